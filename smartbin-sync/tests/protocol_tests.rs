mod common;

use common::{bin_state_json, get_states_result, state_changed_frame};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use smartbin_sync::{
    AccessToken, FrameCodec, InboundFrame, OutboundFrame, SyncError, GET_STATES_ID, SUBSCRIBE_ID,
};

fn decode(frame: Value) -> InboundFrame {
    FrameCodec::default().decode(&frame.to_string()).unwrap()
}

fn encode(frame: &OutboundFrame) -> Value {
    serde_json::from_str(&FrameCodec::default().encode(frame).unwrap()).unwrap()
}

// ── Inbound ──────────────────────────────────────────────────────

#[test]
fn decode_handshake_frames() {
    assert_eq!(
        decode(json!({"type": "auth_required", "ha_version": "2026.3.0"})),
        InboundFrame::AuthRequired {
            ha_version: Some("2026.3.0".into())
        }
    );
    assert_eq!(
        decode(json!({"type": "auth_ok"})),
        InboundFrame::AuthOk { ha_version: None }
    );
    assert_eq!(
        decode(json!({"type": "auth_invalid", "message": "Invalid access token"})),
        InboundFrame::AuthInvalid {
            message: "Invalid access token".into()
        }
    );
}

#[test]
fn decode_ping() {
    assert_eq!(decode(json!({"type": "ping", "id": 7})), InboundFrame::Ping { id: 7 });
}

#[test]
fn decode_unknown_type() {
    assert_eq!(
        decode(json!({"type": "supported_features", "id": 9})),
        InboundFrame::Unknown
    );
}

#[test]
fn decode_full_state_result() {
    let frame = decode(get_states_result(vec![bin_state_json(1, 2), json!({"bogus": true})]));
    let InboundFrame::Result(result) = frame else {
        panic!("expected a result frame");
    };
    assert_eq!(result.id, GET_STATES_ID);
    assert!(result.success);

    let (snapshots, malformed) = result.snapshots().unwrap();
    assert_eq!(snapshots.len(), 1);
    assert_eq!(snapshots[0].entity_id.as_str(), "sensor.smartbin_001_data");
    assert_eq!(malformed, 1);
}

#[test]
fn non_list_result_is_a_protocol_error() {
    let InboundFrame::Result(result) =
        decode(json!({"type": "result", "id": 1, "success": true, "result": {"a": 1}}))
    else {
        panic!("expected a result frame");
    };
    assert!(matches!(result.snapshots(), Err(SyncError::Protocol(_))));
}

#[test]
fn decode_failed_result() {
    let InboundFrame::Result(result) = decode(json!({
        "type": "result",
        "id": 2,
        "success": false,
        "error": {"code": "unauthorized", "message": "Unauthorized"}
    })) else {
        panic!("expected a result frame");
    };
    assert!(!result.success);
    assert_eq!(result.error.unwrap().code, "unauthorized");
}

#[test]
fn decode_state_changed_event() {
    let InboundFrame::Event(event) = decode(state_changed_frame(bin_state_json(3, 1))) else {
        panic!("expected an event frame");
    };
    assert_eq!(event.id, SUBSCRIBE_ID);
    let change = event.state_change().unwrap().unwrap();
    assert_eq!(change.entity_id.as_str(), "sensor.smartbin_003_data");
    assert_eq!(change.new_state.unwrap().state, "1");
    assert!(change.old_state.is_none());
}

#[test]
fn other_event_types_are_not_state_changes() {
    let InboundFrame::Event(event) = decode(json!({
        "type": "event",
        "id": 2,
        "event": {"event_type": "call_service", "data": {}}
    })) else {
        panic!("expected an event frame");
    };
    assert!(event.state_change().unwrap().is_none());
}

#[test]
fn removal_event_has_no_new_state() {
    let InboundFrame::Event(event) = decode(json!({
        "type": "event",
        "id": 2,
        "event": {
            "event_type": "state_changed",
            "data": {"entity_id": "sensor.smartbin_001_data", "new_state": null, "old_state": null}
        }
    })) else {
        panic!("expected an event frame");
    };
    assert!(event.state_change().unwrap().unwrap().new_state.is_none());
}

#[test]
fn malformed_json_is_rejected() {
    let codec = FrameCodec::default();
    assert!(matches!(codec.decode("{not json"), Err(SyncError::Serialization(_))));
    assert!(matches!(codec.decode(r#"{"id": 1}"#), Err(SyncError::Serialization(_))));
}

#[test]
fn oversized_frame_is_rejected() {
    let codec = FrameCodec::new(32);
    let text = json!({"type": "auth_invalid", "message": "x".repeat(64)}).to_string();
    assert!(matches!(
        codec.decode(&text),
        Err(SyncError::FrameTooLarge { limit: 32, .. })
    ));
}

// ── Outbound ─────────────────────────────────────────────────────

#[test]
fn encode_auth() {
    let frame = OutboundFrame::Auth {
        access_token: AccessToken::new("T"),
    };
    assert_eq!(encode(&frame), json!({"type": "auth", "access_token": "T"}));
}

#[test]
fn encode_requests() {
    assert_eq!(encode(&OutboundFrame::get_states()), json!({"type": "get_states", "id": 1}));
    assert_eq!(
        encode(&OutboundFrame::subscribe_state_changes()),
        json!({"type": "subscribe_events", "id": 2, "event_type": "state_changed"})
    );
    assert_eq!(encode(&OutboundFrame::Pong { id: 7 }), json!({"type": "pong", "id": 7}));
}

#[test]
fn request_ids() {
    assert_eq!(OutboundFrame::get_states().request_id(), Some(GET_STATES_ID));
    assert_eq!(OutboundFrame::subscribe_state_changes().request_id(), Some(SUBSCRIBE_ID));
    assert_eq!(OutboundFrame::Pong { id: 3 }.request_id(), None);
}

#[test]
fn access_token_debug_is_redacted() {
    let token = AccessToken::new("super-secret");
    assert_eq!(format!("{token:?}"), "AccessToken(***)");
    assert_eq!(token.expose(), "super-secret");
}
