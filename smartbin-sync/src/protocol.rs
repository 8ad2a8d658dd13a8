//! Event bus protocol frames.
//!
//! The bus speaks JSON frames internally tagged by `type`:
//! 1. The peer announces `auth_required`; we answer with `auth`
//! 2. The peer confirms with `auth_ok` (or `auth_invalid`)
//! 3. We request the full state (`get_states`, id 1) and subscribe to
//!    `state_changed` events (`subscribe_events`, id 2)
//! 4. The peer streams `result` and `event` frames; `ping` may arrive at
//!    any time and is answered with `pong`

use crate::credentials::AccessToken;
use crate::error::{SyncError, SyncResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use smartbin_types::{EntityId, EntitySnapshot};

/// Request id of the full-state request.
pub const GET_STATES_ID: u64 = 1;

/// Request id of the change subscription.
pub const SUBSCRIBE_ID: u64 = 2;

/// Event type carrying entity changes.
pub const STATE_CHANGED: &str = "state_changed";

/// A frame received from the bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundFrame {
    /// The peer wants credentials before anything else.
    AuthRequired {
        #[serde(default)]
        ha_version: Option<String>,
    },

    /// Credentials accepted.
    AuthOk {
        #[serde(default)]
        ha_version: Option<String>,
    },

    /// Credentials rejected.
    AuthInvalid {
        #[serde(default)]
        message: String,
    },

    /// Liveness check; must be echoed.
    Ping { id: u64 },

    /// Reply to a ping we sent.
    Pong { id: u64 },

    /// Result of one of our requests.
    Result(ResultMessage),

    /// Event delivered on a subscription.
    Event(EventMessage),

    /// Any frame type we do not understand.
    #[serde(other)]
    Unknown,
}

/// A frame sent to the bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundFrame {
    /// Bearer credential.
    Auth { access_token: AccessToken },

    /// Full-state snapshot request.
    GetStates { id: u64 },

    /// Subscription to future change events.
    SubscribeEvents {
        id: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        event_type: Option<String>,
    },

    /// Echo of an inbound ping.
    Pong { id: u64 },
}

impl OutboundFrame {
    /// The full-state request issued right after authentication.
    pub fn get_states() -> Self {
        OutboundFrame::GetStates { id: GET_STATES_ID }
    }

    /// The change subscription issued right after authentication.
    pub fn subscribe_state_changes() -> Self {
        OutboundFrame::SubscribeEvents {
            id: SUBSCRIBE_ID,
            event_type: Some(STATE_CHANGED.to_string()),
        }
    }

    /// Request id carried by this frame, if it is a request.
    pub fn request_id(&self) -> Option<u64> {
        match self {
            OutboundFrame::GetStates { id } | OutboundFrame::SubscribeEvents { id, .. } => Some(*id),
            OutboundFrame::Auth { .. } | OutboundFrame::Pong { .. } => None,
        }
    }
}

/// Result of a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultMessage {
    /// Id of the request this answers.
    pub id: u64,
    /// Whether the request succeeded.
    pub success: bool,
    /// Payload on success.
    #[serde(default)]
    pub result: Option<Value>,
    /// Error on failure.
    #[serde(default)]
    pub error: Option<ErrorMessage>,
}

impl ResultMessage {
    /// Decodes a bulk state payload into snapshots.
    ///
    /// Individual malformed items are skipped and counted; a payload that is
    /// not a list at all is a protocol error.
    pub fn snapshots(&self) -> SyncResult<(Vec<EntitySnapshot>, usize)> {
        let items = match &self.result {
            Some(Value::Array(items)) => items,
            Some(Value::Null) | None => return Ok((Vec::new(), 0)),
            Some(other) => {
                return Err(SyncError::Protocol(format!(
                    "expected a list of states, got {}",
                    json_kind(other)
                )));
            }
        };

        let mut snapshots = Vec::with_capacity(items.len());
        let mut malformed = 0;
        for item in items {
            match serde_json::from_value::<EntitySnapshot>(item.clone()) {
                Ok(snapshot) => snapshots.push(snapshot),
                Err(_) => malformed += 1,
            }
        }
        Ok((snapshots, malformed))
    }
}

/// Error carried by a failed result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorMessage {
    /// Machine-readable error code.
    pub code: String,
    /// Human-readable error message.
    #[serde(default)]
    pub message: String,
}

/// Event delivered on a subscription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventMessage {
    /// Id of the subscription that produced this event.
    pub id: u64,
    /// The event itself.
    pub event: BusEvent,
}

/// An event on the bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusEvent {
    pub event_type: String,
    #[serde(default)]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_fired: Option<String>,
}

/// Payload of a `state_changed` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateChange {
    pub entity_id: EntityId,
    /// `None` when the entity was removed upstream.
    #[serde(default)]
    pub new_state: Option<EntitySnapshot>,
    #[serde(default)]
    pub old_state: Option<EntitySnapshot>,
}

impl EventMessage {
    /// Decodes the event as a state change.
    ///
    /// Returns `Ok(None)` for other event types.
    pub fn state_change(&self) -> SyncResult<Option<StateChange>> {
        if self.event.event_type != STATE_CHANGED {
            return Ok(None);
        }
        let change = serde_json::from_value(self.event.data.clone())?;
        Ok(Some(change))
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}
