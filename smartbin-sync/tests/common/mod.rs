//! Shared test helpers for sync tests.

#![allow(dead_code)]

use serde_json::{json, Value};
use smartbin_sync::{CacheView, ViewNode, ViewRenderer, ViewTree};
use smartbin_types::EntitySnapshot;
use std::sync::{Arc, Mutex};

/// Bus JSON for a bin data sensor holding `count` screwdrivers.
pub fn bin_state_json(bin: u32, count: u64) -> Value {
    json!({
        "entity_id": format!("sensor.smartbin_{bin:03}_data"),
        "state": count.to_string(),
        "attributes": {
            "friendly_name": format!("Smart Bin {bin:03} - Data"),
            "inventory": {"items": [{"name": "Screwdriver", "quantity": count, "condition": "good"}]},
            "images": [],
            "analysis_status": {"state": "idle", "message": "Ready."}
        },
        "last_changed": "2026-03-01T12:00:00+00:00",
        "last_updated": "2026-03-01T12:00:00+00:00",
        "context": {"id": "ctx-1"}
    })
}

/// A bin data sensor snapshot.
pub fn bin_snapshot(bin: u32, count: u64) -> EntitySnapshot {
    serde_json::from_value(bin_state_json(bin, count)).unwrap()
}

/// Bus JSON for an entity outside the allow-list.
pub fn foreign_state_json(name: &str) -> Value {
    json!({
        "entity_id": format!("sensor.{name}"),
        "state": "21.5",
        "attributes": {"unit_of_measurement": "°C"}
    })
}

/// A `state_changed` event frame.
pub fn state_changed_frame(new_state: Value) -> Value {
    let entity_id = new_state["entity_id"].clone();
    json!({
        "type": "event",
        "id": 2,
        "event": {
            "event_type": "state_changed",
            "data": {"entity_id": entity_id, "new_state": new_state, "old_state": null},
            "time_fired": "2026-03-01T12:00:01+00:00"
        }
    })
}

/// A successful `get_states` result frame.
pub fn get_states_result(states: Vec<Value>) -> Value {
    json!({"type": "result", "id": 1, "success": true, "result": states})
}

/// Renderer that records the revisions it saw and lists every cached
/// entity as a text node, plus a keyed search box.
#[derive(Clone, Default)]
pub struct RecordingRenderer {
    pub seen: Arc<Mutex<Vec<CacheView>>>,
}

impl RecordingRenderer {
    pub fn passes(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    pub fn last(&self) -> Option<CacheView> {
        self.seen.lock().unwrap().last().cloned()
    }
}

impl ViewRenderer for RecordingRenderer {
    fn render(&self, state: &CacheView) -> ViewTree {
        self.seen.lock().unwrap().push(state.clone());
        let rows = state
            .sorted()
            .into_iter()
            .map(|snapshot| ViewNode::text(format!("{}={}", snapshot.entity_id, snapshot.state)));
        ViewTree::new(vec![
            ViewNode::text_input("screwdriver", "Search").with_key("search"),
            ViewNode::container("list").with_children(rows),
        ])
    }
}
