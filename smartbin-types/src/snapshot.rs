//! Entity snapshots.
//!
//! A snapshot is the full value and attributes of an entity at one point in
//! time. Snapshots are immutable once received; a newer snapshot replaces the
//! older one under the same identifier.

use crate::bin::{AnalysisStatus, HistoryEntry, Inventory, SearchResults};
use crate::EntityId;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The state of one entity as published by the event bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    /// The entity this snapshot belongs to.
    pub entity_id: EntityId,
    /// Primary value.
    pub state: String,
    /// Open attribute mapping.
    #[serde(default)]
    pub attributes: Map<String, Value>,
    /// Bus bookkeeping: when `state` last changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_changed: Option<String>,
    /// Bus bookkeeping: when anything last changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
    /// Bus bookkeeping: originating context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

impl EntitySnapshot {
    /// Creates a snapshot with no attributes and no bus metadata.
    pub fn new(entity_id: impl Into<EntityId>, state: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            state: state.into(),
            attributes: Map::new(),
            last_changed: None,
            last_updated: None,
            context: None,
        }
    }

    /// Adds an attribute.
    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    /// Sets the bus timestamps.
    pub fn with_timestamps(mut self, last_changed: impl Into<String>, last_updated: impl Into<String>) -> Self {
        self.last_changed = Some(last_changed.into());
        self.last_updated = Some(last_updated.into());
        self
    }

    /// Parses a snapshot from a JSON value.
    pub fn from_value(value: Value) -> crate::Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Returns a raw attribute.
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Deserializes an attribute into `T`, returning `None` when it is
    /// missing or has the wrong shape.
    pub fn attribute_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.attributes
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Human-readable name, falling back to the object id.
    pub fn friendly_name(&self) -> &str {
        self.attributes
            .get("friendly_name")
            .and_then(Value::as_str)
            .unwrap_or_else(|| self.entity_id.object_id())
    }

    /// Bin inventory carried by a data sensor. Missing or malformed
    /// inventories read as empty.
    pub fn inventory(&self) -> Inventory {
        self.attribute_as("inventory").unwrap_or_default()
    }

    /// Image filenames, oldest first.
    pub fn images(&self) -> Vec<String> {
        self.attribute_as("images").unwrap_or_default()
    }

    /// Add/remove history, oldest first.
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.attribute_as("history").unwrap_or_default()
    }

    /// Current analysis status, if the sensor reports one.
    pub fn analysis_status(&self) -> Option<AnalysisStatus> {
        self.attribute_as("analysis_status")
    }

    /// Query and hits carried by the search results sensor. Missing fields
    /// read as empty.
    pub fn search_results(&self) -> SearchResults {
        SearchResults {
            query: self.attribute_as("query").unwrap_or_default(),
            results: self.attribute_as("results").unwrap_or_default(),
        }
    }

    /// URL of the most recent image.
    pub fn latest_url(&self) -> Option<&str> {
        self.attributes.get("latest_url").and_then(Value::as_str)
    }
}
