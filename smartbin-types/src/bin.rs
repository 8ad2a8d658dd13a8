//! Typed views over the attributes published by a bin data sensor.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Inventory of one bin.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Inventory {
    #[serde(default)]
    pub items: Vec<InventoryItem>,
}

impl Inventory {
    /// Total number of items, summing quantities. Saturates at `u64::MAX`.
    pub fn item_count(&self) -> u64 {
        self.items
            .iter()
            .fold(0u64, |total, item| total.saturating_add(item.quantity))
    }

    /// Case-insensitive lookup by item name.
    pub fn find(&self, name: &str) -> Option<&InventoryItem> {
        let needle = name.trim().to_lowercase();
        self.items
            .iter()
            .find(|item| item.name.trim().to_lowercase() == needle)
    }
}

/// One inventory line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub name: String,
    #[serde(default, deserialize_with = "lenient_quantity")]
    pub quantity: u64,
    #[serde(default = "default_condition")]
    pub condition: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn default_condition() -> String {
    "good".to_string()
}

/// Quantities arrive as integers, floats or numeric strings depending on
/// which service wrote them. Anything unusable reads as zero.
fn lenient_quantity<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    })
}

/// Progress of the image analysis pipeline for a bin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisStatus {
    pub state: AnalysisState,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisState {
    Idle,
    QuickRunning,
    DeepRunning,
    DeepDone,
    Error,
    #[serde(other)]
    Unknown,
}

impl AnalysisState {
    /// Whether an analysis is in flight.
    pub fn is_running(&self) -> bool {
        matches!(self, AnalysisState::QuickRunning | AnalysisState::DeepRunning)
    }
}

/// One add/remove record in a bin's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: String,
    pub action: String,
    #[serde(default)]
    pub items: Vec<Value>,
    #[serde(default)]
    pub image_filename: Option<String>,
}

/// Payload of the search results sensor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub results: Vec<SearchHit>,
}

/// One matching item across all bins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub bin_id: String,
    #[serde(default)]
    pub bin_name: String,
    pub item_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, deserialize_with = "lenient_quantity")]
    pub quantity: u64,
    #[serde(default = "unknown_condition")]
    pub condition: String,
}

fn unknown_condition() -> String {
    "unknown".to_string()
}
