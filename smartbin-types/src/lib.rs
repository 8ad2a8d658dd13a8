//! Core type definitions for the SmartBin live panel.
//!
//! This crate defines the fundamental types shared by the sync engine and
//! the panel frontend:
//! - Entity identifiers as published by the event bus (`domain.object_id`)
//! - Entity snapshots (primary value + open attribute mapping)
//! - Typed read-only views over the SmartBin attribute payloads
//!
//! Nothing here performs I/O.

mod bin;
mod ids;
mod snapshot;

pub use bin::{
    AnalysisState, AnalysisStatus, HistoryEntry, Inventory, InventoryItem, SearchHit, SearchResults,
};
pub use ids::{EntityId, EntityKind, HelperField};
pub use snapshot::EntitySnapshot;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid entity id: {0}")]
    InvalidEntityId(String),
}
