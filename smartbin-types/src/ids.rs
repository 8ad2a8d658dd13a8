//! Entity identifiers as published by the event bus.
//!
//! Identifiers have the form `domain.object_id` (e.g. `sensor.smartbin_001_data`).

use crate::Error;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

/// Prefix shared by every per-bin object id.
const BIN_PREFIX: &str = "smartbin_";

/// Object id of the integration's search results sensor.
const SEARCH_RESULTS_OBJECT: &str = "smartbin_ai_search_results";

/// Identifier of an entity on the event bus.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Wraps a raw identifier without validation.
    ///
    /// The bus is the authority on identifiers; anything it sends is kept
    /// verbatim so that filtering decisions see exactly what arrived.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Parses an identifier, requiring a non-empty `domain.object_id` form.
    pub fn parse(s: &str) -> Result<Self, Error> {
        match s.split_once('.') {
            Some((domain, object)) if !domain.is_empty() && !object.is_empty() => {
                Ok(Self(s.to_string()))
            }
            _ => Err(Error::InvalidEntityId(s.to_string())),
        }
    }

    /// Returns the raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the domain part (`sensor` in `sensor.smartbin_001_data`).
    #[must_use]
    pub fn domain(&self) -> &str {
        self.0.split_once('.').map_or("", |(domain, _)| domain)
    }

    /// Returns the object id part (`smartbin_001_data` in `sensor.smartbin_001_data`).
    #[must_use]
    pub fn object_id(&self) -> &str {
        self.0.split_once('.').map_or(self.0.as_str(), |(_, object)| object)
    }

    /// Classifies the identifier against the SmartBin naming scheme.
    #[must_use]
    pub fn kind(&self) -> EntityKind {
        let object = self.object_id();
        match self.domain() {
            "sensor" if object == SEARCH_RESULTS_OBJECT => EntityKind::SearchResults,
            "sensor" => match bin_with_suffix(object, "_data") {
                Some(bin_id) => EntityKind::BinData { bin_id },
                None => EntityKind::Other,
            },
            "input_text" => HelperField::ALL
                .iter()
                .find_map(|field| {
                    bin_with_suffix(object, field.suffix()).map(|bin_id| EntityKind::BinHelper {
                        bin_id,
                        field: *field,
                    })
                })
                .unwrap_or(EntityKind::Other),
            _ => EntityKind::Other,
        }
    }
}

/// Extracts `smartbin_001` from `smartbin_001<suffix>`.
fn bin_with_suffix(object: &str, suffix: &str) -> Option<String> {
    let bin = object.strip_suffix(suffix)?;
    let number = bin.strip_prefix(BIN_PREFIX)?;
    if number.is_empty() || bin == SEARCH_RESULTS_OBJECT {
        return None;
    }
    Some(bin.to_string())
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for EntityId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Borrow<str> for EntityId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// What an identifier refers to in the SmartBin naming scheme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityKind {
    /// Per-bin data sensor (`sensor.smartbin_001_data`).
    BinData { bin_id: String },
    /// Global search results sensor.
    SearchResults,
    /// Legacy `input_text` helper for a bin.
    BinHelper { bin_id: String, field: HelperField },
    /// Not part of the SmartBin scheme.
    Other,
}

/// Legacy `input_text.smartbin_XXX_<field>` helpers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HelperField {
    Name,
    Images,
    Inventory,
}

impl HelperField {
    pub const ALL: [HelperField; 3] = [HelperField::Name, HelperField::Images, HelperField::Inventory];

    /// Object id suffix for this helper.
    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            HelperField::Name => "_name",
            HelperField::Images => "_images",
            HelperField::Inventory => "_inventory",
        }
    }
}
