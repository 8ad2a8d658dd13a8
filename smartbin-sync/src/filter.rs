//! Relevance and novelty filtering for inbound snapshots.
//!
//! The bus publishes every entity in the installation and re-publishes them
//! whenever bookkeeping fields move. Only a handful of identifiers matter to
//! the panel, and only changes to their meaningful content should reach the
//! cache.
//!
//! Meaningful content is the primary value plus the attributes, minus any
//! configured volatile attributes. It is normalized before digesting:
//! object keys are sorted at every depth and integral floats are written as
//! integers, so payloads that differ only in key order or number spelling
//! digest identically.

use crate::state::DigestTable;
use serde_json::{Map, Number, Value};
use sha2::{Digest, Sha256};
use smartbin_types::{EntityId, EntitySnapshot};
use std::collections::BTreeSet;
use std::fmt::Write as _;
use tracing::trace;

/// One allow-list rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentifierRule {
    /// Matches one identifier exactly.
    Exact(String),
    /// Matches identifiers that start with `prefix`, end with `suffix`, and
    /// have something in between.
    Affix { prefix: String, suffix: String },
}

impl IdentifierRule {
    pub fn exact(id: impl Into<String>) -> Self {
        IdentifierRule::Exact(id.into())
    }

    pub fn affix(prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        IdentifierRule::Affix {
            prefix: prefix.into(),
            suffix: suffix.into(),
        }
    }

    pub fn matches(&self, id: &str) -> bool {
        match self {
            IdentifierRule::Exact(exact) => id == exact,
            IdentifierRule::Affix { prefix, suffix } => {
                id.len() > prefix.len() + suffix.len()
                    && id.starts_with(prefix.as_str())
                    && id.ends_with(suffix.as_str())
            }
        }
    }
}

/// Allow-list and normalization settings.
#[derive(Debug, Clone)]
pub struct FilterConfig {
    /// Identifiers matching any rule are relevant.
    pub rules: Vec<IdentifierRule>,
    /// Top-level attribute keys excluded from the digest.
    pub volatile_attributes: BTreeSet<String>,
}

impl Default for FilterConfig {
    /// The SmartBin integration's entities.
    fn default() -> Self {
        Self {
            rules: vec![
                IdentifierRule::affix("sensor.smartbin_", "_data"),
                IdentifierRule::exact("sensor.smartbin_ai_search_results"),
                IdentifierRule::affix("input_text.smartbin_", "_name"),
                IdentifierRule::affix("input_text.smartbin_", "_images"),
                IdentifierRule::affix("input_text.smartbin_", "_inventory"),
            ],
            volatile_attributes: BTreeSet::new(),
        }
    }
}

impl FilterConfig {
    /// Adds a rule.
    pub fn with_rule(mut self, rule: IdentifierRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Excludes an attribute from the digest.
    pub fn ignore_attribute(mut self, key: impl Into<String>) -> Self {
        self.volatile_attributes.insert(key.into());
        self
    }
}

/// Decides whether a snapshot is relevant and whether it changes anything.
#[derive(Debug, Clone, Default)]
pub struct EntityFilter {
    config: FilterConfig,
    digests: DigestTable,
}

impl EntityFilter {
    pub fn new(config: FilterConfig) -> Self {
        Self {
            config,
            digests: DigestTable::new(),
        }
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    /// Digests of accepted snapshots.
    pub fn digests(&self) -> &DigestTable {
        &self.digests
    }

    /// Whether an identifier is on the allow-list.
    pub fn is_relevant(&self, entity_id: &EntityId) -> bool {
        self.config
            .rules
            .iter()
            .any(|rule| rule.matches(entity_id.as_str()))
    }

    /// Accepts a snapshot if it is relevant and its meaningful content
    /// differs from the last accepted one, recording its digest.
    ///
    /// A `true` return obliges the caller to store the snapshot; the digest
    /// table already reflects it.
    pub fn admit(&mut self, entity_id: &EntityId, snapshot: &EntitySnapshot) -> bool {
        if !self.is_relevant(entity_id) {
            return false;
        }
        let digest = self.digest(snapshot);
        let accepted = self.digests.record(entity_id, digest);
        if !accepted {
            trace!("Unchanged snapshot for {}", entity_id);
        }
        accepted
    }

    /// Digest of the meaningful content of a snapshot.
    pub fn digest(&self, snapshot: &EntitySnapshot) -> String {
        let mut canonical = String::new();
        canonical.push('{');
        canonical.push_str("\"state\":");
        write_string(&mut canonical, &snapshot.state);
        canonical.push_str(",\"attributes\":");
        write_object(
            &mut canonical,
            &snapshot.attributes,
            Some(&self.config.volatile_attributes),
        );
        canonical.push('}');

        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// Writes `value` as canonical JSON.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_value(&mut out, value);
    out
}

fn write_value(out: &mut String, value: &Value) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => write_number(out, n),
        Value::String(s) => write_string(out, s),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(out, item);
            }
            out.push(']');
        }
        Value::Object(map) => write_object(out, map, None),
    }
}

fn write_object(out: &mut String, map: &Map<String, Value>, skip: Option<&BTreeSet<String>>) {
    let mut keys: Vec<&String> = map
        .keys()
        .filter(|key| skip.is_none_or(|skip| !skip.contains(*key)))
        .collect();
    keys.sort();

    out.push('{');
    for (i, key) in keys.into_iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        write_string(out, key);
        out.push(':');
        write_value(out, &map[key.as_str()]);
    }
    out.push('}');
}

fn write_number(out: &mut String, n: &Number) {
    if n.is_f64() {
        if let Some(f) = n.as_f64() {
            if f.fract() == 0.0 && f.abs() < 9.0e15 {
                let _ = write!(out, "{}", f as i64);
                return;
            }
        }
    }
    let _ = write!(out, "{n}");
}

fn write_string(out: &mut String, s: &str) {
    // Serializing a str cannot fail.
    out.push_str(&serde_json::to_string(s).unwrap_or_default());
}
