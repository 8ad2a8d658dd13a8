//! Synchronized state.
//!
//! The [`StateCache`] maps each relevant entity to its latest snapshot. The
//! [`DigestTable`] remembers the digest of the last accepted snapshot per
//! entity. Both are written only by the session task; renders read a
//! [`CacheView`], which is an immutable copy-on-write snapshot of the cache.

use smartbin_types::{EntityId, EntitySnapshot};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Cache shared between the session task (writer) and renders (readers).
pub type SharedStateCache = Arc<RwLock<StateCache>>;

/// Latest known snapshot per entity.
#[derive(Debug, Clone, Default)]
pub struct StateCache {
    entries: Arc<HashMap<EntityId, Arc<EntitySnapshot>>>,
    /// Number of `put` calls so far.
    revision: u64,
}

impl StateCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty cache ready to be shared.
    pub fn shared() -> SharedStateCache {
        Arc::new(RwLock::new(Self::new()))
    }

    /// Gets the latest snapshot for an entity.
    pub fn get(&self, entity_id: &EntityId) -> Option<Arc<EntitySnapshot>> {
        self.entries.get(entity_id).cloned()
    }

    /// Stores a snapshot, superseding any previous one for the same entity.
    /// Returns the superseded snapshot.
    pub fn put(&mut self, entity_id: EntityId, snapshot: EntitySnapshot) -> Option<Arc<EntitySnapshot>> {
        self.revision += 1;
        Arc::make_mut(&mut self.entries).insert(entity_id, Arc::new(snapshot))
    }

    /// Whether the cache holds an entity.
    pub fn contains(&self, entity_id: &EntityId) -> bool {
        self.entries.contains_key(entity_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of mutations applied since creation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Returns all cached entity IDs.
    pub fn entity_ids(&self) -> impl Iterator<Item = &EntityId> {
        self.entries.keys()
    }

    /// Takes an immutable view of the current contents.
    pub fn view(&self) -> CacheView {
        CacheView {
            entries: Arc::clone(&self.entries),
            revision: self.revision,
        }
    }
}

/// Immutable view of the cache as of one moment.
///
/// Later writes to the cache never show through a view that was already taken.
#[derive(Debug, Clone, Default)]
pub struct CacheView {
    entries: Arc<HashMap<EntityId, Arc<EntitySnapshot>>>,
    revision: u64,
}

impl CacheView {
    pub fn get(&self, entity_id: &EntityId) -> Option<&EntitySnapshot> {
        self.entries.get(entity_id).map(Arc::as_ref)
    }

    /// Looks up by raw identifier.
    pub fn get_str(&self, entity_id: &str) -> Option<&EntitySnapshot> {
        self.entries.get(entity_id).map(Arc::as_ref)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cache revision the view was taken at.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// All snapshots ordered by entity ID.
    pub fn sorted(&self) -> Vec<&EntitySnapshot> {
        let mut snapshots: Vec<&EntitySnapshot> = self.entries.values().map(Arc::as_ref).collect();
        snapshots.sort_by(|a, b| a.entity_id.cmp(&b.entity_id));
        snapshots
    }
}

/// Digest of the last accepted snapshot per entity.
#[derive(Debug, Clone, Default)]
pub struct DigestTable {
    digests: HashMap<EntityId, String>,
}

impl DigestTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, entity_id: &EntityId) -> Option<&str> {
        self.digests.get(entity_id).map(String::as_str)
    }

    /// Records a digest. Returns `false` if it equals the stored one.
    pub fn record(&mut self, entity_id: &EntityId, digest: String) -> bool {
        match self.digests.get_mut(entity_id) {
            Some(existing) if *existing == digest => false,
            Some(existing) => {
                *existing = digest;
                true
            }
            None => {
                self.digests.insert(entity_id.clone(), digest);
                true
            }
        }
    }

    pub fn len(&self) -> usize {
        self.digests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.digests.is_empty()
    }
}
