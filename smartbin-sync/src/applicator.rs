//! Snapshot applicator - runs inbound snapshots through the filter into the cache.
//!
//! The applicator is the cache's only writer and the digest table's only
//! owner, so "digest updated iff cache entry updated" holds by construction:
//! both happen in [`apply_locked`] under one write lock.

use crate::filter::EntityFilter;
use crate::state::{SharedStateCache, StateCache};
use smartbin_types::EntitySnapshot;
use tracing::debug;

/// What happened to one snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Identifier not on the allow-list.
    Ignored,
    /// Meaningful content unchanged.
    Unchanged,
    /// Stored in the cache.
    Applied,
}

/// Tally of a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub applied: usize,
    pub unchanged: usize,
    pub ignored: usize,
}

impl ApplyReport {
    fn record(&mut self, outcome: ApplyOutcome) {
        match outcome {
            ApplyOutcome::Ignored => self.ignored += 1,
            ApplyOutcome::Unchanged => self.unchanged += 1,
            ApplyOutcome::Applied => self.applied += 1,
        }
    }

    /// Whether anything reached the cache.
    pub fn changed(&self) -> bool {
        self.applied > 0
    }
}

/// Applies snapshots to the shared cache.
pub struct SnapshotApplicator {
    filter: EntityFilter,
    cache: SharedStateCache,
}

impl SnapshotApplicator {
    pub fn new(filter: EntityFilter, cache: SharedStateCache) -> Self {
        Self { filter, cache }
    }

    pub fn filter(&self) -> &EntityFilter {
        &self.filter
    }

    pub fn cache(&self) -> &SharedStateCache {
        &self.cache
    }

    /// Applies one snapshot.
    pub async fn apply(&mut self, snapshot: EntitySnapshot) -> ApplyOutcome {
        let mut cache = self.cache.write().await;
        apply_locked(&mut self.filter, &mut cache, snapshot)
    }

    /// Applies a batch under a single write lock, so no reader ever sees a
    /// partially applied batch.
    pub async fn apply_batch(&mut self, snapshots: Vec<EntitySnapshot>) -> ApplyReport {
        let mut report = ApplyReport::default();
        let mut cache = self.cache.write().await;
        for snapshot in snapshots {
            report.record(apply_locked(&mut self.filter, &mut cache, snapshot));
        }
        debug!(
            "Applied batch: {} applied, {} unchanged, {} ignored",
            report.applied, report.unchanged, report.ignored
        );
        report
    }
}

fn apply_locked(filter: &mut EntityFilter, cache: &mut StateCache, snapshot: EntitySnapshot) -> ApplyOutcome {
    let entity_id = snapshot.entity_id.clone();
    if !filter.is_relevant(&entity_id) {
        return ApplyOutcome::Ignored;
    }
    if !filter.admit(&entity_id, &snapshot) {
        return ApplyOutcome::Unchanged;
    }
    debug!("Applying snapshot for {} (state {:?})", entity_id, snapshot.state);
    cache.put(entity_id, snapshot);
    ApplyOutcome::Applied
}
