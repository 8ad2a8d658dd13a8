mod common;

use common::{bin_snapshot, foreign_state_json};
use pretty_assertions::assert_eq;
use smartbin_sync::{
    ApplyOutcome, ApplyReport, EntityFilter, FilterConfig, SnapshotApplicator, StateCache,
};
use smartbin_types::{EntityId, EntitySnapshot};

fn applicator() -> SnapshotApplicator {
    SnapshotApplicator::new(EntityFilter::new(FilterConfig::default()), StateCache::shared())
}

fn foreign(name: &str) -> EntitySnapshot {
    serde_json::from_value(foreign_state_json(name)).unwrap()
}

// ── apply ────────────────────────────────────────────────────────

#[tokio::test]
async fn relevant_new_snapshot_is_applied() {
    let mut app = applicator();
    assert_eq!(app.apply(bin_snapshot(1, 2)).await, ApplyOutcome::Applied);

    let cache = app.cache().read().await;
    assert_eq!(cache.get(&EntityId::new("sensor.smartbin_001_data")).unwrap().state, "2");
    assert_eq!(cache.revision(), 1);
}

#[tokio::test]
async fn duplicate_is_unchanged_and_cache_untouched() {
    let mut app = applicator();
    app.apply(bin_snapshot(1, 2)).await;
    assert_eq!(app.apply(bin_snapshot(1, 2)).await, ApplyOutcome::Unchanged);
    assert_eq!(app.cache().read().await.revision(), 1);
}

#[tokio::test]
async fn foreign_entity_is_ignored() {
    let mut app = applicator();
    assert_eq!(app.apply(foreign("kitchen_temperature")).await, ApplyOutcome::Ignored);
    assert!(app.cache().read().await.is_empty());
    assert!(app.filter().digests().is_empty());
}

#[tokio::test]
async fn digest_and_cache_move_together() {
    let mut app = applicator();
    let id = EntityId::new("sensor.smartbin_001_data");

    app.apply(bin_snapshot(1, 1)).await;
    let first = app.filter().digests().get(&id).unwrap().to_string();
    app.apply(bin_snapshot(1, 1)).await;
    assert_eq!(app.filter().digests().get(&id).unwrap(), first);

    app.apply(bin_snapshot(1, 3)).await;
    let expected = app.filter().digest(&app.cache().read().await.get(&id).unwrap());
    assert_eq!(app.filter().digests().get(&id).unwrap(), expected);
}

// ── apply_batch ──────────────────────────────────────────────────

#[tokio::test]
async fn batch_report_counts_each_outcome() {
    let mut app = applicator();
    let batch = vec![
        bin_snapshot(1, 1),
        bin_snapshot(2, 1),
        bin_snapshot(1, 1),
        foreign("kitchen_temperature"),
        bin_snapshot(2, 4),
    ];

    let report = app.apply_batch(batch).await;

    assert_eq!(
        report,
        ApplyReport {
            applied: 3,
            unchanged: 1,
            ignored: 1,
        }
    );
    assert!(report.changed());
    let cache = app.cache().read().await;
    assert_eq!(cache.len(), 2);
    assert_eq!(cache.get(&EntityId::new("sensor.smartbin_002_data")).unwrap().state, "4");
}

#[tokio::test]
async fn batch_of_duplicates_reports_no_change() {
    let mut app = applicator();
    app.apply(bin_snapshot(1, 1)).await;
    let report = app.apply_batch(vec![bin_snapshot(1, 1), foreign("door")]).await;
    assert!(!report.changed());
}

#[tokio::test]
async fn empty_batch() {
    let mut app = applicator();
    assert_eq!(app.apply_batch(Vec::new()).await, ApplyReport::default());
}
