mod common;

use common::bin_snapshot;
use proptest::prelude::*;
use serde_json::json;
use smartbin_sync::filter::canonical_json;
use smartbin_sync::{EntityFilter, FilterConfig, IdentifierRule};
use smartbin_types::{EntityId, EntitySnapshot};

fn default_filter() -> EntityFilter {
    EntityFilter::new(FilterConfig::default())
}

// ── IdentifierRule ───────────────────────────────────────────────

#[test]
fn exact_rule_matches_only_itself() {
    let rule = IdentifierRule::exact("sensor.smartbin_ai_search_results");
    assert!(rule.matches("sensor.smartbin_ai_search_results"));
    assert!(!rule.matches("sensor.smartbin_ai_search_results_2"));
}

#[test]
fn affix_rule_requires_something_between() {
    let rule = IdentifierRule::affix("sensor.smartbin_", "_data");
    assert!(rule.matches("sensor.smartbin_001_data"));
    assert!(!rule.matches("sensor.smartbin__data"));
    assert!(!rule.matches("sensor.smartbin_001_images"));
    assert!(!rule.matches("binary_sensor.smartbin_001_data"));
}

// ── is_relevant ──────────────────────────────────────────────────

#[test]
fn default_allow_list() {
    let filter = default_filter();
    for id in [
        "sensor.smartbin_001_data",
        "sensor.smartbin_042_data",
        "sensor.smartbin_ai_search_results",
        "input_text.smartbin_001_name",
        "input_text.smartbin_001_images",
        "input_text.smartbin_001_inventory",
    ] {
        assert!(filter.is_relevant(&EntityId::new(id)), "{id} should be relevant");
    }
    for id in [
        "sensor.kitchen_temperature",
        "light.smartbin_001_data",
        "input_text.smartbin_001_notes",
        "sensor.smartbin_001",
        "",
    ] {
        assert!(!filter.is_relevant(&EntityId::new(id)), "{id} should be ignored");
    }
}

#[test]
fn custom_rule_extends_allow_list() {
    let filter = EntityFilter::new(
        FilterConfig::default().with_rule(IdentifierRule::exact("sensor.garage_door")),
    );
    assert!(filter.is_relevant(&EntityId::new("sensor.garage_door")));
}

// ── admit ────────────────────────────────────────────────────────

#[test]
fn first_snapshot_is_admitted() {
    let mut filter = default_filter();
    let snap = bin_snapshot(1, 3);
    assert!(filter.admit(&snap.entity_id, &snap));
    assert!(filter.digests().get(&snap.entity_id).is_some());
}

#[test]
fn identical_snapshot_is_rejected() {
    let mut filter = default_filter();
    let snap = bin_snapshot(1, 3);
    assert!(filter.admit(&snap.entity_id, &snap));
    assert!(!filter.admit(&snap.entity_id, &snap.clone()));
}

#[test]
fn changed_value_is_admitted_and_digest_moves() {
    let mut filter = default_filter();
    let first = bin_snapshot(1, 3);
    let second = bin_snapshot(1, 4);
    filter.admit(&first.entity_id, &first);
    let before = filter.digests().get(&first.entity_id).unwrap().to_string();

    assert!(filter.admit(&second.entity_id, &second));
    assert_ne!(filter.digests().get(&second.entity_id).unwrap(), before);
}

#[test]
fn irrelevant_snapshot_is_rejected_without_digest() {
    let mut filter = default_filter();
    let snap = EntitySnapshot::new("sensor.kitchen_temperature", "21");
    assert!(!filter.admit(&snap.entity_id, &snap));
    assert!(filter.digests().is_empty());
}

#[test]
fn bus_metadata_is_not_meaningful() {
    let mut filter = default_filter();
    let first = bin_snapshot(2, 1);
    let mut second = first.clone();
    second.last_changed = Some("2026-03-02T00:00:00+00:00".into());
    second.last_updated = Some("2026-03-02T00:00:00+00:00".into());
    second.context = Some(json!({"id": "ctx-2"}));

    assert!(filter.admit(&first.entity_id, &first));
    assert!(!filter.admit(&second.entity_id, &second));
}

#[test]
fn key_order_is_not_meaningful() {
    let filter = default_filter();
    let a: EntitySnapshot = serde_json::from_str(
        r#"{"entity_id":"sensor.smartbin_001_data","state":"1","attributes":{"a":1,"b":{"x":1,"y":2}}}"#,
    )
    .unwrap();
    let b: EntitySnapshot = serde_json::from_str(
        r#"{"entity_id":"sensor.smartbin_001_data","state":"1","attributes":{"b":{"y":2,"x":1},"a":1}}"#,
    )
    .unwrap();
    assert_eq!(filter.digest(&a), filter.digest(&b));
}

#[test]
fn integral_float_equals_integer() {
    let filter = default_filter();
    let a = EntitySnapshot::new("sensor.smartbin_001_data", "1").with_attribute("quantity", json!(2));
    let b = EntitySnapshot::new("sensor.smartbin_001_data", "1").with_attribute("quantity", json!(2.0));
    assert_eq!(filter.digest(&a), filter.digest(&b));
}

#[test]
fn array_order_is_meaningful() {
    let filter = default_filter();
    let a = EntitySnapshot::new("sensor.smartbin_001_data", "1").with_attribute("images", json!(["a", "b"]));
    let b = EntitySnapshot::new("sensor.smartbin_001_data", "1").with_attribute("images", json!(["b", "a"]));
    assert_ne!(filter.digest(&a), filter.digest(&b));
}

#[test]
fn volatile_attributes_are_ignored() {
    let filter = EntityFilter::new(FilterConfig::default().ignore_attribute("latest_url"));
    let a = EntitySnapshot::new("sensor.smartbin_001_data", "1").with_attribute("latest_url", json!("/a.jpg"));
    let b = EntitySnapshot::new("sensor.smartbin_001_data", "1").with_attribute("latest_url", json!("/b.jpg"));
    assert_eq!(filter.digest(&a), filter.digest(&b));
}

#[test]
fn digest_is_hex_sha256() {
    let digest = default_filter().digest(&bin_snapshot(1, 1));
    assert_eq!(digest.len(), 64);
    assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn canonical_json_sorts_nested_keys() {
    let value = json!({"b": [{"d": 1, "c": 2}], "a": null});
    assert_eq!(canonical_json(&value), r#"{"a":null,"b":[{"c":2,"d":1}]}"#);
}

// ── Properties ───────────────────────────────────────────────────

fn object_id_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z_]{1,20}").unwrap()
}

proptest! {
    /// Identifiers outside the allow-list are never admitted, no matter
    /// how often they are sent.
    #[test]
    fn foreign_ids_never_admitted(object in object_id_strategy(), repeats in 1usize..5) {
        let id = EntityId::new(format!("sensor.other_{object}"));
        let mut filter = default_filter();
        for i in 0..repeats {
            let snap = EntitySnapshot::new(id.clone(), i.to_string());
            prop_assert!(!filter.admit(&id, &snap));
        }
        prop_assert!(filter.digests().is_empty());
    }

    /// Re-sending the same meaning with different bus metadata is admitted
    /// exactly once.
    #[test]
    fn metadata_churn_admitted_once(count in 0u64..1000, stamps in prop::collection::vec("[0-9]{10}", 1..10)) {
        let mut filter = default_filter();
        let base = common::bin_snapshot(7, count);
        let mut admitted = 0;
        for stamp in stamps {
            let mut snap = base.clone();
            snap.last_updated = Some(stamp.clone());
            snap.context = Some(json!({"id": stamp}));
            if filter.admit(&snap.entity_id, &snap) {
                admitted += 1;
            }
        }
        prop_assert_eq!(admitted, 1);
    }
}
