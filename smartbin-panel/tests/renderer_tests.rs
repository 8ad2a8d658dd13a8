use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use smartbin_panel::{analyze_key, bin_name_key, render_text, BinPanelRenderer, TerminalPanel, SEARCH_KEY};
use smartbin_sync::{
    CacheView, NodeKind, RenderTarget, Selection, StableKey, StateCache, ViewRenderer, ViewSurface,
};
use smartbin_types::EntitySnapshot;

fn snapshot(value: Value) -> EntitySnapshot {
    EntitySnapshot::from_value(value).unwrap()
}

fn bin_data(bin: u32, items: Value, status: &str) -> EntitySnapshot {
    snapshot(json!({
        "entity_id": format!("sensor.smartbin_{bin:03}_data"),
        "state": "0",
        "attributes": {
            "friendly_name": format!("Smart Bin {bin:03} - Data"),
            "inventory": {"items": items},
            "images": ["1.jpg", "2.jpg"],
            "analysis_status": {"state": status, "message": "Ready."},
            "history": [
                {"timestamp": "2026-03-01T10:00:00", "action": "add"},
                {"timestamp": "2026-03-01T11:00:00", "action": "remove"}
            ]
        }
    }))
}

fn view(snapshots: Vec<EntitySnapshot>) -> CacheView {
    let mut cache = StateCache::new();
    for snap in snapshots {
        cache.put(snap.entity_id.clone(), snap);
    }
    cache.view()
}

// ── BinPanelRenderer ─────────────────────────────────────────────

#[test]
fn empty_cache_renders_search_box_only() {
    let tree = BinPanelRenderer::default().render(&CacheView::default());
    assert_eq!(
        render_text(&tree),
        "[search]\n  [ Search items ]\n  [results]\n[bins]\n"
    );
}

#[test]
fn bin_section_lists_inventory() {
    let state = view(vec![bin_data(
        1,
        json!([
            {"name": "Screwdriver", "quantity": 2, "condition": "good"},
            {"name": "Tape", "quantity": 1, "condition": "worn", "description": "duct"}
        ]),
        "idle",
    )]);

    let text = render_text(&BinPanelRenderer::default().render(&state));

    assert_eq!(
        text,
        "[search]\n  [ Search items ]\n  [results]\n[bins]\n  [bin]\n    [ Smart Bin 001 - Data ]\n    3 item(s), 2 image(s)\n    Status: Ready.\n    [inventory]\n      2 x Screwdriver (good)\n      1 x Tape (worn) - duct\n    [history]\n      2026-03-01T11:00:00 remove\n      2026-03-01T10:00:00 add\n    <Analyze>\n"
    );
}

#[test]
fn helper_name_overrides_friendly_name() {
    let state = view(vec![
        bin_data(2, json!([]), "quick_running"),
        EntitySnapshot::new("input_text.smartbin_002_name", "Garage shelf"),
    ]);
    let tree = BinPanelRenderer::default().render(&state);

    let path = tree.find(&StableKey::new(bin_name_key("smartbin_002"))).unwrap();
    let NodeKind::TextInput { value, .. } = &tree.node(&path).unwrap().kind else {
        panic!("name field is a text input");
    };
    assert_eq!(value, "Garage shelf");
    assert!(render_text(&tree).contains("Analyzing: Ready."));
    assert!(tree.find(&StableKey::new(analyze_key("smartbin_002"))).is_some());
}

#[test]
fn helper_without_data_waits() {
    let state = view(vec![EntitySnapshot::new("input_text.smartbin_004_name", "Attic")]);
    let text = render_text(&BinPanelRenderer::default().render(&state));
    assert!(text.contains("[ Attic ]\n    Waiting for data..."));
}

#[test]
fn history_limit_is_respected() {
    let state = view(vec![bin_data(1, json!([]), "idle")]);
    let renderer = BinPanelRenderer { history_limit: 1 };
    let text = render_text(&renderer.render(&state));
    assert!(text.contains("remove"));
    assert!(!text.contains(" add\n"));
}

#[test]
fn search_results_are_rendered() {
    let state = view(vec![snapshot(json!({
        "entity_id": "sensor.smartbin_ai_search_results",
        "state": "1",
        "attributes": {
            "query": "drill",
            "results": [{
                "bin_id": "smartbin_002",
                "bin_name": "Garage shelf",
                "item_name": "Cordless drill",
                "quantity": 1,
                "condition": "good"
            }]
        }
    }))]);

    let tree = BinPanelRenderer::default().render(&state);

    let search = tree.find(&StableKey::new(SEARCH_KEY)).unwrap();
    assert_eq!(tree.node(&search).unwrap().value_len(), "drill".len());
    assert!(render_text(&tree).contains(
        "  1 result(s) for \"drill\"\n  [results]\n    1 x Cordless drill (good) in Garage shelf\n"
    ));
}

// ── TerminalPanel ────────────────────────────────────────────────

#[test]
fn panel_prints_each_pass_and_keeps_focus() {
    let mut panel = TerminalPanel::new(BinPanelRenderer::default(), Vec::new());
    panel.render(&view(vec![bin_data(1, json!([]), "idle")]));

    let surface = panel.surface();
    {
        let mut surface = surface.lock().unwrap();
        let key = StableKey::new(bin_name_key("smartbin_001"));
        assert!(surface.focus(&key, Some(Selection::new(2, 5))));
    }

    panel.render(&view(vec![bin_data(1, json!([{"name": "Saw", "quantity": 1}]), "idle")]));

    {
        let surface = surface.lock().unwrap();
        assert_eq!(surface.focused_key(), Some(StableKey::new(bin_name_key("smartbin_001"))));
        assert_eq!(surface.selection(), Some(Selection::new(2, 5)));
    }
    let out = String::from_utf8(panel.into_inner()).unwrap();
    assert_eq!(out.matches("── revision 1 ──").count(), 2);
    assert!(out.contains("1 x Saw (good)"));
}

#[test]
fn huge_quantities_render_without_overflow() {
    let state = view(vec![bin_data(
        1,
        json!([
            {"name": "Washer", "quantity": 18446744073709551615u64},
            {"name": "Nut", "quantity": "5"}
        ]),
        "idle",
    )]);
    let text = render_text(&BinPanelRenderer::default().render(&state));
    assert!(text.contains(&format!("{} item(s)", u64::MAX)));
}
