//! Terminal rendering for the SmartBin live panel.
//!
//! [`BinPanelRenderer`] turns the synchronized cache into a view tree: a
//! search box with its results, then one section per bin. [`TerminalPanel`]
//! reconciles that tree onto a retained surface and prints it.

use smartbin_sync::{
    CacheView, FocusPreservingReconciler, NodeKind, RenderTarget, RetainedSurface, SharedSurface,
    ViewNode, ViewRenderer, ViewTree,
};
use smartbin_types::{EntityKind, EntitySnapshot, HelperField};
use std::collections::BTreeMap;
use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::warn;

/// Key of the search box.
pub const SEARCH_KEY: &str = "search";

/// Key of a bin's name field.
pub fn bin_name_key(bin_id: &str) -> String {
    format!("bin-name:{bin_id}")
}

/// Key of a bin's analyze button.
pub fn analyze_key(bin_id: &str) -> String {
    format!("analyze:{bin_id}")
}

/// Everything known about one bin, gathered from its entities.
#[derive(Debug, Default)]
struct BinEntry<'a> {
    data: Option<&'a EntitySnapshot>,
    name: Option<&'a str>,
}

/// Renders the bins and search results held in the cache.
#[derive(Debug, Clone)]
pub struct BinPanelRenderer {
    /// Most recent history entries shown per bin.
    pub history_limit: usize,
}

impl Default for BinPanelRenderer {
    fn default() -> Self {
        Self { history_limit: 3 }
    }
}

impl BinPanelRenderer {
    fn search_section(&self, state: &CacheView) -> ViewNode {
        let search = state
            .sorted()
            .into_iter()
            .find(|snapshot| snapshot.entity_id.kind() == EntityKind::SearchResults)
            .map(EntitySnapshot::search_results)
            .unwrap_or_default();

        let hits = search.results.iter().map(|hit| {
            let bin = if hit.bin_name.is_empty() { &hit.bin_id } else { &hit.bin_name };
            ViewNode::text(format!(
                "{} x {} ({}) in {}",
                hit.quantity, hit.item_name, hit.condition, bin
            ))
        });

        let mut section = ViewNode::container("search")
            .with_child(ViewNode::text_input(search.query.clone(), "Search items").with_key(SEARCH_KEY));
        if !search.query.is_empty() {
            section = section.with_child(ViewNode::text(format!(
                "{} result(s) for \"{}\"",
                search.results.len(),
                search.query
            )));
        }
        section.with_child(ViewNode::container("results").with_children(hits))
    }

    fn bin_section(&self, bin_id: &str, entry: &BinEntry<'_>) -> ViewNode {
        let name = entry
            .name
            .filter(|name| !name.trim().is_empty())
            .or_else(|| entry.data.map(EntitySnapshot::friendly_name))
            .unwrap_or(bin_id);

        let mut section = ViewNode::container("bin")
            .with_child(ViewNode::text_input(name, "Bin name").with_key(bin_name_key(bin_id)));

        let Some(data) = entry.data else {
            return section.with_child(ViewNode::text("Waiting for data..."));
        };

        let inventory = data.inventory();
        section = section.with_child(ViewNode::text(format!(
            "{} item(s), {} image(s)",
            inventory.item_count(),
            data.images().len()
        )));

        if let Some(status) = data.analysis_status() {
            let label = if status.state.is_running() { "Analyzing" } else { "Status" };
            section = section.with_child(ViewNode::text(format!("{label}: {}", status.message)));
        }

        let items = inventory.items.iter().map(|item| {
            let text = match &item.description {
                Some(description) if !description.is_empty() => format!(
                    "{} x {} ({}) - {}",
                    item.quantity, item.name, item.condition, description
                ),
                _ => format!("{} x {} ({})", item.quantity, item.name, item.condition),
            };
            ViewNode::text(text)
        });
        section = section.with_child(ViewNode::container("inventory").with_children(items));

        let history = data.history();
        let recent = history.iter().rev().take(self.history_limit).map(|entry| {
            ViewNode::text(format!("{} {}", entry.timestamp, entry.action))
        });
        section = section.with_child(ViewNode::container("history").with_children(recent));

        section.with_child(ViewNode::button("Analyze").with_key(analyze_key(bin_id)))
    }
}

impl ViewRenderer for BinPanelRenderer {
    fn render(&self, state: &CacheView) -> ViewTree {
        let mut bins: BTreeMap<String, BinEntry<'_>> = BTreeMap::new();
        for snapshot in state.sorted() {
            match snapshot.entity_id.kind() {
                EntityKind::BinData { bin_id } => bins.entry(bin_id).or_default().data = Some(snapshot),
                EntityKind::BinHelper {
                    bin_id,
                    field: HelperField::Name,
                } => bins.entry(bin_id).or_default().name = Some(snapshot.state.as_str()),
                _ => {}
            }
        }

        let sections = bins
            .iter()
            .map(|(bin_id, entry)| self.bin_section(bin_id, entry));

        ViewTree::new(vec![
            self.search_section(state),
            ViewNode::container("bins").with_children(sections),
        ])
    }
}

/// Prints a view tree as indented text, one node per line.
pub fn render_text(tree: &ViewTree) -> String {
    fn walk(out: &mut String, node: &ViewNode, depth: usize) {
        let indent = "  ".repeat(depth);
        let line = match &node.kind {
            NodeKind::Container { role } => format!("[{role}]"),
            NodeKind::Text(text) => text.clone(),
            NodeKind::TextInput { value, placeholder } if value.is_empty() => format!("[ {placeholder} ]"),
            NodeKind::TextInput { value, .. } => format!("[ {value} ]"),
            NodeKind::Button { label } => format!("<{label}>"),
        };
        out.push_str(&indent);
        out.push_str(&line);
        out.push('\n');
        for child in &node.children {
            walk(out, child, depth + 1);
        }
    }

    let mut out = String::new();
    for root in &tree.roots {
        walk(&mut out, root, 0);
    }
    out
}

/// Render target that reconciles onto a retained surface and prints it.
pub struct TerminalPanel<W> {
    reconciler: FocusPreservingReconciler<BinPanelRenderer, RetainedSurface>,
    out: W,
}

impl<W: Write + Send> TerminalPanel<W> {
    pub fn new(renderer: BinPanelRenderer, out: W) -> Self {
        let surface = Arc::new(Mutex::new(RetainedSurface::new()));
        Self {
            reconciler: FocusPreservingReconciler::new(renderer, surface),
            out,
        }
    }

    /// The surface input handling should operate on.
    pub fn surface(&self) -> SharedSurface<RetainedSurface> {
        Arc::clone(self.reconciler.surface())
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> RenderTarget for TerminalPanel<W> {
    fn render(&mut self, view: &CacheView) {
        self.reconciler.reconcile(view);
        let text = {
            let surface = self
                .reconciler
                .surface()
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            render_text(surface.tree())
        };
        let written = writeln!(self.out, "── revision {} ──", view.revision())
            .and_then(|_| self.out.write_all(text.as_bytes()))
            .and_then(|_| self.out.flush());
        if let Err(e) = written {
            warn!("Cannot write panel: {}", e);
        }
    }
}
