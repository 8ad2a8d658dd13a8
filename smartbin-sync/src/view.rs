//! Retained view tree and the surface it is shown on.
//!
//! Renderers build a fresh [`ViewTree`] from the cache on every pass; the
//! [`ViewSurface`] swaps it in wholesale. Interactive controls carry a
//! [`StableKey`] so they can be found again in the replacement tree.

use crate::state::CacheView;
use std::fmt;

/// Identifier of an interactive control that survives re-rendering.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StableKey(String);

impl StableKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Caret/selection range in characters, `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    start: usize,
    end: usize,
}

impl Selection {
    pub fn new(a: usize, b: usize) -> Self {
        Self {
            start: a.min(b),
            end: a.max(b),
        }
    }

    pub fn start(self) -> usize {
        self.start
    }

    pub fn end(self) -> usize {
        self.end
    }

    /// A collapsed selection (caret).
    pub fn caret(at: usize) -> Self {
        Self { start: at, end: at }
    }

    /// Clamps both ends to `len`.
    pub fn clamped(self, len: usize) -> Self {
        Self {
            start: self.start.min(len),
            end: self.end.min(len),
        }
    }
}

/// What a node is.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Grouping node.
    Container { role: String },
    /// Static text.
    Text(String),
    /// Editable text.
    TextInput { value: String, placeholder: String },
    /// Clickable control.
    Button { label: String },
}

impl NodeKind {
    pub fn is_text_input(&self) -> bool {
        matches!(self, NodeKind::TextInput { .. })
    }
}

/// One node of the view tree.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewNode {
    pub key: Option<StableKey>,
    pub kind: NodeKind,
    pub children: Vec<ViewNode>,
}

impl ViewNode {
    pub fn container(role: impl Into<String>) -> Self {
        Self {
            key: None,
            kind: NodeKind::Container { role: role.into() },
            children: Vec::new(),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            key: None,
            kind: NodeKind::Text(text.into()),
            children: Vec::new(),
        }
    }

    pub fn text_input(value: impl Into<String>, placeholder: impl Into<String>) -> Self {
        Self {
            key: None,
            kind: NodeKind::TextInput {
                value: value.into(),
                placeholder: placeholder.into(),
            },
            children: Vec::new(),
        }
    }

    pub fn button(label: impl Into<String>) -> Self {
        Self {
            key: None,
            kind: NodeKind::Button { label: label.into() },
            children: Vec::new(),
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(StableKey::new(key));
        self
    }

    pub fn with_child(mut self, child: ViewNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = ViewNode>) -> Self {
        self.children.extend(children);
        self
    }

    /// Character length of a text input's value, 0 for other nodes.
    pub fn value_len(&self) -> usize {
        match &self.kind {
            NodeKind::TextInput { value, .. } => value.chars().count(),
            _ => 0,
        }
    }
}

/// A full rendered view. Nodes are addressed by index paths from the roots.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewTree {
    pub roots: Vec<ViewNode>,
}

impl ViewTree {
    pub fn new(roots: Vec<ViewNode>) -> Self {
        Self { roots }
    }

    /// Node at an index path.
    pub fn node(&self, path: &[usize]) -> Option<&ViewNode> {
        let (first, rest) = path.split_first()?;
        let mut node = self.roots.get(*first)?;
        for index in rest {
            node = node.children.get(*index)?;
        }
        Some(node)
    }

    pub fn node_mut(&mut self, path: &[usize]) -> Option<&mut ViewNode> {
        let (first, rest) = path.split_first()?;
        let mut node = self.roots.get_mut(*first)?;
        for index in rest {
            node = node.children.get_mut(*index)?;
        }
        Some(node)
    }

    /// Index path of the first node (depth-first) carrying `key`.
    pub fn find(&self, key: &StableKey) -> Option<Vec<usize>> {
        fn walk(nodes: &[ViewNode], key: &StableKey, path: &mut Vec<usize>) -> bool {
            for (i, node) in nodes.iter().enumerate() {
                path.push(i);
                if node.key.as_ref() == Some(key) || walk(&node.children, key, path) {
                    return true;
                }
                path.pop();
            }
            false
        }

        let mut path = Vec::new();
        walk(&self.roots, key, &mut path).then_some(path)
    }
}

/// Produces a full replacement view from the current state.
pub trait ViewRenderer: Send {
    fn render(&self, state: &CacheView) -> ViewTree;
}

/// Where rendered trees are shown and where focus lives.
pub trait ViewSurface: Send {
    /// Stable key of the focused control, if any control is focused and
    /// carries one.
    fn focused_key(&self) -> Option<StableKey>;

    /// Selection of the focused control, if it is a text input.
    fn selection(&self) -> Option<Selection>;

    /// Replaces the whole view. Focus is lost.
    fn replace(&mut self, tree: ViewTree);

    /// Focuses the control with `key`, applying `selection` if it is a text
    /// input. Returns `false` if no such control exists.
    fn focus(&mut self, key: &StableKey, selection: Option<Selection>) -> bool;
}

/// Focus state of a [`RetainedSurface`].
#[derive(Debug, Clone, PartialEq, Eq)]
struct Focus {
    path: Vec<usize>,
    selection: Option<Selection>,
}

/// In-memory surface holding the current tree and focus.
#[derive(Debug, Clone, Default)]
pub struct RetainedSurface {
    tree: ViewTree,
    focus: Option<Focus>,
    replacements: u64,
}

impl RetainedSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tree(&self) -> &ViewTree {
        &self.tree
    }

    /// Number of full replacements so far.
    pub fn replacements(&self) -> u64 {
        self.replacements
    }

    /// The focused node.
    pub fn focused_node(&self) -> Option<&ViewNode> {
        self.focus.as_ref().and_then(|focus| self.tree.node(&focus.path))
    }

    /// Focuses the node at `path`. Text inputs get a caret at the end.
    pub fn focus_path(&mut self, path: Vec<usize>) -> bool {
        let Some(node) = self.tree.node(&path) else {
            return false;
        };
        let selection = node
            .kind
            .is_text_input()
            .then(|| Selection::caret(node.value_len()));
        self.focus = Some(Focus { path, selection });
        true
    }

    /// Sets the selection of the focused text input.
    pub fn select(&mut self, selection: Selection) -> bool {
        let Some(focus) = self.focus.as_mut() else {
            return false;
        };
        match self.tree.node(&focus.path) {
            Some(node) if node.kind.is_text_input() => {
                focus.selection = Some(selection.clamped(node.value_len()));
                true
            }
            _ => false,
        }
    }

    /// Replaces the focused text input's selection with `text`, leaving the
    /// caret after it.
    pub fn type_text(&mut self, text: &str) -> bool {
        let Some(focus) = self.focus.as_mut() else {
            return false;
        };
        let Some(selection) = focus.selection else {
            return false;
        };
        let Some(ViewNode {
            kind: NodeKind::TextInput { value, .. },
            ..
        }) = self.tree.node_mut(&focus.path)
        else {
            return false;
        };

        let start = byte_offset(value, selection.start);
        let end = byte_offset(value, selection.end);
        value.replace_range(start..end, text);
        focus.selection = Some(Selection::caret(selection.start + text.chars().count()));
        true
    }

    pub fn blur(&mut self) {
        self.focus = None;
    }
}

fn byte_offset(s: &str, chars: usize) -> usize {
    s.char_indices().nth(chars).map_or(s.len(), |(i, _)| i)
}

impl ViewSurface for RetainedSurface {
    fn focused_key(&self) -> Option<StableKey> {
        self.focused_node().and_then(|node| node.key.clone())
    }

    fn selection(&self) -> Option<Selection> {
        self.focus.as_ref().and_then(|focus| focus.selection)
    }

    fn replace(&mut self, tree: ViewTree) {
        self.tree = tree;
        self.focus = None;
        self.replacements += 1;
    }

    fn focus(&mut self, key: &StableKey, selection: Option<Selection>) -> bool {
        let Some(path) = self.tree.find(key) else {
            return false;
        };
        let Some(node) = self.tree.node(&path) else {
            return false;
        };
        let selection = if node.kind.is_text_input() {
            let len = node.value_len();
            Some(selection.map_or(Selection::caret(len), |s| s.clamped(len)))
        } else {
            None
        };
        self.focus = Some(Focus { path, selection });
        true
    }
}
