//! Focus-preserving reconciler.
//!
//! The renderer's only update strategy is full replacement, which would drop
//! focus and caret on every state update. The reconciler captures the focused
//! control's stable key and selection before the swap and restores them on
//! the matching control afterwards. A control that disappeared simply loses
//! focus.

use crate::scheduler::RenderTarget;
use crate::state::CacheView;
use crate::view::{Selection, StableKey, ViewRenderer, ViewSurface};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

/// Surface shared between the render loop and the host's input handling.
pub type SharedSurface<S> = Arc<Mutex<S>>;

/// Focus captured immediately before a render pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusSnapshot {
    pub key: StableKey,
    pub selection: Option<Selection>,
}

/// Outcome of one reconciled pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    /// Focus captured before the pass.
    pub captured: Option<FocusSnapshot>,
    /// Whether focus was put back.
    pub restored: bool,
}

/// Wraps a [`ViewRenderer`] so that full replacement keeps focus.
pub struct FocusPreservingReconciler<R, S> {
    renderer: R,
    surface: SharedSurface<S>,
}

impl<R: ViewRenderer, S: ViewSurface> FocusPreservingReconciler<R, S> {
    pub fn new(renderer: R, surface: SharedSurface<S>) -> Self {
        Self { renderer, surface }
    }

    pub fn surface(&self) -> &SharedSurface<S> {
        &self.surface
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Renders `view` onto the surface, preserving focus.
    pub fn reconcile(&mut self, view: &CacheView) -> Reconciliation {
        // Build the tree before locking so the host's input handling is not
        // blocked while the renderer runs.
        let tree = self.renderer.render(view);

        let mut surface = self.surface.lock().unwrap_or_else(PoisonError::into_inner);
        let captured = capture(&*surface);
        surface.replace(tree);

        let restored = match &captured {
            Some(snapshot) => {
                let found = surface.focus(&snapshot.key, snapshot.selection);
                if !found {
                    debug!("Focused control {} is gone after render", snapshot.key);
                }
                found
            }
            None => false,
        };

        Reconciliation { captured, restored }
    }
}

fn capture<S: ViewSurface>(surface: &S) -> Option<FocusSnapshot> {
    let key = surface.focused_key()?;
    Some(FocusSnapshot {
        key,
        selection: surface.selection(),
    })
}

impl<R: ViewRenderer, S: ViewSurface> RenderTarget for FocusPreservingReconciler<R, S> {
    fn render(&mut self, view: &CacheView) {
        self.reconcile(view);
    }
}
