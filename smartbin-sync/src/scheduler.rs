//! Render scheduler - coalesces render requests into one pass per frame.
//!
//! Requests only raise a flag. The render loop, running on its own task,
//! waits for the flag, lets the rest of the frame elapse so that further
//! requests collapse into the same pass, then reads the cache and renders.
//! A render therefore never runs inside a frame handler and always observes
//! the cache as of the moment the pass begins. A pass that would show a
//! revision already rendered is skipped.

use crate::state::{CacheView, SharedStateCache};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tracing::trace;

/// Default frame length (one 60 Hz frame).
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Consumer of render passes.
pub trait RenderTarget: Send {
    /// Renders the given state. Called at most once per frame.
    fn render(&mut self, view: &CacheView);
}

#[derive(Debug, Default)]
struct Shared {
    pending: AtomicBool,
    notify: Notify,
    requests: AtomicU64,
}

/// Cheap handle used to request renders.
#[derive(Debug, Clone)]
pub struct RenderHandle {
    shared: Arc<Shared>,
}

impl RenderHandle {
    /// Requests a render on the next frame. Returns `true` if this call
    /// scheduled a pass, `false` if one was already pending.
    pub fn request_render(&self) -> bool {
        self.shared.requests.fetch_add(1, Ordering::Relaxed);
        if self.shared.pending.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.shared.notify.notify_one();
        true
    }

    /// Whether a pass is pending.
    pub fn is_pending(&self) -> bool {
        self.shared.pending.load(Ordering::Acquire)
    }

    /// Total `request_render` calls so far.
    pub fn requests(&self) -> u64 {
        self.shared.requests.load(Ordering::Relaxed)
    }
}

/// Drives render passes.
#[derive(Debug)]
pub struct RenderScheduler {
    shared: Arc<Shared>,
    frame_interval: Duration,
}

impl Default for RenderScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_FRAME_INTERVAL)
    }
}

impl RenderScheduler {
    pub fn new(frame_interval: Duration) -> Self {
        Self {
            shared: Arc::new(Shared::default()),
            frame_interval,
        }
    }

    pub fn handle(&self) -> RenderHandle {
        RenderHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn frame_interval(&self) -> Duration {
        self.frame_interval
    }

    /// Clears the pending flag, returning whether a pass was due.
    pub fn take_pending(&self) -> bool {
        self.shared.pending.swap(false, Ordering::AcqRel)
    }

    /// Runs render passes until `shutdown` flips to `true` or its sender is
    /// dropped. Returns the target and the number of passes run.
    pub async fn run<T: RenderTarget>(
        self,
        cache: SharedStateCache,
        mut target: T,
        mut shutdown: watch::Receiver<bool>,
    ) -> (T, u64) {
        let mut passes = 0;
        let mut last_rendered: Option<u64> = None;
        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                _ = self.shared.notify.notified() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
            }

            // Let the rest of the frame's requests pile up.
            tokio::time::sleep(self.frame_interval).await;

            if !self.take_pending() {
                continue;
            }
            let view = cache.read().await.view();
            // A request landing while we waited for the lock re-arms the
            // flag for a revision this pass already covers.
            if last_rendered == Some(view.revision()) {
                trace!("Revision {} already rendered", view.revision());
                continue;
            }
            trace!("Render pass at revision {}", view.revision());
            target.render(&view);
            last_rendered = Some(view.revision());
            passes += 1;
        }
        (target, passes)
    }
}
