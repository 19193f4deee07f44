//! The lifecycle-signaling handle passed to every deferred render.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::node::Node;

/// Handle given to a deferred render for signaling interim state.
///
/// During a harvest there is no live UI to signal to, so every operation is
/// an inert no-op. The handle is still fully constructible and callable:
/// components written against a live renderer can call any method
/// defensively without observable effect.
#[derive(Debug, Clone)]
pub struct Meanwhile {
    started: Instant,
    cancelled: Arc<AtomicBool>,
}

impl Meanwhile {
    pub(crate) fn new() -> Self {
        Self {
            started: Instant::now(),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Time elapsed since the deferred render began.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Whether the render was cancelled. Harvests never cancel, so this is
    /// always `false` here.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Declares an interim placeholder rendering. Ignored during a harvest.
    pub fn interim(&self, _placeholder: Node) {}

    /// Requests a delayed progressive update. Ignored during a harvest.
    pub fn delay(&self, _after: Duration) {}

    /// Registers a completion callback. Never invoked during a harvest.
    pub fn on_done(&self, _callback: impl FnOnce() + Send + 'static) {}

    /// Registers a cancellation callback. Never invoked during a harvest.
    pub fn on_cancel(&self, _callback: impl FnOnce() + Send + 'static) {}

    /// Registers a progress callback. Never invoked during a harvest.
    pub fn on_progress(&self, _callback: impl Fn(f64) + Send + 'static) {}
}
