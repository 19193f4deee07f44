//! The seed side-channel: a record of every asynchronous component
//! invocation, collected for later cache population.

use std::fmt::Debug;
use std::sync::{Arc, Mutex};

use crate::component::ComponentDef;
use crate::node::Node;
use crate::props::Props;

/// One recorded asynchronous component invocation.
pub struct Seed {
    /// The component that rendered asynchronously.
    pub component: ComponentDef,
    /// The props it was invoked with, defaults already merged.
    pub props: Props,
    /// The subtree its deferred render eventually produced, before further
    /// resolution.
    pub result: Node,
}

impl Debug for Seed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Seed")
            .field("component", &self.component.name())
            .field("props", &self.props)
            .field("result", &self.result)
            .finish()
    }
}

/// Append-only accumulator created once per top-level harvest. Entries are
/// recorded in depth-first encounter order.
#[derive(Default)]
pub(crate) struct SeedBucket {
    entries: Mutex<Vec<Seed>>,
}

impl SeedBucket {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn push(&self, seed: Seed) {
        self.entries.lock().unwrap().push(seed);
    }

    /// Consumes the bucket once every deferred resolution has settled and
    /// the harvest holds the only reference.
    pub(crate) fn unwrap(bucket: Arc<Self>) -> Vec<Seed> {
        Arc::try_unwrap(bucket)
            .ok()
            .expect("seed bucket still shared after harvest settled")
            .entries
            .into_inner()
            .unwrap()
    }
}
