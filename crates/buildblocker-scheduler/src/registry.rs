//! Registry of queue dispatchers consulted by the host queue.

use buildblocker_core::ids::NodeName;
use buildblocker_core::ports::{CauseOfBlockage, QueueTaskDispatcher};
use buildblocker_core::queue::{QueueItem, Snapshot};
use std::sync::Arc;
use tracing::info;

/// Dispatchers registered by the host at startup.
///
/// Vetoes are additive: the first dispatcher, in registration order, that
/// returns a cause blocks the item.
#[derive(Default, Clone)]
pub struct DispatcherRegistry {
    dispatchers: Vec<Arc<dyn QueueTaskDispatcher>>,
}

impl DispatcherRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, dispatcher: Arc<dyn QueueTaskDispatcher>) {
        info!(dispatcher = dispatcher.name(), "Registered queue dispatcher");
        self.dispatchers.push(dispatcher);
    }

    pub fn with(mut self, dispatcher: Arc<dyn QueueTaskDispatcher>) -> Self {
        self.register(dispatcher);
        self
    }

    pub fn can_run(&self, item: &QueueItem, snapshot: &Snapshot) -> Option<CauseOfBlockage> {
        self.dispatchers
            .iter()
            .find_map(|d| d.can_run(item, snapshot))
    }

    pub fn can_take(
        &self,
        node: &NodeName,
        item: &QueueItem,
        snapshot: &Snapshot,
    ) -> Option<CauseOfBlockage> {
        self.dispatchers
            .iter()
            .find_map(|d| d.can_take(node, item, snapshot))
    }

    pub fn len(&self) -> usize {
        self.dispatchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dispatchers.is_empty()
    }
}
