//! Port traits (hexagonal architecture).
//!
//! These traits define the interfaces between the blocking logic and the host
//! scheduler that embeds it.

use crate::blocking::BlockingConfig;
use crate::ids::NodeName;
use crate::job::JobRef;
use crate::queue::{QueueItem, Snapshot};
use serde::Serialize;
use std::fmt;

/// Why a queue item may not proceed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CauseOfBlockage {
    /// Another job matching the item's blocking patterns is running or queued.
    BlockedByJob { in_queue_for: String, job: JobRef },
    /// Free-form reason from any other dispatcher.
    Message { message: String },
}

impl CauseOfBlockage {
    pub fn message(message: impl Into<String>) -> Self {
        CauseOfBlockage::Message {
            message: message.into(),
        }
    }

    pub fn blocking_job(&self) -> Option<&JobRef> {
        match self {
            CauseOfBlockage::BlockedByJob { job, .. } => Some(job),
            CauseOfBlockage::Message { .. } => None,
        }
    }
}

impl fmt::Display for CauseOfBlockage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CauseOfBlockage::BlockedByJob { in_queue_for, job } => write!(
                f,
                "{} - Build is blocked by: {}",
                in_queue_for, job.display_name
            ),
            CauseOfBlockage::Message { message } => f.write_str(message),
        }
    }
}

/// Extension point consulted by the host queue before an item may proceed.
///
/// Vetoes are additive: an item is blocked if any registered dispatcher
/// returns a cause. Implementations are called concurrently and must not
/// mutate their inputs.
pub trait QueueTaskDispatcher: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// May the item leave the waiting state at all?
    fn can_run(&self, _item: &QueueItem, _snapshot: &Snapshot) -> Option<CauseOfBlockage> {
        None
    }

    /// May the item start on the given node?
    fn can_take(
        &self,
        _node: &NodeName,
        _item: &QueueItem,
        _snapshot: &Snapshot,
    ) -> Option<CauseOfBlockage> {
        None
    }
}

/// Lookup of the blocking configuration attached to a job.
pub trait BlockingConfigSource: Send + Sync {
    /// Returns `None` when the job carries no blocking configuration.
    fn blocking_config(&self, job: &JobRef) -> Option<BlockingConfig>;
}
