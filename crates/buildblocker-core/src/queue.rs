//! Queue and execution state as seen by dispatchers.

use crate::ids::{BuildId, NodeName, QueueItemId};
use crate::job::Task;
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum QueueState {
    /// Newly queued, not yet checked by dispatchers.
    Waiting,
    /// Vetoed by a dispatcher; re-checked on every maintenance pass.
    Blocked,
    /// Ready to start as soon as a node takes it.
    Buildable,
    /// Handed to a node, not started yet.
    Pending,
}

impl fmt::Display for QueueState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            QueueState::Waiting => "waiting",
            QueueState::Blocked => "blocked",
            QueueState::Buildable => "buildable",
            QueueState::Pending => "pending",
        };
        f.write_str(s)
    }
}

/// A pending unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct QueueItem {
    #[serde(default)]
    pub id: QueueItemId,
    pub task: Task,
    pub state: QueueState,
    /// Node the item is pending on, once assigned.
    #[serde(default)]
    pub node: Option<NodeName>,
    pub queued_at: DateTime<Utc>,
}

impl QueueItem {
    pub fn new(task: Task, queued_at: DateTime<Utc>) -> Self {
        Self {
            id: QueueItemId::new(),
            task,
            state: QueueState::Waiting,
            node: None,
            queued_at,
        }
    }

    pub fn is_pending_on(&self, node: &NodeName) -> bool {
        self.node.as_ref() == Some(node)
    }
}

/// An in-progress execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RunningBuild {
    #[serde(default)]
    pub id: BuildId,
    pub task: Task,
    pub node: NodeName,
    pub started_at: DateTime<Utc>,
}

/// Point-in-time view of running and queued work.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Snapshot {
    #[serde(default = "Utc::now")]
    pub taken_at: DateTime<Utc>,
    #[serde(default)]
    pub running: Vec<RunningBuild>,
    #[serde(default)]
    pub queued: Vec<QueueItem>,
}

/// An empty snapshot taken now.
impl Default for Snapshot {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Snapshot {
    pub fn new(taken_at: DateTime<Utc>) -> Self {
        Self {
            taken_at,
            running: Vec::new(),
            queued: Vec::new(),
        }
    }

    pub fn with_running(mut self, build: RunningBuild) -> Self {
        self.running.push(build);
        self
    }

    pub fn with_queued(mut self, item: QueueItem) -> Self {
        self.queued.push(item);
        self
    }

    pub fn queue_item(&self, id: QueueItemId) -> Option<&QueueItem> {
        self.queued.iter().find(|item| item.id == id)
    }
}
