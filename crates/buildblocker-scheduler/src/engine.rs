//! The blocking decision.
//!
//! Given a job's [`BlockingConfig`], the queue item being considered, an
//! optional target node and a [`Snapshot`] of running and queued work, the
//! engine reports either [`Verdict::Clear`] or the first job found blocking
//! the candidate. Global checks run before node checks, running builds before
//! queue entries; evaluation stops at the first match.

use crate::monitor::{BlockingJobsMonitor, QueueScan};
use buildblocker_core::blocking::{BlockingConfig, PatternSet};
use buildblocker_core::ids::NodeName;
use buildblocker_core::job::{JobRef, Task};
use buildblocker_core::queue::{QueueItem, Snapshot};
use tracing::{debug, trace};

/// Outcome of one evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Clear,
    /// The reported job is always top-level: matrix children are replaced by their parent.
    BlockedBy(JobRef),
}

impl Verdict {
    pub fn is_clear(&self) -> bool {
        matches!(self, Verdict::Clear)
    }

    pub fn blocker(&self) -> Option<&JobRef> {
        match self {
            Verdict::Clear => None,
            Verdict::BlockedBy(job) => Some(job),
        }
    }
}

/// Which check found the blocker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    GlobalRunning,
    GlobalQueue,
    NodeRunning,
    NodeQueue,
}

/// Stateless evaluator; safe to share and call from many threads.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockingDecisionEngine;

impl BlockingDecisionEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn evaluate(
        &self,
        config: &BlockingConfig,
        candidate: &QueueItem,
        target_node: Option<&NodeName>,
        snapshot: &Snapshot,
    ) -> Verdict {
        if !config.is_active() {
            return Verdict::Clear;
        }
        self.evaluate_compiled(config, &config.compile(), candidate, target_node, snapshot)
    }

    /// Like [`evaluate`](Self::evaluate), with `patterns` already compiled from `config`.
    pub fn evaluate_compiled(
        &self,
        config: &BlockingConfig,
        patterns: &PatternSet,
        candidate: &QueueItem,
        target_node: Option<&NodeName>,
        snapshot: &Snapshot,
    ) -> Verdict {
        if !config.is_active() || patterns.is_empty() {
            return Verdict::Clear;
        }
        let monitor = BlockingJobsMonitor::new(patterns);
        let scan = QueueScan::from_flag(config.scan_all_queue_states);

        match self.find_blocker(config, &monitor, candidate, target_node, snapshot, scan) {
            Some((scope, task)) => {
                let blocker = task.owner().clone();
                debug!(
                    job = %candidate.task.identity().full_name,
                    blocked_by = %blocker.full_name,
                    matched = %task.identity().full_name,
                    scope = ?scope,
                    node = target_node.map(NodeName::as_str),
                    "Job is blocked"
                );
                Verdict::BlockedBy(blocker)
            }
            None => {
                trace!(
                    job = %candidate.task.identity().full_name,
                    node = target_node.map(NodeName::as_str),
                    "No blocking job found"
                );
                Verdict::Clear
            }
        }
    }

    fn find_blocker<'s>(
        &self,
        config: &BlockingConfig,
        monitor: &BlockingJobsMonitor<'_>,
        candidate: &QueueItem,
        target_node: Option<&NodeName>,
        snapshot: &'s Snapshot,
        scan: QueueScan,
    ) -> Option<(Scope, &'s Task)> {
        if config.block_on_global {
            if let Some(task) = monitor.check_all_nodes_for_running_builds(snapshot) {
                return Some((Scope::GlobalRunning, task));
            }
            if let Some(task) = monitor.check_for_queue_entries(snapshot, candidate, scan) {
                return Some((Scope::GlobalQueue, task));
            }
        }

        if let Some(node) = target_node
            && config.block_on_node
        {
            if let Some(task) = monitor.check_node_for_running_builds(snapshot, node) {
                return Some((Scope::NodeRunning, task));
            }
            if let Some(task) = monitor.check_node_for_queue_entries(snapshot, candidate, node, scan)
            {
                return Some((Scope::NodeQueue, task));
            }
        }

        None
    }
}
