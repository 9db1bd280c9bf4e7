//! Scans of running and queued work for jobs matching blocking patterns.

use buildblocker_core::blocking::PatternSet;
use buildblocker_core::ids::NodeName;
use buildblocker_core::job::Task;
use buildblocker_core::queue::{QueueItem, QueueState, Snapshot};

/// Which queue items count as potential blockers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueScan {
    /// Only items ready to execute: buildable, or pending on a node.
    Buildable,
    /// Items in any queue state.
    AllStates,
}

impl QueueScan {
    pub fn from_flag(scan_all_queue_states: bool) -> Self {
        if scan_all_queue_states {
            QueueScan::AllStates
        } else {
            QueueScan::Buildable
        }
    }

    fn includes(&self, state: QueueState) -> bool {
        match self {
            QueueScan::Buildable => {
                matches!(state, QueueState::Buildable | QueueState::Pending)
            }
            QueueScan::AllStates => true,
        }
    }
}

/// Looks for blocking jobs in a snapshot. Every check returns the first match.
pub struct BlockingJobsMonitor<'a> {
    patterns: &'a PatternSet,
}

impl<'a> BlockingJobsMonitor<'a> {
    pub fn new(patterns: &'a PatternSet) -> Self {
        Self { patterns }
    }

    /// A matching build running on any node.
    pub fn check_all_nodes_for_running_builds<'s>(&self, snapshot: &'s Snapshot) -> Option<&'s Task> {
        snapshot
            .running
            .iter()
            .map(|build| &build.task)
            .find(|task| self.matches(task))
    }

    /// A matching build running on `node`.
    pub fn check_node_for_running_builds<'s>(
        &self,
        snapshot: &'s Snapshot,
        node: &NodeName,
    ) -> Option<&'s Task> {
        snapshot
            .running
            .iter()
            .filter(|build| &build.node == node)
            .map(|build| &build.task)
            .find(|task| self.matches(task))
    }

    /// A matching queue item other than `candidate`.
    pub fn check_for_queue_entries<'s>(
        &self,
        snapshot: &'s Snapshot,
        candidate: &QueueItem,
        scan: QueueScan,
    ) -> Option<&'s Task> {
        self.queue_entries(snapshot, candidate, scan)
            .map(|item| &item.task)
            .find(|task| self.matches(task))
    }

    /// A matching queue item other than `candidate` pending on `node`.
    ///
    /// Items not yet assigned to any node never match.
    pub fn check_node_for_queue_entries<'s>(
        &self,
        snapshot: &'s Snapshot,
        candidate: &QueueItem,
        node: &NodeName,
        scan: QueueScan,
    ) -> Option<&'s Task> {
        self.queue_entries(snapshot, candidate, scan)
            .filter(|item| item.is_pending_on(node))
            .map(|item| &item.task)
            .find(|task| self.matches(task))
    }

    fn queue_entries<'s>(
        &self,
        snapshot: &'s Snapshot,
        candidate: &QueueItem,
        scan: QueueScan,
    ) -> impl Iterator<Item = &'s QueueItem> {
        let candidate_id = candidate.id;
        snapshot
            .queued
            .iter()
            .filter(move |item| item.id != candidate_id && scan.includes(item.state))
    }

    fn matches(&self, task: &Task) -> bool {
        self.patterns.matches_job(task.identity())
    }
}
