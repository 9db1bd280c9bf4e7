//! In-memory build queue driven by queue dispatchers.

use crate::registry::DispatcherRegistry;
use buildblocker_core::ids::{BuildId, NodeName, QueueItemId};
use buildblocker_core::job::Task;
use buildblocker_core::ports::CauseOfBlockage;
use buildblocker_core::queue::{QueueItem, QueueState, RunningBuild, Snapshot};
use buildblocker_core::{Error, Result};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::{debug, info};

/// Outcome of one maintenance pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaintenanceReport {
    /// Items that may proceed.
    pub buildable: Vec<QueueItemId>,
    /// Items vetoed by a dispatcher.
    pub blocked: Vec<QueueItemId>,
}

/// Queue of pending items plus the builds currently executing.
#[derive(Debug, Default)]
pub struct BuildQueue {
    items: Vec<QueueItem>,
    running: Vec<RunningBuild>,
    causes: HashMap<QueueItemId, CauseOfBlockage>,
}

impl BuildQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a task to the queue in the waiting state.
    pub fn enqueue(&mut self, task: Task, now: DateTime<Utc>) -> QueueItemId {
        let item = QueueItem::new(task, now);
        let id = item.id;
        debug!(item = %id, job = %item.task.identity().full_name, "Queued");
        self.items.push(item);
        id
    }

    pub fn snapshot(&self, now: DateTime<Utc>) -> Snapshot {
        Snapshot {
            taken_at: now,
            running: self.running.clone(),
            queued: self.items.clone(),
        }
    }

    /// Re-check every waiting and blocked item.
    ///
    /// The pass works on one snapshot, updated as items change state, so an
    /// item made buildable early in the pass is visible to later items.
    pub fn maintain(&mut self, registry: &DispatcherRegistry, now: DateTime<Utc>) -> MaintenanceReport {
        let mut snapshot = self.snapshot(now);
        let mut report = MaintenanceReport::default();

        for idx in 0..self.items.len() {
            let current = self.items[idx].state;
            if !matches!(current, QueueState::Waiting | QueueState::Blocked) {
                continue;
            }

            let cause = registry.can_run(&snapshot.queued[idx], &snapshot);
            let next = if cause.is_some() {
                QueueState::Blocked
            } else {
                QueueState::Buildable
            };

            let item = &mut self.items[idx];
            let id = item.id;
            if next != current {
                info!(item = %id, job = %item.task.identity().full_name, from = %current, to = %next, "Queue item changed state");
            }
            item.state = next;
            snapshot.queued[idx].state = next;

            match cause {
                Some(cause) => {
                    self.causes.insert(id, cause);
                    report.blocked.push(id);
                }
                None => {
                    self.causes.remove(&id);
                    report.buildable.push(id);
                }
            }
        }

        report
    }

    /// Hand the first buildable item the node may take to that node.
    pub fn offer(
        &mut self,
        node: &NodeName,
        registry: &DispatcherRegistry,
        now: DateTime<Utc>,
    ) -> Option<QueueItemId> {
        let snapshot = self.snapshot(now);

        for (idx, item) in snapshot.queued.iter().enumerate() {
            if item.state != QueueState::Buildable {
                continue;
            }
            match registry.can_take(node, item, &snapshot) {
                Some(cause) => {
                    debug!(item = %item.id, node = %node, cause = %cause, "Node refused item");
                    self.causes.insert(item.id, cause);
                }
                None => {
                    let entry = &mut self.items[idx];
                    entry.state = QueueState::Pending;
                    entry.node = Some(node.clone());
                    self.causes.remove(&item.id);
                    info!(item = %item.id, node = %node, "Queue item pending on node");
                    return Some(item.id);
                }
            }
        }

        None
    }

    /// Start a pending item on the node it was handed to.
    pub fn start(&mut self, id: QueueItemId, now: DateTime<Utc>) -> Result<BuildId> {
        let idx = self
            .items
            .iter()
            .position(|item| item.id == id)
            .ok_or_else(|| Error::QueueItemNotFound(id.to_string()))?;

        let node = match (&self.items[idx].state, &self.items[idx].node) {
            (QueueState::Pending, Some(node)) => node.clone(),
            (state, _) => {
                return Err(Error::InvalidTransition {
                    item: id.to_string(),
                    from: state.to_string(),
                    to: "running".to_string(),
                });
            }
        };

        let item = self.items.remove(idx);
        let build = RunningBuild {
            id: BuildId::new(),
            task: item.task,
            node,
            started_at: now,
        };
        let build_id = build.id;
        info!(item = %id, build = %build_id, node = %build.node, "Build started");
        self.running.push(build);
        Ok(build_id)
    }

    /// Remove a finished build.
    pub fn complete(&mut self, id: BuildId) -> Result<RunningBuild> {
        let idx = self
            .running
            .iter()
            .position(|build| build.id == id)
            .ok_or_else(|| Error::BuildNotFound(id.to_string()))?;
        let build = self.running.remove(idx);
        info!(build = %id, job = %build.task.identity().full_name, "Build completed");
        Ok(build)
    }

    pub fn item(&self, id: QueueItemId) -> Option<&QueueItem> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Last recorded reason the item could not proceed.
    pub fn cause(&self, id: QueueItemId) -> Option<&CauseOfBlockage> {
        self.causes.get(&id)
    }

    /// Get the current queue length.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn running(&self) -> &[RunningBuild] {
        &self.running
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::{BuildBlockerDispatcher, JobConfigs};
    use buildblocker_core::blocking::BlockingConfig;
    use buildblocker_core::job::JobRef;
    use std::sync::Arc;

    fn registry(configs: JobConfigs) -> DispatcherRegistry {
        DispatcherRegistry::new().with(Arc::new(BuildBlockerDispatcher::new(Arc::new(configs))))
    }

    #[test]
    fn test_blocked_until_blocker_completes() {
        let deploy = JobRef::named("deploy-prod");
        let smoke = JobRef::named("smoke");
        let registry = registry(JobConfigs::new().with(&smoke, BlockingConfig::new(["^deploy-"])));
        let node = NodeName::from("agent-1");
        let now = Utc::now();
        let mut queue = BuildQueue::new();

        let deploy_id = queue.enqueue(Task::job(deploy.clone()), now);
        queue.maintain(&registry, now);
        assert_eq!(queue.offer(&node, &registry, now), Some(deploy_id));
        let build = queue.start(deploy_id, now).unwrap();

        let smoke_id = queue.enqueue(Task::job(smoke), now);
        let report = queue.maintain(&registry, now);
        assert_eq!(report.blocked, vec![smoke_id]);
        assert_eq!(queue.item(smoke_id).unwrap().state, QueueState::Blocked);
        assert_eq!(queue.cause(smoke_id).and_then(|c| c.blocking_job()), Some(&deploy));

        queue.complete(build).unwrap();
        let report = queue.maintain(&registry, now);
        assert_eq!(report.buildable, vec![smoke_id]);
        assert_eq!(queue.item(smoke_id).unwrap().state, QueueState::Buildable);
        assert!(queue.cause(smoke_id).is_none());
    }

    #[test]
    fn test_buildable_item_blocks_later_item_in_same_pass() {
        let smoke = JobRef::named("smoke");
        let registry = registry(JobConfigs::new().with(&smoke, BlockingConfig::new(["^deploy-"])));
        let now = Utc::now();
        let mut queue = BuildQueue::new();

        let deploy_id = queue.enqueue(Task::job(JobRef::named("deploy-prod")), now);
        let smoke_id = queue.enqueue(Task::job(smoke), now);
        let report = queue.maintain(&registry, now);

        assert_eq!(report.buildable, vec![deploy_id]);
        assert_eq!(report.blocked, vec![smoke_id]);
    }

    #[test]
    fn test_node_refuses_item_while_blocker_runs_there() {
        let smoke = JobRef::named("smoke");
        let config = BlockingConfig::new(["^deploy-"]).with_global(false).with_node(true);
        let registry = registry(JobConfigs::new().with(&smoke, config));
        let agent1 = NodeName::from("agent-1");
        let agent2 = NodeName::from("agent-2");
        let now = Utc::now();
        let mut queue = BuildQueue::new();

        let deploy_id = queue.enqueue(Task::job(JobRef::named("deploy-prod")), now);
        queue.maintain(&registry, now);
        queue.offer(&agent1, &registry, now);
        queue.start(deploy_id, now).unwrap();

        let smoke_id = queue.enqueue(Task::job(smoke), now);
        queue.maintain(&registry, now);
        assert_eq!(queue.item(smoke_id).unwrap().state, QueueState::Buildable);

        assert_eq!(queue.offer(&agent1, &registry, now), None);
        assert!(queue.cause(smoke_id).is_some());
        assert_eq!(queue.offer(&agent2, &registry, now), Some(smoke_id));
        assert_eq!(queue.item(smoke_id).unwrap().node, Some(agent2));
    }

    #[test]
    fn test_pending_item_blocks_globally_before_it_starts() {
        let smoke = JobRef::named("smoke");
        let registry = registry(JobConfigs::new().with(&smoke, BlockingConfig::new(["^deploy-"])));
        let now = Utc::now();
        let mut queue = BuildQueue::new();

        let deploy_id = queue.enqueue(Task::job(JobRef::named("deploy-prod")), now);
        queue.maintain(&registry, now);
        assert_eq!(queue.offer(&NodeName::from("agent-1"), &registry, now), Some(deploy_id));
        assert_eq!(queue.item(deploy_id).unwrap().state, QueueState::Pending);

        let smoke_id = queue.enqueue(Task::job(smoke), now);
        let report = queue.maintain(&registry, now);
        assert_eq!(report.blocked, vec![smoke_id]);
        assert!(report.buildable.is_empty());
        assert_eq!(queue.offer(&NodeName::from("agent-2"), &registry, now), None);
        assert!(queue.running().is_empty());
    }

    #[test]
    fn test_pending_item_blocks_its_node() {
        let smoke = JobRef::named("smoke");
        let config = BlockingConfig::new(["^deploy-"]).with_global(false).with_node(true);
        let registry = registry(JobConfigs::new().with(&smoke, config));
        let agent1 = NodeName::from("agent-1");
        let agent2 = NodeName::from("agent-2");
        let now = Utc::now();
        let mut queue = BuildQueue::new();

        let deploy_id = queue.enqueue(Task::job(JobRef::named("deploy-prod")), now);
        queue.maintain(&registry, now);
        assert_eq!(queue.offer(&agent1, &registry, now), Some(deploy_id));

        let smoke_id = queue.enqueue(Task::job(smoke), now);
        queue.maintain(&registry, now);
        assert_eq!(queue.offer(&agent1, &registry, now), None);
        assert_eq!(
            queue.cause(smoke_id).and_then(|c| c.blocking_job()),
            Some(&JobRef::named("deploy-prod"))
        );
        assert_eq!(queue.offer(&agent2, &registry, now), Some(smoke_id));
    }

    #[test]
    fn test_start_requires_pending_item() {
        let now = Utc::now();
        let mut queue = BuildQueue::new();
        let id = queue.enqueue(Task::job(JobRef::named("smoke")), now);

        assert!(matches!(
            queue.start(id, now),
            Err(Error::InvalidTransition { .. })
        ));
        assert!(matches!(
            queue.start(QueueItemId::new(), now),
            Err(Error::QueueItemNotFound(_))
        ));
        assert!(matches!(
            queue.complete(BuildId::new()),
            Err(Error::BuildNotFound(_))
        ));
    }
}
