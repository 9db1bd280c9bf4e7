//! Main scheduler orchestration.

use crate::queue::{BuildQueue, MaintenanceReport};
use crate::registry::DispatcherRegistry;

use buildblocker_core::Result;
use buildblocker_core::ids::{BuildId, NodeName, QueueItemId};
use buildblocker_core::job::Task;
use buildblocker_core::ports::CauseOfBlockage;
use buildblocker_core::queue::{QueueState, RunningBuild, Snapshot};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// The scheduler service.
pub struct Scheduler {
    registry: DispatcherRegistry,
    queue: Arc<RwLock<BuildQueue>>,
}

impl Scheduler {
    pub fn new(registry: DispatcherRegistry) -> Self {
        Self {
            registry,
            queue: Arc::new(RwLock::new(BuildQueue::new())),
        }
    }

    /// Queue a task; it stays waiting until the next maintenance pass.
    pub async fn submit(&self, task: Task) -> QueueItemId {
        self.queue.write().await.enqueue(task, Utc::now())
    }

    /// Re-evaluate waiting and blocked items.
    pub async fn maintain(&self) -> MaintenanceReport {
        let mut queue = self.queue.write().await;
        queue.maintain(&self.registry, Utc::now())
    }

    /// Offer a free executor on `node` to the queue.
    pub async fn offer(&self, node: &NodeName) -> Option<QueueItemId> {
        let mut queue = self.queue.write().await;
        queue.offer(node, &self.registry, Utc::now())
    }

    pub async fn start(&self, id: QueueItemId) -> Result<BuildId> {
        self.queue.write().await.start(id, Utc::now())
    }

    pub async fn complete(&self, id: BuildId) -> Result<RunningBuild> {
        self.queue.write().await.complete(id)
    }

    pub async fn snapshot(&self) -> Snapshot {
        self.queue.read().await.snapshot(Utc::now())
    }

    pub async fn state(&self, id: QueueItemId) -> Option<QueueState> {
        self.queue.read().await.item(id).map(|item| item.state)
    }

    pub async fn cause(&self, id: QueueItemId) -> Option<CauseOfBlockage> {
        self.queue.read().await.cause(id).cloned()
    }

    /// Get the current queue length.
    pub async fn queue_length(&self) -> usize {
        self.queue.read().await.len()
    }

    /// Run maintenance passes every `period` until `shutdown` turns true or its sender is dropped.
    pub async fn run_maintenance(&self, period: Duration, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(period_ms = period.as_millis() as u64, "Queue maintenance started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let report = self.maintain().await;
                    debug!(
                        buildable = report.buildable.len(),
                        blocked = report.blocked.len(),
                        "Maintenance pass finished"
                    );
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Queue maintenance stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::{BuildBlockerDispatcher, JobConfigs};
    use buildblocker_core::blocking::BlockingConfig;
    use buildblocker_core::job::JobRef;

    fn scheduler() -> Scheduler {
        let configs = JobConfigs::new().with(
            &JobRef::named("smoke"),
            BlockingConfig::new(["^deploy-"]).with_node(true),
        );
        let registry = DispatcherRegistry::new()
            .with(Arc::new(BuildBlockerDispatcher::new(Arc::new(configs))));
        Scheduler::new(registry)
    }

    #[tokio::test]
    async fn test_submit_and_run() {
        let scheduler = scheduler();
        let node = NodeName::from("agent-1");

        let id = scheduler.submit(Task::job(JobRef::named("deploy-prod"))).await;
        assert_eq!(scheduler.state(id).await, Some(QueueState::Waiting));

        scheduler.maintain().await;
        assert_eq!(scheduler.offer(&node).await, Some(id));
        let build = scheduler.start(id).await.unwrap();
        assert_eq!(scheduler.queue_length().await, 0);

        let snapshot = scheduler.snapshot().await;
        assert_eq!(snapshot.running.len(), 1);
        assert_eq!(snapshot.running[0].node, node);

        let finished = scheduler.complete(build).await.unwrap();
        assert_eq!(finished.task.identity().display_name, "deploy-prod");
    }

    #[tokio::test]
    async fn test_blocked_job_reports_cause() {
        let scheduler = scheduler();
        let node = NodeName::from("agent-1");

        let deploy = scheduler.submit(Task::job(JobRef::named("deploy-prod"))).await;
        scheduler.maintain().await;
        scheduler.offer(&node).await;
        scheduler.start(deploy).await.unwrap();

        let smoke = scheduler.submit(Task::job(JobRef::named("smoke"))).await;
        scheduler.maintain().await;

        assert_eq!(scheduler.state(smoke).await, Some(QueueState::Blocked));
        let cause = scheduler.cause(smoke).await.unwrap();
        assert!(cause.to_string().ends_with("Build is blocked by: deploy-prod"));
    }
}
