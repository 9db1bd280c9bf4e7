//! Queue dispatcher backed by the blocking decision engine.

use crate::engine::{BlockingDecisionEngine, Verdict};
use buildblocker_core::blocking::{BlockingConfig, PatternSet};
use buildblocker_core::ids::NodeName;
use buildblocker_core::job::JobRef;
use buildblocker_core::ports::{BlockingConfigSource, CauseOfBlockage, QueueTaskDispatcher};
use buildblocker_core::queue::{QueueItem, Snapshot};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// In-memory blocking configurations keyed by job full name.
#[derive(Debug, Clone, Default)]
pub struct JobConfigs {
    configs: HashMap<String, BlockingConfig>,
}

impl JobConfigs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, job: &JobRef, config: BlockingConfig) -> Self {
        self.insert(job, config);
        self
    }

    pub fn insert(&mut self, job: &JobRef, config: BlockingConfig) {
        self.configs.insert(job.full_name.clone(), config);
    }
}

impl BlockingConfigSource for JobConfigs {
    fn blocking_config(&self, job: &JobRef) -> Option<BlockingConfig> {
        self.configs.get(&job.full_name).cloned()
    }
}

/// Keeps jobs in the queue while a job matching their blocking patterns is
/// running or queued.
pub struct BuildBlockerDispatcher {
    engine: BlockingDecisionEngine,
    configs: Arc<dyn BlockingConfigSource>,
    /// Compiled pattern sets keyed by their pattern lines.
    compiled: Mutex<HashMap<Vec<String>, Arc<PatternSet>>>,
}

impl BuildBlockerDispatcher {
    pub fn new(configs: Arc<dyn BlockingConfigSource>) -> Self {
        Self {
            engine: BlockingDecisionEngine::new(),
            configs,
            compiled: Mutex::new(HashMap::new()),
        }
    }

    /// Compile `config`'s patterns once; later lookups share the result.
    fn patterns(&self, config: &BlockingConfig) -> Arc<PatternSet> {
        let mut compiled = self.compiled.lock().unwrap_or_else(PoisonError::into_inner);
        compiled
            .entry(config.patterns.clone())
            .or_insert_with(|| Arc::new(config.compile()))
            .clone()
    }

    fn check_for_block(
        &self,
        node: Option<&NodeName>,
        item: &QueueItem,
        snapshot: &Snapshot,
    ) -> Option<CauseOfBlockage> {
        // Matrix children inherit the configuration of their parent.
        let config = self.configs.blocking_config(item.task.owner())?;
        if !config.is_active() {
            return None;
        }
        let patterns = self.patterns(&config);

        match self.engine.evaluate_compiled(&config, &patterns, item, node, snapshot) {
            Verdict::Clear => None,
            Verdict::BlockedBy(job) => Some(CauseOfBlockage::BlockedByJob {
                in_queue_for: in_queue_for(item.queued_at, snapshot.taken_at),
                job,
            }),
        }
    }
}

impl QueueTaskDispatcher for BuildBlockerDispatcher {
    fn name(&self) -> &str {
        "build-blocker"
    }

    fn can_run(&self, item: &QueueItem, snapshot: &Snapshot) -> Option<CauseOfBlockage> {
        self.check_for_block(None, item, snapshot)
    }

    fn can_take(
        &self,
        node: &NodeName,
        item: &QueueItem,
        snapshot: &Snapshot,
    ) -> Option<CauseOfBlockage> {
        self.check_for_block(Some(node), item, snapshot)
    }
}

/// Time an item has spent in the queue, as shown next to a blockage.
pub fn in_queue_for(queued_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    format_time_span(now - queued_at)
}

/// Human-readable span using its two most significant units.
pub fn format_time_span(span: Duration) -> String {
    let millis = span.num_milliseconds().max(0);
    let seconds = millis / 1000;
    let days = seconds / 86_400;
    let hours = seconds % 86_400 / 3_600;
    let minutes = seconds % 3_600 / 60;
    let secs = seconds % 60;

    if days > 0 {
        let unit = if days == 1 { "day" } else { "days" };
        format!("{} {} {} hr", days, unit, hours)
    } else if hours > 0 {
        format!("{} hr {} min", hours, minutes)
    } else if minutes > 0 {
        format!("{} min {} sec", minutes, secs)
    } else if secs >= 10 {
        format!("{} sec", secs)
    } else if secs > 0 {
        format!("{}.{} sec", secs, millis % 1000 / 100)
    } else {
        format!("{} ms", millis)
    }
}
