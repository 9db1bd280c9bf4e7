//! Blocking decisions and queue dispatch for the build blocker.
//!
//! [`engine::BlockingDecisionEngine`] is the pure predicate. The dispatcher
//! adapts it to the host queue's decision points, and [`queue::BuildQueue`]
//! with [`scheduler::Scheduler`] form a reference host that drives the queue
//! state machine through a [`registry::DispatcherRegistry`].

pub mod dispatcher;
pub mod engine;
pub mod monitor;
pub mod queue;
pub mod registry;
pub mod scheduler;

pub use dispatcher::{BuildBlockerDispatcher, JobConfigs};
pub use engine::{BlockingDecisionEngine, Verdict};
pub use registry::DispatcherRegistry;
pub use scheduler::Scheduler;
