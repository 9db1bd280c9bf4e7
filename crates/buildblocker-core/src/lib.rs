//! Build Blocker Core
//!
//! Domain types, blocking configuration, and port traits shared by the
//! decision engine and the hosts that embed it. This crate has minimal
//! dependencies and defines the shared vocabulary used across the workspace.

pub mod blocking;
pub mod error;
pub mod ids;
pub mod job;
pub mod ports;
pub mod queue;

pub use blocking::{BlockingConfig, Matcher, PatternSet};
pub use error::{Error, Result};
pub use ids::*;
pub use job::{JobRef, Task};
pub use queue::{QueueItem, QueueState, RunningBuild, Snapshot};
