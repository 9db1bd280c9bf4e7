//! Job identity types.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reference to a job definition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct JobRef {
    /// Name shown to users.
    pub display_name: String,
    /// Fully qualified name, including any enclosing folders.
    pub full_name: String,
}

impl JobRef {
    pub fn new(display_name: impl Into<String>, full_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            full_name: full_name.into(),
        }
    }

    /// A top-level job whose display name equals its full name.
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            display_name: name.clone(),
            full_name: name,
        }
    }
}

impl fmt::Display for JobRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name)
    }
}

/// A schedulable unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Task {
    /// A plain job.
    Job { job: JobRef },
    /// One configuration of a multi-configuration (matrix) job.
    MatrixChild { job: JobRef, parent: JobRef },
}

impl Task {
    pub fn job(job: JobRef) -> Self {
        Task::Job { job }
    }

    pub fn matrix_child(job: JobRef, parent: JobRef) -> Self {
        Task::MatrixChild { job, parent }
    }

    /// The task's own identity, used for name matching.
    pub fn identity(&self) -> &JobRef {
        match self {
            Task::Job { job } | Task::MatrixChild { job, .. } => job,
        }
    }

    /// The top-level job a user would recognize: the parent of a matrix child.
    pub fn owner(&self) -> &JobRef {
        match self {
            Task::Job { job } => job,
            Task::MatrixChild { parent, .. } => parent,
        }
    }
}
