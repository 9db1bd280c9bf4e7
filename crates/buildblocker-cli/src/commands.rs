//! CLI command definitions.

use clap::{Subcommand, ValueEnum};

#[derive(Subcommand)]
pub enum Commands {
    /// Evaluate a job's blocking configuration against a queue snapshot
    Check {
        /// Path to the check file (YAML or JSON)
        #[arg(default_value = "check.yaml")]
        path: String,

        /// Node the job is being considered for; omit to check only whether it may leave the queue
        #[arg(short, long)]
        node: Option<String>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate a blocking configuration
    Validate {
        /// Path to the blocking configuration file
        path: String,
    },

    /// Print the JSON schema of the check file
    Schema,
}

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}
