//! Command handlers.

use crate::input::{self, CheckFile};
use buildblocker_core::blocking::BlockingConfig;
use buildblocker_core::ids::NodeName;
use buildblocker_core::ports::{CauseOfBlockage, QueueTaskDispatcher};
use buildblocker_scheduler::{BuildBlockerDispatcher, JobConfigs};
use console::style;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Evaluate a check file. Returns the blockage, if any.
pub fn check(
    path: &str,
    node: Option<String>,
    json: bool,
) -> Result<Option<CauseOfBlockage>, Box<dyn std::error::Error>> {
    let file: CheckFile = input::load(Path::new(path))?;
    let candidate = file.candidate()?;
    let node = node.map(NodeName::new);

    let mut configs = JobConfigs::new();
    if let Some(config) = &file.config {
        configs.insert(candidate.task.owner(), config.clone());
    }
    let dispatcher = BuildBlockerDispatcher::new(Arc::new(configs));

    debug!(
        job = %candidate.task.identity().full_name,
        running = file.snapshot.running.len(),
        queued = file.snapshot.queued.len(),
        "Evaluating blocking configuration"
    );
    let cause = match &node {
        Some(node) => dispatcher.can_take(node, candidate, &file.snapshot),
        None => dispatcher.can_run(candidate, &file.snapshot),
    };

    if json {
        let output = match &cause {
            Some(cause) => serde_json::json!({
                "verdict": "blocked",
                "cause": cause,
                "message": cause.to_string(),
            }),
            None => serde_json::json!({ "verdict": "clear" }),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(cause);
    }

    let target = node
        .as_ref()
        .map(|n| format!(" on {}", style(n).bold()))
        .unwrap_or_default();
    match &cause {
        Some(cause) => {
            println!(
                "{} {} is blocked{}",
                style("✗").red(),
                style(&candidate.task.identity().display_name).bold(),
                target
            );
            println!("  {}", cause);
        }
        None => println!(
            "{} {} may proceed{}",
            style("✓").green(),
            style(&candidate.task.identity().display_name).bold(),
            target
        ),
    }

    Ok(cause)
}

/// Validate a blocking configuration.
pub fn validate(path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config: BlockingConfig = input::load(Path::new(path))?;
    let patterns = config.compile();

    if !config.enabled {
        println!("{} Blocking is disabled", style("!").yellow());
    }
    if patterns.is_empty() {
        println!("{} No patterns configured, nothing will block", style("!").yellow());
    }
    if !config.block_on_global && !config.block_on_node {
        println!(
            "{} Neither global nor node blocking is enabled, nothing will block",
            style("!").yellow()
        );
    }

    println!("  Patterns: {}", patterns.len());
    for matcher in patterns.matchers() {
        if matcher.is_literal() {
            println!(
                "    - {} {}",
                matcher.as_str(),
                style("(not a valid regular expression, matched literally)").yellow()
            );
        } else {
            println!("    - {}", matcher.as_str());
        }
    }
    println!(
        "  Scope: {}{}",
        if config.block_on_global { "global " } else { "" },
        if config.block_on_node { "node" } else { "" }
    );
    println!(
        "  Queue scan: {}",
        if config.scan_all_queue_states {
            "all states"
        } else {
            "buildable only"
        }
    );

    let degraded = patterns.degraded().count();
    if degraded > 0 {
        println!(
            "{} {} pattern(s) fall back to literal matching",
            style("!").yellow(),
            degraded
        );
    } else {
        println!("{} Configuration is valid", style("✓").green());
    }

    Ok(())
}

/// Print the JSON schema of the check file.
pub fn schema() -> Result<(), Box<dyn std::error::Error>> {
    let schema = schemars::schema_for!(CheckFile);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}
