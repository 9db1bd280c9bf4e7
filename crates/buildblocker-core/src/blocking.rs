//! Per-job blocking configuration and pattern compilation.

use crate::job::JobRef;
use regex::{Regex, RegexBuilder};
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

/// Upper bound on the compiled size of a single pattern.
const PATTERN_SIZE_LIMIT: usize = 1 << 20;

/// Blocking configuration attached to a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct BlockingConfig {
    /// Master switch.
    #[serde(default)]
    pub enabled: bool,
    /// Job name patterns, one per line.
    #[serde(default, deserialize_with = "deserialize_patterns")]
    #[schemars(with = "PatternLines")]
    pub patterns: Vec<String>,
    /// Block while a matching job runs or is queued anywhere.
    #[serde(default = "default_block_on_global")]
    pub block_on_global: bool,
    /// Block while a matching job runs or is queued on the node being considered.
    #[serde(default)]
    pub block_on_node: bool,
    /// Consider queue items in every state, not only buildable ones.
    #[serde(default)]
    pub scan_all_queue_states: bool,
}

fn default_block_on_global() -> bool {
    true
}

impl Default for BlockingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            patterns: vec![],
            block_on_global: default_block_on_global(),
            block_on_node: false,
            scan_all_queue_states: false,
        }
    }
}

impl BlockingConfig {
    /// Create an enabled configuration blocking globally on the given patterns.
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            enabled: true,
            patterns: patterns
                .into_iter()
                .flat_map(|line| Self::parse_patterns(line.as_ref()))
                .collect(),
            ..Default::default()
        }
    }

    /// Create an enabled configuration from newline-delimited pattern text.
    pub fn from_text(text: &str) -> Self {
        Self {
            enabled: true,
            patterns: Self::parse_patterns(text),
            ..Default::default()
        }
    }

    pub fn with_global(mut self, enabled: bool) -> Self {
        self.block_on_global = enabled;
        self
    }

    pub fn with_node(mut self, enabled: bool) -> Self {
        self.block_on_node = enabled;
        self
    }

    pub fn with_scan_all_queue_states(mut self, enabled: bool) -> Self {
        self.scan_all_queue_states = enabled;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Split newline-delimited text into trimmed, non-blank pattern lines.
    pub fn parse_patterns(text: &str) -> Vec<String> {
        text.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Whether this configuration can ever block anything.
    pub fn is_active(&self) -> bool {
        self.enabled && !self.patterns.is_empty()
    }

    /// Compile every pattern line. Never fails.
    pub fn compile(&self) -> PatternSet {
        PatternSet {
            matchers: self
                .patterns
                .iter()
                .map(|line| line.trim())
                .filter(|line| !line.is_empty())
                .map(Matcher::compile)
                .collect(),
        }
    }
}

/// Serialized form of the pattern list: either one block of text or a list of lines.
#[derive(Deserialize, JsonSchema)]
#[serde(untagged)]
enum PatternLines {
    Text(String),
    Lines(Vec<String>),
}

fn deserialize_patterns<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let lines = match Option::<PatternLines>::deserialize(deserializer)? {
        None => vec![],
        Some(PatternLines::Text(text)) => BlockingConfig::parse_patterns(&text),
        Some(PatternLines::Lines(lines)) => lines
            .iter()
            .flat_map(|line| BlockingConfig::parse_patterns(line))
            .collect(),
    };
    Ok(lines)
}

/// A single compiled pattern line.
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Unanchored, case-sensitive regular expression.
    Regex(Regex),
    /// Fallback for lines that are not valid regular expressions.
    Literal(String),
}

impl Matcher {
    pub fn compile(line: &str) -> Self {
        match RegexBuilder::new(line)
            .size_limit(PATTERN_SIZE_LIMIT)
            .build()
        {
            Ok(re) => Matcher::Regex(re),
            Err(err) => {
                warn!(
                    pattern = line,
                    error = %err,
                    "Blocking pattern is not a valid regular expression, matching it literally"
                );
                Matcher::Literal(line.to_string())
            }
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        match self {
            Matcher::Regex(re) => re.is_match(name),
            Matcher::Literal(literal) => literal == name,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Matcher::Regex(re) => re.as_str(),
            Matcher::Literal(literal) => literal,
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Matcher::Literal(_))
    }
}

/// The compiled patterns of one configuration.
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    matchers: Vec<Matcher>,
}

impl PatternSet {
    /// True if any pattern matches the job's display name or full name.
    pub fn matches_job(&self, job: &JobRef) -> bool {
        self.matchers
            .iter()
            .any(|m| m.matches(&job.display_name) || m.matches(&job.full_name))
    }

    pub fn matchers(&self) -> &[Matcher] {
        &self.matchers
    }

    /// Lines that fell back to literal matching.
    pub fn degraded(&self) -> impl Iterator<Item = &str> {
        self.matchers
            .iter()
            .filter(|m| m.is_literal())
            .map(Matcher::as_str)
    }

    pub fn len(&self) -> usize {
        self.matchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }
}
