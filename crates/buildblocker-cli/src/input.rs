//! Input files read by the CLI.

use buildblocker_core::blocking::BlockingConfig;
use buildblocker_core::ids::QueueItemId;
use buildblocker_core::queue::{QueueItem, Snapshot};
use buildblocker_core::{Error, Result};
use schemars::JsonSchema;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::path::Path;

/// A job's blocking configuration, the item being considered, and the queue around it.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct CheckFile {
    /// Blocking configuration of the candidate's job. Absent means the job never blocks.
    #[serde(default)]
    pub config: Option<BlockingConfig>,
    /// The queue item being considered.
    #[schemars(with = "CandidateRepr")]
    pub candidate: Candidate,
    /// Running builds and queued items at the time of the check.
    #[serde(default)]
    pub snapshot: Snapshot,
}

/// Either a full queue item or the position of one in `snapshot.queued`.
#[derive(Debug, Deserialize)]
#[serde(from = "CandidateRepr")]
pub enum Candidate {
    Queued { queued: usize },
    Item(QueueItem),
}

/// On-disk form of [`Candidate`].
///
/// An inline item must carry its id: it is how the item recognises its own
/// entry in `snapshot.queued`.
#[derive(Deserialize, JsonSchema)]
#[serde(untagged)]
enum CandidateRepr {
    Queued {
        queued: usize,
    },
    Item {
        id: QueueItemId,
        #[serde(flatten)]
        item: QueueItem,
    },
}

impl From<CandidateRepr> for Candidate {
    fn from(repr: CandidateRepr) -> Self {
        match repr {
            CandidateRepr::Queued { queued } => Candidate::Queued { queued },
            CandidateRepr::Item { id, mut item } => {
                item.id = id;
                Candidate::Item(item)
            }
        }
    }
}

impl CheckFile {
    /// Resolve the candidate, borrowing it from the snapshot when referenced by position.
    pub fn candidate(&self) -> Result<&QueueItem> {
        match &self.candidate {
            Candidate::Item(item) => Ok(item),
            Candidate::Queued { queued } => self.snapshot.queued.get(*queued).ok_or_else(|| {
                Error::Config(format!(
                    "candidate refers to queued item {} but the snapshot has {}",
                    queued,
                    self.snapshot.queued.len()
                ))
            }),
        }
    }
}

/// Load a YAML (or JSON) document.
pub fn load<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = std::fs::read_to_string(path)?;
    serde_yaml::from_str(&contents)
        .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const CHECK: &str = r#"
config:
  enabled: true
  patterns: "deploy-.*"
candidate:
  queued: 0
snapshot:
  taken_at: "2026-01-01T12:00:00Z"
  queued:
    - task: { kind: job, job: { display_name: smoke, full_name: smoke } }
      state: waiting
      queued_at: "2026-01-01T11:58:00Z"
"#;

    #[test]
    fn test_load_check_file_with_queued_candidate() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(CHECK.as_bytes()).unwrap();

        let check: CheckFile = load(file.path()).unwrap();
        let candidate = check.candidate().unwrap();
        assert_eq!(candidate.task.identity().display_name, "smoke");
        assert_eq!(candidate.id, check.snapshot.queued[0].id);
    }

    #[test]
    fn test_candidate_index_out_of_range() {
        let check: CheckFile =
            serde_yaml::from_str("candidate:\n  queued: 3\n").unwrap();
        assert!(matches!(check.candidate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_inline_candidate_keeps_its_id() {
        let id = QueueItemId::new();
        let yaml = format!(
            "candidate:\n  id: {}\n  task: {{ kind: job, job: {{ display_name: smoke, full_name: smoke }} }}\n  state: buildable\n  queued_at: \"2026-01-01T11:58:00Z\"\n",
            id
        );
        let check: CheckFile = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(check.candidate().unwrap().id, id);
    }

    #[test]
    fn test_inline_candidate_requires_id() {
        let yaml = "candidate:\n  task: { kind: job, job: { display_name: smoke, full_name: smoke } }\n  state: buildable\n  queued_at: \"2026-01-01T11:58:00Z\"\n";
        assert!(serde_yaml::from_str::<CheckFile>(yaml).is_err());
    }

    #[test]
    fn test_missing_snapshot_is_taken_now() {
        let before = chrono::Utc::now();
        let check: CheckFile = serde_yaml::from_str("candidate:\n  queued: 0\n").unwrap();
        assert!(check.snapshot.taken_at >= before);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result: Result<CheckFile> = load(Path::new("/nonexistent/check.yaml"));
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
