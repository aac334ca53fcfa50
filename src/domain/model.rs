use crate::utils::error::ErrorCategory;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// The set of compose services under test, named by its definition files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceGroup {
    pub definitions: Vec<PathBuf>,
    pub working_dir: Option<PathBuf>,
}

impl ServiceGroup {
    pub fn new(definitions: Vec<PathBuf>) -> Self {
        Self {
            definitions,
            working_dir: None,
        }
    }

    pub fn with_working_dir(mut self, working_dir: Option<PathBuf>) -> Self {
        self.working_dir = working_dir;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpFlags {
    pub force_recreate: bool,
    pub remove_orphans: bool,
    pub build: bool,
    pub detach: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownFlags {
    pub volumes: bool,
}

/// One entry of the registry search response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Version")]
    pub version: String,
}

impl CatalogItem {
    pub fn composite_key(&self) -> String {
        format!("{}-{}", self.name, self.version)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallOutcome {
    pub key: String,
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<ErrorCategory>,
    pub error: Option<String>,
}

impl InstallOutcome {
    pub fn failed(
        key: String,
        status: Option<u16>,
        category: ErrorCategory,
        error: String,
    ) -> Self {
        Self {
            key,
            status,
            category: Some(category),
            error: Some(error),
        }
    }

    pub fn passed(&self) -> bool {
        self.error.is_none() && self.status == Some(200)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum PollOutcome {
    Ready { attempts: u32 },
    TimedOut { attempts: u32 },
}

impl PollOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, PollOutcome::Ready { .. })
    }

    pub fn attempts(&self) -> u32 {
        match self {
            PollOutcome::Ready { attempts } | PollOutcome::TimedOut { attempts } => *attempts,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Init,
    Starting,
    Polling,
    Setup,
    Fetch,
    Verify,
    Teardown,
    Done,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Init => "init",
            Stage::Starting => "starting",
            Stage::Polling => "polling",
            Stage::Setup => "setup",
            Stage::Fetch => "fetch",
            Stage::Verify => "verify",
            Stage::Teardown => "teardown",
            Stage::Done => "done",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single violated assertion or error, attributed to a stage and,
/// for install checks, to the item's composite key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    pub stage: Stage,
    pub subject: Option<String>,
    pub category: ErrorCategory,
    pub message: String,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.subject {
            Some(subject) => write!(f, "[{}/{}] {}", self.stage, subject, self.message),
            None => write!(f, "[{}] {}", self.stage, self.message),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub stages: Vec<Stage>,
    pub readiness: Option<PollOutcome>,
    pub outcomes: Vec<InstallOutcome>,
    pub failures: Vec<Failure>,
}

impl RunReport {
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn verified_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.passed()).count()
    }

    pub fn failures_for(&self, key: &str) -> Vec<&Failure> {
        self.failures
            .iter()
            .filter(|f| f.subject.as_deref() == Some(key))
            .collect()
    }

    pub fn failures_in(&self, stage: Stage) -> Vec<&Failure> {
        self.failures.iter().filter(|f| f.stage == stage).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_composite_key() {
        let item = CatalogItem {
            name: "nginx".to_string(),
            version: "1.0.0".to_string(),
        };
        assert_eq!(item.composite_key(), "nginx-1.0.0");
    }

    #[test]
    fn test_install_outcome_passed() {
        let ok = InstallOutcome {
            key: "nginx-1.0.0".to_string(),
            status: Some(200),
            category: None,
            error: None,
        };
        let bad_status = InstallOutcome {
            status: Some(500),
            category: Some(ErrorCategory::Assertion),
            error: Some("unexpected status".to_string()),
            ..ok.clone()
        };
        let transport = InstallOutcome {
            status: None,
            category: Some(ErrorCategory::Transport),
            error: Some("connection refused".to_string()),
            ..ok.clone()
        };
        assert!(ok.passed());
        assert!(!bad_status.passed());
        assert!(!transport.passed());
    }

    #[test]
    fn test_failure_display() {
        let failure = Failure {
            stage: Stage::Verify,
            subject: Some("redis-6.0.0".to_string()),
            category: ErrorCategory::Assertion,
            message: "got 500".to_string(),
        };
        assert_eq!(failure.to_string(), "[verify/redis-6.0.0] got 500");
    }

    #[test]
    fn test_poll_outcome_serializes_with_tag() {
        let json = serde_json::to_value(PollOutcome::TimedOut { attempts: 300 }).unwrap();
        assert_eq!(json, serde_json::json!({"result": "timed_out", "attempts": 300}));
    }
}
