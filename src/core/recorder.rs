use crate::domain::model::{Failure, InstallOutcome, PollOutcome, RunReport, Stage};
use crate::utils::error::{ErrorCategory, HarnessError};
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct RecorderState {
    stages: Vec<Stage>,
    readiness: Option<PollOutcome>,
    outcomes: Vec<InstallOutcome>,
    failures: Vec<Failure>,
}

/// Collects stage transitions and failures for one harness run.
///
/// Clones share the same state, so whatever a stage recorded before it
/// panicked is still in the final report.
#[derive(Debug, Clone, Default)]
pub struct RunRecorder {
    inner: Arc<Mutex<RecorderState>>,
}

impl RunRecorder {
    pub fn new() -> Self {
        let recorder = Self::default();
        recorder.state().stages.push(Stage::Init);
        recorder
    }

    // Never held across an await; a poisoned lock still holds valid data.
    fn state(&self) -> MutexGuard<'_, RecorderState> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn enter(&self, stage: Stage) {
        tracing::info!("▶️ Stage: {}", stage);
        self.state().stages.push(stage);
    }

    pub fn current_stage(&self) -> Stage {
        self.state().stages.last().copied().unwrap_or(Stage::Init)
    }

    pub fn record(
        &self,
        stage: Stage,
        subject: Option<String>,
        category: ErrorCategory,
        message: impl Into<String>,
    ) {
        let failure = Failure {
            stage,
            subject,
            category,
            message: message.into(),
        };
        tracing::error!("❌ {}", failure);
        self.state().failures.push(failure);
    }

    pub fn record_error(&self, stage: Stage, subject: Option<String>, error: &HarnessError) {
        self.record(stage, subject, error.category(), error.to_string());
    }

    pub fn set_readiness(&self, outcome: PollOutcome) {
        self.state().readiness = Some(outcome);
    }

    pub fn add_outcomes(&self, outcomes: Vec<InstallOutcome>) {
        self.state().outcomes.extend(outcomes);
    }

    pub fn failure_count(&self) -> usize {
        self.state().failures.len()
    }

    pub fn report(&self, started_at: DateTime<Utc>) -> RunReport {
        let state = self.state();
        RunReport {
            started_at,
            finished_at: Utc::now(),
            stages: state.stages.clone(),
            readiness: state.readiness,
            outcomes: state.outcomes.clone(),
            failures: state.failures.clone(),
        }
    }
}
