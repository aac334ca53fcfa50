use crate::adapters::http::ApiClient;
use crate::config::HarnessConfig;
use crate::core::catalog;
use crate::core::environment::EnvironmentController;
use crate::core::install::InstallVerifier;
use crate::core::readiness::ReadinessPoller;
use crate::core::recorder::RunRecorder;
use crate::core::setup;
use crate::domain::model::{RunReport, Stage};
use crate::domain::ports::ServiceController;
use crate::utils::error::{ErrorCategory, Result};
use chrono::Utc;
use std::sync::Arc;

/// Drives one run: start, poll, setup, fetch, verify, teardown.
pub struct Harness<C: ServiceController + 'static> {
    environment: Arc<EnvironmentController<C>>,
    poller: ReadinessPoller,
    api: ApiClient,
    verifier: InstallVerifier,
}

impl<C: ServiceController + 'static> Harness<C> {
    pub fn new(config: &HarnessConfig, controller: C) -> Result<Self> {
        let api = ApiClient::new(config)?;
        Ok(Self {
            environment: Arc::new(EnvironmentController::new(Arc::new(controller), config)),
            poller: ReadinessPoller::from_config(config),
            verifier: InstallVerifier::from_config(api.clone(), config),
            api,
        })
    }

    pub fn environment(&self) -> &EnvironmentController<C> {
        &self.environment
    }

    /// Always tears the environment down exactly once, whatever happened in
    /// the stages before. Failures end up in the report, never as `Err`.
    pub async fn run(&self) -> RunReport {
        let started_at = Utc::now();
        let recorder = RunRecorder::new();

        recorder.enter(Stage::Starting);
        let lease = self.environment.start();

        // Stages run in their own task so a panic cannot skip the teardown below.
        let stages = StageRunner {
            environment: Arc::clone(&self.environment),
            poller: self.poller.clone(),
            api: self.api.clone(),
            verifier: self.verifier.clone(),
            recorder: recorder.clone(),
        };
        match tokio::spawn(stages.run()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let stage = recorder.current_stage();
                tracing::error!("Aborting remaining stages after {} error", stage);
                recorder.record_error(stage, None, &e);
            }
            Err(join_error) => {
                recorder.record(
                    recorder.current_stage(),
                    None,
                    ErrorCategory::Internal,
                    format!("stage task failed: {}", join_error),
                );
            }
        }

        recorder.enter(Stage::Teardown);
        let teardown = lease.release().await;
        if let Some(e) = &teardown.stop_error {
            recorder.record_error(Stage::Teardown, None, e);
        }
        for e in &teardown.start_errors {
            recorder.record_error(Stage::Starting, None, e);
        }

        recorder.enter(Stage::Done);
        let report = recorder.report(started_at);
        if report.passed() {
            tracing::info!(
                "🎉 Run passed: {} packages verified",
                report.verified_count()
            );
        } else {
            tracing::error!(
                "Run failed with {} failures ({} packages verified)",
                report.failures.len(),
                report.verified_count()
            );
        }
        report
    }
}

/// Owned copy of everything the stages need, so it can move into a task.
struct StageRunner<C: ServiceController + 'static> {
    environment: Arc<EnvironmentController<C>>,
    poller: ReadinessPoller,
    api: ApiClient,
    verifier: InstallVerifier,
    recorder: RunRecorder,
}

impl<C: ServiceController + 'static> StageRunner<C> {
    async fn run(self) -> Result<()> {
        self.recorder.enter(Stage::Polling);
        let readiness = self.poller.wait_until_ready(self.environment.as_ref()).await;
        if readiness.is_ready() {
            self.environment.mark_running();
        }
        self.recorder.set_readiness(readiness);

        self.recorder.enter(Stage::Setup);
        if let Err(e) = setup::invoke_setup(&self.api).await {
            self.recorder.record_error(Stage::Setup, None, &e);
        }

        self.recorder.enter(Stage::Fetch);
        let keys = catalog::fetch_catalog(&self.api, &self.recorder).await?;

        self.recorder.enter(Stage::Verify);
        let outcomes = self.verifier.verify_all(keys).await;
        for outcome in &outcomes {
            if let Some(error) = &outcome.error {
                let category = outcome.category.unwrap_or(ErrorCategory::Internal);
                self.recorder
                    .record(Stage::Verify, Some(outcome.key.clone()), category, error.clone());
            }
        }
        self.recorder.add_outcomes(outcomes);

        Ok(())
    }
}
