use crate::config::HarnessConfig;
use crate::domain::model::{DownFlags, LifecycleState, ServiceGroup, UpFlags};
use crate::domain::ports::{ServiceController, StatusSource};
use crate::utils::error::{HarnessError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Start/stop/status for the service group under test.
pub struct EnvironmentController<C: ServiceController + 'static> {
    controller: Arc<C>,
    group: ServiceGroup,
    pull_group: ServiceGroup,
    pull: bool,
    up_flags: UpFlags,
    down_flags: DownFlags,
    start_grace: Duration,
    state: watch::Sender<LifecycleState>,
}

impl<C: ServiceController + 'static> EnvironmentController<C> {
    pub fn new(controller: Arc<C>, config: &HarnessConfig) -> Self {
        let (state, _) = watch::channel(LifecycleState::Stopped);
        Self {
            controller,
            group: config.service_group(),
            pull_group: config.pull_group(),
            pull: config.environment.pull,
            up_flags: config.up_flags(),
            down_flags: config.down_flags(),
            start_grace: config.start_grace(),
            state,
        }
    }

    pub fn group(&self) -> &ServiceGroup {
        &self.group
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    /// Launches pull + up as a background task and returns immediately.
    /// The returned lease owns the teardown of the group.
    pub fn start(self: &Arc<Self>) -> EnvironmentLease<C> {
        self.state.send_replace(LifecycleState::Starting);
        let environment = Arc::clone(self);
        let start_task = tokio::spawn(async move { environment.bring_up().await });

        EnvironmentLease {
            environment: Some(Arc::clone(self)),
            start_task: Some(start_task),
            start_grace: self.start_grace,
        }
    }

    /// Errors are collected rather than short-circuiting: a failed pull still
    /// lets `up` use whatever images are already present.
    async fn bring_up(&self) -> Vec<HarnessError> {
        let mut errors = Vec::new();

        if self.pull {
            tracing::info!("📥 Pulling images for {:?}", self.pull_group.definitions);
            if let Err(e) = self.controller.pull(&self.pull_group).await {
                tracing::error!("Pull failed: {}", e);
                errors.push(e);
            }
        }

        tracing::info!("🚀 Starting services {:?}", self.group.definitions);
        match self.controller.up(&self.group, &self.up_flags).await {
            Ok(()) if self.up_flags.detach => self.mark_running(),
            Ok(()) => tracing::info!("Attached compose session exited"),
            Err(e) => {
                tracing::error!("Starting services failed: {}", e);
                errors.push(e);
            }
        }

        errors
    }

    pub fn mark_running(&self) {
        self.state.send_if_modified(|state| {
            if *state == LifecycleState::Starting {
                *state = LifecycleState::Running;
                true
            } else {
                false
            }
        });
    }

    pub async fn stop(&self) -> Result<()> {
        self.state.send_replace(LifecycleState::Stopping);
        tracing::info!("🧹 Tearing down services {:?}", self.group.definitions);
        let result = self.controller.down(&self.group, &self.down_flags).await;
        self.state.send_replace(LifecycleState::Stopped);
        result
    }
}

#[async_trait]
impl<C: ServiceController + 'static> StatusSource for EnvironmentController<C> {
    async fn status(&self) -> Result<String> {
        self.controller.ps(&self.group).await.map_err(|e| {
            // Early in startup the services may not exist yet.
            tracing::warn!("Status query failed: {}", e);
            e
        })
    }
}

/// What teardown observed.
#[derive(Debug, Default)]
pub struct TeardownReport {
    pub stop_error: Option<HarnessError>,
    pub start_errors: Vec<HarnessError>,
    pub start_task_aborted: bool,
}

/// Scoped ownership of a started service group.
///
/// `release` consumes the lease, so teardown runs at most once through it.
/// Dropping an unreleased lease schedules teardown on the current runtime.
pub struct EnvironmentLease<C: ServiceController + 'static> {
    environment: Option<Arc<EnvironmentController<C>>>,
    start_task: Option<JoinHandle<Vec<HarnessError>>>,
    start_grace: Duration,
}

impl<C: ServiceController + 'static> EnvironmentLease<C> {
    /// Settles the start task before `down`, so a slow `up` cannot bring
    /// services back after they were torn down.
    pub async fn release(mut self) -> TeardownReport {
        let mut report = TeardownReport::default();

        if let Some(mut task) = self.start_task.take() {
            match tokio::time::timeout(self.start_grace, &mut task).await {
                Ok(Ok(errors)) => report.start_errors = errors,
                Ok(Err(join_error)) => report.start_errors.push(HarnessError::TaskError {
                    message: format!("start task failed: {}", join_error),
                }),
                Err(_) => {
                    tracing::warn!(
                        "Start task still running after {:?}, aborting it before teardown",
                        self.start_grace
                    );
                    // kill_on_drop takes the compose child down with the task
                    task.abort();
                    let _ = task.await;
                    report.start_task_aborted = true;
                }
            }
        }

        if let Some(environment) = self.environment.take() {
            report.stop_error = environment.stop().await.err();
        }

        report
    }
}

impl<C: ServiceController + 'static> Drop for EnvironmentLease<C> {
    fn drop(&mut self) {
        if let Some(task) = self.start_task.take() {
            task.abort();
        }
        if let Some(environment) = self.environment.take() {
            tracing::warn!("Environment lease dropped without release, scheduling teardown");
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    handle.spawn(async move {
                        if let Err(e) = environment.stop().await {
                            tracing::error!("Teardown after dropped lease failed: {}", e);
                        }
                    });
                }
                Err(_) => tracing::error!("No runtime available, services were left running"),
            }
        }
    }
}
