use crate::config::HarnessConfig;
use crate::domain::model::PollOutcome;
use crate::domain::ports::StatusSource;
use std::time::Duration;

/// Bounded, best-effort wait for a number of services to report healthy.
#[derive(Debug, Clone)]
pub struct ReadinessPoller {
    required_healthy: usize,
    marker: String,
    interval: Duration,
    max_attempts: u32,
}

impl ReadinessPoller {
    pub fn new(required_healthy: usize, interval: Duration, max_attempts: u32) -> Self {
        Self {
            required_healthy,
            marker: "healthy".to_string(),
            interval,
            max_attempts,
        }
    }

    pub fn from_config(config: &HarnessConfig) -> Self {
        Self::new(
            config.readiness.required_healthy,
            config.poll_interval(),
            config.readiness.max_attempts,
        )
        .with_marker(&config.readiness.marker)
    }

    pub fn with_marker(mut self, marker: &str) -> Self {
        self.marker = marker.to_string();
        self
    }

    /// Plain substring count, the same way the status text is scanned by eye.
    pub fn count_healthy(&self, status: &str) -> usize {
        status.matches(self.marker.as_str()).count()
    }

    /// Never fails: giving up after `max_attempts` is reported as
    /// `PollOutcome::TimedOut` and the caller carries on.
    pub async fn wait_until_ready<S: StatusSource + ?Sized>(&self, source: &S) -> PollOutcome {
        tracing::info!(
            "⏳ Waiting for {} services to report '{}' (max {} attempts, every {:?})",
            self.required_healthy,
            self.marker,
            self.max_attempts,
            self.interval
        );

        for attempt in 1..=self.max_attempts {
            // 查詢失敗視為尚未就緒
            let healthy = match source.status().await {
                Ok(output) => self.count_healthy(&output),
                Err(_) => 0,
            };
            tracing::debug!(
                "Readiness attempt {}/{}: {} healthy",
                attempt,
                self.max_attempts,
                healthy
            );

            if healthy == self.required_healthy {
                tracing::info!("✅ Services ready after {} attempts", attempt);
                return PollOutcome::Ready { attempts: attempt };
            }

            if attempt < self.max_attempts {
                tokio::time::sleep(self.interval).await;
            }
        }

        tracing::warn!(
            "⚠️ Services not ready after {} attempts, continuing anyway",
            self.max_attempts
        );
        PollOutcome::TimedOut {
            attempts: self.max_attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::{HarnessError, Result};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Replays a script of status results, repeating the last one.
    struct ScriptedStatus {
        script: Mutex<Vec<Option<String>>>,
        calls: AtomicUsize,
    }

    impl ScriptedStatus {
        fn new(script: Vec<Option<&str>>) -> Self {
            Self {
                script: Mutex::new(script.into_iter().map(|s| s.map(String::from)).collect()),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl StatusSource for ScriptedStatus {
        async fn status(&self) -> Result<String> {
            let index = self.calls.fetch_add(1, Ordering::SeqCst);
            let script = self.script.lock().unwrap();
            let entry = script.get(index).or(script.last()).cloned().flatten();
            entry.ok_or_else(|| HarnessError::CommandFailed {
                command: "ps".to_string(),
                code: Some(1),
            })
        }
    }

    const THREE_HEALTHY: &str = "es   Up (healthy)\nkibana   Up (healthy)\nregistry   Up (healthy)";

    fn poller(max_attempts: u32) -> ReadinessPoller {
        ReadinessPoller::new(3, Duration::from_millis(1), max_attempts)
    }

    #[test]
    fn test_count_healthy() {
        let poller = poller(1);
        assert_eq!(poller.count_healthy(THREE_HEALTHY), 3);
        assert_eq!(poller.count_healthy("es Up (health: starting)"), 0);
        assert_eq!(poller.count_healthy(""), 0);
    }

    #[tokio::test]
    async fn test_stops_as_soon_as_count_matches() {
        let source = ScriptedStatus::new(vec![
            Some("es Up (health: starting)"),
            Some("es Up (healthy)\nkibana Up (health: starting)"),
            Some(THREE_HEALTHY),
        ]);

        let outcome = poller(300).wait_until_ready(&source).await;

        assert_eq!(outcome, PollOutcome::Ready { attempts: 3 });
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_exactly_max_attempts() {
        let source = ScriptedStatus::new(vec![Some("es Up (healthy)")]);

        let outcome = poller(5).wait_until_ready(&source).await;

        assert_eq!(outcome, PollOutcome::TimedOut { attempts: 5 });
        assert!(!outcome.is_ready());
        assert_eq!(source.calls(), 5);
    }

    #[tokio::test]
    async fn test_status_errors_count_as_not_ready() {
        let source = ScriptedStatus::new(vec![None, None, Some(THREE_HEALTHY)]);

        let outcome = poller(10).wait_until_ready(&source).await;

        assert_eq!(outcome, PollOutcome::Ready { attempts: 3 });
    }

    #[tokio::test]
    async fn test_more_than_required_is_not_ready() {
        let source = ScriptedStatus::new(vec![Some("healthy healthy healthy healthy")]);

        let outcome = poller(3).wait_until_ready(&source).await;

        assert_eq!(outcome, PollOutcome::TimedOut { attempts: 3 });
    }

    #[tokio::test]
    async fn test_custom_marker() {
        let source = ScriptedStatus::new(vec![Some("a running\nb running")]);

        let outcome = ReadinessPoller::new(2, Duration::from_millis(1), 2)
            .with_marker("running")
            .wait_until_ready(&source)
            .await;

        assert!(outcome.is_ready());
    }
}
