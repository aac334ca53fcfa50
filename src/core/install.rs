use crate::adapters::http::ApiClient;
use crate::config::HarnessConfig;
use crate::domain::model::InstallOutcome;
use crate::utils::error::ErrorCategory;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Installs every catalog item concurrently and reports one outcome per key.
#[derive(Debug, Clone)]
pub struct InstallVerifier {
    api: ApiClient,
    concurrency: usize,
    item_timeout: Option<Duration>,
}

impl InstallVerifier {
    pub fn new(api: ApiClient, concurrency: usize) -> Self {
        Self {
            api,
            // A zero-permit semaphore would never let a check start.
            concurrency: concurrency.max(1),
            item_timeout: None,
        }
    }

    pub fn from_config(api: ApiClient, config: &HarnessConfig) -> Self {
        Self::new(api, config.install.concurrency).with_item_timeout(config.item_timeout())
    }

    pub fn with_item_timeout(mut self, item_timeout: Option<Duration>) -> Self {
        self.item_timeout = item_timeout;
        self
    }

    /// Returns once every check has finished, in the order of `keys`.
    pub async fn verify_all(&self, keys: Vec<String>) -> Vec<InstallOutcome> {
        tracing::info!(
            "🔍 Verifying {} package installs ({} at a time)",
            keys.len(),
            self.concurrency
        );
        let semaphore = Arc::new(Semaphore::new(self.concurrency));

        let handles: Vec<_> = keys
            .into_iter()
            .map(|key| {
                let api = self.api.clone();
                let semaphore = Arc::clone(&semaphore);
                let item_timeout = self.item_timeout;
                let task_key = key.clone();
                let handle = tokio::spawn(async move {
                    let _permit = match semaphore.acquire_owned().await {
                        Ok(permit) => permit,
                        Err(e) => {
                            return InstallOutcome::failed(
                                task_key,
                                None,
                                ErrorCategory::Internal,
                                e.to_string(),
                            )
                        }
                    };
                    match item_timeout {
                        Some(limit) => {
                            match tokio::time::timeout(limit, check_install(&api, &task_key)).await
                            {
                                Ok(outcome) => outcome,
                                Err(_) => InstallOutcome::failed(
                                    task_key,
                                    None,
                                    ErrorCategory::Internal,
                                    format!("install did not finish within {:?}", limit),
                                ),
                            }
                        }
                        None => check_install(&api, &task_key).await,
                    }
                });
                (key, handle)
            })
            .collect();

        let mut outcomes = Vec::with_capacity(handles.len());
        for (key, handle) in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(join_error) => InstallOutcome::failed(
                    key,
                    None,
                    ErrorCategory::Internal,
                    format!("install check aborted: {}", join_error),
                ),
            };
            outcomes.push(outcome);
        }

        let passed = outcomes.iter().filter(|o| o.passed()).count();
        tracing::info!("🔍 {}/{} packages installed", passed, outcomes.len());
        outcomes
    }
}

/// One install round trip; owns its own request and response.
pub async fn check_install(api: &ApiClient, key: &str) -> InstallOutcome {
    match api.post_install(key).await {
        Ok(response) if response.status == 200 => {
            tracing::info!("✅ {}", key);
            tracing::debug!("{} install response: {}", key, response.body);
            InstallOutcome {
                key: key.to_string(),
                status: Some(response.status),
                category: None,
                error: None,
            }
        }
        Ok(response) => {
            tracing::debug!("{} install response: {}", key, response.body);
            InstallOutcome::failed(
                key.to_string(),
                Some(response.status),
                ErrorCategory::Assertion,
                format!("expected status 200, got {}", response.status),
            )
        }
        Err(e) => InstallOutcome::failed(key.to_string(), None, e.category(), e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn api_for(server: &MockServer) -> ApiClient {
        let mut config = HarnessConfig::default();
        config.api.kibana_url = server.base_url();
        ApiClient::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_empty_key_list() {
        let server = MockServer::start();
        let outcomes = InstallVerifier::new(api_for(&server), 4)
            .verify_all(Vec::new())
            .await;
        assert!(outcomes.is_empty());
    }

    #[tokio::test]
    async fn test_outcomes_follow_key_order() {
        let server = MockServer::start();
        let mocks: Vec<_> = ["a-1.0.0", "b-1.0.0", "c-1.0.0"]
            .iter()
            .map(|key| {
                server.mock(|when, then| {
                    when.method(POST)
                        .path(format!("/api/ingest_manager/epm/packages/{}", key))
                        .header("kbn-xsrf", "ingest_manager");
                    then.status(200).body("{}");
                })
            })
            .collect();

        let keys = vec![
            "a-1.0.0".to_string(),
            "b-1.0.0".to_string(),
            "c-1.0.0".to_string(),
        ];
        let outcomes = InstallVerifier::new(api_for(&server), 2)
            .verify_all(keys.clone())
            .await;

        for mock in &mocks {
            mock.assert();
        }
        let seen: Vec<_> = outcomes.iter().map(|o| o.key.clone()).collect();
        assert_eq!(seen, keys);
        assert!(outcomes.iter().all(InstallOutcome::passed));
    }

    #[tokio::test]
    async fn test_item_timeout() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST)
                .path("/api/ingest_manager/epm/packages/slow-1.0.0");
            then.status(200).delay(Duration::from_secs(2));
        });

        let outcomes = InstallVerifier::new(api_for(&server), 1)
            .with_item_timeout(Some(Duration::from_millis(100)))
            .verify_all(vec!["slow-1.0.0".to_string()])
            .await;

        assert_eq!(outcomes.len(), 1);
        assert!(!outcomes[0].passed());
        assert_eq!(outcomes[0].status, None);
        assert_eq!(outcomes[0].category, Some(ErrorCategory::Internal));
        assert!(outcomes[0]
            .error
            .as_deref()
            .unwrap()
            .contains("did not finish"));
    }

    fn mock_slow_installs(server: &MockServer, keys: &[String], delay: Duration) {
        for key in keys {
            server.mock(|when, then| {
                when.method(POST)
                    .path(format!("/api/ingest_manager/epm/packages/{}", key));
                then.status(200).delay(delay);
            });
        }
    }

    fn package_keys(count: usize) -> Vec<String> {
        (0..count).map(|i| format!("pkg{}-1.0.0", i)).collect()
    }

    #[tokio::test]
    async fn test_checks_run_concurrently() {
        let server = MockServer::start();
        let keys = package_keys(4);
        let delay = Duration::from_millis(400);
        mock_slow_installs(&server, &keys, delay);

        let started = std::time::Instant::now();
        let outcomes = InstallVerifier::new(api_for(&server), 4)
            .verify_all(keys)
            .await;
        let elapsed = started.elapsed();

        assert!(outcomes.iter().all(InstallOutcome::passed));
        // Sequential checks would need 1.6s.
        assert!(elapsed < delay * 3, "took {:?}", elapsed);
    }

    #[tokio::test]
    async fn test_concurrency_limit_serializes_checks() {
        let server = MockServer::start();
        let keys = package_keys(3);
        let delay = Duration::from_millis(200);
        mock_slow_installs(&server, &keys, delay);

        let started = std::time::Instant::now();
        let outcomes = InstallVerifier::new(api_for(&server), 1)
            .verify_all(keys)
            .await;
        let elapsed = started.elapsed();

        assert!(outcomes.iter().all(InstallOutcome::passed));
        assert!(elapsed >= delay * 3, "took {:?}", elapsed);
    }

    #[tokio::test]
    async fn test_failure_categories() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST)
                .path("/api/ingest_manager/epm/packages/redis-6.0.0");
            then.status(500);
        });

        let outcome = check_install(&api_for(&server), "redis-6.0.0").await;
        assert_eq!(outcome.status, Some(500));
        assert_eq!(outcome.category, Some(ErrorCategory::Assertion));

        let mut config = HarnessConfig::default();
        config.api.kibana_url = "http://127.0.0.1:9".to_string();
        let unreachable = ApiClient::new(&config).unwrap();
        let outcome = check_install(&unreachable, "redis-6.0.0").await;
        assert_eq!(outcome.status, None);
        assert_eq!(outcome.category, Some(ErrorCategory::Transport));
    }

    #[test]
    fn test_zero_concurrency_is_clamped() {
        let verifier = InstallVerifier::new(ApiClient::new(&HarnessConfig::default()).unwrap(), 0);
        assert_eq!(verifier.concurrency, 1);
    }
}
