use crate::adapters::http::ApiClient;
use crate::utils::error::{HarnessError, Result};

pub const EXPECTED_STATUS: u16 = 200;

/// Fires the one-shot setup call.
///
/// Both a transport error and a non-200 answer come back as `Err`; the caller
/// records it and moves on, setup failures never stop the run.
pub async fn invoke_setup(api: &ApiClient) -> Result<()> {
    tracing::info!("🔧 Running setup: POST {}", api.setup_url());
    let response = api.post_setup().await?;
    tracing::debug!("Setup response body: {}", response.body);

    if response.status != EXPECTED_STATUS {
        return Err(HarnessError::UnexpectedStatus {
            endpoint: api.setup_url(),
            expected: EXPECTED_STATUS,
            actual: response.status,
        });
    }

    tracing::info!("✅ Setup completed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HarnessConfig;
    use httpmock::prelude::*;

    fn api_for(server: &MockServer) -> ApiClient {
        let mut config = HarnessConfig::default();
        config.api.kibana_url = server.base_url();
        ApiClient::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_setup_ok() {
        let server = MockServer::start();
        let setup_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/api/ingest_manager/setup")
                .header("kbn-xsrf", "ingest_manager");
            then.status(200).body("{}");
        });

        invoke_setup(&api_for(&server)).await.unwrap();

        setup_mock.assert();
    }

    #[tokio::test]
    async fn test_setup_non_200_is_assertion_failure() {
        let server = MockServer::start();
        let setup_mock = server.mock(|when, then| {
            when.method(POST).path("/api/ingest_manager/setup");
            then.status(503).body("Kibana server is not ready yet");
        });

        let err = invoke_setup(&api_for(&server)).await.unwrap_err();

        setup_mock.assert();
        match err {
            HarnessError::UnexpectedStatus { actual, .. } => assert_eq!(actual, 503),
            other => panic!("unexpected error: {other}"),
        }
    }
}
