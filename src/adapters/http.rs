use crate::config::HarnessConfig;
use crate::utils::error::Result;
use reqwest::{Client, RequestBuilder};

/// Status and fully read body of a finished request.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

/// Thin wrapper over the setup/install API and the registry search endpoint.
/// Cloning is cheap: the underlying connection pool is shared.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    kibana_url: String,
    catalog_url: String,
    username: Option<String>,
    password: Option<String>,
    xsrf_header: String,
    xsrf_value: String,
    setup_path: String,
    install_path: String,
}

impl ApiClient {
    pub fn new(config: &HarnessConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            kibana_url: config.api.kibana_url.trim_end_matches('/').to_string(),
            catalog_url: config.catalog.url.clone(),
            username: config.api.username.clone(),
            password: config.api.password.clone(),
            xsrf_header: config.api.xsrf_header.clone(),
            xsrf_value: config.api.xsrf_value.clone(),
            setup_path: config.api.setup_path.clone(),
            install_path: config.api.install_path.trim_end_matches('/').to_string(),
        })
    }

    pub fn setup_url(&self) -> String {
        format!("{}{}", self.kibana_url, self.setup_path)
    }

    pub fn install_url(&self, key: &str) -> String {
        format!("{}{}/{}", self.kibana_url, self.install_path, key)
    }

    pub fn catalog_url(&self) -> &str {
        &self.catalog_url
    }

    pub async fn post_setup(&self) -> Result<ApiResponse> {
        let request = self.authorized_post(&self.setup_url());
        Self::execute(request).await
    }

    pub async fn post_install(&self, key: &str) -> Result<ApiResponse> {
        let request = self.authorized_post(&self.install_url(key));
        Self::execute(request).await
    }

    pub async fn get_catalog(&self) -> Result<ApiResponse> {
        Self::execute(self.client.get(&self.catalog_url)).await
    }

    fn authorized_post(&self, url: &str) -> RequestBuilder {
        let mut request = self
            .client
            .post(url)
            .header(self.xsrf_header.as_str(), self.xsrf_value.as_str());
        if let Some(username) = &self.username {
            request = request.basic_auth(username, self.password.as_ref());
        }
        request
    }

    /// The response is consumed here, so its connection goes back to the pool
    /// whether or not the body read succeeds.
    async fn execute(request: RequestBuilder) -> Result<ApiResponse> {
        let response = request.send().await?;
        let status = response.status().as_u16();
        tracing::debug!("{} -> {}", response.url(), status);
        let body = response.text().await?;
        Ok(ApiResponse { status, body })
    }
}
