use crate::domain::model::{DownFlags, ServiceGroup, UpFlags};
use crate::utils::error::{HarnessError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    pub environment: EnvironmentConfig,
    pub readiness: ReadinessConfig,
    pub api: ApiConfig,
    pub catalog: CatalogConfig,
    pub install: InstallConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    /// Program plus leading arguments, e.g. `["docker", "compose"]`.
    pub command: Vec<String>,
    pub files: Vec<String>,
    /// Files used for `pull`; falls back to `files` when absent.
    pub pull_files: Option<Vec<String>>,
    pub working_dir: Option<String>,
    pub pull: bool,
    pub force_recreate: bool,
    pub remove_orphans: bool,
    pub build: bool,
    pub detach: bool,
    pub remove_volumes: bool,
    pub start_grace_seconds: u64,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            command: vec!["docker-compose".to_string()],
            files: vec!["snapshot.yml".to_string(), "local.yml".to_string()],
            pull_files: Some(vec!["snapshot.yml".to_string()]),
            working_dir: Some("environments".to_string()),
            pull: true,
            force_recreate: true,
            remove_orphans: true,
            build: true,
            detach: true,
            remove_volumes: true,
            start_grace_seconds: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadinessConfig {
    pub required_healthy: usize,
    pub marker: String,
    pub interval_ms: u64,
    pub max_attempts: u32,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            required_healthy: 3,
            marker: "healthy".to_string(),
            interval_ms: 1000,
            max_attempts: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub kibana_url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub xsrf_header: String,
    pub xsrf_value: String,
    pub setup_path: String,
    pub install_path: String,
    pub request_timeout_seconds: Option<u64>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            kibana_url: "http://localhost:5601".to_string(),
            username: Some("elastic".to_string()),
            password: Some("changeme".to_string()),
            xsrf_header: "kbn-xsrf".to_string(),
            xsrf_value: "ingest_manager".to_string(),
            setup_path: "/api/ingest_manager/setup".to_string(),
            install_path: "/api/ingest_manager/epm/packages".to_string(),
            request_timeout_seconds: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub url: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8080/search".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallConfig {
    pub concurrency: usize,
    pub item_timeout_seconds: Option<u64>,
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            concurrency: 8,
            item_timeout_seconds: None,
        }
    }
}

impl HarnessConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(HarnessError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| HarnessError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${KIBANA_PASSWORD})
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| HarnessError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        let env = &self.environment;
        match env.command.first() {
            Some(program) => validation::validate_non_empty("environment.command", program)?,
            None => {
                return Err(HarnessError::MissingConfigError {
                    field: "environment.command".to_string(),
                })
            }
        }
        if env.files.is_empty() {
            return Err(HarnessError::MissingConfigError {
                field: "environment.files".to_string(),
            });
        }
        validation::validate_compose_files("environment.files", &env.files)?;
        if let Some(pull_files) = &env.pull_files {
            validation::validate_compose_files("environment.pull_files", pull_files)?;
        }
        if let Some(dir) = &env.working_dir {
            validation::validate_working_dir("environment.working_dir", Path::new(dir))?;
        }

        validation::validate_at_least(
            "readiness.required_healthy",
            self.readiness.required_healthy,
            1,
        )?;
        validation::validate_at_least(
            "readiness.max_attempts",
            self.readiness.max_attempts as usize,
            1,
        )?;
        validation::validate_non_empty("readiness.marker", &self.readiness.marker)?;

        validation::validate_url("api.kibana_url", &self.api.kibana_url)?;
        validation::validate_non_empty("api.xsrf_header", &self.api.xsrf_header)?;
        validation::validate_api_path("api.setup_path", &self.api.setup_path)?;
        validation::validate_api_path("api.install_path", &self.api.install_path)?;
        if self.api.password.is_some() && self.api.username.is_none() {
            return Err(HarnessError::MissingConfigError {
                field: "api.username".to_string(),
            });
        }

        validation::validate_url("catalog.url", &self.catalog.url)?;
        validation::validate_at_least("install.concurrency", self.install.concurrency, 1)?;

        Ok(())
    }

    pub fn service_group(&self) -> ServiceGroup {
        ServiceGroup::new(self.environment.files.iter().map(PathBuf::from).collect())
            .with_working_dir(self.environment.working_dir.as_ref().map(PathBuf::from))
    }

    pub fn pull_group(&self) -> ServiceGroup {
        match &self.environment.pull_files {
            Some(files) => ServiceGroup::new(files.iter().map(PathBuf::from).collect())
                .with_working_dir(self.environment.working_dir.as_ref().map(PathBuf::from)),
            None => self.service_group(),
        }
    }

    pub fn up_flags(&self) -> UpFlags {
        UpFlags {
            force_recreate: self.environment.force_recreate,
            remove_orphans: self.environment.remove_orphans,
            build: self.environment.build,
            detach: self.environment.detach,
        }
    }

    pub fn down_flags(&self) -> DownFlags {
        DownFlags {
            volumes: self.environment.remove_volumes,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.readiness.interval_ms)
    }

    pub fn start_grace(&self) -> Duration {
        Duration::from_secs(self.environment.start_grace_seconds)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.api.request_timeout_seconds.map(Duration::from_secs)
    }

    pub fn item_timeout(&self) -> Option<Duration> {
        self.install.item_timeout_seconds.map(Duration::from_secs)
    }
}

impl Validate for HarnessConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
