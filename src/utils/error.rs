use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Catalog decode error: {source}")]
    CatalogDecodeError { source: serde_json::Error },

    #[error("Unexpected status from {endpoint}: expected {expected}, got {actual}")]
    UnexpectedStatus {
        endpoint: String,
        expected: u16,
        actual: u16,
    },

    #[error("Command `{command}` failed with exit code {code:?}")]
    CommandFailed { command: String, code: Option<i32> },

    #[error("Background task failed: {message}")]
    TaskError { message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Transport,
    Assertion,
    Decode,
    Environment,
    Configuration,
    Internal,
}

impl HarnessError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            HarnessError::HttpError(_) => ErrorCategory::Transport,
            HarnessError::UnexpectedStatus { .. } => ErrorCategory::Assertion,
            HarnessError::CatalogDecodeError { .. } => ErrorCategory::Decode,
            HarnessError::IoError(_) | HarnessError::CommandFailed { .. } => {
                ErrorCategory::Environment
            }
            HarnessError::ConfigError { .. }
            | HarnessError::ConfigValidationError { .. }
            | HarnessError::InvalidConfigValueError { .. }
            | HarnessError::MissingConfigError { .. } => ErrorCategory::Configuration,
            HarnessError::SerializationError(_) | HarnessError::TaskError { .. } => {
                ErrorCategory::Internal
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Transport => format!("Could not reach the service: {}", self),
            ErrorCategory::Assertion => format!("Service answered unexpectedly: {}", self),
            ErrorCategory::Decode => format!("Package catalog is malformed: {}", self),
            ErrorCategory::Environment => format!("Environment command failed: {}", self),
            ErrorCategory::Configuration => format!("Invalid configuration: {}", self),
            ErrorCategory::Internal => format!("Internal harness error: {}", self),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Transport => {
                "Check that the services are up and the configured URLs are reachable"
            }
            ErrorCategory::Assertion => "Inspect the service logs for the failing request",
            ErrorCategory::Decode => "Verify the registry search endpoint returns a JSON array",
            ErrorCategory::Environment => {
                "Make sure the compose tool is installed and the definition files exist"
            }
            ErrorCategory::Configuration => "Fix the configuration file and run again",
            ErrorCategory::Internal => "Re-run with --verbose and report the log output",
        }
    }
}

pub type Result<T> = std::result::Result<T, HarnessError>;
