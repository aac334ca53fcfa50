use crate::utils::error::{HarnessError, Result};
use std::path::Path;
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

fn invalid(field: &str, value: impl ToString, reason: impl Into<String>) -> HarnessError {
    HarnessError::InvalidConfigValueError {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

/// Only plain HTTP(S) endpoints are reachable through the API client.
pub fn validate_url(field: &str, value: &str) -> Result<()> {
    let url = Url::parse(value).map_err(|e| invalid(field, value, format!("Invalid URL: {}", e)))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(invalid(field, value, format!("Unsupported URL scheme: {}", scheme))),
    }
}

/// Request paths are joined onto a base URL, so they must be absolute.
pub fn validate_api_path(field: &str, path: &str) -> Result<()> {
    if path.starts_with('/') {
        Ok(())
    } else {
        Err(invalid(field, path, "Path must start with '/'"))
    }
}

pub fn validate_working_dir(field: &str, dir: &Path) -> Result<()> {
    if dir.as_os_str().is_empty() {
        return Err(invalid(field, dir.display(), "Directory cannot be empty"));
    }
    Ok(())
}

pub fn validate_at_least(field: &str, value: usize, min: usize) -> Result<()> {
    if value < min {
        return Err(invalid(field, value, format!("Value must be at least {}", min)));
    }
    Ok(())
}

/// Compose definitions are YAML; anything else is almost certainly a typo.
pub fn validate_compose_files(field: &str, files: &[String]) -> Result<()> {
    for file in files {
        match Path::new(file).extension().and_then(|ext| ext.to_str()) {
            Some("yml") | Some("yaml") => {}
            Some(ext) => {
                return Err(invalid(
                    field,
                    file,
                    format!("Expected a .yml or .yaml file, got .{}", ext),
                ))
            }
            None => return Err(invalid(field, file, "Compose file has no extension")),
        }
    }
    Ok(())
}

pub fn validate_non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(invalid(field, value, "Value cannot be blank"));
    }
    Ok(())
}
