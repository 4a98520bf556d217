//! Runtime configuration for registry access.
//!
//! Values come from defaults, an optional YAML file, and CLI flags or
//! environment variables, in that order of precedence (last wins).

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DiveError, Result};
use crate::types::Platform;

/// Default number of retries for transient registry failures.
pub const DEFAULT_RETRIES: u32 = 3;

/// Default first wait between retries, in milliseconds.
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 250;

/// Default per-request timeout, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default cap on the size of decoded documents (manifests, index, package manifest).
pub const DEFAULT_MAX_DOCUMENT_BYTES: u64 = 16 * 1024 * 1024;

/// Root configuration for pkgdive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiveConfig {
    /// Talk to the registry over plain HTTP.
    pub plain_http: bool,
    /// Retries for transport errors, `429`, and `5xx` responses.
    pub retries: u32,
    /// First wait between retries; later waits grow exponentially.
    pub retry_backoff_ms: u64,
    /// Per-request timeout.
    pub timeout_secs: u64,
    /// Largest document the transport will download and decode.
    pub max_document_bytes: u64,
    /// Platform used to pick a root manifest from a multi-platform package.
    pub platform: Platform,
    /// Registry username.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Registry password or token.
    #[serde(skip_serializing)]
    pub password: Option<String>,
}

impl Default for DiveConfig {
    fn default() -> Self {
        Self {
            plain_http: false,
            retries: DEFAULT_RETRIES,
            retry_backoff_ms: DEFAULT_RETRY_BACKOFF_MS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_document_bytes: DEFAULT_MAX_DOCUMENT_BYTES,
            platform: Platform::host(),
            username: None,
            password: None,
        }
    }
}

impl DiveConfig {
    /// Loads a configuration file, filling missing fields with defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid YAML.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| DiveError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns `DiveError::Config` if a password is set without a username,
    /// or if the timeout or document cap is zero.
    pub fn validate(&self) -> Result<()> {
        if self.password.is_some() && self.username.is_none() {
            return Err(DiveError::Config {
                message: "password is set but username is missing".into(),
            });
        }
        if self.timeout_secs == 0 {
            return Err(DiveError::Config {
                message: "timeout_secs must be greater than zero".into(),
            });
        }
        if self.max_document_bytes == 0 {
            return Err(DiveError::Config {
                message: "max_document_bytes must be greater than zero".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = DiveConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.retries, DEFAULT_RETRIES);
        assert!(!config.plain_http);
    }

    #[test]
    fn load_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let path = dir.path().join("pkgdive.yaml");
        std::fs::write(
            &path,
            "plain_http: true\nretries: 0\nplatform:\n  os: linux\n  architecture: arm64\n",
        )
        .expect("write");

        let config = DiveConfig::load(&path).expect("load failed");
        assert!(config.plain_http);
        assert_eq!(config.retries, 0);
        assert_eq!(config.platform.architecture, "arm64");
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn load_missing_file_returns_io_error() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let result = DiveConfig::load(&dir.path().join("missing.yaml"));
        assert!(matches!(result, Err(DiveError::Io { .. })));
    }

    #[test]
    fn load_rejects_password_without_username() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let path = dir.path().join("pkgdive.yaml");
        std::fs::write(&path, "password: hunter2\n").expect("write");
        assert!(matches!(
            DiveConfig::load(&path),
            Err(DiveError::Config { .. })
        ));
    }

    #[test]
    fn load_rejects_malformed_yaml() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let path = dir.path().join("pkgdive.yaml");
        std::fs::write(&path, "retries: [not, a, number]\n").expect("write");
        assert!(matches!(DiveConfig::load(&path), Err(DiveError::Yaml { .. })));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let config = DiveConfig {
            timeout_secs: 0,
            ..DiveConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
