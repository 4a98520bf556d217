//! CLI argument definitions and dispatch.

pub mod dive;

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use pkgdive_common::config::DiveConfig;
use pkgdive_common::types::Platform;

/// pkgdive: plan a sparse pull of a registry-hosted package.
#[derive(Parser, Debug)]
#[command(name = "pkgdive", version, about, long_about = None)]
pub struct Cli {
    /// Package source, e.g. `oci://ghcr.io/org/package:1.0.0`.
    pub source: String,

    /// Components to pull in addition to the required ones.
    #[arg(long, value_delimiter = ',')]
    pub components: Vec<String>,

    /// YAML configuration file.
    #[arg(long, env = "PKGDIVE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Talk to the registry over plain HTTP.
    #[arg(long, env = "PKGDIVE_PLAIN_HTTP")]
    pub plain_http: bool,

    /// Platform of the package root to inspect (`os/arch[/variant]`).
    #[arg(long, env = "PKGDIVE_PLATFORM")]
    pub platform: Option<Platform>,

    /// Registry username.
    #[arg(long, env = "PKGDIVE_USERNAME")]
    pub username: Option<String>,

    /// Registry password or token.
    #[arg(long, env = "PKGDIVE_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Print the plan as a JSON array of descriptors.
    #[arg(long)]
    pub json: bool,

    /// Diagnostic log format on stderr.
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

/// Diagnostic log formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    Text,
    /// One JSON object per event.
    Json,
}

impl Cli {
    /// Builds the effective configuration: file first, then flags and environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file cannot be loaded or the
    /// merged configuration is invalid.
    pub fn load_config(&self) -> anyhow::Result<DiveConfig> {
        let mut config = match &self.config {
            Some(path) => DiveConfig::load(path)?,
            None => DiveConfig::default(),
        };
        if self.plain_http {
            config.plain_http = true;
        }
        if let Some(platform) = &self.platform {
            config.platform = platform.clone();
        }
        if self.username.is_some() {
            config.username.clone_from(&self.username);
        }
        if self.password.is_some() {
            config.password.clone_from(&self.password);
        }
        config.validate()?;
        Ok(config)
    }
}

/// Runs the CLI.
///
/// # Errors
///
/// Returns an error if configuration, registry access, or planning fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    dive::execute(&cli)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn components_split_on_commas() {
        let cli = Cli::parse_from([
            "pkgdive",
            "oci://r.io/p:1",
            "--components",
            "a,b",
            "--components",
            "c",
        ]);
        assert_eq!(cli.components, vec!["a", "b", "c"]);
    }

    #[test]
    fn flags_override_config_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("pkgdive.yaml");
        std::fs::write(&path, "retries: 7\nplatform:\n  os: linux\n  architecture: amd64\n")
            .expect("write");
        let cli = Cli::parse_from([
            "pkgdive",
            "oci://r.io/p:1",
            "--config",
            path.to_str().expect("utf8 path"),
            "--platform",
            "linux/arm64",
            "--plain-http",
        ]);

        let config = cli.load_config().expect("config");
        assert_eq!(config.retries, 7);
        assert_eq!(config.platform.architecture, "arm64");
        assert!(config.plain_http);
    }

    #[test]
    fn password_without_username_is_rejected() {
        let cli = Cli::parse_from(["pkgdive", "oci://r.io/p:1", "--password", "secret"]);
        assert!(cli.load_config().is_err());
    }

    #[test]
    fn log_format_defaults_to_text() {
        let cli = Cli::parse_from(["pkgdive", "oci://r.io/p:1"]);
        assert_eq!(cli.log_format, LogFormat::Text);
        assert!(cli.components.is_empty());
    }
}
