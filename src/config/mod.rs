//! Configuration module for the floor price estimator.
//!
//! Configuration comes from environment variables by default, organized by
//! concern: Model and Observability. A TOML file with the same sections can
//! replace the environment entirely.

mod model_config;
mod observability_config;

pub use model_config::ModelEnvConfig;
pub use observability_config::ObservabilityEnvConfig;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub model: ModelEnvConfig,
    pub observability: ObservabilityEnvConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            model: ModelEnvConfig::from_env().context("Failed to load model config")?,
            observability: ObservabilityEnvConfig::from_env()
                .context("Failed to load observability config")?,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config TOML")
    }

    /// Loads configuration from a TOML file; missing keys take defaults.
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml_str(&content).context(format!("Invalid config file: {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_toml_sections_override_defaults() {
        let config = Config::from_toml_str(
            r#"
            [model]
            model_path = "/srv/models/floor"
            timeout_ms = 25

            [observability]
            metrics_enabled = false
            "#,
        )
        .unwrap();

        assert_eq!(config.model.model_path, PathBuf::from("/srv/models/floor"));
        assert_eq!(config.model.timeout_ms, 25);
        assert_eq!(config.model.output_node, "Squeeze:0");
        assert!(!config.observability.metrics_enabled);
        assert_eq!(config.observability.metrics_prefix, "floor_estimator");
    }

    #[test]
    fn test_empty_toml_is_default() {
        assert_eq!(Config::from_toml_str("").unwrap(), Config::default());
    }

    #[test]
    fn test_malformed_toml_is_an_error() {
        assert!(Config::from_toml_str("[model\nmodel_path = ").is_err());
    }
}
