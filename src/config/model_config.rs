//! Model configuration parsing from environment variables.
//!
//! This module handles the model location, the graph node names and the
//! prediction time budget.

use crate::domain::ports::ModelSignature;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Model environment configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelEnvConfig {
    /// Model file, or a directory of numbered versions
    pub model_path: PathBuf,
    pub input_node: String,
    pub output_node: String,
    pub intra_threads: usize,
    /// Budget for one prediction before it counts as "no estimate"
    pub timeout_ms: u64,
}

impl Default for ModelEnvConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("model"),
            input_node: ModelSignature::DEFAULT_INPUT_NODE.to_string(),
            output_node: ModelSignature::DEFAULT_OUTPUT_NODE.to_string(),
            intra_threads: 1,
            timeout_ms: 50,
        }
    }
}

impl ModelEnvConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; unset keys fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        Ok(Self {
            model_path: lookup("MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.model_path),
            input_node: lookup("MODEL_INPUT_NODE").unwrap_or(defaults.input_node),
            output_node: lookup("MODEL_OUTPUT_NODE").unwrap_or(defaults.output_node),
            intra_threads: parse_or(&lookup, "MODEL_INTRA_THREADS", defaults.intra_threads)?,
            timeout_ms: parse_or(&lookup, "PREDICTION_TIMEOUT_MS", defaults.timeout_ms)?,
        })
    }

    pub fn signature(&self) -> ModelSignature {
        ModelSignature::new(self.input_node.clone(), self.output_node.clone())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

pub(crate) fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .context(format!("Failed to parse {}", key)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_model_config_defaults() {
        let config = ModelEnvConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, ModelEnvConfig::default());
        assert_eq!(config.signature(), ModelSignature::default());
        assert_eq!(config.timeout(), Duration::from_millis(50));
    }

    #[test]
    fn test_model_config_overrides() {
        let config = ModelEnvConfig::from_lookup(lookup_from(&[
            ("MODEL_PATH", "/srv/models/floor"),
            ("MODEL_OUTPUT_NODE", "score:0"),
            ("PREDICTION_TIMEOUT_MS", " 120 "),
        ]))
        .unwrap();

        assert_eq!(config.model_path, PathBuf::from("/srv/models/floor"));
        assert_eq!(config.output_node, "score:0");
        assert_eq!(config.input_node, ModelSignature::DEFAULT_INPUT_NODE);
        assert_eq!(config.timeout_ms, 120);
    }

    #[test]
    fn test_invalid_number_is_an_error() {
        let result = ModelEnvConfig::from_lookup(lookup_from(&[("MODEL_INTRA_THREADS", "four")]));
        let err = result.unwrap_err();
        assert!(err.to_string().contains("MODEL_INTRA_THREADS"));
    }
}
