//! Observability configuration parsing from environment variables.
//!
//! This module handles loading metrics configuration.

use super::model_config::parse_or;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;

/// Observability environment configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityEnvConfig {
    pub metrics_enabled: bool,
    pub metrics_prefix: String,
}

impl Default for ObservabilityEnvConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: true,
            metrics_prefix: "floor_estimator".to_string(),
        }
    }
}

impl ObservabilityEnvConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            metrics_enabled: parse_or(&lookup, "METRICS_ENABLED", defaults.metrics_enabled)?,
            metrics_prefix: lookup("METRICS_PREFIX").unwrap_or(defaults.metrics_prefix),
        })
    }
}
