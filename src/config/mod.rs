//! Configuration module for Gnosis.
//!
//! This module provides structured configuration loading from environment variables,
//! organized by concern: Engine parameters, Runtime wiring, and Observability.

mod engine_config;
mod observability_config;
mod runtime_config;

pub use engine_config::{BandwidthRule, EngineConfig, VwapWindow};
pub use observability_config::ObservabilityEnvConfig;
pub use runtime_config::{FeedMode, RuntimeEnvConfig};

use anyhow::{Context, Result};
use std::sync::Arc;

/// Main application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Immutable engine parameters shared by every session
    pub engine: Arc<EngineConfig>,
    pub runtime: RuntimeEnvConfig,
    pub observability: ObservabilityEnvConfig,
}

impl Config {
    /// Loads all sub-configs from the environment.
    ///
    /// When `ENGINE_CONFIG_PATH` is set, engine parameters come from that TOML
    /// file instead of individual environment variables.
    pub fn from_env() -> Result<Self> {
        let engine = match std::env::var("ENGINE_CONFIG_PATH") {
            Ok(path) => EngineConfig::from_toml_file(&path)
                .context(format!("Failed to load engine config from {}", path))?,
            Err(_) => EngineConfig::from_env().context("Failed to load engine config")?,
        };
        let runtime = RuntimeEnvConfig::from_env().context("Failed to load runtime config")?;
        let observability = ObservabilityEnvConfig::from_env();

        Ok(Self {
            engine: Arc::new(engine),
            runtime,
            observability,
        })
    }
}
