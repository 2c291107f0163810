//! Runtime configuration: built-in defaults, then environment overrides.
//!
//! The binary applies its command-line flags on top of [`AppConfig::from_env`].

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use log::debug;

use crate::artifact_manager::{ArtifactManager, DEFAULT_DOWNLOAD_TIMEOUT};
use crate::classifier::DEFAULT_TOP_K;
use crate::features::DefaultBundle;
use crate::runtime::RuntimeConfig;

pub const ENV_CACHE: &str = "APPCAT_CACHE";
pub const ENV_DOWNLOAD_TIMEOUT: &str = "APPCAT_DOWNLOAD_TIMEOUT_SECS";
pub const ENV_TOP_K: &str = "APPCAT_TOP_K";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} must be {expected}, got {value:?}")]
    InvalidValue {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Directory the artifact cache lives in
    pub artifacts_dir: PathBuf,
    pub download_timeout: Duration,
    pub top_k: usize,
    pub runtime: RuntimeConfig,
    pub defaults: DefaultBundle,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            artifacts_dir: ArtifactManager::get_default_artifacts_dir(),
            download_timeout: DEFAULT_DOWNLOAD_TIMEOUT,
            top_k: DEFAULT_TOP_K,
            runtime: RuntimeConfig::default(),
            defaults: DefaultBundle::default(),
        }
    }
}

impl AppConfig {
    /// Reads overrides from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Reads overrides through `lookup`, which returns the value of a variable
    /// if it is set.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(cache) = lookup(ENV_CACHE).filter(|v| !v.trim().is_empty()) {
            config.artifacts_dir = PathBuf::from(cache).join("artifacts");
        }
        if let Some(raw) = lookup(ENV_DOWNLOAD_TIMEOUT) {
            let secs = parse_positive(ENV_DOWNLOAD_TIMEOUT, &raw)?;
            config.download_timeout = Duration::from_secs(secs as u64);
        }
        if let Some(raw) = lookup(ENV_TOP_K) {
            config.top_k = parse_positive(ENV_TOP_K, &raw)?;
        }

        debug!("Configuration: {:?}", config);
        Ok(config)
    }
}

fn parse_positive(name: &'static str, raw: &str) -> Result<usize, ConfigError> {
    raw.trim()
        .parse::<usize>()
        .ok()
        .filter(|value| *value > 0)
        .ok_or_else(|| ConfigError::InvalidValue {
            name,
            expected: "a positive integer",
            value: raw.to_string(),
        })
}
