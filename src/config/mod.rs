//! Harness configuration
//!
//! TOML settings describing the TTL tiers to verify, probe behavior, client
//! headers, the resources under test and the known edge nodes.

use crate::core::edge::types::{EdgeNode, PolicyParameters, ProbeStrategy, Protocol};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

const DEFAULT_TIMEOUT_MS: u32 = 5000;
const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
const DEFAULT_RETRY_DELAY_SECONDS: u64 = 15;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config [{path}]")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub ttl_settings: TtlSettings,
    pub probe_settings: ProbeSettings,
    #[serde(default)]
    pub client_headers: ClientHeaderSettings,
    pub resources: Vec<ResourceEntry>,
    #[serde(default)]
    pub edge_nodes: Vec<EdgeNode>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TtlSettings {
    /// "Fast" TTL used to verify that edges do revalidate
    pub short_ttl: u64,
    /// "Long" TTL used to verify that edges do not revalidate early
    pub long_ttl: u64,
    /// Fraction of the nominal TTL a revalidation gap must exceed, in (0, 1]
    pub error_rate: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProbeSettings {
    /// Number of TTL periods one campaign keeps probing for
    pub periods_to_test: u32,
    /// Stop the campaign as soon as any single history is accepted
    pub finish_once_success: bool,
    pub requests_type: ProbeStrategy,
    #[serde(default)]
    pub protocol: Protocol,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u32,
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    #[serde(default = "default_retry_delay_seconds")]
    pub retry_delay_seconds: u64,
}

fn default_timeout_ms() -> u32 {
    DEFAULT_TIMEOUT_MS
}

fn default_retry_attempts() -> u32 {
    DEFAULT_RETRY_ATTEMPTS
}

fn default_retry_delay_seconds() -> u64 {
    DEFAULT_RETRY_DELAY_SECONDS
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientHeaderSettings {
    /// Use a randomly generated value for the injected custom header
    pub use_random_headers: bool,
    /// Value of the injected custom header when not randomly generated
    pub custom_header_value: String,
}

impl Default for ClientHeaderSettings {
    fn default() -> Self {
        Self {
            use_random_headers: false,
            custom_header_value: "edgeprobe".to_string(),
        }
    }
}

impl ClientHeaderSettings {
    /// Value to inject as the static header under test: either the
    /// configured constant or a fresh random token per run
    pub fn custom_header(&self) -> String {
        if self.use_random_headers {
            uuid::Uuid::new_v4().to_string()[..8].to_string()
        } else {
            self.custom_header_value.clone()
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResourceEntry {
    pub id: String,
    pub cname: String,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.ttl_settings.error_rate > 0.0 && self.ttl_settings.error_rate <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "ttl_settings.error_rate must be in (0, 1], got {}",
                self.ttl_settings.error_rate
            )));
        }
        if self.probe_settings.periods_to_test == 0 {
            return Err(ConfigError::Invalid(
                "probe_settings.periods_to_test must be at least 1".to_string(),
            ));
        }
        if self.probe_settings.timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "probe_settings.timeout_ms must be positive".to_string(),
            ));
        }
        if self.resources.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one resource must be configured".to_string(),
            ));
        }
        if self.probe_settings.requests_type == ProbeStrategy::Targeted && self.edge_nodes.is_empty()
        {
            return Err(ConfigError::Invalid(
                "targeted probing requires at least one edge node".to_string(),
            ));
        }
        Ok(())
    }

    /// Campaign parameters for one TTL tier, with query variation off
    pub fn policy_parameters(&self, ttl_seconds: u64) -> PolicyParameters {
        PolicyParameters {
            ttl: Duration::from_secs(ttl_seconds),
            tolerance_ratio: self.ttl_settings.error_rate,
            periods_to_test: self.probe_settings.periods_to_test,
            finish_on_first_success: self.probe_settings.finish_once_success,
            strategy: self.probe_settings.requests_type,
            vary_query: false,
        }
    }
}
