//! Service configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use vpower_index::IndexSettings;
use vpower_power::{EngineConfig, FetchPolicy, StakeScale};
use vpower_rpc::QueryLimits;
use vpower_utils::LogFormat;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Read(String),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("invalid config value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Configuration for the voting-power service.
///
/// Every field has a default, so an empty file is a valid configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Address the HTTP API binds to.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Base URL of the search index.
    #[serde(default = "default_index_url")]
    pub index_url: String,

    #[serde(default = "default_voting_index")]
    pub voting_index: String,

    /// Prefix of the monthly operation indices probed by `/is_alive`.
    #[serde(default = "default_operations_index_prefix")]
    pub operations_index_prefix: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Raw stake is divided by this before it is reported.
    #[serde(default = "default_stake_scale")]
    pub stake_scale: u64,

    #[serde(default = "default_max_datapoints")]
    pub max_datapoints: usize,

    #[serde(default = "default_datapoints")]
    pub default_datapoints: usize,

    /// Lookback when a request has no `from`.
    #[serde(default = "default_range_days")]
    pub default_range_days: i64,

    /// Subjects kept in the result cache; 0 means unbounded.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    /// Window fetches in flight per request.
    #[serde(default = "default_one")]
    pub fetch_concurrency: usize,

    #[serde(default)]
    pub fetch_retries: u32,

    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    #[serde(default = "default_true")]
    pub enable_cors: bool,

    #[serde(default)]
    pub log_format: LogFormat,

    /// Log level filter, e.g. "info" or "info,vpower_power=debug".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_listen_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_index_url() -> String {
    "http://localhost:9200".to_string()
}

fn default_voting_index() -> String {
    "objects-voting-statistics".to_string()
}

fn default_operations_index_prefix() -> String {
    "bitshares-".to_string()
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_stake_scale() -> u64 {
    1
}

fn default_max_datapoints() -> usize {
    vpower_rpc::params::MAX_DATAPOINTS
}

fn default_datapoints() -> usize {
    vpower_rpc::params::DEFAULT_DATAPOINTS
}

fn default_range_days() -> i64 {
    vpower_rpc::params::DEFAULT_RANGE_DAYS
}

fn default_cache_capacity() -> usize {
    1024
}

fn default_one() -> usize {
    1
}

fn default_retry_backoff_ms() -> u64 {
    200
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl ServiceConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn listen_socket(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self.listen_addr.parse().map_err(|e| ConfigError::Invalid {
            field: "listen_addr",
            reason: format!("{:?}: {e}", self.listen_addr),
        })?;
        Ok(SocketAddr::new(ip, self.port))
    }

    pub fn engine_config(&self) -> Result<EngineConfig, ConfigError> {
        let stake_scale = StakeScale::new(self.stake_scale).ok_or_else(|| ConfigError::Invalid {
            field: "stake_scale",
            reason: "must be at least 1".into(),
        })?;
        Ok(EngineConfig {
            stake_scale,
            cache_capacity: (self.cache_capacity > 0).then_some(self.cache_capacity),
            fetch: FetchPolicy {
                concurrency: self.fetch_concurrency.max(1),
                retries: self.fetch_retries,
                backoff: Duration::from_millis(self.retry_backoff_ms),
            },
        })
    }

    pub fn index_settings(&self) -> IndexSettings {
        IndexSettings {
            url: self.index_url.clone(),
            voting_index: self.voting_index.clone(),
            operations_index_prefix: self.operations_index_prefix.clone(),
            timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }

    pub fn query_limits(&self) -> QueryLimits {
        QueryLimits {
            default_datapoints: self.default_datapoints,
            max_datapoints: self.max_datapoints,
            default_range_days: self.default_range_days,
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            port: default_port(),
            index_url: default_index_url(),
            voting_index: default_voting_index(),
            operations_index_prefix: default_operations_index_prefix(),
            request_timeout_secs: default_request_timeout_secs(),
            stake_scale: default_stake_scale(),
            max_datapoints: default_max_datapoints(),
            default_datapoints: default_datapoints(),
            default_range_days: default_range_days(),
            cache_capacity: default_cache_capacity(),
            fetch_concurrency: default_one(),
            fetch_retries: 0,
            retry_backoff_ms: default_retry_backoff_ms(),
            enable_cors: default_true(),
            log_format: LogFormat::default(),
            log_level: default_log_level(),
        }
    }
}
