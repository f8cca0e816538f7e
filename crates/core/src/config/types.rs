use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::IpAddr;
use std::path::PathBuf;

use crate::converter::ConverterConfig;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub converter: ConverterConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

/// Maximum input size per format name, in bytes. `0` means unlimited.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct LimitsConfig(BTreeMap<String, u64>);

impl LimitsConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(mut self, format: impl Into<String>, max_bytes: u64) -> Self {
        self.0.insert(format.into().to_ascii_lowercase(), max_bytes);
        self
    }

    /// Limit for `format`, or `None` when unlimited.
    pub fn limit_for(&self, format: &str) -> Option<u64> {
        self.0
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(format))
            .map(|(_, &limit)| limit)
            .filter(|&limit| limit > 0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.0.iter().map(|(k, &v)| (k.as_str(), v))
    }
}

/// Sanitized config for API responses
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub converter: SanitizedConverterConfig,
    pub limits: LimitsConfig,
}

/// Converter settings without local filesystem paths
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConverterConfig {
    pub buffer_size: usize,
    pub spool_threshold_bytes: usize,
    pub temp_dir_configured: bool,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            converter: SanitizedConverterConfig {
                buffer_size: config.converter.buffer_size,
                spool_threshold_bytes: config.converter.spool_threshold_bytes,
                temp_dir_configured: config.converter.temp_dir.is_some(),
            },
            limits: config.limits.clone(),
        }
    }
}

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "phono.toml";

/// Environment variable naming an alternative config file.
pub const CONFIG_PATH_ENV: &str = "PHONO_CONFIG";

/// Config file to load: explicit path, then `PHONO_CONFIG`, then `phono.toml`.
pub fn config_path(explicit: Option<PathBuf>) -> PathBuf {
    explicit
        .or_else(|| std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}
