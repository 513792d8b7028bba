//! Server configuration: listen address, GPU inventory, and engine tunables.
//!
//! Loaded from an optional YAML file (`CONFIG_PATH`, `${ENV:default}`
//! expansion supported) layered under environment variables and,
//! finally, hardcoded defaults.

pub mod loader;

pub use loader::{deep_merge, load_yaml_config, load_yaml_file};

use gpu_arbiter::{AllocationStrategy, GpuRecord};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use thiserror::Error;
use workflow_core::EngineConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read { path: String, source: std::io::Error },

    #[error("failed to parse config file {path}: {source}")]
    Parse { path: String, source: serde_yaml::Error },

    #[error("{0}")]
    General(String),
}

/// One accelerator entry as declared in the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GpuConfigEntry {
    pub gpu_id: u32,
    pub total_mem_gb: f64,
    #[serde(default)]
    pub name: Option<String>,
}

impl From<GpuConfigEntry> for GpuRecord {
    fn from(entry: GpuConfigEntry) -> Self {
        GpuRecord::new(entry.gpu_id, entry.total_mem_gb, entry.name.unwrap_or_else(|| format!("gpu{}", entry.gpu_id)))
    }
}

/// Engine tunables as declared in the config file; mirrors
/// [`workflow_core::EngineConfig`] field-for-field so the wire format
/// stays a flat, readable YAML document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfigEntry {
    pub max_concurrent_nodes: usize,
    pub default_timeout_seconds: u64,
    pub retry_failed_nodes: bool,
    pub max_retries: usize,
    pub continue_on_error: bool,
    pub enable_caching: bool,
}

impl Default for EngineConfigEntry {
    fn default() -> Self {
        let defaults = EngineConfig::default();
        EngineConfigEntry {
            max_concurrent_nodes: defaults.max_concurrent_nodes,
            default_timeout_seconds: defaults.default_timeout_seconds,
            retry_failed_nodes: defaults.retry_failed_nodes,
            max_retries: defaults.max_retries,
            continue_on_error: defaults.continue_on_error,
            enable_caching: defaults.enable_caching,
        }
    }
}

impl From<EngineConfigEntry> for EngineConfig {
    fn from(entry: EngineConfigEntry) -> Self {
        EngineConfig {
            max_concurrent_nodes: entry.max_concurrent_nodes,
            default_timeout_seconds: entry.default_timeout_seconds,
            retry_failed_nodes: entry.retry_failed_nodes,
            max_retries: entry.max_retries,
            continue_on_error: entry.continue_on_error,
            enable_caching: entry.enable_caching,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub gpus: Vec<GpuConfigEntry>,
    pub gpu_strategy: AllocationStrategy,
    pub engine: EngineConfigEntry,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            gpus: Vec::new(),
            gpu_strategy: AllocationStrategy::default(),
            engine: EngineConfigEntry::default(),
        }
    }
}

impl ServerConfig {
    /// Loads from `CONFIG_PATH` if set and the file exists, then applies
    /// `HOST`/`PORT` environment overrides on top of whatever was loaded
    /// (or the defaults, if no file was found).
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match env::var("CONFIG_PATH") {
            Ok(path) if Path::new(&path).exists() => load_yaml_config(&path)?,
            _ => ServerConfig::default(),
        };

        if let Ok(host) = env::var("HOST") {
            config.host = host;
        }
        if let Ok(port) = env::var("PORT") {
            config.port = port.parse().map_err(|_| ConfigError::General("PORT must be a valid u16".to_string()))?;
        }

        Ok(config)
    }

    pub fn socket_addr(&self) -> Result<std::net::SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| ConfigError::General(format!("invalid listen address: {e}")))
    }
}
