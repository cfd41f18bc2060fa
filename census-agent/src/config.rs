//! Configuration management
//!
//! Handles:
//! - Location of the `ceph` binary and per-cluster arguments
//! - Names of the persisted config-keys
//! - HTTP transport settings
//! - The runtime verbose switch, threaded to every component that issues external calls

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable overriding the config file location
pub const CONFIG_ENV: &str = "CEPH_CENSUS_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CensusConfig {
    /// Control-plane executable
    pub ceph_binary: String,
    /// Prepended to every control-plane call (e.g. `--cluster`, `--conf`)
    pub cluster_args: Vec<String>,
    /// Config-key holding the cluster identity
    pub identity_key: String,
    /// Config-key holding the ownership metadata blob
    pub ownership_key: String,
    pub http_timeout_secs: Option<u64>,
    #[serde(skip)]
    pub verbose: bool,
}

impl Default for CensusConfig {
    fn default() -> Self {
        Self {
            ceph_binary: "ceph".to_string(),
            cluster_args: Vec::new(),
            identity_key: "cluster-uuid".to_string(),
            ownership_key: "cluster-ownership".to_string(),
            http_timeout_secs: None,
            verbose: false,
        }
    }
}

impl CensusConfig {
    /// Load config from `$CEPH_CENSUS_CONFIG` or the OS-specific location.
    /// A missing file yields the defaults.
    pub async fn load() -> Result<Self> {
        let path = match std::env::var_os(CONFIG_ENV) {
            Some(path) => PathBuf::from(path),
            None => match Self::config_file_path() {
                Some(path) => path,
                None => return Ok(Self::default()),
            },
        };
        Self::load_from(&path).await
    }

    /// Load config from an explicit path. A missing file yields the defaults.
    pub async fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// OS-specific config file path
    pub fn config_file_path() -> Option<PathBuf> {
        let mut path = dirs::config_dir()?;
        path.push("ceph-census");
        path.push("config.toml");
        Some(path)
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}
