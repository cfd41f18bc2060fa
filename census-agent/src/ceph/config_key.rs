//! Key/value storage backed by the control plane's `config-key` namespace

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use super::ClusterQuery;
use crate::error::StoreError;

/// `ceph` exits with ENOENT when a config-key is absent.
const ENOENT: i32 = 2;

/// Persistent string-keyed namespace shared with the cluster
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<String, StoreError>;
    async fn put(&self, key: &str, value: &str) -> Result<(), StoreError>;
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

/// [`KeyValueStore`] over `ceph config-key get|put|del`
pub struct ConfigKeyStore {
    query: Arc<dyn ClusterQuery>,
}

impl ConfigKeyStore {
    pub fn new(query: Arc<dyn ClusterQuery>) -> Self {
        Self { query }
    }

    /// Issue one config-key call. `absent_ok` maps ENOENT to `NotFound`.
    async fn call(&self, args: &[&str], key: &str, absent_ok: bool) -> Result<String, StoreError> {
        let output = self.query.run(args).await.map_err(|e| StoreError::Backend {
            key: key.to_string(),
            message: e.to_string(),
        })?;

        match output.exit_code {
            0 => Ok(output.stdout),
            ENOENT if absent_ok => Err(StoreError::NotFound(key.to_string())),
            code => Err(StoreError::Backend {
                key: key.to_string(),
                message: format!("exit code {}: {}", code, output.stderr.trim_end()),
            }),
        }
    }
}

#[async_trait]
impl KeyValueStore for ConfigKeyStore {
    async fn get(&self, key: &str) -> Result<String, StoreError> {
        debug!("config-key get {}", key);
        self.call(&["config-key", "get", key], key, true).await
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        debug!("config-key put {} ({} bytes)", key, value.len());
        self.call(&["config-key", "put", key, value], key, false).await.map(|_| ())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        debug!("config-key del {}", key);
        self.call(&["config-key", "del", key], key, false).await.map(|_| ())
    }
}
