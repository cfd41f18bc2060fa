//! Stable cluster identity
//!
//! The identity is a random UUID minted on first use and stored in the
//! cluster's key/value namespace. Once stored it is never regenerated.

use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::ceph::KeyValueStore;
use crate::error::{CensusError, Result, StoreError};

pub struct IdentityManager {
    store: Arc<dyn KeyValueStore>,
    key: String,
}

impl IdentityManager {
    pub fn new(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    /// Return the stored identity, minting and persisting one if none is stored.
    ///
    /// Read failures are treated like an absent key: an unreachable store
    /// cannot be told apart from an empty one.
    pub async fn get_or_create(&self) -> Result<String> {
        match self.store.get(&self.key).await {
            Ok(stored) if !stored.trim().is_empty() => {
                debug!("Using stored cluster identity");
                return Ok(stored.trim().to_string());
            }
            Ok(_) | Err(StoreError::NotFound(_)) => {}
            Err(e) => warn!("Could not read cluster identity, minting a new one: {}", e),
        }

        let identity = Uuid::new_v4().to_string();
        self.store
            .put(&self.key, &identity)
            .await
            .map_err(|e| CensusError::Persistence(e.to_string()))?;

        info!("Minted cluster identity {}", identity);
        Ok(identity)
    }
}
