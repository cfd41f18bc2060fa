//! Top-level census operations, one per command

use std::sync::Arc;
use tracing::info;

use crate::ceph::{CephCli, ClusterQuery, ConfigKeyStore, KeyValueStore};
use crate::config::CensusConfig;
use crate::error::{CensusError, Result};
use crate::identity::IdentityManager;
use crate::metrics::MetricsCollector;
use crate::ownership::{split_assignment, OwnershipMetadata, OwnershipStore};
use crate::publisher::{HttpTransport, Publisher, Transport};
use crate::report::{BuiltReport, ReportBuilder};

/// Confirmation flag `unpublish` insists on
pub const UNPUBLISH_CONFIRMATION: &str = "--yes-i-am-shy";

pub struct Census {
    identity: IdentityManager,
    metrics: MetricsCollector,
    ownership: OwnershipStore,
    publisher: Publisher,
}

impl Census {
    /// Wire the components to the real `ceph` binary and HTTP client.
    pub fn new(config: &CensusConfig) -> Result<Self> {
        let query: Arc<dyn ClusterQuery> = Arc::new(CephCli::new(config));
        let store: Arc<dyn KeyValueStore> = Arc::new(ConfigKeyStore::new(query.clone()));
        let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(config)?);
        Ok(Self::with_backends(config, query, store, transport))
    }

    pub fn with_backends(
        config: &CensusConfig,
        query: Arc<dyn ClusterQuery>,
        store: Arc<dyn KeyValueStore>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            identity: IdentityManager::new(store.clone(), config.identity_key.clone()),
            metrics: MetricsCollector::new(query),
            ownership: OwnershipStore::new(store, config.ownership_key.clone()),
            publisher: Publisher::new(transport),
        }
    }

    pub async fn report(&self) -> Result<BuiltReport> {
        ReportBuilder::new(&self.identity, &self.metrics, &self.ownership)
            .build()
            .await
    }

    /// Merge `--key=value` arguments into the stored ownership metadata.
    pub async fn update_metadata(&self, args: &[String]) -> Result<OwnershipMetadata> {
        let fields = args
            .iter()
            .map(|arg| split_assignment(arg))
            .collect::<Result<Vec<_>>>()?;
        self.ownership.update(&fields).await
    }

    pub async fn clear_metadata(&self) -> Result<()> {
        self.ownership.clear().await
    }

    pub async fn publish(&self) -> Result<()> {
        let built = self.report().await?;
        self.publisher.publish(&built.report, built.url.as_deref()).await
    }

    /// Withdraw the published report. Refused unless `confirmed`.
    pub async fn unpublish(&self, confirmed: bool) -> Result<()> {
        if !confirmed {
            return Err(CensusError::Usage(format!(
                "unpublish should be followed by {}",
                UNPUBLISH_CONFIRMATION
            )));
        }

        let (_, url) = self.ownership.read().await.into_parts();
        let url = url.ok_or_else(|| CensusError::Configuration("URL is not updated yet".to_string()))?;

        let identity = self.identity.get_or_create().await?;
        info!("Withdrawing report for cluster {}", identity);
        self.publisher.unpublish(&identity, &url).await
    }
}
