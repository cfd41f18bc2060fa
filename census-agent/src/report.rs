//! Census report document and its assembly

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use tracing::debug;

use crate::error::{CensusError, Result};
use crate::histogram::Histogram;
use crate::identity::IdentityManager;
use crate::metrics::{CountSummary, MetricsCollector, PoolMetadata, SysInfo};
use crate::ownership::{OwnerDetails, OwnershipStore};

/// Root document sent to the aggregation endpoint
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub uuid: String,
    pub cluster_creation_date: String,
    pub components_count: CountSummary,
    pub crush_types: Histogram,
    pub pool_metadata: Vec<PoolMetadata>,
    #[serde(serialize_with = "sysinfo_or_empty")]
    pub sysinfo: Option<SysInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ownership: Option<OwnerDetails>,
}

impl Report {
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(CensusError::Encode)
    }
}

fn sysinfo_or_empty<S: Serializer>(sysinfo: &Option<SysInfo>, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    match sysinfo {
        Some(sysinfo) => sysinfo.serialize(serializer),
        None => serializer.serialize_map(Some(0))?.end(),
    }
}

/// A freshly built report and the publish target taken out of the ownership metadata
#[derive(Debug, Clone)]
pub struct BuiltReport {
    pub report: Report,
    pub url: Option<String>,
}

pub struct ReportBuilder<'a> {
    identity: &'a IdentityManager,
    metrics: &'a MetricsCollector,
    ownership: &'a OwnershipStore,
}

impl<'a> ReportBuilder<'a> {
    pub fn new(
        identity: &'a IdentityManager,
        metrics: &'a MetricsCollector,
        ownership: &'a OwnershipStore,
    ) -> Self {
        Self {
            identity,
            metrics,
            ownership,
        }
    }

    /// Identity first, then the collection steps, then ownership.
    pub async fn build(&self) -> Result<BuiltReport> {
        let uuid = self.identity.get_or_create().await?;
        let metrics = self.metrics.collect().await?;
        let (ownership, url) = self.ownership.read().await.into_parts();

        debug!(
            "Report built: {} pools, {} crush types, sysinfo {}",
            metrics.osd_map.pools.len(),
            metrics.crush_types.len(),
            if metrics.sysinfo.is_some() { "present" } else { "absent" }
        );

        Ok(BuiltReport {
            report: Report {
                uuid,
                cluster_creation_date: metrics.osd_map.created,
                components_count: metrics.counts,
                crush_types: metrics.crush_types,
                pool_metadata: metrics.osd_map.pools,
                sysinfo: metrics.sysinfo,
                ownership,
            },
            url,
        })
    }
}
