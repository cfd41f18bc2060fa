//! Cluster metrics collection for census reports
//!
//! Gathers, from the control plane:
//! - Component counts and capacity (status + pool statistics)
//! - Topology histogram from the crush map
//! - Pool metadata and cluster creation date from the OSD map
//! - Per-node software/hardware histograms (see [`sysinfo`])
//!
//! Every step is a single pass over freshly fetched documents. Any failed
//! query aborts collection, except per-node metadata which is best effort.

mod sysinfo;

pub use sysinfo::SysInfo;

use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::ceph::ClusterQuery;
use crate::error::{CensusError, Result};
use crate::histogram::Histogram;

const STATUS_DOC: &str = "cluster status";
const POOL_STATS_DOC: &str = "pool statistics";
const CRUSH_DOC: &str = "crush map";
const OSD_MAP_DOC: &str = "OSD map";

/// Component counts and capacity
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountSummary {
    pub num_mons: u64,
    pub num_osds: u64,
    pub num_mdss: u64,
    pub num_pgs: u64,
    pub num_data_bytes: u64,
    pub num_bytes_total: u64,
    pub num_pools: u64,
    pub num_objects: u64,
}

/// One storage pool as listed in the OSD map
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolMetadata {
    pub id: u64,
    #[serde(rename = "type")]
    pub pool_type: u64,
    pub size: u64,
}

/// Creation date and pool listing extracted from the OSD map
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OsdMapSummary {
    pub created: String,
    pub pools: Vec<PoolMetadata>,
}

/// Everything a census report needs from the control plane
#[derive(Debug, Clone)]
pub struct ClusterMetrics {
    pub counts: CountSummary,
    pub crush_types: Histogram,
    pub osd_map: OsdMapSummary,
    /// `None` when no node answered a metadata query
    pub sysinfo: Option<SysInfo>,
}

pub struct MetricsCollector {
    query: Arc<dyn ClusterQuery>,
}

impl MetricsCollector {
    pub fn new(query: Arc<dyn ClusterQuery>) -> Self {
        Self { query }
    }

    /// Run the four collection steps in order.
    pub async fn collect(&self) -> Result<ClusterMetrics> {
        debug!("Collecting cluster metrics...");

        let counts = self.count_summary().await?;
        let crush_types = self.crush_types().await?;
        let osd_map = self.osd_map().await?;
        let sysinfo = self.sysinfo(counts.num_osds).await?;

        Ok(ClusterMetrics {
            counts,
            crush_types,
            osd_map,
            sysinfo,
        })
    }

    pub async fn count_summary(&self) -> Result<CountSummary> {
        let status = self.query.run_json(&["-s", "-f", "json"]).await?;
        let pool_stats = self.query.run_json(&["pg", "dump", "pools", "-f", "json"]).await?;
        CountSummary::from_documents(&status, &pool_stats)
    }

    pub async fn crush_types(&self) -> Result<Histogram> {
        let dump = self.query.run_json(&["osd", "crush", "dump", "-f", "json"]).await?;
        crush_type_histogram(&dump)
    }

    pub async fn osd_map(&self) -> Result<OsdMapSummary> {
        let dump = self.query.run_json(&["osd", "dump", "-f", "json"]).await?;
        OsdMapSummary::from_document(&dump)
    }

    /// Query metadata for node ids `0..max_osds`, each exactly once.
    ///
    /// A failed or malformed answer for one id means that id is absent
    /// (OSD numbering is sparse) and is skipped. A transient outage of a
    /// node is indistinguishable from a retired id here.
    pub async fn sysinfo(&self, max_osds: u64) -> Result<Option<SysInfo>> {
        let mut sysinfo = SysInfo::default();
        let mut answered = 0usize;

        for id in 0..max_osds {
            let id_arg = id.to_string();
            match self.query.run_json(&["osd", "metadata", &id_arg, "-f", "json"]).await {
                Ok(meta) => {
                    sysinfo.record(&meta);
                    answered += 1;
                }
                Err(e @ (CensusError::Query { .. } | CensusError::Decode { .. })) => {
                    debug!("osd.{} metadata unavailable, skipping: {}", id, e);
                }
                Err(e) => return Err(e),
            }
        }

        if answered == 0 {
            if max_osds > 0 {
                warn!("'ceph osd metadata' is not available at all");
            }
            return Ok(None);
        }

        debug!("Collected metadata from {}/{} OSD ids", answered, max_osds);
        Ok(Some(sysinfo))
    }
}

impl CountSummary {
    /// Build counts from a status document and a pool statistics document.
    pub fn from_documents(status: &Value, pool_stats: &Value) -> Result<Self> {
        let num_mons = required(status, STATUS_DOC, &["monmap", "mons"])?
            .as_array()
            .ok_or_else(|| CensusError::schema(STATUS_DOC, "monmap.mons"))?
            .len() as u64;

        let num_osds = match lookup(status, &["osdmap", "osdmap", "num_in_osds"]) {
            Some(value) => as_count(value, STATUS_DOC, "osdmap.osdmap.num_in_osds")?,
            None => count_field(status, STATUS_DOC, &["osdmap", "num_in_osds"])?,
        };

        // No metadata service configured is a valid state
        let num_mdss = match lookup(status, &["mdsmap", "in"]) {
            Some(value) => as_count(value, STATUS_DOC, "mdsmap.in")?,
            None => 0,
        };

        let num_pgs = count_field(status, STATUS_DOC, &["pgmap", "num_pgs"])?;
        let num_data_bytes = count_field(status, STATUS_DOC, &["pgmap", "data_bytes"])?;
        let num_bytes_total = count_field(status, STATUS_DOC, &["pgmap", "bytes_total"])?;

        let pools = pool_stats
            .as_array()
            .or_else(|| pool_stats.get("pool_stats").and_then(Value::as_array))
            .ok_or_else(|| CensusError::schema(POOL_STATS_DOC, "pool_stats"))?;

        let mut num_objects = 0u64;
        for pool in pools {
            num_objects += count_field(pool, POOL_STATS_DOC, &["stat_sum", "num_objects"])?;
        }

        Ok(CountSummary {
            num_mons,
            num_osds,
            num_mdss,
            num_pgs,
            num_data_bytes,
            num_bytes_total,
            num_pools: pools.len() as u64,
            num_objects,
        })
    }
}

/// Tally crush buckets by type name, plus a `devices` entry when the map lists devices.
pub fn crush_type_histogram(dump: &Value) -> Result<Histogram> {
    let types = required(dump, CRUSH_DOC, &["types"])?
        .as_array()
        .ok_or_else(|| CensusError::schema(CRUSH_DOC, "types"))?;

    let mut names = HashMap::new();
    for crush_type in types {
        let id = count_field(crush_type, CRUSH_DOC, &["type_id"])?;
        let name = required(crush_type, CRUSH_DOC, &["name"])?
            .as_str()
            .ok_or_else(|| CensusError::schema(CRUSH_DOC, "types[].name"))?;
        names.insert(id, name);
    }

    let buckets = required(dump, CRUSH_DOC, &["buckets"])?
        .as_array()
        .ok_or_else(|| CensusError::schema(CRUSH_DOC, "buckets"))?;

    let mut histogram = Histogram::new("type");
    for bucket in buckets {
        let id = count_field(bucket, CRUSH_DOC, &["type_id"])?;
        let name = names
            .get(&id)
            .ok_or_else(|| CensusError::schema(CRUSH_DOC, &format!("types[type_id={}]", id)))?;
        histogram.increment(*name);
    }

    if let Some(devices) = dump.get("devices").and_then(Value::as_array) {
        histogram.add("devices", devices.len() as u64);
    }

    Ok(histogram)
}

impl OsdMapSummary {
    pub fn from_document(dump: &Value) -> Result<Self> {
        let created = required(dump, OSD_MAP_DOC, &["created"])?
            .as_str()
            .ok_or_else(|| CensusError::schema(OSD_MAP_DOC, "created"))?
            .to_string();

        let pools = required(dump, OSD_MAP_DOC, &["pools"])?
            .as_array()
            .ok_or_else(|| CensusError::schema(OSD_MAP_DOC, "pools"))?
            .iter()
            .map(|pool| -> Result<PoolMetadata> {
                Ok(PoolMetadata {
                    id: count_field(pool, OSD_MAP_DOC, &["pool"])?,
                    pool_type: count_field(pool, OSD_MAP_DOC, &["type"])?,
                    size: count_field(pool, OSD_MAP_DOC, &["size"])?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(OsdMapSummary { created, pools })
    }
}

/// Convert a count expressed in `unit` to raw bytes.
///
/// Unknown or absent units pass the value through. `None` on overflow.
pub fn bytes_pretty_to_raw(count: u64, unit: Option<&str>) -> Option<u64> {
    let shift = match unit {
        Some("kB") => 10,
        Some("MB") => 20,
        Some("GB") => 30,
        Some("TB") => 40,
        Some("PB") => 50,
        Some("EB") => 60,
        _ => return Some(count),
    };
    count.checked_mul(1u64 << shift)
}

/// Parse a pretty-printed size such as `"12 GB"` or `"512kB"` into bytes.
pub fn parse_pretty_bytes(text: &str) -> Option<u64> {
    let text = text.trim();
    let split = text.find(|c: char| !c.is_ascii_digit()).unwrap_or(text.len());
    let (digits, unit) = text.split_at(split);
    let count = digits.parse().ok()?;
    let unit = unit.trim();
    bytes_pretty_to_raw(count, (!unit.is_empty()).then_some(unit))
}

fn lookup<'a>(doc: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter()
        .try_fold(doc, |value, key| value.get(key))
        .filter(|value| !value.is_null())
}

fn required<'a>(doc: &'a Value, document: &str, path: &[&str]) -> Result<&'a Value> {
    lookup(doc, path).ok_or_else(|| CensusError::schema(document, &path.join(".")))
}

/// Non-negative integer, either as a JSON number or a numeric string
fn as_count(value: &Value, document: &str, field: &str) -> Result<u64> {
    value
        .as_u64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
        .ok_or_else(|| CensusError::schema(document, field))
}

fn count_field(doc: &Value, document: &str, path: &[&str]) -> Result<u64> {
    as_count(required(doc, document, path)?, document, &path.join("."))
}
