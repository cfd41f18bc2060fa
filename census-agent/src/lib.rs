//! Ceph Census - anonymized census reports for storage clusters
//!
//! Builds a report describing a cluster's topology, capacity and
//! software/hardware inventory, and optionally publishes it:
//! - Control-plane queries through the `ceph` command ([`ceph`])
//! - Stable cluster identity and opt-in ownership metadata in `config-key`
//! - Histogramming into a stable document shape ([`report::Report`])
//! - Idempotent PUT/DELETE publication ([`publisher`])

pub mod app;
pub mod ceph;
pub mod config;
pub mod error;
pub mod histogram;
pub mod identity;
pub mod metrics;
pub mod ownership;
pub mod publisher;
pub mod report;

pub use app::Census;
pub use config::CensusConfig;
pub use error::{CensusError, Result, StoreError};
