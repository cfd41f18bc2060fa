/*!
Test harness for the census pipeline

Wires a [`Census`] to a mock control plane and a recording HTTP endpoint so a
test only has to describe the cluster and assert on the calls made.
*/

use crate::cluster_stub::MockCluster;
use crate::fixtures::ClusterFixture;
use crate::transport_stub::RecordingTransport;
use census_agent::ceph::{ConfigKeyStore, KeyValueStore};
use census_agent::{Census, CensusConfig};
use std::sync::Arc;

pub struct TestHarness {
    pub cluster: MockCluster,
    pub transport: RecordingTransport,
    pub config: CensusConfig,
}

impl TestHarness {
    /// Empty cluster, endpoint answering 201
    pub fn new() -> Self {
        env_logger::builder().is_test(true).try_init().ok();

        Self {
            cluster: MockCluster::new(),
            transport: RecordingTransport::default(),
            config: CensusConfig::default(),
        }
    }

    pub fn with_fixture(fixture: &ClusterFixture) -> Self {
        let harness = Self::new();
        fixture.install(&harness.cluster);
        harness
    }

    /// Census backed by the mock cluster's own `config-key` namespace
    pub fn census(&self) -> Census {
        let store = Arc::new(ConfigKeyStore::new(Arc::new(self.cluster.clone())));
        self.census_with_store(store)
    }

    /// Census with a separate key/value store, e.g. [`MemoryStore`](crate::MemoryStore)
    pub fn census_with_store(&self, store: Arc<dyn KeyValueStore>) -> Census {
        Census::with_backends(
            &self.config,
            Arc::new(self.cluster.clone()),
            store,
            Arc::new(self.transport.clone()),
        )
    }

    pub fn identity(&self) -> Option<String> {
        self.cluster.config_key(&self.config.identity_key)
    }

    pub fn ownership_blob(&self) -> Option<String> {
        self.cluster.config_key(&self.config.ownership_key)
    }

    /// Store an ownership blob directly, bypassing validation
    pub fn seed_ownership(&self, blob: &str) {
        self.cluster.set_config_key(&self.config.ownership_key, blob);
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
