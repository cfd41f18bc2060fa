/*!
# Census DevKit - test doubles for the census pipeline

Library for testing census components without a cluster or an aggregation server:
- Mock control plane with a stateful `config-key` namespace
- In-memory key/value store with failure injection
- Recording HTTP transport
- Fixture builders for control-plane documents
*/

pub mod cluster_stub;
pub mod fixtures;
pub mod store_stub;
pub mod test_utils;
pub mod transport_stub;

pub use cluster_stub::MockCluster;
pub use fixtures::ClusterFixture;
pub use store_stub::MemoryStore;
pub use test_utils::TestHarness;
pub use transport_stub::{RecordedRequest, RecordingTransport};
