/*!
Control-plane documents for tests

Builds the JSON documents a small cluster would return for `ceph -s`,
`pg dump pools`, `osd crush dump`, `osd dump` and `osd metadata`, and
installs them on a [`MockCluster`].
*/

use crate::cluster_stub::MockCluster;
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// One pool: `(id, type, size, objects)`
pub type PoolSpec = (u64, u64, u64, u64);

#[derive(Debug, Clone)]
pub struct ClusterFixture {
    pub mons: usize,
    pub num_in_osds: u64,
    pub mds_in: Option<u64>,
    pub num_pgs: u64,
    pub data_bytes: u64,
    pub bytes_total: u64,
    pub created: String,
    pub pools: Vec<PoolSpec>,
    pub crush_types: Vec<(u64, String)>,
    pub bucket_types: Vec<u64>,
    pub devices: Option<usize>,
    /// OSD ids that answer `osd metadata`, with their metadata
    pub nodes: BTreeMap<u64, Value>,
}

impl Default for ClusterFixture {
    /// Three monitors, three OSDs that all answer, two pools
    fn default() -> Self {
        let mut fixture = Self {
            mons: 3,
            num_in_osds: 3,
            mds_in: Some(1),
            num_pgs: 192,
            data_bytes: 1 << 30,
            bytes_total: 3 << 40,
            created: "2014-03-11 10:12:44.000000".to_string(),
            pools: vec![(0, 1, 3, 120), (1, 3, 5, 8)],
            crush_types: vec![
                (0, "host".to_string()),
                (1, "rack".to_string()),
                (2, "root".to_string()),
            ],
            bucket_types: vec![0, 0, 1, 2, 2, 2],
            devices: Some(3),
            nodes: BTreeMap::new(),
        };
        for id in 0..3 {
            fixture.nodes.insert(id, Self::node_metadata("Linux", "x86_64"));
        }
        fixture
    }
}

impl ClusterFixture {
    pub fn new() -> Self {
        Self::default()
    }

    /// `num_in_osds` in the status document; only `answering` ids have metadata
    pub fn with_osds(mut self, num_in_osds: u64, answering: &[u64]) -> Self {
        self.num_in_osds = num_in_osds;
        self.nodes = answering
            .iter()
            .map(|&id| (id, Self::node_metadata("Linux", "x86_64")))
            .collect();
        self
    }

    pub fn with_node(mut self, id: u64, metadata: Value) -> Self {
        self.nodes.insert(id, metadata);
        self
    }

    pub fn without_mds(mut self) -> Self {
        self.mds_in = None;
        self
    }

    pub fn with_bucket_types(mut self, bucket_types: &[u64]) -> Self {
        self.bucket_types = bucket_types.to_vec();
        self
    }

    pub fn without_devices(mut self) -> Self {
        self.devices = None;
        self
    }

    /// Metadata a healthy Ubuntu OSD host reports
    pub fn node_metadata(os: &str, arch: &str) -> Value {
        json!({
            "arch": arch,
            "ceph_version": "ceph version 0.80.1 (a38fe1169b6d2ac98b427334c12d7cf81f809b74)",
            "cpu": "Intel(R) Xeon(R) CPU E5-2620 0 @ 2.00GHz",
            "distro": "Ubuntu",
            "distro_codename": "trusty",
            "distro_description": "Ubuntu 14.04 LTS",
            "distro_version": "14.04",
            "hostname": "osd-host",
            "kernel_description": "#42-Ubuntu SMP Mon Apr 28 14:46:40 UTC 2014",
            "kernel_version": "3.13.0-24-generic",
            "mem_total_kb": "16401152",
            "os": os
        })
    }

    pub fn status(&self) -> Value {
        let mons: Vec<Value> = (0..self.mons)
            .map(|rank| json!({"rank": rank, "name": format!("mon{}", rank)}))
            .collect();
        let mut status = json!({
            "fsid": "00000000-0000-0000-0000-000000000000",
            "monmap": {"epoch": 1, "mons": mons},
            "osdmap": {"osdmap": {"num_osds": self.num_in_osds, "num_up_osds": self.num_in_osds, "num_in_osds": self.num_in_osds}},
            "pgmap": {
                "num_pgs": self.num_pgs,
                "data_bytes": self.data_bytes,
                "bytes_used": self.data_bytes * 3,
                "bytes_total": self.bytes_total
            }
        });
        if let Some(mds_in) = self.mds_in {
            status["mdsmap"] = json!({"epoch": 4, "in": mds_in, "up": mds_in});
        }
        status
    }

    pub fn pool_stats(&self) -> Value {
        self.pools
            .iter()
            .map(|&(id, _, _, objects)| json!({"poolid": id, "stat_sum": {"num_objects": objects}}))
            .collect()
    }

    pub fn crush_dump(&self) -> Value {
        let types: Vec<Value> = self
            .crush_types
            .iter()
            .map(|(id, name)| json!({"type_id": id, "name": name}))
            .collect();
        let buckets: Vec<Value> = self
            .bucket_types
            .iter()
            .enumerate()
            .map(|(i, type_id)| {
                let id = -(i as i64) - 1;
                json!({"id": id, "type_id": type_id, "items": []})
            })
            .collect();
        let mut dump = json!({"types": types, "buckets": buckets, "rules": []});
        if let Some(devices) = self.devices {
            let devices: Vec<Value> = (0..devices)
                .map(|id| json!({"id": id, "name": format!("osd.{}", id)}))
                .collect();
            dump["devices"] = Value::Array(devices);
        }
        dump
    }

    pub fn osd_dump(&self) -> Value {
        let pools: Vec<Value> = self
            .pools
            .iter()
            .map(|&(id, pool_type, size, _)| {
                json!({"pool": id, "pool_name": format!("pool{}", id), "type": pool_type, "size": size})
            })
            .collect();
        json!({"epoch": 42, "created": self.created, "modified": self.created, "pools": pools})
    }

    /// Script every document on `cluster`. Ids without metadata answer ENOENT.
    pub fn install(&self, cluster: &MockCluster) {
        cluster.respond_json("-s -f json", &self.status());
        cluster.respond_json("pg dump pools -f json", &self.pool_stats());
        cluster.respond_json("osd crush dump -f json", &self.crush_dump());
        cluster.respond_json("osd dump -f json", &self.osd_dump());

        for id in 0..self.num_in_osds {
            let command = format!("osd metadata {} -f json", id);
            match self.nodes.get(&id) {
                Some(metadata) => cluster.respond_json(command, metadata),
                None => cluster.fail(command, 2, &format!("Error ENOENT: osd.{} does not exist", id)),
            }
        }
        log::info!(
            "Installed fixture: {} OSDs in, {} answering",
            self.num_in_osds,
            self.nodes.len()
        );
    }
}
