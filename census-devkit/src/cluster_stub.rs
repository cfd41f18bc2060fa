/*!
Mock control plane for developing without a Ceph cluster

Answers scripted commands, keeps a stateful `config-key` namespace and records
every call so tests can assert on what was issued.
*/

use async_trait::async_trait;
use census_agent::ceph::{ClusterQuery, QueryOutput};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Exit code `ceph` uses for an absent config-key
pub const ENOENT: i32 = 2;

/// Scriptable [`ClusterQuery`]
#[derive(Clone, Default)]
pub struct MockCluster {
    responses: Arc<Mutex<HashMap<String, QueryOutput>>>,
    config_keys: Arc<Mutex<HashMap<String, String>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockCluster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `command` (arguments joined by spaces) with `output`
    pub fn respond<S: Into<String>>(&self, command: S, output: QueryOutput) {
        self.responses.lock().unwrap().insert(command.into(), output);
    }

    pub fn respond_json<S: Into<String>>(&self, command: S, value: &Value) {
        self.respond(command, QueryOutput::success(value.to_string()));
    }

    pub fn fail<S: Into<String>>(&self, command: S, exit_code: i32, stderr: &str) {
        self.respond(command, QueryOutput::failure(exit_code, stderr));
    }

    pub fn set_config_key(&self, key: &str, value: &str) {
        self.config_keys.lock().unwrap().insert(key.to_string(), value.to_string());
    }

    pub fn config_key(&self, key: &str) -> Option<String> {
        self.config_keys.lock().unwrap().get(key).cloned()
    }

    /// Every command issued so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_starting_with(&self, prefix: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|call| call.starts_with(prefix))
            .collect()
    }
}

#[async_trait]
impl ClusterQuery for MockCluster {
    async fn run(&self, args: &[&str]) -> census_agent::Result<QueryOutput> {
        let command = args.join(" ");
        self.calls.lock().unwrap().push(command.clone());
        log::debug!("[MOCK] ceph {}", command);

        let output = match args {
            ["config-key", "get", key] => match self.config_key(key) {
                Some(value) => QueryOutput::success(value),
                None => QueryOutput::failure(
                    ENOENT,
                    format!("Error ENOENT: error obtaining '{}': (2) No such file or directory", key),
                ),
            },
            ["config-key", "put", key, value] => {
                self.set_config_key(key, value);
                QueryOutput::success("")
            }
            ["config-key", "del", key] => {
                self.config_keys.lock().unwrap().remove(*key);
                QueryOutput::success("")
            }
            _ => self
                .responses
                .lock()
                .unwrap()
                .get(&command)
                .cloned()
                .unwrap_or_else(|| QueryOutput::failure(22, format!("unscripted command: {}", command))),
        };

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_scripted_responses_and_call_log() {
        let cluster = MockCluster::new();
        cluster.respond_json("-s -f json", &json!({"ok": true}));

        let value = cluster.run_json(&["-s", "-f", "json"]).await.unwrap();
        assert_eq!(value["ok"], true);

        let output = cluster.run(&["osd", "tree"]).await.unwrap();
        assert_eq!(output.exit_code, 22);
        assert_eq!(cluster.calls(), vec!["-s -f json", "osd tree"]);
    }

    #[tokio::test]
    async fn test_config_key_namespace() {
        let cluster = MockCluster::new();
        assert_eq!(cluster.run(&["config-key", "get", "k"]).await.unwrap().exit_code, ENOENT);

        cluster.run(&["config-key", "put", "k", "v"]).await.unwrap();
        assert_eq!(cluster.run(&["config-key", "get", "k"]).await.unwrap().stdout, "v");

        cluster.run(&["config-key", "del", "k"]).await.unwrap();
        assert!(cluster.config_key("k").is_none());
        assert_eq!(cluster.calls_starting_with("config-key put").len(), 1);
    }
}
