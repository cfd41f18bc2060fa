//! Control-plane access for the census pipeline
//!
//! Handles every call into the external `ceph` command:
//! - Command execution with permissive output decoding
//! - Exit-code checking and JSON decoding of responses
//! - The `config-key` namespace used as a key/value store

mod config_key;

pub use config_key::{ConfigKeyStore, KeyValueStore};

use async_trait::async_trait;
use serde_json::Value;
use std::process::Stdio;
use std::time::Instant;
use tokio::process::Command as AsyncCommand;
use tracing::{debug, info};

use crate::config::CensusConfig;
use crate::error::{CensusError, Result};

/// Raw result of one control-plane invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl QueryOutput {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failure(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Stdout of a successful call, or a `Query` error carrying stderr.
    pub fn into_stdout(self, command: &str) -> Result<String> {
        if self.exit_code == 0 {
            Ok(self.stdout)
        } else {
            Err(CensusError::Query {
                command: command.to_string(),
                code: self.exit_code,
                stderr: self.stderr.trim_end().to_string(),
            })
        }
    }
}

/// Interface to the cluster's administrative command.
///
/// `run` only fails when the command could not be issued at all; a
/// non-zero exit code is reported through [`QueryOutput`] and left to
/// the caller.
#[async_trait]
pub trait ClusterQuery: Send + Sync {
    async fn run(&self, args: &[&str]) -> Result<QueryOutput>;

    /// Run a command and decode its stdout as JSON. Non-zero exit is a `Query` error.
    async fn run_json(&self, args: &[&str]) -> Result<Value> {
        let command = args.join(" ");
        let stdout = self.run(args).await?.into_stdout(&command)?;
        serde_json::from_str(&stdout).map_err(|source| CensusError::Decode { command, source })
    }
}

/// Runs the real `ceph` binary
pub struct CephCli {
    program: String,
    base_args: Vec<String>,
    verbose: bool,
}

impl CephCli {
    pub fn new(config: &CensusConfig) -> Self {
        Self {
            program: config.ceph_binary.clone(),
            base_args: config.cluster_args.clone(),
            verbose: config.verbose,
        }
    }
}

#[async_trait]
impl ClusterQuery for CephCli {
    async fn run(&self, args: &[&str]) -> Result<QueryOutput> {
        let start_time = Instant::now();
        let command_line = std::iter::once(self.program.as_str())
            .chain(self.base_args.iter().map(String::as_str))
            .chain(args.iter().copied())
            .collect::<Vec<_>>()
            .join(" ");

        if self.verbose {
            info!("run: {}", command_line);
        } else {
            debug!("run: {}", command_line);
        }

        let output = AsyncCommand::new(&self.program)
            .args(&self.base_args)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| CensusError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let exit_code = output.status.code().unwrap_or(-1);
        debug!(
            "`{}` exited with {} after {}ms",
            command_line,
            exit_code,
            start_time.elapsed().as_millis()
        );

        Ok(QueryOutput {
            exit_code,
            stdout: decode_lossy(&output.stdout),
            stderr: decode_lossy(&output.stderr),
        })
    }
}

/// Decode command output, dropping byte sequences that are not valid UTF-8.
pub fn decode_lossy(bytes: &[u8]) -> String {
    let mut text = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        text.push_str(chunk.valid());
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_drops_invalid_bytes() {
        assert_eq!(decode_lossy(b"ok"), "ok");
        assert_eq!(decode_lossy(b"ab\xffcd\xc3"), "abcd");
        assert_eq!(decode_lossy("héllo".as_bytes()), "héllo");
    }

    #[test]
    fn test_into_stdout_checks_exit_code() {
        let ok = QueryOutput::success("{}");
        assert_eq!(ok.into_stdout("osd dump").unwrap(), "{}");

        let failed = QueryOutput::failure(2, "Error ENOENT\n");
        match failed.into_stdout("osd metadata 3") {
            Err(CensusError::Query { command, code, stderr }) => {
                assert_eq!(command, "osd metadata 3");
                assert_eq!(code, 2);
                assert_eq!(stderr, "Error ENOENT");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[cfg(unix)]
    fn shell() -> CephCli {
        CephCli {
            program: "sh".to_string(),
            base_args: vec!["-c".to_string()],
            verbose: true,
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_cli_captures_output_and_exit_code() {
        let cli = shell();
        let output = cli.run(&["printf '{\"a\": 1}'"]).await.unwrap();
        assert_eq!(output.exit_code, 0);
        assert_eq!(output.stdout, "{\"a\": 1}");

        let output = cli.run(&["echo nope >&2; exit 3"]).await.unwrap();
        assert_eq!(output.exit_code, 3);
        assert!(output.stderr.contains("nope"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_cli_run_json() {
        let cli = shell();
        let value = cli.run_json(&["printf '{\"mons\": [1, 2]}'"]).await.unwrap();
        assert_eq!(value["mons"].as_array().unwrap().len(), 2);

        let err = cli.run_json(&["printf 'not json'"]).await.unwrap_err();
        assert!(matches!(err, CensusError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_missing_binary_is_spawn_error() {
        let cli = CephCli {
            program: "/nonexistent/ceph-census-test-binary".to_string(),
            base_args: Vec::new(),
            verbose: false,
        };
        let err = cli.run(&["-s"]).await.unwrap_err();
        assert!(matches!(err, CensusError::Spawn { .. }));
    }
}
