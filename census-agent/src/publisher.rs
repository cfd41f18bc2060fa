//! Publication of census reports
//!
//! One PUT publishes, one DELETE retracts. Success is a single exact status
//! code; anything else is reported to the caller. No retries.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::CensusConfig;
use crate::error::{CensusError, Result};
use crate::report::Report;

pub const PUBLISH_OK: u16 = 201;
pub const UNPUBLISH_OK: u16 = 200;

/// Status and body of an HTTP response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

/// HTTP seam used by [`Publisher`]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn put(&self, url: &str, body: String) -> Result<HttpReply>;
    async fn delete(&self, url: &str, query: &[(&str, &str)]) -> Result<HttpReply>;
}

/// [`Transport`] over `reqwest`
pub struct HttpTransport {
    client: reqwest::Client,
    verbose: bool,
}

impl HttpTransport {
    pub fn new(config: &CensusConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("ceph-census/", env!("CARGO_PKG_VERSION")));
        if let Some(secs) = config.http_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            client: builder.build()?,
            verbose: config.verbose,
        })
    }

    fn trace(&self, method: &str, url: &str) {
        if self.verbose {
            info!("{} {}", method, url);
        } else {
            debug!("{} {}", method, url);
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn put(&self, url: &str, body: String) -> Result<HttpReply> {
        self.trace("PUT", url);
        let response = self
            .client
            .put(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status().as_u16();
        Ok(HttpReply {
            status,
            body: response.text().await?,
        })
    }

    async fn delete(&self, url: &str, query: &[(&str, &str)]) -> Result<HttpReply> {
        self.trace("DELETE", url);
        let response = self.client.delete(url).query(query).send().await?;

        let status = response.status().as_u16();
        Ok(HttpReply {
            status,
            body: response.text().await?,
        })
    }
}

pub struct Publisher {
    transport: Arc<dyn Transport>,
}

impl Publisher {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// PUT the report to `url`. Only HTTP 201 counts as success.
    pub async fn publish(&self, report: &Report, url: Option<&str>) -> Result<()> {
        let url = url.ok_or_else(|| {
            CensusError::Configuration(
                "Cannot publish until a URL is set using update-metadata".to_string(),
            )
        })?;

        let body = report.to_json_pretty()?;
        let reply = self.transport.put(url, body).await?;
        if reply.status != PUBLISH_OK {
            return Err(CensusError::Publish {
                status: reply.status,
                body: reply.body,
            });
        }

        info!("Report {} published to {}", report.uuid, url);
        Ok(())
    }

    /// DELETE `url?uuid=<identity>`. Only HTTP 200 counts as success.
    pub async fn unpublish(&self, identity: &str, url: &str) -> Result<()> {
        let reply = self.transport.delete(url, &[("uuid", identity)]).await?;
        if reply.status != UNPUBLISH_OK {
            return Err(CensusError::Unpublish {
                status: reply.status,
            });
        }

        info!("Report {} withdrawn from {}", identity, url);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::histogram::Histogram;
    use crate::metrics::CountSummary;
    use std::sync::Mutex;

    struct Scripted {
        status: u16,
        calls: Mutex<Vec<String>>,
    }

    impl Scripted {
        fn new(status: u16) -> Arc<Self> {
            Arc::new(Self {
                status,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn reply(&self) -> Result<HttpReply> {
            Ok(HttpReply {
                status: self.status,
                body: "server says no".to_string(),
            })
        }
    }

    #[async_trait]
    impl Transport for Scripted {
        async fn put(&self, url: &str, _body: String) -> Result<HttpReply> {
            self.calls.lock().unwrap().push(format!("PUT {}", url));
            self.reply()
        }

        async fn delete(&self, url: &str, query: &[(&str, &str)]) -> Result<HttpReply> {
            self.calls.lock().unwrap().push(format!("DELETE {} {:?}", url, query));
            self.reply()
        }
    }

    fn report() -> Report {
        Report {
            uuid: "u-1".to_string(),
            cluster_creation_date: "2014-03-11".to_string(),
            components_count: CountSummary {
                num_mons: 1,
                num_osds: 0,
                num_mdss: 0,
                num_pgs: 0,
                num_data_bytes: 0,
                num_bytes_total: 0,
                num_pools: 0,
                num_objects: 0,
            },
            crush_types: Histogram::new("type"),
            pool_metadata: Vec::new(),
            sysinfo: None,
            ownership: None,
        }
    }

    #[tokio::test]
    async fn test_publish_requires_url() {
        let transport = Scripted::new(PUBLISH_OK);
        let publisher = Publisher::new(transport.clone());
        let err = publisher.publish(&report(), None).await.unwrap_err();
        assert!(matches!(err, CensusError::Configuration(_)));
        assert!(transport.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_publish_status_handling() {
        let publisher = Publisher::new(Scripted::new(201));
        publisher.publish(&report(), Some("http://brag/")).await.unwrap();

        let publisher = Publisher::new(Scripted::new(200));
        match publisher.publish(&report(), Some("http://brag/")).await {
            Err(CensusError::Publish { status, body }) => {
                assert_eq!(status, 200);
                assert_eq!(body, "server says no");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unpublish_sends_identity() {
        let transport = Scripted::new(UNPUBLISH_OK);
        let publisher = Publisher::new(transport.clone());
        publisher.unpublish("u-1", "http://brag/").await.unwrap();
        assert_eq!(
            transport.calls.lock().unwrap()[0],
            r#"DELETE http://brag/ [("uuid", "u-1")]"#
        );

        let publisher = Publisher::new(Scripted::new(404));
        assert!(matches!(
            publisher.unpublish("u-1", "http://brag/").await,
            Err(CensusError::Unpublish { status: 404 })
        ));
    }

    #[test]
    fn test_http_transport_honors_timeout() {
        let config = CensusConfig {
            http_timeout_secs: Some(5),
            ..Default::default()
        };
        assert!(HttpTransport::new(&config).is_ok());
    }
}
