/*!
Recording HTTP transport

Stands in for the aggregation endpoint: every request is recorded and
answered with a scripted status and body.
*/

use async_trait::async_trait;
use census_agent::publisher::{HttpReply, Transport};
use serde_json::Value;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: String,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub body: Option<String>,
}

#[derive(Clone)]
pub struct RecordingTransport {
    reply: Arc<Mutex<HttpReply>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl RecordingTransport {
    pub fn new(status: u16) -> Self {
        Self {
            reply: Arc::new(Mutex::new(HttpReply {
                status,
                body: String::new(),
            })),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Script the reply for every following request
    pub fn set_reply(&self, status: u16, body: &str) {
        *self.reply.lock().unwrap() = HttpReply {
            status,
            body: body.to_string(),
        };
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Body of the last PUT, parsed as JSON
    pub fn last_put_json(&self) -> anyhow::Result<Option<Value>> {
        let requests = self.requests.lock().unwrap();
        match requests.iter().rev().find(|r| r.method == "PUT") {
            Some(RecordedRequest { body: Some(body), .. }) => Ok(Some(serde_json::from_str(body)?)),
            _ => Ok(None),
        }
    }

    fn record(&self, request: RecordedRequest) -> HttpReply {
        log::info!("[MOCK] {} {}", request.method, request.url);
        self.requests.lock().unwrap().push(request);
        self.reply.lock().unwrap().clone()
    }
}

impl Default for RecordingTransport {
    fn default() -> Self {
        Self::new(201)
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn put(&self, url: &str, body: String) -> census_agent::Result<HttpReply> {
        Ok(self.record(RecordedRequest {
            method: "PUT".to_string(),
            url: url.to_string(),
            query: Vec::new(),
            body: Some(body),
        }))
    }

    async fn delete(&self, url: &str, query: &[(&str, &str)]) -> census_agent::Result<HttpReply> {
        Ok(self.record(RecordedRequest {
            method: "DELETE".to_string(),
            url: url.to_string(),
            query: query
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            body: None,
        }))
    }
}
