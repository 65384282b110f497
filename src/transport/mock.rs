//! Mock transport for testing.
//!
//! Replays scripted responses in order and records every request it sees.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use super::{HttpRequest, HttpResponse, HttpTransport, Method};
use crate::error::{Db2Error, Result};

#[derive(Debug, Clone)]
enum Reply {
    Response(HttpResponse),
    Failure(String),
}

/// A transport that answers from a FIFO script instead of the network.
///
/// When the script runs dry every further request fails with a transport error.
#[derive(Debug, Default)]
pub struct MockTransport {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<HttpRequest>>,
    latency: Option<Duration>,
}

impl MockTransport {
    /// Creates a mock with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a response with a raw body.
    pub fn with_response(self, status: u16, body: impl Into<String>) -> Self {
        self.push_response(status, body);
        self
    }

    /// Appends a response with a JSON body.
    pub fn with_json(self, status: u16, body: Value) -> Self {
        self.push_response(status, body.to_string());
        self
    }

    /// Appends a failed round trip (connection reset, timeout, ...).
    pub fn with_failure(self, msg: impl Into<String>) -> Self {
        self.push(Reply::Failure(msg.into()));
        self
    }

    /// Delays every response by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Appends a response to a mock that is already shared.
    pub fn push_response(&self, status: u16, body: impl Into<String>) {
        self.push(Reply::Response(HttpResponse::new(status, body)));
    }

    fn push(&self, reply: Reply) {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(reply);
        }
    }

    /// All requests sent so far, oldest first.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    /// Number of requests sent so far.
    pub fn request_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }

    /// Requests with the given method whose URL path ends with `suffix`.
    pub fn requests_matching(&self, method: Method, suffix: &str) -> Vec<HttpRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && r.url.ends_with(suffix))
            .collect()
    }

    /// Number of scripted replies not yet consumed.
    pub fn remaining(&self) -> usize {
        self.replies.lock().map(|r| r.len()).unwrap_or(0)
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let url = request.url.clone();
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }
        let reply = self.replies.lock().ok().and_then(|mut r| r.pop_front());

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        match reply {
            Some(Reply::Response(response)) => Ok(response),
            Some(Reply::Failure(msg)) => Err(Db2Error::transport(msg)),
            None => Err(Db2Error::transport(format!(
                "MockTransport: no scripted response for {url}"
            ))),
        }
    }
}
