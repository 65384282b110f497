//! reqwest-backed transport.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use super::{HttpRequest, HttpResponse, HttpTransport, Method};
use crate::error::{Db2Error, Result};

/// Transport over a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Creates a transport whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Db2Error::transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// Wraps an existing client (custom TLS roots, proxies, ...).
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut builder = match request.method {
            Method::Post => self.client.post(&request.url),
            Method::Put => self.client.put(&request.url),
        };
        if let Some(token) = &request.authorization {
            builder = builder.header("authorization", token);
        }
        if let Some(body) = &request.body {
            // .json() also sets Content-Type: application/json
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                Db2Error::transport(format!("Request to {} timed out", request.url))
            } else if e.is_connect() {
                Db2Error::transport(format!("Failed to connect to {}: {}", request.url, e))
            } else {
                Db2Error::transport(format!("Request failed: {}", e))
            }
        })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| Db2Error::transport(format!("Failed to read response: {}", e)))?;

        debug!(method = %request.method, url = %request.url, status, "round trip complete");

        Ok(HttpResponse { status, body })
    }
}
