//! HTTP transport layer.
//!
//! Every request the client makes is a single JSON round trip, so the
//! transport is a small trait: send one [`HttpRequest`], get back the status
//! code and the raw body. [`ReqwestTransport`] talks to a real server;
//! [`MockTransport`] replays scripted answers for tests.

mod http;
mod mock;

pub use http::ReqwestTransport;
pub use mock::MockTransport;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::error::{Db2Error, Result};

/// HTTP methods used by the Db2 REST protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Post,
    Put,
}

impl Method {
    /// Returns the method as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Post => "POST",
            Self::Put => "PUT",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One outgoing request.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    /// Value of the `authorization` header, sent verbatim (no scheme prefix).
    pub authorization: Option<String>,
    /// JSON body, if any.
    pub body: Option<Value>,
}

impl HttpRequest {
    /// Creates a POST request without body or authorization.
    pub fn post(url: impl Into<String>) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            authorization: None,
            body: None,
        }
    }

    /// Creates a PUT request without body or authorization.
    pub fn put(url: impl Into<String>) -> Self {
        Self {
            method: Method::Put,
            url: url.into(),
            authorization: None,
            body: None,
        }
    }

    /// Sets the `authorization` header value.
    pub fn with_authorization(mut self, token: impl Into<String>) -> Self {
        self.authorization = Some(token.into());
        self
    }

    /// Serializes `body` as the JSON request body.
    pub fn with_json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self> {
        let value = serde_json::to_value(body)
            .map_err(|e| Db2Error::encode(format!("Failed to serialize request body: {e}")))?;
        self.body = Some(value);
        Ok(self)
    }
}

/// The status and raw body of one response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    /// Creates a response.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Turns the response into an `InvalidResponse` error carrying the raw body.
    pub fn into_error(self) -> Db2Error {
        Db2Error::invalid_response(self.status, self.body)
    }
}

/// Trait for sending requests to the Db2 REST service.
///
/// Implementations must be thread-safe (Send + Sync): a session and its job
/// handles share one transport across tasks.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Sends a request and returns whatever status the server answered with.
    ///
    /// Only failures to complete the round trip are errors here; non-2xx
    /// statuses are interpreted by the caller.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}
