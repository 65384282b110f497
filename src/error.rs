//! Error types for the Db2 REST client.
//!
//! Defines the main error enum used throughout the crate. A job whose status
//! is `Failed` is not an error: it comes back as data inside a
//! [`Response`](crate::job::Response).

use thiserror::Error;

/// Main error type for Db2 REST operations.
#[derive(Error, Debug)]
pub enum Db2Error {
    /// Settings that cannot produce a usable endpoint (bad host, missing fields, bad config file).
    #[error("Configuration error: {0}")]
    InvalidConfiguration(String),

    /// The auth endpoint rejected the credentials or returned no token.
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// The server answered with an unexpected HTTP status. The raw body is kept for diagnostics.
    #[error("Invalid response (HTTP {status}): {body}")]
    InvalidResponse { status: u16, body: String },

    /// Connection failures, timeouts and unreadable response bodies.
    #[error("Transport error: {0}")]
    Transport(String),

    /// A request body could not be serialized.
    #[error("Encode error: {0}")]
    Encode(String),

    /// A response body could not be decoded (including unknown job status ordinals).
    #[error("Decode error: {0}")]
    Decode(String),

    /// The caller's operation was cancelled.
    #[error("Operation cancelled")]
    Cancelled,

    /// The configured retry budget ran out while the job was still running.
    #[error("Job still running after {0} retries")]
    PollTimeout(u32),
}

impl Db2Error {
    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Creates an authentication error with the given message.
    pub fn authentication(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Creates an invalid response error from a status code and raw body.
    pub fn invalid_response(status: u16, body: impl Into<String>) -> Self {
        Self::InvalidResponse {
            status,
            body: body.into(),
        }
    }

    /// Creates a transport error with the given message.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Creates an encode error with the given message.
    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidConfiguration(_) => "Configuration Error",
            Self::Authentication(_) => "Authentication Error",
            Self::InvalidResponse { .. } => "Invalid Response",
            Self::Transport(_) => "Transport Error",
            Self::Encode(_) => "Encode Error",
            Self::Decode(_) => "Decode Error",
            Self::Cancelled => "Cancelled",
            Self::PollTimeout(_) => "Poll Timeout",
        }
    }

    /// Returns the raw server body for errors that carry one.
    pub fn response_body(&self) -> Option<&str> {
        match self {
            Self::InvalidResponse { body, .. } => Some(body),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Db2Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Result type alias using Db2Error.
pub type Result<T> = std::result::Result<T, Db2Error>;
