//! Authenticated session against the Db2 REST service.
//!
//! A session performs exactly one authentication exchange when it is opened
//! and keeps the returned token for its whole lifetime. The token is never
//! renewed: once the requested expiry passes, every call fails with whatever
//! the server answers for an expired token.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

use crate::config::Settings;
use crate::error::{Db2Error, Result};
use crate::transport::{HttpRequest, HttpTransport, ReqwestTransport};

/// An authenticated connection to the REST service.
pub struct Session {
    settings: Settings,
    base_url: Url,
    token: String,
    transport: Arc<dyn HttpTransport>,
}

impl Session {
    /// Authenticates over a reqwest transport configured from `settings`.
    pub async fn open(settings: Settings) -> Result<Self> {
        let transport = ReqwestTransport::new(settings.timeout())?;
        Self::open_with(settings, Arc::new(transport)).await
    }

    /// Authenticates over the given transport.
    pub async fn open_with(settings: Settings, transport: Arc<dyn HttpTransport>) -> Result<Self> {
        settings.validate()?;
        let base_url = settings.base_url()?;
        let auth_url = join_segments(&base_url, &["v1", "auth"])?;

        info!("Authenticating {}", settings.display_string());

        let request = HttpRequest::post(auth_url).with_json(&AuthBody::from(&settings))?;
        let response = transport.send(request).await?;

        if response.status != 200 {
            debug!(status = response.status, "authentication rejected");
            return Err(Db2Error::authentication(response.body));
        }

        let reply: AuthReply = serde_json::from_str(&response.body)
            .map_err(|e| Db2Error::authentication(format!("No token in auth response: {e}")))?;
        if reply.token.trim().is_empty() {
            return Err(Db2Error::authentication("Auth response carried an empty token"));
        }

        info!("Authenticated to {}", settings.database);

        Ok(Self {
            settings,
            base_url,
            token: reply.token,
            transport,
        })
    }

    /// Connection settings this session was opened with.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The auth token, sent verbatim in the `authorization` header.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Transport shared by this session and its job handles.
    pub fn transport(&self) -> &Arc<dyn HttpTransport> {
        &self.transport
    }

    /// `POST /v1/services/{service}/{version}`.
    pub fn service_url(&self, service: &str, version: &str) -> Result<String> {
        join_segments(&self.base_url, &["v1", "services", service, version])
    }

    /// `POST /v1/services/execsql`.
    pub fn execsql_url(&self) -> Result<String> {
        join_segments(&self.base_url, &["v1", "services", "execsql"])
    }

    /// `POST /v1/services/{job_id}`: next page of a job.
    pub fn job_page_url(&self, job_id: &str) -> Result<String> {
        join_segments(&self.base_url, &["v1", "services", job_id])
    }

    /// `PUT /v1/services/stop/{job_id}`.
    pub fn job_stop_url(&self, job_id: &str) -> Result<String> {
        join_segments(&self.base_url, &["v1", "services", "stop", job_id])
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("settings", &self.settings)
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

/// Appends percent-encoded path segments to the base URL.
fn join_segments(base: &Url, segments: &[&str]) -> Result<String> {
    if segments.iter().any(|s| s.is_empty()) {
        return Err(Db2Error::config(format!(
            "Empty path segment in {:?}",
            segments
        )));
    }
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| Db2Error::config(format!("{base} cannot carry a path")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url.into())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthBody<'a> {
    db_parms: DbParms<'a>,
    expiry_time: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DbParms<'a> {
    db_host: &'a str,
    db_name: &'a str,
    db_port: u16,
    #[serde(rename = "isSSLConnection")]
    is_ssl_connection: bool,
    password: &'a str,
    username: &'a str,
}

impl<'a> From<&'a Settings> for AuthBody<'a> {
    fn from(settings: &'a Settings) -> Self {
        Self {
            db_parms: DbParms {
                db_host: &settings.hostname,
                db_name: &settings.database,
                db_port: settings.db_port,
                is_ssl_connection: settings.ssl_db2,
                password: &settings.password,
                username: &settings.username,
            },
            expiry_time: &settings.expiry_time,
        }
    }
}

#[derive(Debug, Deserialize)]
struct AuthReply {
    token: String,
}
