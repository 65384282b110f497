//! Configuration management for the Db2 REST client.
//!
//! Handles connection settings, the job poll policy, loading configuration
//! from TOML files and filling gaps from environment variables.

use crate::error::{Db2Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Default Db2 database port.
pub const DEFAULT_DB_PORT: u16 = 50000;

/// Default Db2 REST service port.
pub const DEFAULT_REST_PORT: u16 = 50050;

/// Default token lifetime requested from the auth endpoint.
pub const DEFAULT_EXPIRY_TIME: &str = "1h";

/// Default timeout for a single HTTP round trip.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Default delay between polls while a job is `New` or `Running`.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// Immutable connection and authentication settings for one session.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Host running both Db2 and the REST service.
    pub hostname: String,
    /// Database name.
    pub database: String,
    /// Port of the Db2 database itself (used by the REST service, not by us).
    #[serde(default = "default_db_port")]
    pub db_port: u16,
    /// Port of the REST service.
    #[serde(default = "default_rest_port")]
    pub rest_port: u16,
    /// Whether the REST service connects to Db2 over TLS.
    #[serde(default)]
    pub ssl_db2: bool,
    /// Whether we talk to the REST service over HTTPS.
    #[serde(default)]
    pub ssl_rest: bool,
    /// Database user.
    pub username: String,
    /// Database password.
    #[serde(default)]
    pub password: String,
    /// Requested token lifetime, in the server's notation (e.g. "1h", "30m").
    #[serde(default = "default_expiry_time")]
    pub expiry_time: String,
    /// Timeout for a single HTTP round trip, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_db_port() -> u16 {
    DEFAULT_DB_PORT
}

fn default_rest_port() -> u16 {
    DEFAULT_REST_PORT
}

fn default_expiry_time() -> String {
    DEFAULT_EXPIRY_TIME.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Settings {
    /// Creates settings with default ports, no TLS and the default expiry.
    pub fn new(
        hostname: impl Into<String>,
        database: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            hostname: hostname.into(),
            database: database.into(),
            db_port: DEFAULT_DB_PORT,
            rest_port: DEFAULT_REST_PORT,
            ssl_db2: false,
            ssl_rest: false,
            username: username.into(),
            password: password.into(),
            expiry_time: DEFAULT_EXPIRY_TIME.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Sets the database port.
    pub fn with_db_port(mut self, port: u16) -> Self {
        self.db_port = port;
        self
    }

    /// Sets the REST service port.
    pub fn with_rest_port(mut self, port: u16) -> Self {
        self.rest_port = port;
        self
    }

    /// Sets TLS for the database leg and the REST leg.
    pub fn with_tls(mut self, ssl_db2: bool, ssl_rest: bool) -> Self {
        self.ssl_db2 = ssl_db2;
        self.ssl_rest = ssl_rest;
        self
    }

    /// Sets the requested token lifetime.
    pub fn with_expiry_time(mut self, expiry: impl Into<String>) -> Self {
        self.expiry_time = expiry.into();
        self
    }

    /// Sets the per-request timeout.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Loads settings purely from environment variables (and `.env`, if present).
    ///
    /// Reads `DB2_HOST`, `DB2_DATABASE`, `DB2_PORT`, `DB2_REST_PORT`, `DB2_SSL`,
    /// `DB2_REST_SSL`, `DB2_USER`, `DB2_PASSWORD` and `DB2_TOKEN_EXPIRY`.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        let mut conn = ConnectionConfig::default();
        conn.apply_env_defaults();
        conn.into_settings()
    }

    /// URL scheme for the REST leg.
    pub fn url_scheme(&self) -> &'static str {
        if self.ssl_rest {
            "https"
        } else {
            "http"
        }
    }

    /// Base URL of the REST service, e.g. `http://db2host:50050/`.
    pub fn base_url(&self) -> Result<Url> {
        if self.hostname.trim().is_empty() {
            return Err(Db2Error::config("hostname must not be empty"));
        }
        let raw = format!(
            "{}://{}:{}/",
            self.url_scheme(),
            self.hostname,
            self.rest_port
        );
        Url::parse(&raw).map_err(|e| Db2Error::config(format!("Invalid REST URL '{raw}': {e}")))
    }

    /// Per-request timeout as a Duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Checks that the settings can produce a session.
    pub fn validate(&self) -> Result<()> {
        if self.database.trim().is_empty() {
            return Err(Db2Error::config("database must not be empty"));
        }
        if self.username.trim().is_empty() {
            return Err(Db2Error::config("username must not be empty"));
        }
        if self.timeout_secs == 0 {
            return Err(Db2Error::config("timeout_secs must be greater than zero"));
        }
        self.base_url().map(|_| ())
    }

    /// Returns a display-safe string (no password).
    pub fn display_string(&self) -> String {
        format!(
            "{}@{} on {}:{} (rest {}://{}:{})",
            self.username,
            self.database,
            self.hostname,
            self.db_port,
            self.url_scheme(),
            self.hostname,
            self.rest_port
        )
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("hostname", &self.hostname)
            .field("database", &self.database)
            .field("db_port", &self.db_port)
            .field("rest_port", &self.rest_port)
            .field("ssl_db2", &self.ssl_db2)
            .field("ssl_rest", &self.ssl_rest)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("expiry_time", &self.expiry_time)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// How a job handle waits for a running job.
///
/// The default never gives up: long database jobs are polled until they reach
/// a terminal status or a request fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollPolicy {
    /// Delay between polls while the job is `New` or `Running`, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub interval_ms: u64,
    /// Retries allowed within one `poll` call. `None` means unbounded.
    #[serde(default)]
    pub max_retries: Option<u32>,
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_POLL_INTERVAL_MS,
            max_retries: None,
        }
    }
}

impl PollPolicy {
    /// Sets the retry interval, rounded up to whole milliseconds (at least one).
    pub fn with_interval(mut self, interval: Duration) -> Self {
        let millis = interval.as_nanos().div_ceil(1_000_000);
        self.interval_ms = u64::try_from(millis).unwrap_or(u64::MAX).max(1);
        self
    }

    /// Caps the number of retries within one `poll` call.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Retry interval as a Duration. Never zero.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }

    /// Checks that the policy waits between polls.
    pub fn validate(&self) -> Result<()> {
        if self.interval_ms == 0 {
            return Err(Db2Error::config("poll.interval_ms must be greater than zero"));
        }
        Ok(())
    }
}

/// Main configuration file structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Job poll policy shared by all connections.
    #[serde(default)]
    pub poll: PollPolicy,

    /// Named connections.
    #[serde(default)]
    pub connections: HashMap<String, ConnectionConfig>,
}

/// A connection as written in the config file; every field may be left to the environment.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ConnectionConfig {
    pub host: Option<String>,
    pub database: Option<String>,
    pub db_port: Option<u16>,
    pub rest_port: Option<u16>,
    pub ssl_db2: Option<bool>,
    pub ssl_rest: Option<bool>,
    pub user: Option<String>,
    /// Not recommended to store in config; prefer `DB2_PASSWORD`.
    pub password: Option<String>,
    pub expiry_time: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("database", &self.database)
            .field("db_port", &self.db_port)
            .field("rest_port", &self.rest_port)
            .field("ssl_db2", &self.ssl_db2)
            .field("ssl_rest", &self.ssl_rest)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("expiry_time", &self.expiry_time)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl ConnectionConfig {
    /// Applies environment variables (`DB2_HOST`, `DB2_PORT`, ...) to unset fields.
    pub fn apply_env_defaults(&mut self) {
        if self.host.is_none() {
            self.host = env_string("DB2_HOST");
        }
        if self.database.is_none() {
            self.database = env_string("DB2_DATABASE");
        }
        if self.db_port.is_none() {
            self.db_port = env_string("DB2_PORT").and_then(|p| p.parse().ok());
        }
        if self.rest_port.is_none() {
            self.rest_port = env_string("DB2_REST_PORT").and_then(|p| p.parse().ok());
        }
        if self.ssl_db2.is_none() {
            self.ssl_db2 = env_string("DB2_SSL").and_then(|v| parse_flag(&v));
        }
        if self.ssl_rest.is_none() {
            self.ssl_rest = env_string("DB2_REST_SSL").and_then(|v| parse_flag(&v));
        }
        if self.user.is_none() {
            self.user = env_string("DB2_USER");
        }
        if self.password.is_none() {
            self.password = env_string("DB2_PASSWORD");
        }
        if self.expiry_time.is_none() {
            self.expiry_time = env_string("DB2_TOKEN_EXPIRY");
        }
    }

    /// Resolves into validated settings, filling unset optional fields with defaults.
    pub fn into_settings(self) -> Result<Settings> {
        let hostname = self
            .host
            .ok_or_else(|| Db2Error::config("Missing host (set `host` or DB2_HOST)"))?;
        let database = self
            .database
            .ok_or_else(|| Db2Error::config("Missing database (set `database` or DB2_DATABASE)"))?;
        let username = self
            .user
            .ok_or_else(|| Db2Error::config("Missing user (set `user` or DB2_USER)"))?;

        let settings = Settings {
            hostname,
            database,
            db_port: self.db_port.unwrap_or(DEFAULT_DB_PORT),
            rest_port: self.rest_port.unwrap_or(DEFAULT_REST_PORT),
            ssl_db2: self.ssl_db2.unwrap_or(false),
            ssl_rest: self.ssl_rest.unwrap_or(false),
            username,
            password: self.password.unwrap_or_default(),
            expiry_time: self
                .expiry_time
                .unwrap_or_else(|| DEFAULT_EXPIRY_TIME.to_string()),
            timeout_secs: self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
        };
        settings.validate()?;
        Ok(settings)
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl Config {
    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("db2-rest")
            .join("config.toml")
    }

    /// Loads configuration from a TOML file. A missing file yields the defaults.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| Db2Error::config(format!("Failed to read config file: {e}")))?;

        Self::parse_toml(&content, path)
    }

    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| {
            Db2Error::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })?;
        config.poll.validate()?;
        Ok(config)
    }

    /// Gets a named connection, or the default connection if name is None.
    pub fn get_connection(&self, name: Option<&str>) -> Option<&ConnectionConfig> {
        let key = name.unwrap_or("default");
        self.connections.get(key)
    }

    /// Resolves a named connection (environment filling the gaps) into settings.
    pub fn resolve_settings(&self, name: Option<&str>) -> Result<Settings> {
        let mut conn = match self.get_connection(name) {
            Some(conn) => conn.clone(),
            None if name.is_some() => {
                return Err(Db2Error::config(format!(
                    "Connection '{}' not found in config file",
                    name.unwrap_or_default()
                )))
            }
            None => ConnectionConfig::default(),
        };
        conn.apply_env_defaults();
        conn.into_settings()
    }
}
