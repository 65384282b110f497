//! Configuration file loading.
//!
//! Every connection here sets all fields explicitly so that DB2_* variables in
//! the test environment cannot leak into the results.

use std::io::Write;
use std::time::Duration;

use db2_rest::config::{DEFAULT_DB_PORT, DEFAULT_POLL_INTERVAL_MS};
use db2_rest::{Config, PollPolicy};
use pretty_assertions::assert_eq;
use tempfile::NamedTempFile;
use tokio_test::{assert_err, assert_ok};

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(content.as_bytes()).expect("write config");
    file
}

const FULL: &str = r#"
[poll]
interval_ms = 500
max_retries = 120

[connections.default]
host = "db2.local"
database = "SAMPLE"
db_port = 50000
rest_port = 50050
ssl_db2 = false
ssl_rest = false
user = "db2inst1"
password = "pw"
expiry_time = "1h"
timeout_secs = 15

[connections.cloud]
host = "db2.cloud.example.com"
database = "BLUDB"
db_port = 50001
rest_port = 50443
ssl_db2 = true
ssl_rest = true
user = "reporting"
password = "pw"
expiry_time = "8h"
timeout_secs = 30
"#;

#[test]
fn test_load_and_resolve_named_connection() {
    let file = write_config(FULL);
    let config = Config::load_from_file(file.path()).unwrap();

    assert_eq!(
        config.poll,
        PollPolicy {
            interval_ms: 500,
            max_retries: Some(120)
        }
    );
    assert_eq!(config.poll.interval(), Duration::from_millis(500));

    let cloud = assert_ok!(config.resolve_settings(Some("cloud")));
    assert_eq!(cloud.hostname, "db2.cloud.example.com");
    assert_eq!(cloud.rest_port, 50443);
    assert!(cloud.ssl_db2);
    assert_eq!(cloud.url_scheme(), "https");
    assert_eq!(cloud.timeout(), Duration::from_secs(30));
    assert_eq!(
        cloud.base_url().unwrap().as_str(),
        "https://db2.cloud.example.com:50443/"
    );
}

#[test]
fn test_default_connection_when_unnamed() {
    let file = write_config(FULL);
    let config = Config::load_from_file(file.path()).unwrap();

    let settings = config.resolve_settings(None).unwrap();
    assert_eq!(settings.database, "SAMPLE");
    assert_eq!(settings.db_port, DEFAULT_DB_PORT);
    assert_eq!(
        settings.display_string(),
        "db2inst1@SAMPLE on db2.local:50000 (rest http://db2.local:50050)"
    );
}

#[test]
fn test_unknown_connection_name() {
    let file = write_config(FULL);
    let config = Config::load_from_file(file.path()).unwrap();

    let err = assert_err!(config.resolve_settings(Some("staging")));
    assert_eq!(err.category(), "Configuration Error");
    assert!(err.to_string().contains("staging"));
}

#[test]
fn test_missing_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::load_from_file(&dir.path().join("absent.toml")).unwrap();

    assert!(config.connections.is_empty());
    assert_eq!(config.poll.interval_ms, DEFAULT_POLL_INTERVAL_MS);
    assert_eq!(config.poll.max_retries, None);
}

#[test]
fn test_malformed_file_names_the_path() {
    let file = write_config("[connections.default\nhost = ");
    let err = Config::load_from_file(file.path()).unwrap_err();

    assert_eq!(err.category(), "Configuration Error");
    assert!(err.to_string().contains(&file.path().display().to_string()));
}

#[test]
fn test_invalid_values_are_rejected() {
    let file = write_config(
        r#"
[connections.default]
host = "db2.local"
database = "SAMPLE"
db_port = 50000
rest_port = 50050
ssl_db2 = false
ssl_rest = false
user = "db2inst1"
password = "pw"
expiry_time = "1h"
timeout_secs = 0
"#,
    );
    let config = Config::load_from_file(file.path()).unwrap();

    let err = config.resolve_settings(None).unwrap_err();
    assert!(err.to_string().contains("timeout_secs"));
}

#[test]
fn test_default_path_is_under_app_dir() {
    let path = Config::default_path();
    assert!(path.ends_with("db2-rest/config.toml"));
}
