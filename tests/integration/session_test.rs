//! Session authentication and URL layout.

use std::sync::Arc;

use db2_rest::transport::{HttpTransport, Method, MockTransport};
use db2_rest::{Db2Error, Dispatcher, Session};
use pretty_assertions::assert_eq;
use serde_json::json;

use super::common::{open_session, settings, JOB_ID};

#[tokio::test]
async fn test_auth_request_shape() {
    let mock = Arc::new(MockTransport::new());
    let session = open_session(&mock).await;

    assert_eq!(session.token(), "test-token");

    let auth = &mock.requests_matching(Method::Post, "/v1/auth")[0];
    assert_eq!(auth.url, "http://db2.test.local:50050/v1/auth");
    assert_eq!(auth.authorization, None);
    assert_eq!(
        auth.body,
        Some(json!({
            "dbParms": {
                "dbHost": "db2.test.local",
                "dbName": "SAMPLE",
                "dbPort": 50000,
                "isSSLConnection": false,
                "username": "db2inst1",
                "password": "password"
            },
            "expiryTime": "1h"
        }))
    );
}

#[tokio::test]
async fn test_tls_settings_change_scheme_and_flag() {
    let mock = Arc::new(MockTransport::new().with_json(200, json!({"token": "t"})));
    let settings = settings()
        .with_tls(true, true)
        .with_rest_port(50443)
        .with_db_port(50001)
        .with_expiry_time("30m");

    Session::open_with(settings, Arc::clone(&mock) as Arc<dyn HttpTransport>)
        .await
        .unwrap();

    let auth = mock.requests().remove(0);
    assert_eq!(auth.url, "https://db2.test.local:50443/v1/auth");
    let body = auth.body.unwrap();
    assert_eq!(body["dbParms"]["isSSLConnection"], json!(true));
    assert_eq!(body["dbParms"]["dbPort"], json!(50001));
    assert_eq!(body["expiryTime"], json!("30m"));
}

#[tokio::test]
async fn test_rejected_credentials() {
    let mock = Arc::new(MockTransport::new().with_response(401, "Invalid credentials"));

    let err = Session::open_with(settings(), Arc::clone(&mock) as Arc<dyn HttpTransport>)
        .await
        .unwrap_err();

    assert!(matches!(err, Db2Error::Authentication(_)));
    assert!(err.to_string().contains("Invalid credentials"));
}

#[tokio::test]
async fn test_reply_without_token() {
    let mock = Arc::new(MockTransport::new().with_json(200, json!({"message": "ok"})));

    let err = Session::open_with(settings(), Arc::clone(&mock) as Arc<dyn HttpTransport>)
        .await
        .unwrap_err();

    assert_eq!(err.category(), "Authentication Error");
}

#[tokio::test]
async fn test_invalid_settings_never_reach_the_server() {
    let mock = Arc::new(MockTransport::new());
    let mut bad = settings();
    bad.hostname = String::new();

    let err = Session::open_with(bad, Arc::clone(&mock) as Arc<dyn HttpTransport>)
        .await
        .unwrap_err();

    assert_eq!(err.category(), "Configuration Error");
    assert_eq!(mock.request_count(), 0);
}

#[tokio::test]
async fn test_endpoint_urls() {
    let mock = Arc::new(MockTransport::new());
    let session = open_session(&mock).await;

    assert_eq!(
        session.service_url("GetDept", "1.0").unwrap(),
        "http://db2.test.local:50050/v1/services/GetDept/1.0"
    );
    assert_eq!(
        session.execsql_url().unwrap(),
        "http://db2.test.local:50050/v1/services/execsql"
    );
    assert_eq!(
        session.job_page_url(JOB_ID).unwrap(),
        format!("http://db2.test.local:50050/v1/services/{JOB_ID}")
    );
    assert_eq!(
        session.job_stop_url(JOB_ID).unwrap(),
        format!("http://db2.test.local:50050/v1/services/stop/{JOB_ID}")
    );
    assert!(session.service_url("", "1.0").is_err());
}

#[tokio::test]
async fn test_token_reused_for_every_call() {
    let mock = Arc::new(MockTransport::new());
    let dispatcher = Dispatcher::new(open_session(&mock).await);
    mock.push_response(200, "{}");
    mock.push_response(200, "{}");

    dispatcher
        .run_sync_statement_sql("COMMIT", json!({}))
        .await
        .unwrap();
    dispatcher
        .run_sync_statement_service("Noop", "1", json!({}))
        .await
        .unwrap();

    let requests = mock.requests();
    assert_eq!(requests.len(), 3);
    assert_eq!(mock.requests_matching(Method::Post, "/v1/auth").len(), 1);
    assert!(requests[1..]
        .iter()
        .all(|r| r.authorization.as_deref() == Some("test-token")));
}

#[tokio::test]
async fn test_debug_output_hides_password_and_token() {
    let mock = Arc::new(MockTransport::new().with_json(200, json!({"token": "tok-8f2a"})));
    let mut settings = settings();
    settings.password = "hunter2-db2".to_string();
    let session = Session::open_with(settings, Arc::clone(&mock) as Arc<dyn HttpTransport>)
        .await
        .unwrap();

    let debug = format!("{session:?}");
    assert!(!debug.contains("hunter2-db2"));
    assert!(!debug.contains("tok-8f2a"));
    assert!(debug.contains("<redacted>"));
}
