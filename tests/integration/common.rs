//! Shared fixtures for integration tests.

use std::sync::Arc;
use std::time::Duration;

use db2_rest::transport::{HttpTransport, Method, MockTransport};
use db2_rest::{Dispatcher, PollPolicy, Session, Settings};
use serde_json::{json, Value};

pub const JOB_ID: &str = "1637100237855829";

/// Settings pointing at a host no test ever reaches.
pub fn settings() -> Settings {
    Settings::new("db2.test.local", "SAMPLE", "db2inst1", "password")
}

/// Poll policy with a short interval so retry tests stay fast.
pub fn fast_policy() -> PollPolicy {
    PollPolicy::default().with_interval(Duration::from_millis(20))
}

/// Opens a session against `mock`, consuming one scripted auth reply.
pub async fn open_session(mock: &Arc<MockTransport>) -> Session {
    mock.push_response(200, json!({"token": "test-token"}).to_string());
    Session::open_with(settings(), Arc::clone(mock) as Arc<dyn HttpTransport>)
        .await
        .expect("session should open")
}

/// A dispatcher with a fast poll policy over `mock`.
pub async fn dispatcher(mock: &Arc<MockTransport>) -> Dispatcher {
    Dispatcher::new(open_session(mock).await).with_poll_policy(fast_policy())
}

/// A page body as the server sends it.
pub fn page(status: i64, rows: Option<Vec<Value>>) -> String {
    let row_count = rows.as_ref().map_or(0, Vec::len);
    json!({
        "jobStatus": status,
        "jobStatusDescription": null,
        "resultSet": rows,
        "rowCount": row_count
    })
    .to_string()
}

/// Stop requests sent for the shared test job.
pub fn stop_requests(mock: &MockTransport) -> usize {
    mock.requests_matching(Method::Put, &format!("/v1/services/stop/{JOB_ID}"))
        .len()
}

/// Page requests sent for the shared test job.
pub fn page_requests(mock: &MockTransport) -> usize {
    mock.requests_matching(Method::Post, &format!("/v1/services/{JOB_ID}"))
        .len()
}

/// Gives detached stop tasks time to run.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(40)).await;
}
