//! Tests against a live Db2 REST service.
//!
//! Configured through the DB2_* environment variables; skipped when DB2_HOST
//! is not set.

use db2_rest::{Db2Error, Dispatcher, JobStatus, NoParameters, Response, Settings};
use serde_json::Value;

/// Helper to connect from the environment.
async fn get_test_dispatcher() -> Option<Dispatcher> {
    std::env::var("DB2_HOST").ok()?;
    let settings = Settings::from_env().ok()?;
    Dispatcher::connect(settings).await.ok()
}

#[tokio::test]
async fn test_sync_query_against_server() {
    let Some(dispatcher) = get_test_dispatcher().await else {
        eprintln!("Skipping test: DB2_HOST not set");
        return;
    };

    let response: Response<Value> = dispatcher
        .run_sync_query_sql("SELECT 1 AS ONE FROM SYSIBM.SYSDUMMY1", NoParameters {})
        .await
        .unwrap();

    assert!(response.status.carries_data());
    assert_eq!(response.row_count(), 1);
}

#[tokio::test]
async fn test_async_query_against_server() {
    let Some(dispatcher) = get_test_dispatcher().await else {
        eprintln!("Skipping test: DB2_HOST not set");
        return;
    };

    let job = dispatcher
        .run_async_sql::<_, Value>("SELECT TABNAME FROM SYSCAT.TABLES", NoParameters {})
        .await
        .unwrap();

    let mut rows = 0;
    while let Some(response) = job.poll(100).await.unwrap() {
        rows += response.row_count();
        if matches!(response.status, JobStatus::Completed | JobStatus::Failed) {
            break;
        }
    }
    assert!(rows > 0);

    job.close().await.ok();
}

#[tokio::test]
async fn test_bad_sql_is_reported() {
    let Some(dispatcher) = get_test_dispatcher().await else {
        eprintln!("Skipping test: DB2_HOST not set");
        return;
    };

    let result = dispatcher
        .run_sync_query_sql::<_, Value>("SELEC oops", NoParameters {})
        .await;

    match result {
        Ok(response) => assert_eq!(response.status, JobStatus::Failed),
        Err(e) => assert!(matches!(e, Db2Error::InvalidResponse { .. })),
    }
}

#[tokio::test(flavor = "current_thread")]
async fn test_connect_to_unreachable_host() {
    let settings = Settings::new("127.0.0.1", "SAMPLE", "db2inst1", "pw")
        .with_rest_port(9)
        .with_timeout(2);

    let result = Dispatcher::connect(settings).await;
    assert!(matches!(result, Err(Db2Error::Transport(_))));
}
