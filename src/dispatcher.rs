//! Request dispatch for services and ad-hoc SQL.
//!
//! The dispatcher submits work on behalf of a [`Session`]: sync calls decode
//! the page straight away, async calls hand back a [`JobHandle`] for the
//! submitted job.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::{PollPolicy, Settings};
use crate::error::{Db2Error, Result};
use crate::job::{JobAccepted, JobHandle, Page, Response};
use crate::session::Session;
use crate::transport::HttpRequest;

/// Empty parameter object for services and statements that take none.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NoParameters {}

/// Fails with `Cancelled` if the caller gave up while a round trip was in flight.
pub(crate) fn ensure_not_cancelled(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        Err(Db2Error::Cancelled)
    } else {
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct ServiceBody<P> {
    parameters: P,
    sync: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SqlBody<'a, P> {
    sql_statement: &'a str,
    parameters: P,
    is_query: bool,
    sync: bool,
}

/// Submits queries and statements through one authenticated session.
///
/// Cheap to clone; clones share the session.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    session: Arc<Session>,
    policy: PollPolicy,
    cancel: CancellationToken,
}

impl Dispatcher {
    /// Wraps an open session.
    pub fn new(session: Session) -> Self {
        Self::from_shared(Arc::new(session))
    }

    /// Wraps a session shared with other dispatchers.
    pub fn from_shared(session: Arc<Session>) -> Self {
        Self {
            session,
            policy: PollPolicy::default(),
            cancel: CancellationToken::new(),
        }
    }

    /// Opens a session over reqwest and wraps it.
    pub async fn connect(settings: Settings) -> Result<Self> {
        Ok(Self::new(Session::open(settings).await?))
    }

    /// Sets the poll policy given to job handles created from now on.
    pub fn with_poll_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Derives a dispatcher whose calls, and the job handles they create,
    /// end in `Cancelled` once `cancel` fires.
    pub fn with_cancellation(&self, cancel: CancellationToken) -> Self {
        Self {
            session: Arc::clone(&self.session),
            policy: self.policy,
            cancel,
        }
    }

    /// The session this dispatcher submits through.
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Poll policy for new job handles.
    pub fn poll_policy(&self) -> PollPolicy {
        self.policy
    }

    /// Cancellation token observed by this dispatcher.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// `POST /v1/services/{service}/{version}`. Returns the raw body on 200 or 202.
    pub async fn submit_query<P: Serialize>(
        &self,
        service: &str,
        version: &str,
        parameters: P,
        sync: bool,
    ) -> Result<String> {
        let url = self.session.service_url(service, version)?;
        debug!(service, version, sync, "submitting service call");
        self.submit(url, &ServiceBody { parameters, sync }).await
    }

    /// `POST /v1/services/execsql`. Returns the raw body on 200 or 202.
    pub async fn submit_statement<P: Serialize>(
        &self,
        sql: &str,
        parameters: P,
        is_query: bool,
        sync: bool,
    ) -> Result<String> {
        let url = self.session.execsql_url()?;
        debug!(is_query, sync, "submitting SQL statement");
        let body = SqlBody {
            sql_statement: sql,
            parameters,
            is_query,
            sync,
        };
        self.submit(url, &body).await
    }

    async fn submit<B: Serialize>(&self, url: String, body: &B) -> Result<String> {
        let request = HttpRequest::post(url)
            .with_authorization(self.session.token())
            .with_json(body)?;

        let response = self.session.transport().send(request).await?;
        ensure_not_cancelled(&self.cancel)?;

        match response.status {
            200 | 202 => Ok(response.body),
            _ => Err(response.into_error()),
        }
    }

    /// Runs a service synchronously and decodes its rows.
    pub async fn run_sync_query_service<P, T>(
        &self,
        service: &str,
        version: &str,
        parameters: P,
    ) -> Result<Response<T>>
    where
        P: Serialize,
        T: DeserializeOwned,
    {
        let body = self.submit_query(service, version, parameters, true).await?;
        decode_response(&body)
    }

    /// Runs a SQL query synchronously and decodes its rows.
    pub async fn run_sync_query_sql<P, T>(&self, sql: &str, parameters: P) -> Result<Response<T>>
    where
        P: Serialize,
        T: DeserializeOwned,
    {
        let body = self.submit_statement(sql, parameters, true, true).await?;
        decode_response(&body)
    }

    /// Runs a service synchronously, discarding any rows.
    pub async fn run_sync_statement_service<P: Serialize>(
        &self,
        service: &str,
        version: &str,
        parameters: P,
    ) -> Result<()> {
        self.submit_query(service, version, parameters, true)
            .await
            .map(|_| ())
    }

    /// Runs a non-query SQL statement synchronously.
    pub async fn run_sync_statement_sql<P: Serialize>(&self, sql: &str, parameters: P) -> Result<()> {
        self.submit_statement(sql, parameters, false, true)
            .await
            .map(|_| ())
    }

    /// Submits a service as an async job.
    pub async fn run_async_service<P, T>(
        &self,
        service: &str,
        version: &str,
        parameters: P,
    ) -> Result<JobHandle<T>>
    where
        P: Serialize,
    {
        let body = self.submit_query(service, version, parameters, false).await?;
        self.open_job(&body)
    }

    /// Submits a SQL query as an async job.
    pub async fn run_async_sql<P, T>(&self, sql: &str, parameters: P) -> Result<JobHandle<T>>
    where
        P: Serialize,
    {
        let body = self.submit_statement(sql, parameters, true, false).await?;
        self.open_job(&body)
    }

    fn open_job<T>(&self, body: &str) -> Result<JobHandle<T>> {
        let accepted: JobAccepted = serde_json::from_str(body)?;
        info!(job_id = %accepted.id, "job submitted");
        JobHandle::new(accepted.id, &self.session, self.policy, self.cancel.clone())
    }
}

fn decode_response<T: DeserializeOwned>(body: &str) -> Result<Response<T>> {
    let page: Page<T> = serde_json::from_str(body)?;
    Ok(page.into_response())
}
