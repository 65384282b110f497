//! Async job handles.
//!
//! A [`JobHandle`] is returned for every async submission. It polls the
//! server for pages of results, waits while the job is `New` or `Running`,
//! and stops the job on request, on poll failure, or (as a leak guard) when
//! dropped without being closed.
//!
//! Release handles with [`JobHandle::close`]. Dropping an unclosed handle only
//! fires a detached best-effort stop whose outcome nobody observes.

mod state;
mod status;

pub use status::{JobStatus, Page, Response};
pub(crate) use status::{JobAccepted, PageRequest};

use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::PollPolicy;
use crate::dispatcher::ensure_not_cancelled;
use crate::error::{Db2Error, Result};
use crate::session::Session;
use crate::transport::{HttpRequest, HttpTransport};
use state::{Lifecycle, SharedState};

/// Handle to one server-side job producing rows of type `T`.
///
/// Share it behind an `Arc` to poll from several tasks: polls are
/// single-flight, a second concurrent `poll` returns `Ok(None)` right away.
pub struct JobHandle<T> {
    job_id: String,
    page_url: String,
    token: String,
    stop_request: HttpRequest,
    transport: Arc<dyn HttpTransport>,
    policy: PollPolicy,
    cancel: CancellationToken,
    state: SharedState,
    _rows: PhantomData<fn() -> T>,
}

impl<T> JobHandle<T> {
    /// Binds a handle to the page and stop endpoints of `job_id`.
    pub(crate) fn new(
        job_id: String,
        session: &Session,
        policy: PollPolicy,
        cancel: CancellationToken,
    ) -> Result<Self> {
        let page_url = session.job_page_url(&job_id)?;
        let stop_request =
            HttpRequest::put(session.job_stop_url(&job_id)?).with_authorization(session.token());

        Ok(Self {
            job_id,
            page_url,
            token: session.token().to_string(),
            stop_request,
            transport: Arc::clone(session.transport()),
            policy,
            cancel,
            state: SharedState::new(),
            _rows: PhantomData,
        })
    }

    /// Server-side id of the job.
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Whether a poll is currently in flight.
    pub fn is_polling(&self) -> bool {
        self.state.is_polling()
    }

    /// Whether a `stop()` has succeeded.
    pub fn is_stopped(&self) -> bool {
        self.state.lifecycle() == Lifecycle::Stopped
    }

    /// Whether a poll has seen the job disappear (404).
    pub fn is_gone(&self) -> bool {
        self.state.lifecycle() == Lifecycle::Gone
    }

    /// Stops the job: `PUT /v1/services/stop/{id}`, expecting 204.
    ///
    /// Every call issues the request; the protocol does not make stop
    /// idempotent, so a second call surfaces whatever the server says.
    pub async fn stop(&self) -> Result<()> {
        send_stop(self.transport.as_ref(), self.stop_request.clone()).await?;
        self.state.set_lifecycle(Lifecycle::Stopped);
        info!(job_id = %self.job_id, "job stopped");
        Ok(())
    }

    /// Releases the handle, stopping the job unless it is already stopped or gone.
    pub async fn close(self) -> Result<()> {
        let result = match self.state.lifecycle() {
            Lifecycle::Stopped | Lifecycle::Gone | Lifecycle::Released => Ok(()),
            Lifecycle::Active | Lifecycle::CleanupScheduled => {
                send_stop(self.transport.as_ref(), self.stop_request.clone()).await
            }
        };
        // Disarm the drop guard whether or not the stop went through: the
        // caller has seen the outcome.
        self.state.set_lifecycle(Lifecycle::Released);
        if result.is_ok() {
            debug!(job_id = %self.job_id, "job handle closed");
        }
        result
    }

    /// Hands a stop request to a detached task after a failed poll.
    ///
    /// Sent whatever the handle has seen before; leaving `Active` only
    /// disarms the drop guard.
    fn schedule_cleanup(&self, cause: &Db2Error) {
        self.state.leave_active(Lifecycle::CleanupScheduled);
        debug!(job_id = %self.job_id, error = %cause, "poll failed, stopping job in background");
        self.spawn_best_effort_stop();
    }

    /// Spawns a detached stop on the current runtime. Returns false without a runtime.
    fn spawn_best_effort_stop(&self) -> bool {
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(stop_detached(
                    Arc::clone(&self.transport),
                    self.stop_request.clone(),
                    self.job_id.clone(),
                ));
                true
            }
            Err(_) => false,
        }
    }

    async fn wait_before_retry(&self) -> Result<()> {
        tokio::select! {
            biased;

            _ = self.cancel.cancelled() => Err(Db2Error::Cancelled),
            _ = tokio::time::sleep(self.policy.interval()) => Ok(()),
        }
    }
}

impl<T: DeserializeOwned> JobHandle<T> {
    /// Fetches the next page of results, waiting while the job runs.
    ///
    /// - `Ok(None)`: another poll on this handle is in flight, or the job no
    ///   longer exists on the server (404).
    /// - `Ok(Some(response))`: the job reached `Failed` (no rows),
    ///   `DataAvailable`, `Completed` or `Stopping`.
    /// - `Err(_)`: the request failed; a best-effort stop has been scheduled.
    pub async fn poll(&self, limit: usize) -> Result<Option<Response<T>>> {
        let Some(_guard) = self.state.try_begin_poll() else {
            debug!(job_id = %self.job_id, "poll already in flight, declining");
            return Ok(None);
        };

        match self.poll_until_settled(limit).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                self.schedule_cleanup(&e);
                Err(e)
            }
        }
    }

    async fn poll_until_settled(&self, limit: usize) -> Result<Option<Response<T>>> {
        let mut retries = 0u32;
        loop {
            let Some(page) = self.fetch_page(limit).await? else {
                self.state.leave_active(Lifecycle::Gone);
                debug!(job_id = %self.job_id, "job no longer exists on the server");
                return Ok(None);
            };

            match page.job_status {
                JobStatus::Failed => {
                    warn!(
                        job_id = %self.job_id,
                        description = page.job_status_description.as_deref().unwrap_or(""),
                        "job failed"
                    );
                    return Ok(Some(Response::failed()));
                }
                status if status.is_retryable() => {
                    if let Some(max) = self.policy.max_retries {
                        if retries >= max {
                            return Err(Db2Error::PollTimeout(retries));
                        }
                    }
                    retries += 1;
                    debug!(job_id = %self.job_id, %status, retries, "job not ready, retrying");
                    self.wait_before_retry().await?;
                }
                _ => return Ok(Some(page.into_response())),
            }
        }
    }

    /// One page round trip. `None` means 404.
    async fn fetch_page(&self, limit: usize) -> Result<Option<Page<T>>> {
        let request = HttpRequest::post(self.page_url.as_str())
            .with_authorization(self.token.as_str())
            .with_json(&PageRequest { limit })?;

        let response = self.transport.send(request).await?;
        ensure_not_cancelled(&self.cancel)?;

        match response.status {
            200 => Ok(Some(serde_json::from_str(&response.body)?)),
            404 => Ok(None),
            _ => Err(response.into_error()),
        }
    }
}

impl<T> Drop for JobHandle<T> {
    fn drop(&mut self) {
        if self.state.lifecycle() != Lifecycle::Active {
            return;
        }
        if self.spawn_best_effort_stop() {
            warn!(
                job_id = %self.job_id,
                "job handle dropped without close(), stopping job in background"
            );
        } else {
            warn!(
                job_id = %self.job_id,
                "job handle dropped outside a Tokio runtime, remote job left running"
            );
        }
    }
}

impl<T> std::fmt::Debug for JobHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobHandle")
            .field("job_id", &self.job_id)
            .field("page_url", &self.page_url)
            .field("policy", &self.policy)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

async fn send_stop(transport: &dyn HttpTransport, request: HttpRequest) -> Result<()> {
    let response = transport.send(request).await?;
    if response.status == 204 {
        Ok(())
    } else {
        Err(response.into_error())
    }
}

/// Fire-and-forget stop. The outcome is logged and otherwise dropped.
async fn stop_detached(transport: Arc<dyn HttpTransport>, request: HttpRequest, job_id: String) {
    match send_stop(transport.as_ref(), request).await {
        Ok(()) => debug!(job_id = %job_id, "best-effort stop succeeded"),
        Err(e) => debug!(job_id = %job_id, error = %e, "best-effort stop failed"),
    }
}
