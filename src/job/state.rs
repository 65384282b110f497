//! Per-handle flags and the single-flight poll guard.

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Where the remote job stands, as far as this handle knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Job may still hold server resources.
    Active,
    /// A poll failed and a best-effort stop has been handed to a detached task.
    CleanupScheduled,
    /// `stop()` got a 204.
    Stopped,
    /// A poll got a 404; the server no longer knows the job.
    Gone,
    /// `close()` ran; the drop guard is disarmed.
    Released,
}

#[derive(Debug)]
pub struct JobState {
    in_flight: bool,
    lifecycle: Lifecycle,
}

/// Mutex-guarded state shared by all call sites of one handle.
///
/// The lock is only held for flag updates, never across an await.
#[derive(Debug)]
pub struct SharedState {
    inner: Mutex<JobState>,
}

impl SharedState {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(JobState {
                in_flight: false,
                lifecycle: Lifecycle::Active,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, JobState> {
        // Flags stay meaningful even if a holder panicked.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claims the poll slot. `None` means another poll is in flight.
    pub fn try_begin_poll(&self) -> Option<PollGuard<'_>> {
        let mut state = self.lock();
        if state.in_flight {
            return None;
        }
        state.in_flight = true;
        Some(PollGuard { state: self })
    }

    pub fn is_polling(&self) -> bool {
        self.lock().in_flight
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lock().lifecycle
    }

    pub fn set_lifecycle(&self, lifecycle: Lifecycle) {
        self.lock().lifecycle = lifecycle;
    }

    /// Moves to `next` only from `Active`. Returns whether it moved.
    pub fn leave_active(&self, next: Lifecycle) -> bool {
        let mut state = self.lock();
        if state.lifecycle == Lifecycle::Active {
            state.lifecycle = next;
            true
        } else {
            false
        }
    }
}

/// Holds the poll slot; releases it on every exit path when dropped.
#[derive(Debug)]
pub struct PollGuard<'a> {
    state: &'a SharedState,
}

impl Drop for PollGuard<'_> {
    fn drop(&mut self) {
        self.state.lock().in_flight = false;
    }
}
