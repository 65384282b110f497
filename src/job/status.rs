//! Wire types for job results: status ordinals, pages and responses.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a server-side job, as reported by its integer ordinal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum JobStatus {
    Failed,
    New,
    Running,
    DataAvailable,
    Completed,
    Stopping,
}

impl JobStatus {
    /// Server ordinal of this status.
    pub fn ordinal(self) -> i64 {
        match self {
            Self::Failed => 0,
            Self::New => 1,
            Self::Running => 2,
            Self::DataAvailable => 3,
            Self::Completed => 4,
            Self::Stopping => 5,
        }
    }

    /// `New` and `Running` are the only statuses worth asking about again.
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::New | Self::Running)
    }

    /// Whether a page with this status may carry rows.
    pub fn carries_data(self) -> bool {
        matches!(self, Self::DataAvailable | Self::Completed)
    }

    /// Returns the status as a string.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Failed => "failed",
            Self::New => "new",
            Self::Running => "running",
            Self::DataAvailable => "data_available",
            Self::Completed => "completed",
            Self::Stopping => "stopping",
        }
    }
}

impl TryFrom<i64> for JobStatus {
    type Error = String;

    fn try_from(n: i64) -> std::result::Result<Self, Self::Error> {
        match n {
            0 => Ok(Self::Failed),
            1 => Ok(Self::New),
            2 => Ok(Self::Running),
            3 => Ok(Self::DataAvailable),
            4 => Ok(Self::Completed),
            5 => Ok(Self::Stopping),
            _ => Err(format!("Unknown job status ordinal: {n}")),
        }
    }
}

impl From<JobStatus> for i64 {
    fn from(status: JobStatus) -> Self {
        status.ordinal()
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One decoded poll (or sync execution) response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub job_status: JobStatus,
    #[serde(default)]
    pub job_status_description: Option<String>,
    pub result_set: Option<Vec<T>>,
    #[serde(default)]
    pub row_count: u64,
}

impl<T> Page<T> {
    /// Keeps the status, and the rows only when the status is a data state.
    pub fn into_response(self) -> Response<T> {
        let results = if self.job_status.carries_data() {
            self.result_set
        } else {
            None
        };
        Response {
            status: self.job_status,
            results,
        }
    }
}

/// Caller-facing result of a sync execution or one `poll`.
///
/// `results` is present only for `DataAvailable` and `Completed`.
#[derive(Debug, Clone, PartialEq)]
pub struct Response<T> {
    pub status: JobStatus,
    pub results: Option<Vec<T>>,
}

impl<T> Response<T> {
    /// A failed job: no rows.
    pub fn failed() -> Self {
        Self {
            status: JobStatus::Failed,
            results: None,
        }
    }

    /// Whether the job will produce no further pages.
    pub fn is_complete(&self) -> bool {
        matches!(
            self.status,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Stopping
        )
    }

    /// Number of rows carried by this response.
    pub fn row_count(&self) -> usize {
        self.results.as_ref().map_or(0, Vec::len)
    }

    /// Rows carried by this response, empty when absent.
    pub fn rows(&self) -> &[T] {
        self.results.as_deref().unwrap_or(&[])
    }

    /// Consumes the response, returning its rows (empty when absent).
    pub fn into_rows(self) -> Vec<T> {
        self.results.unwrap_or_default()
    }
}

/// Body of a 202 reply to an async submission.
#[derive(Debug, Deserialize)]
pub(crate) struct JobAccepted {
    pub id: String,
}

/// Body of a page request.
#[derive(Debug, Serialize)]
pub(crate) struct PageRequest {
    pub limit: usize,
}
