//! Structural conversion of decoded rows into application types.
//!
//! A row type implements [`Convert`] once; the impls here carry that
//! conversion through the containers results arrive in, keeping their shape:
//! absent stays absent, sequences keep order and length, responses keep
//! their status, and job handles keep their polling semantics.
//!
//! ```
//! use db2_rest::convert::{narrow_i32, Convert};
//! use db2_rest::job::{JobStatus, Response};
//!
//! struct WireEmployee { id: i64, name: String }
//! struct Employee { id: i32, name: String }
//!
//! impl Convert for WireEmployee {
//!     type Output = Employee;
//!     fn convert(self) -> Employee {
//!         Employee { id: narrow_i32(self.id), name: self.name }
//!     }
//! }
//!
//! let wire = Response {
//!     status: JobStatus::Completed,
//!     results: Some(vec![WireEmployee { id: 10, name: "HAAS".into() }]),
//! };
//! let typed: Response<Employee> = wire.convert();
//! assert_eq!(typed.rows()[0].id, 10);
//! ```

use serde::de::DeserializeOwned;

use crate::error::Result;
use crate::job::{JobHandle, Response};

/// A value that knows how to produce an alternate representation of itself.
pub trait Convert {
    type Output;

    fn convert(self) -> Self::Output;
}

impl<T: Convert> Convert for Option<T> {
    type Output = Option<T::Output>;

    fn convert(self) -> Self::Output {
        self.map(Convert::convert)
    }
}

impl<T: Convert> Convert for Vec<T> {
    type Output = Vec<T::Output>;

    fn convert(self) -> Self::Output {
        self.into_iter().map(Convert::convert).collect()
    }
}

impl<T: Convert> Convert for Response<T> {
    type Output = Response<T::Output>;

    fn convert(self) -> Self::Output {
        Response {
            status: self.status,
            results: self.results.convert(),
        }
    }
}

impl<T: Convert> Convert for JobHandle<T> {
    type Output = ConvertedJob<T>;

    fn convert(self) -> Self::Output {
        ConvertedJob { inner: self }
    }
}

/// A job handle whose pages are converted on the way out.
///
/// Polling, stopping and closing go straight to the wrapped handle.
#[derive(Debug)]
pub struct ConvertedJob<T> {
    inner: JobHandle<T>,
}

impl<T: Convert> ConvertedJob<T> {
    /// The wrapped handle.
    pub fn inner(&self) -> &JobHandle<T> {
        &self.inner
    }

    /// Server-side id of the job.
    pub fn job_id(&self) -> &str {
        self.inner.job_id()
    }

    /// See [`JobHandle::stop`].
    pub async fn stop(&self) -> Result<()> {
        self.inner.stop().await
    }

    /// See [`JobHandle::close`].
    pub async fn close(self) -> Result<()> {
        self.inner.close().await
    }

    /// Unwraps the underlying handle.
    pub fn into_inner(self) -> JobHandle<T> {
        self.inner
    }
}

impl<T: Convert + DeserializeOwned> ConvertedJob<T> {
    /// See [`JobHandle::poll`]; the returned rows are converted.
    pub async fn poll(&self, limit: usize) -> Result<Option<Response<T::Output>>> {
        Ok(self.inner.poll(limit).await?.convert())
    }
}

/// Narrows a wire integer to 32 bits, saturating at the bounds.
pub fn narrow_i32(value: i64) -> i32 {
    value.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

/// Narrows a wire integer to 16 bits (Db2 SMALLINT), saturating at the bounds.
pub fn narrow_i16(value: i64) -> i16 {
    value.clamp(i16::MIN as i64, i16::MAX as i64) as i16
}

/// Widens a fixed-width integer to the wire representation.
pub fn widen<I: Into<i64>>(value: I) -> i64 {
    value.into()
}

/// [`narrow_i32`] for nullable columns.
pub fn narrow_i32_opt(value: Option<i64>) -> Option<i32> {
    value.map(narrow_i32)
}

/// [`widen`] for nullable columns.
pub fn widen_opt<I: Into<i64>>(value: Option<I>) -> Option<i64> {
    value.map(widen)
}
