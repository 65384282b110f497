//! db2-rest - async client for the Db2 REST service.
//!
//! Open a [`Session`] (one authentication exchange), submit work through a
//! [`Dispatcher`], and poll async work through a [`JobHandle`] until it
//! reaches a terminal status. Rows can be reshaped into application types
//! with the [`convert`] module.

pub mod config;
pub mod convert;
pub mod dispatcher;
pub mod error;
pub mod job;
pub mod logging;
pub mod session;
pub mod transport;

pub use config::{Config, PollPolicy, Settings};
pub use convert::{Convert, ConvertedJob};
pub use dispatcher::{Dispatcher, NoParameters};
pub use error::{Db2Error, Result};
pub use job::{JobHandle, JobStatus, Page, Response};
pub use session::Session;
