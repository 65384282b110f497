//! Integration tests for db2-rest.

pub mod common;
pub mod config_test;
pub mod live_test;
pub mod session_test;
