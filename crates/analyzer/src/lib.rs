//! Placement analyzer service
//!
//! Long-running service that accepts pod lifecycle records over HTTP,
//! recomputes displacement chains periodically and serves reports.

pub mod api;
pub mod config;
