//! hiring-funnel library crate.
//!
//! Recruiting funnel dashboard: keeps a Huntflow credential fresh, builds a
//! per-vacancy funnel report, caches it with user comments and serves it
//! over HTTP.

pub mod api;
pub mod config;
pub mod credentials;
pub mod error;
pub mod export;
pub mod huntflow;
pub mod logging;
pub mod report;
pub mod scheduler;
pub mod services;
pub mod utils;

pub use error::{Error, Result};
