//! HTTP boundary: dashboard page, report endpoints and health.

pub mod error;
mod page;
pub mod routes;
pub mod server;

pub use error::{ApiError, ApiResult};
pub use server::{ApiServer, ApiServerConfig, AppState};
