//! API route modules.

pub mod health;
pub mod logging;
pub mod report;

use axum::Router;

use crate::api::server::AppState;

/// Create the main router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(report::router())
        .nest("/api/logging", logging::router())
        .nest("/health", health::router())
        .with_state(state)
}
