//! Health check routes.

use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};
use serde::Serialize;

use crate::api::server::AppState;
use crate::credentials::FailureInfo;
use crate::scheduler::JobStats;

/// Create the health router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(health_check))
        .route("/live", get(liveness_check))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_secs: u64,
    pub credentials_configured: bool,
    pub credential_refresh_failure: Option<FailureInfo>,
    pub refresh_job: JobStats,
    pub report_rows: usize,
}

/// Degraded when no credential is configured or the last refresh failed.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let credentials_configured = state.credentials.is_configured();
    let refresh_job = state.refresh_job.stats();

    let status = if credentials_configured && refresh_job.consecutive_failures == 0 {
        "healthy"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: state.start_time.elapsed().as_secs(),
        credentials_configured,
        credential_refresh_failure: state.credentials.failure_info(),
        refresh_job,
        report_rows: state.cache.snapshot().rows.len(),
    })
}

/// Liveness check - is the service alive?
async fn liveness_check(State(state): State<AppState>) -> impl IntoResponse {
    let uptime = state.start_time.elapsed().as_secs();
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "alive",
            "uptime_secs": uptime
        })),
    )
}
