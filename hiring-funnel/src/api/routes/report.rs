//! Dashboard and report routes.

use axum::{
    Json, Router,
    extract::State,
    http::header,
    response::{Html, IntoResponse},
    routing::{get, post},
};
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::error::{ApiError, ApiResult};
use crate::api::page::render_dashboard;
use crate::api::server::AppState;
use crate::export;
use crate::report::{Coworkers, RefreshOutcome, VacancyFunnelRow};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(dashboard))
        .route("/api/report", get(get_report))
        .route("/status", get(get_status))
        .route("/update-comment", post(update_comment))
        .route("/download-report", get(download_report))
        .route("/refresh-report", post(refresh_report))
}

#[derive(Debug, Deserialize)]
pub struct CommentUpdateRequest {
    pub vacancy_name: String,
    pub comment: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ReportResponse {
    pub rows: Vec<VacancyFunnelRow>,
    pub coworkers: Coworkers,
    pub last_updated: Option<DateTime<Utc>>,
    pub last_updated_local: Option<DateTime<FixedOffset>>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub rows: usize,
    pub last_updated: Option<DateTime<FixedOffset>>,
    pub refresh_running: bool,
    pub consecutive_failures: u32,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub message: String,
    pub updated: bool,
    pub rows: usize,
}

async fn dashboard(State(state): State<AppState>) -> Html<String> {
    let snapshot = state.cache.snapshot();
    Html(render_dashboard(
        &snapshot,
        state.cache.get_last_updated_local(),
    ))
}

async fn get_report(State(state): State<AppState>) -> Json<ReportResponse> {
    let snapshot = state.cache.snapshot();
    Json(ReportResponse {
        rows: snapshot.rows.clone(),
        coworkers: snapshot.coworkers.clone(),
        last_updated: snapshot.last_updated,
        last_updated_local: state.cache.get_last_updated_local(),
    })
}

async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        rows: state.cache.snapshot().rows.len(),
        last_updated: state.cache.get_last_updated_local(),
        refresh_running: state.refresh_job.is_running(),
        consecutive_failures: state.refresh_job.stats().consecutive_failures,
    })
}

async fn update_comment(
    State(state): State<AppState>,
    Json(request): Json<CommentUpdateRequest>,
) -> ApiResult<Json<MessageResponse>> {
    info!(vacancy = %request.vacancy_name, "Comment update requested");

    let found = state
        .cache
        .update_comment(&request.vacancy_name, &request.comment)
        .await?;
    if !found {
        return Err(ApiError::not_found(format!(
            "Vacancy '{}' is not in the report",
            request.vacancy_name
        )));
    }

    Ok(Json(MessageResponse {
        message: "Comment saved".to_string(),
    }))
}

async fn download_report(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let snapshot = state.cache.snapshot();
    let Some(bytes) = export::build_workbook(&snapshot.rows)? else {
        return Err(ApiError::not_found("No report data to export"));
    };

    Ok((
        [
            (header::CONTENT_TYPE, export::CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", export::DOWNLOAD_FILE_NAME),
            ),
        ],
        bytes,
    ))
}

async fn refresh_report(State(state): State<AppState>) -> ApiResult<Json<RefreshResponse>> {
    if !state.credentials.is_configured() {
        return Err(ApiError::forbidden("No Huntflow API token configured"));
    }

    info!("Manual report refresh requested");
    let response = match state.refresh_job.run_now().await? {
        RefreshOutcome::Updated { rows } => RefreshResponse {
            message: "Report refreshed".to_string(),
            updated: true,
            rows,
        },
        RefreshOutcome::Skipped => RefreshResponse {
            message: "Refresh produced no data; previous report kept".to_string(),
            updated: false,
            rows: state.cache.snapshot().rows.len(),
        },
    };
    Ok(Json(response))
}
