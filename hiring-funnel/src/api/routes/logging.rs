//! Logging API routes.
//!
//! View and change the log filter at runtime.

use axum::{Json, Router, extract::State, routing::get};
use serde::{Deserialize, Serialize};

use crate::api::error::{ApiError, ApiResult};
use crate::api::server::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(get_filter).put(set_filter))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LogFilter {
    pub filter: String,
}

async fn get_filter(State(state): State<AppState>) -> ApiResult<Json<LogFilter>> {
    let logging = state
        .logging_config
        .as_ref()
        .ok_or_else(|| ApiError::internal("Logging is not configured"))?;
    Ok(Json(LogFilter {
        filter: logging.get_filter(),
    }))
}

async fn set_filter(
    State(state): State<AppState>,
    Json(request): Json<LogFilter>,
) -> ApiResult<Json<LogFilter>> {
    let logging = state
        .logging_config
        .as_ref()
        .ok_or_else(|| ApiError::internal("Logging is not configured"))?;
    logging.set_filter(&request.filter)?;
    Ok(Json(LogFilter {
        filter: logging.get_filter(),
    }))
}
