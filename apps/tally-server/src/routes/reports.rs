//! # Daily Report Routes
//!
//! ```text
//! GET  /api/reports                  ?limit=N (default from config), newest first
//! GET  /api/reports/latest           404 when the archive is empty
//! GET  /api/reports/{date}           404 when that date was never closed
//! POST /api/reports/{date}/generate  manual rerun, same guard as the scheduler
//! ```

use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tracing::info;

use crate::error::{ApiError, ApiResult, ErrorCode};
use crate::scheduler::FireOutcome;
use crate::state::AppState;
use tally_core::validation::parse_date;
use tally_core::DailyReport;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/reports", get(list))
        .route("/api/reports/latest", get(latest))
        .route("/api/reports/{date}", get(get_by_date))
        .route("/api/reports/{date}/generate", post(generate))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<u32>,
}

/// GET /api/reports
async fn list(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<DailyReport>>> {
    let Query(q) = query?;
    let limit = q.limit.unwrap_or(state.config.reports.history_limit);
    Ok(Json(state.db.reports().list(limit).await?))
}

/// GET /api/reports/latest
async fn latest(State(state): State<AppState>) -> ApiResult<Json<DailyReport>> {
    Ok(Json(state.db.reports().latest().await?))
}

/// GET /api/reports/{date}
async fn get_by_date(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> ApiResult<Json<DailyReport>> {
    let date = parse_date(&date)?;
    Ok(Json(state.db.reports().get(date).await?))
}

/// POST /api/reports/{date}/generate
///
/// Only closed dates (before today) can be generated. Overwrites any
/// existing report for the date.
async fn generate(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> ApiResult<Json<DailyReport>> {
    let date = parse_date(&date)?;
    if date >= state.clock.today() {
        return Err(ApiError::validation(format!(
            "{date} is not a closed business date"
        )));
    }

    info!(date = %date, "Manual daily report rerun requested");
    match state.runner.run_for(date).await {
        FireOutcome::Generated(report) => Ok(Json(report)),
        FireOutcome::Skipped => Err(ApiError::new(
            ErrorCode::ReportInProgress,
            "A daily report is already being generated",
        )),
        FireOutcome::Failed(_) => Err(ApiError::new(
            ErrorCode::DatabaseError,
            "Daily report generation failed",
        )),
    }
}
