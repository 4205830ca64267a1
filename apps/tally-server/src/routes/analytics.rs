//! All-history breakdowns, recomputed on every request.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use crate::error::ApiResult;
use crate::state::AppState;
use tally_core::{HourBucket, WeekdayBucket};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/analytics/peak-hours", get(peak_hours))
        .route("/api/analytics/weekdays", get(weekdays))
}

/// GET /api/analytics/peak-hours
async fn peak_hours(State(state): State<AppState>) -> ApiResult<Json<Vec<HourBucket>>> {
    Ok(Json(state.aggregation().peak_hours().await?))
}

/// GET /api/analytics/weekdays
async fn weekdays(State(state): State<AppState>) -> ApiResult<Json<Vec<WeekdayBucket>>> {
    Ok(Json(state.aggregation().weekday_distribution().await?))
}
