//! Liveness and health endpoints.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::scheduler::RunnerState;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
}

/// GET /
async fn index() -> &'static str {
    "Tally POS ledger is running!"
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
    pub migrations_applied: usize,
    pub migrations_total: usize,
    pub scheduler: &'static str,
}

/// GET /health
///
/// 200 when the database answers, 503 otherwise.
async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let healthy = state.db.health_check().await;
    let (total, applied) = state.db.migration_status().await.unwrap_or((0, 0));

    let response = HealthResponse {
        status: if healthy { "ok" } else { "degraded" },
        database: if healthy { "connected" } else { "unavailable" },
        migrations_applied: applied,
        migrations_total: total,
        scheduler: match state.runner.state() {
            RunnerState::Idle => "idle",
            RunnerState::RunningReport => "running_report",
        },
    };

    let code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(response))
}
