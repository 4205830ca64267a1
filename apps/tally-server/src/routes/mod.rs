//! # HTTP Routes
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Router (TraceLayer + CORS)                                             │
//! │                                                                         │
//! │  health     GET  /  /health                                            │
//! │  sales      POST /api/sales  /add-upi-sale  /api/transaction/sms       │
//! │             GET  /api/sales                                            │
//! │  dashboard  GET  /api/dashboard/today[/sales]                          │
//! │  reports    GET  /api/reports[/latest|/{date}]                         │
//! │             POST /api/reports/{date}/generate                          │
//! │  analytics  GET  /api/analytics/peak-hours  /api/analytics/weekdays    │
//! │  export     GET  /api/export/sales.csv  /api/export/reports.csv        │
//! │  feed       GET  /ws/sales (websocket)                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod analytics;
pub mod dashboard;
pub mod export;
pub mod feed;
pub mod health;
pub mod reports;
pub mod sales;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// The full HTTP API.
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(sales::router())
        .merge(dashboard::router())
        .merge(reports::router())
        .merge(analytics::router())
        .merge(export::router())
        .merge(feed::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// =============================================================================
// Router Tests
// =============================================================================
