//! Dashboard read models for the current business date.
//!
//! Field names are what the dashboard already consumes: electronic totals
//! are labelled `upi*`.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use ts_rs::TS;

use crate::error::ApiResult;
use crate::state::AppState;
use tally_core::{ItemizedSale, Money, SaleEvent};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/dashboard/today", get(today))
        .route("/api/dashboard/today/sales", get(today_sales))
}

#[derive(Debug, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct TodayResponse {
    #[ts(type = "number")]
    pub cash_sales: Money,
    #[ts(type = "number")]
    pub upi_sales: Money,
    #[ts(type = "number")]
    pub total_sales: Money,
    pub customer_count: i64,
    /// `null` on an empty ledger.
    pub last_sale: Option<SaleEvent>,
}

#[derive(Debug, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct TodaySalesResponse {
    pub cash_sales: Vec<ItemizedSale>,
    pub upi_sales: Vec<ItemizedSale>,
}

/// GET /api/dashboard/today
async fn today(State(state): State<AppState>) -> ApiResult<Json<TodayResponse>> {
    let summary = state.aggregation().today().await?;
    Ok(Json(TodayResponse {
        cash_sales: summary.cash_total,
        upi_sales: summary.electronic_total,
        total_sales: summary.combined_total,
        customer_count: summary.visit_count,
        last_sale: summary.last_sale,
    }))
}

/// GET /api/dashboard/today/sales
async fn today_sales(State(state): State<AppState>) -> ApiResult<Json<TodaySalesResponse>> {
    let items = state.aggregation().today_itemized().await?;
    Ok(Json(TodaySalesResponse {
        cash_sales: items.cash,
        upi_sales: items.electronic,
    }))
}
