//! # Sale Ingestion Routes
//!
//! ```text
//! POST /api/sales               {amount, mode, time?, date?}
//! POST /add-upi-sale            {amount, time?, date?}        mode = electronic
//! POST /api/transaction/sms     {message}                     classifier decides
//! GET  /api/transaction/sms     reachability check
//! GET  /api/sales               ?mode=&from=&to=              newest first
//! ```
//!
//! Every ingestion path validates first and only then touches storage, so a
//! rejected request leaves no rows behind.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::ApiResult;
use crate::state::AppState;
use tally_core::validation::{self, parse_date, parse_mode, resolve_override};
use tally_core::{Money, NewSale, PaymentMode, SaleEvent};
use tally_db::SaleFilter;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/sales", post(create_sale).get(list_sales))
        .route("/add-upi-sale", post(add_upi_sale))
        .route("/api/transaction/sms", get(sms_status).post(sms_transaction))
}

// =============================================================================
// Request / Response
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct SaleRequest {
    /// Number or numeric string.
    #[serde(default)]
    pub amount: Value,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SmsRequest {
    #[serde(default, alias = "text", alias = "body")]
    pub message: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct SalesQuery {
    pub mode: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SaleResponse {
    pub status: &'static str,
    pub id: i64,
    pub amount: Money,
    pub mode: PaymentMode,
    /// Business-local `YYYY-MM-DD HH:MM:SS`.
    pub timestamp: String,
}

impl From<&SaleEvent> for SaleResponse {
    fn from(event: &SaleEvent) -> Self {
        SaleResponse {
            status: "success",
            id: event.id,
            amount: event.amount,
            mode: event.mode,
            timestamp: format!(
                "{} {}",
                event.occurred_at.date().format("%Y-%m-%d"),
                event.occurred_at.time().format("%H:%M:%S")
            ),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum SmsResponse {
    Recorded(SaleResponse),
    Ignored { status: &'static str },
}

// =============================================================================
// Handlers
// =============================================================================

/// POST /api/sales
async fn create_sale(
    State(state): State<AppState>,
    payload: Result<Json<SaleRequest>, JsonRejection>,
) -> ApiResult<Json<SaleResponse>> {
    let Json(req) = payload?;
    let mode = parse_mode(req.mode.as_deref().unwrap_or_default())?;
    record(&state, &req, mode).await
}

/// POST /add-upi-sale
///
/// Older bridge clients only ever send electronic payments.
async fn add_upi_sale(
    State(state): State<AppState>,
    payload: Result<Json<SaleRequest>, JsonRejection>,
) -> ApiResult<Json<SaleResponse>> {
    let Json(req) = payload?;
    record(&state, &req, PaymentMode::Electronic).await
}

async fn record(
    state: &AppState,
    req: &SaleRequest,
    mode: PaymentMode,
) -> ApiResult<Json<SaleResponse>> {
    let amount = validation::parse_amount(&req.amount)?;
    let occurred_at = resolve_override(&state.clock, req.date.as_deref(), req.time.as_deref())?;

    let event = state
        .ingest(NewSale {
            amount,
            mode,
            occurred_at,
        })
        .await?;

    info!(
        sale_id = event.id,
        amount = %event.amount,
        mode = %event.mode,
        date = %event.occurred_at.date(),
        "Sale recorded"
    );
    Ok(Json(SaleResponse::from(&event)))
}

/// GET /api/transaction/sms
async fn sms_status() -> &'static str {
    "API endpoint reachable"
}

/// POST /api/transaction/sms
///
/// Records the payment the classifier finds in `message`, stamped now.
async fn sms_transaction(
    State(state): State<AppState>,
    payload: Result<Json<SmsRequest>, JsonRejection>,
) -> ApiResult<Json<SmsResponse>> {
    let Json(req) = payload?;

    let Some(candidate) = state.classifier.classify(&req.message) else {
        debug!("Payment text ignored");
        return Ok(Json(SmsResponse::Ignored { status: "ignored" }));
    };

    validation::validate_amount(candidate.amount)?;
    let event = state
        .ingest(NewSale {
            amount: candidate.amount,
            mode: candidate.mode,
            occurred_at: state.clock.now(),
        })
        .await?;

    info!(
        sale_id = event.id,
        amount = %event.amount,
        matched = %candidate.matched,
        "Sale recorded from payment text"
    );
    Ok(Json(SmsResponse::Recorded(SaleResponse::from(&event))))
}

/// GET /api/sales
async fn list_sales(
    State(state): State<AppState>,
    query: Result<Query<SalesQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<SaleEvent>>> {
    let Query(q) = query?;
    let filter = SaleFilter {
        mode: present(&q.mode).map(parse_mode).transpose()?,
        from: present(&q.from).map(parse_date).transpose()?,
        to: present(&q.to).map(parse_date).transpose()?,
    };

    let mut sales = state.db.sale_events().query(filter).await?;
    sales.reverse();
    Ok(Json(sales))
}

/// Blank query values count as absent.
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}
