//! CSV downloads of the full ledger and report archive.

use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;

use crate::error::ApiResult;
use crate::state::AppState;
use tally_core::export::{write_reports_csv, write_sales_csv};

const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/export/sales.csv", get(sales_csv))
        .route("/api/export/reports.csv", get(reports_csv))
}

/// GET /api/export/sales.csv
async fn sales_csv(State(state): State<AppState>) -> ApiResult<Response> {
    let sales = state.db.sale_events().list_all().await?;
    let mut body = Vec::new();
    write_sales_csv(&sales, &mut body)?;
    Ok(csv_response("sales.csv", body))
}

/// GET /api/export/reports.csv
async fn reports_csv(State(state): State<AppState>) -> ApiResult<Response> {
    let reports = state.db.reports().list_all().await?;
    let mut body = Vec::new();
    write_reports_csv(&reports, &mut body)?;
    Ok(csv_response("reports.csv", body))
}

fn csv_response(filename: &str, body: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, CSV_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    )
        .into_response()
}
