//! # Sale Event Repository
//!
//! The append-only store of sale events.
//!
//! ## Write Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Database::ingest_sale(NewSale)                                         │
//! │       │  write gate held                                                │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   SINGLE TRANSACTION                            │   │
//! │  │  1. SaleEventRepository::record()  → INSERT INTO sale_events   │   │
//! │  │  2. VisitRepository::record_visit() → INSERT INTO              │   │
//! │  │                                       customer_visits          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  COMMIT ← the event is durable before the caller sees it               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Rows are never updated or deleted.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqliteExecutor, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use tally_core::validation::validate_amount;
use tally_core::{Money, NewSale, OccurredAt, PaymentMode, SaleEvent};

macro_rules! select_sale_events {
    ($tail:literal) => {
        concat!(
            "SELECT id, amount, mode, occurred_at_ms, sale_date, sale_time FROM sale_events",
            $tail
        )
    };
}

/// Optional filters for [`SaleEventRepository::query`]. Date bounds are
/// inclusive business dates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaleFilter {
    pub mode: Option<PaymentMode>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct SaleEventRow {
    id: i64,
    amount: String,
    mode: PaymentMode,
    occurred_at_ms: i64,
    sale_date: NaiveDate,
    sale_time: NaiveTime,
}

impl SaleEventRow {
    pub(crate) fn into_event(self) -> DbResult<SaleEvent> {
        let amount = Money::parse(&self.amount).map_err(|e| {
            DbError::corrupt("sale_events", format!("id {}: amount '{}': {e}", self.id, self.amount))
        })?;
        let occurred_at = OccurredAt::from_stored(self.occurred_at_ms, self.sale_date, self.sale_time)
            .ok_or_else(|| {
                DbError::corrupt("sale_events", format!("id {}: instant out of range", self.id))
            })?;
        Ok(SaleEvent {
            id: self.id,
            amount,
            mode: self.mode,
            occurred_at,
        })
    }
}

fn into_events(rows: Vec<SaleEventRow>) -> DbResult<Vec<SaleEvent>> {
    rows.into_iter().map(SaleEventRow::into_event).collect()
}

/// Repository for sale event reads and the in-transaction insert.
#[derive(Debug, Clone)]
pub struct SaleEventRepository {
    pool: SqlitePool,
}

impl SaleEventRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SaleEventRepository { pool }
    }

    /// Inserts a sale event on `conn`.
    ///
    /// Must run inside the caller's transaction together with the matching
    /// visit insert; [`crate::Database::ingest_sale`] is the public entry
    /// point that does both.
    pub async fn record(
        conn: &mut SqliteConnection,
        sale: &NewSale,
        recorded_at: DateTime<Utc>,
    ) -> DbResult<SaleEvent> {
        validate_amount(sale.amount)?;

        let result = sqlx::query(
            r#"
            INSERT INTO sale_events (
                amount, mode, occurred_at_ms, sale_date, sale_time, recorded_at_ms
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(sale.amount.to_storage_string())
        .bind(sale.mode)
        .bind(sale.occurred_at.timestamp_millis())
        .bind(sale.occurred_at.date())
        .bind(sale.occurred_at.time())
        .bind(recorded_at.timestamp_millis())
        .execute(&mut *conn)
        .await?;

        let id = result.last_insert_rowid();
        debug!(id, amount = %sale.amount, mode = %sale.mode, "Sale event stored");

        Ok(SaleEvent {
            id,
            amount: sale.amount,
            mode: sale.mode,
            occurred_at: sale.occurred_at,
        })
    }

    /// Sale events matching `filter`, ascending by occurrence (ties by id).
    pub async fn query(&self, filter: SaleFilter) -> DbResult<Vec<SaleEvent>> {
        let mut qb = QueryBuilder::<Sqlite>::new(select_sale_events!(" WHERE 1 = 1"));
        if let Some(mode) = filter.mode {
            qb.push(" AND mode = ").push_bind(mode);
        }
        if let Some(from) = filter.from {
            qb.push(" AND sale_date >= ").push_bind(from);
        }
        if let Some(to) = filter.to {
            qb.push(" AND sale_date <= ").push_bind(to);
        }
        qb.push(" ORDER BY occurred_at_ms ASC, id ASC");

        let rows: Vec<SaleEventRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        into_events(rows)
    }

    /// Every sale event, ascending.
    pub async fn list_all(&self) -> DbResult<Vec<SaleEvent>> {
        self.query(SaleFilter::default()).await
    }

    /// Sale events on one business date, ascending.
    pub async fn list_for_date(&self, date: NaiveDate) -> DbResult<Vec<SaleEvent>> {
        for_date(&self.pool, date).await
    }

    /// The most recently occurred sale event, if any.
    pub async fn latest(&self) -> DbResult<Option<SaleEvent>> {
        latest(&self.pool).await
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sale_events")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

// -----------------------------------------------------------------------------
// Executor-generic helpers shared with the aggregation engine and close-out,
// which run them inside their own transactions.
// -----------------------------------------------------------------------------

pub(crate) async fn for_date<'e, E>(exec: E, date: NaiveDate) -> DbResult<Vec<SaleEvent>>
where
    E: SqliteExecutor<'e>,
{
    let rows: Vec<SaleEventRow> = sqlx::query_as(select_sale_events!(
        " WHERE sale_date = ?1 ORDER BY occurred_at_ms ASC, id ASC"
    ))
    .bind(date)
    .fetch_all(exec)
    .await?;
    into_events(rows)
}

pub(crate) async fn latest<'e, E>(exec: E) -> DbResult<Option<SaleEvent>>
where
    E: SqliteExecutor<'e>,
{
    let row: Option<SaleEventRow> = sqlx::query_as(select_sale_events!(
        " ORDER BY occurred_at_ms DESC, id DESC LIMIT 1"
    ))
    .fetch_optional(exec)
    .await?;
    row.map(SaleEventRow::into_event).transpose()
}
