//! # Customer-Visit Ledger
//!
//! One visit per sale event, written in the sale's transaction. Visits are
//! what the dashboard counts as customers.

use chrono::{NaiveDate, NaiveTime};
use sqlx::{SqliteConnection, SqliteExecutor, SqlitePool};

use crate::error::{DbError, DbResult};
use tally_core::{CustomerVisit, Money, OccurredAt, PaymentMode, VisitRecord};

#[derive(Debug, sqlx::FromRow)]
struct VisitRecordRow {
    sale_event_id: i64,
    occurred_at_ms: i64,
    visit_date: NaiveDate,
    visit_time: NaiveTime,
    mode: PaymentMode,
    amount: String,
}

impl VisitRecordRow {
    fn into_record(self) -> DbResult<VisitRecord> {
        let amount = Money::parse(&self.amount).map_err(|e| {
            DbError::corrupt(
                "sale_events",
                format!("id {}: amount '{}': {e}", self.sale_event_id, self.amount),
            )
        })?;
        let occurred_at = OccurredAt::from_stored(self.occurred_at_ms, self.visit_date, self.visit_time)
            .ok_or_else(|| {
                DbError::corrupt(
                    "customer_visits",
                    format!("sale {}: instant out of range", self.sale_event_id),
                )
            })?;
        Ok(VisitRecord {
            occurred_at,
            mode: self.mode,
            amount,
        })
    }
}

/// Repository for customer visits.
#[derive(Debug, Clone)]
pub struct VisitRepository {
    pool: SqlitePool,
}

impl VisitRepository {
    pub fn new(pool: SqlitePool) -> Self {
        VisitRepository { pool }
    }

    /// Inserts the visit for `sale_event_id` on `conn`, inside the sale's
    /// transaction. The occurrence time is copied from the sale.
    pub async fn record_visit(
        conn: &mut SqliteConnection,
        sale_event_id: i64,
        occurred_at: &OccurredAt,
    ) -> DbResult<CustomerVisit> {
        let result = sqlx::query(
            r#"
            INSERT INTO customer_visits (
                sale_event_id, occurred_at_ms, visit_date, visit_time
            ) VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(sale_event_id)
        .bind(occurred_at.timestamp_millis())
        .bind(occurred_at.date())
        .bind(occurred_at.time())
        .execute(&mut *conn)
        .await?;

        Ok(CustomerVisit {
            id: result.last_insert_rowid(),
            sale_event_id,
            occurred_at: *occurred_at,
        })
    }

    /// Visits on one business date.
    pub async fn count_by_date(&self, date: NaiveDate) -> DbResult<i64> {
        count_by_date(&self.pool, date).await
    }

    /// Lifetime visit count.
    pub async fn count_all(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customer_visits")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Every visit joined with its sale's mode and amount, oldest first.
    pub async fn list_records(&self) -> DbResult<Vec<VisitRecord>> {
        let rows: Vec<VisitRecordRow> = sqlx::query_as(
            r#"
            SELECT
                v.sale_event_id,
                v.occurred_at_ms,
                v.visit_date,
                v.visit_time,
                s.mode,
                s.amount
            FROM customer_visits v
            JOIN sale_events s ON s.id = v.sale_event_id
            ORDER BY v.occurred_at_ms ASC, v.id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(VisitRecordRow::into_record).collect()
    }
}

pub(crate) async fn count_by_date<'e, E>(exec: E, date: NaiveDate) -> DbResult<i64>
where
    E: SqliteExecutor<'e>,
{
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customer_visits WHERE visit_date = ?1")
        .bind(date)
        .fetch_one(exec)
        .await?;
    Ok(count)
}
