//! # Daily Report Archive
//!
//! Business date → finalized snapshot.
//!
//! ```text
//! upsert(report)     INSERT ... ON CONFLICT(business_date) DO UPDATE
//! get(date)          DailyReport | NotFound
//! latest()           max(business_date) | NotFound
//! list(limit)        date descending
//! list_all()         date ascending (CSV export)
//! ```
//!
//! A date with no report is `NotFound`, which is different from a report
//! whose totals are all zero.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{SqliteExecutor, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use tally_core::{DailyReport, Money};

macro_rules! select_reports {
    ($tail:literal) => {
        concat!(
            "SELECT business_date, visit_count, cash_total, electronic_total, ",
            "combined_total, generated_at_ms FROM daily_reports",
            $tail
        )
    };
}

#[derive(Debug, sqlx::FromRow)]
struct DailyReportRow {
    business_date: NaiveDate,
    visit_count: i64,
    cash_total: String,
    electronic_total: String,
    combined_total: String,
    generated_at_ms: i64,
}

impl DailyReportRow {
    fn into_report(self) -> DbResult<DailyReport> {
        let date = self.business_date;
        let money = |text: &str| {
            Money::parse(text).map_err(|e| {
                DbError::corrupt("daily_reports", format!("{date}: amount '{text}': {e}"))
            })
        };
        let generated_at = DateTime::<Utc>::from_timestamp_millis(self.generated_at_ms)
            .ok_or_else(|| DbError::corrupt("daily_reports", format!("{date}: generated_at")))?;

        Ok(DailyReport {
            business_date: date,
            visit_count: self.visit_count,
            cash_total: money(&self.cash_total)?,
            electronic_total: money(&self.electronic_total)?,
            combined_total: money(&self.combined_total)?,
            generated_at,
        })
    }
}

fn into_reports(rows: Vec<DailyReportRow>) -> DbResult<Vec<DailyReport>> {
    rows.into_iter().map(DailyReportRow::into_report).collect()
}

/// Repository for the report archive.
#[derive(Debug, Clone)]
pub struct DailyReportRepository {
    pool: SqlitePool,
}

impl DailyReportRepository {
    pub fn new(pool: SqlitePool) -> Self {
        DailyReportRepository { pool }
    }

    /// Replaces any report for the same date.
    pub async fn upsert(&self, report: &DailyReport) -> DbResult<()> {
        upsert(&self.pool, report).await
    }

    /// The report for `date`, or [`DbError::NotFound`].
    pub async fn get(&self, date: NaiveDate) -> DbResult<DailyReport> {
        let row: Option<DailyReportRow> =
            sqlx::query_as(select_reports!(" WHERE business_date = ?1"))
                .bind(date)
                .fetch_optional(&self.pool)
                .await?;

        row.ok_or_else(|| DbError::not_found("DailyReport", date.to_string()))?
            .into_report()
    }

    /// The report with the greatest business date, or [`DbError::NotFound`].
    pub async fn latest(&self) -> DbResult<DailyReport> {
        let row: Option<DailyReportRow> =
            sqlx::query_as(select_reports!(" ORDER BY business_date DESC LIMIT 1"))
                .fetch_optional(&self.pool)
                .await?;

        row.ok_or_else(|| DbError::not_found("DailyReport", "latest"))?
            .into_report()
    }

    /// Up to `limit` reports, newest date first.
    pub async fn list(&self, limit: u32) -> DbResult<Vec<DailyReport>> {
        let rows: Vec<DailyReportRow> =
            sqlx::query_as(select_reports!(" ORDER BY business_date DESC LIMIT ?1"))
                .bind(i64::from(limit))
                .fetch_all(&self.pool)
                .await?;
        into_reports(rows)
    }

    /// Every report, oldest date first.
    pub async fn list_all(&self) -> DbResult<Vec<DailyReport>> {
        let rows: Vec<DailyReportRow> =
            sqlx::query_as(select_reports!(" ORDER BY business_date ASC"))
                .fetch_all(&self.pool)
                .await?;
        into_reports(rows)
    }

    /// Dates in `from..=to` that have sales but no report yet, ascending.
    pub async fn missing_dates(&self, from: NaiveDate, to: NaiveDate) -> DbResult<Vec<NaiveDate>> {
        let dates: Vec<NaiveDate> = sqlx::query_scalar(
            r#"
            SELECT DISTINCT s.sale_date
            FROM sale_events s
            LEFT JOIN daily_reports r ON r.business_date = s.sale_date
            WHERE s.sale_date >= ?1 AND s.sale_date <= ?2
              AND r.business_date IS NULL
            ORDER BY s.sale_date ASC
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;
        Ok(dates)
    }
}

pub(crate) async fn upsert<'e, E>(exec: E, report: &DailyReport) -> DbResult<()>
where
    E: SqliteExecutor<'e>,
{
    debug!(
        date = %report.business_date,
        visits = report.visit_count,
        combined = %report.combined_total,
        "Upserting daily report"
    );

    sqlx::query(
        r#"
        INSERT INTO daily_reports (
            business_date, visit_count, cash_total, electronic_total,
            combined_total, generated_at_ms
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT(business_date) DO UPDATE SET
            visit_count = excluded.visit_count,
            cash_total = excluded.cash_total,
            electronic_total = excluded.electronic_total,
            combined_total = excluded.combined_total,
            generated_at_ms = excluded.generated_at_ms
        "#,
    )
    .bind(report.business_date)
    .bind(report.visit_count)
    .bind(report.cash_total.to_storage_string())
    .bind(report.electronic_total.to_storage_string())
    .bind(report.combined_total.to_storage_string())
    .bind(report.generated_at.timestamp_millis())
    .execute(exec)
    .await?;

    Ok(())
}

pub(crate) async fn exists<'e, E>(exec: E, date: NaiveDate) -> DbResult<bool>
where
    E: SqliteExecutor<'e>,
{
    let found: Option<i64> =
        sqlx::query_scalar("SELECT 1 FROM daily_reports WHERE business_date = ?1")
            .bind(date)
            .fetch_optional(exec)
            .await?;
    Ok(found.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use chrono::TimeZone;
    use chrono_tz::Asia::Kolkata;
    use std::sync::Arc;
    use tally_core::{BusinessClock, DayTotals, FixedClock, NewSale, PaymentMode};

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    fn report(d: u32, cents: i64) -> DailyReport {
        let totals = DayTotals {
            date: date(d),
            cash_total: Money::from_cents(cents),
            electronic_total: Money::zero(),
            visit_count: 1,
        };
        DailyReport::from_totals(&totals, Utc.with_ymd_and_hms(2024, 6, 10, 0, 0, 0).unwrap())
    }

    #[tokio::test]
    async fn test_latest_and_list_order() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let reports = db.reports();

        assert!(matches!(reports.latest().await, Err(DbError::NotFound { .. })));

        for d in [3, 1, 2] {
            reports.upsert(&report(d, 100 * i64::from(d))).await.unwrap();
        }

        assert_eq!(reports.latest().await.unwrap().business_date, date(3));

        let newest_two: Vec<_> = reports
            .list(2)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.business_date)
            .collect();
        assert_eq!(newest_two, vec![date(3), date(2)]);

        let all: Vec<_> = reports
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.business_date)
            .collect();
        assert_eq!(all, vec![date(1), date(2), date(3)]);
    }

    #[tokio::test]
    async fn test_upsert_replaces() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let reports = db.reports();

        reports.upsert(&report(1, 100)).await.unwrap();
        reports.upsert(&report(1, 250)).await.unwrap();

        assert_eq!(reports.get(date(1)).await.unwrap().cash_total, Money::from_cents(250));
        assert_eq!(reports.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_dates_only_with_sales() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let fixed = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2024, 6, 1, 6, 0, 0).unwrap()));
        let clock = BusinessClock::new(Kolkata, fixed.clone());

        // Sales on the 1st and 3rd; the 2nd is quiet
        for _ in 0..2 {
            db.ingest_sale(NewSale {
                amount: Money::from_cents(500),
                mode: PaymentMode::Cash,
                occurred_at: clock.now(),
            })
            .await
            .unwrap();
            fixed.advance(chrono::Duration::days(2));
        }
        db.reports().upsert(&report(1, 500)).await.unwrap();

        let missing = db.reports().missing_dates(date(1), date(5)).await.unwrap();
        assert_eq!(missing, vec![date(3)]);
    }
}
