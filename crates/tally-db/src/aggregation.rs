//! # Aggregation Engine
//!
//! On-demand figures for the dashboard, computed from the sale and visit
//! stores on every call.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  today()                                                               │
//! │    clock.today() ──► read transaction (one snapshot)                   │
//! │                      ├── sale_events WHERE sale_date = today           │
//! │                      ├── COUNT customer_visits WHERE visit_date = today│
//! │                      └── latest sale (system-wide)                     │
//! │                  ──► tally_core::aggregate::day_totals (exact sums)    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each call reads inside one transaction so the sale sums and the visit
//! count come from the same snapshot.

use chrono::NaiveDate;
use sqlx::SqlitePool;

use crate::error::DbResult;
use crate::repository::{sale_event, visit, VisitRepository};
use tally_core::aggregate;
use tally_core::{
    BusinessClock, DayTotals, HourBucket, TodayItemized, TodaySummary, WeekdayBucket,
};

/// Read-only aggregation over the ledger.
#[derive(Debug, Clone)]
pub struct AggregationEngine {
    pool: SqlitePool,
    clock: BusinessClock,
}

impl AggregationEngine {
    pub fn new(pool: SqlitePool, clock: BusinessClock) -> Self {
        AggregationEngine { pool, clock }
    }

    /// Live totals for the current business date plus the latest sale.
    pub async fn today(&self) -> DbResult<TodaySummary> {
        let date = self.clock.today();

        let mut tx = self.pool.begin().await?;
        let sales = sale_event::for_date(&mut *tx, date).await?;
        let visits = visit::count_by_date(&mut *tx, date).await?;
        let last_sale = sale_event::latest(&mut *tx).await?;
        tx.commit().await?;

        let totals = aggregate::day_totals(date, &sales, visits);
        Ok(TodaySummary {
            business_date: date,
            cash_total: totals.cash_total,
            electronic_total: totals.electronic_total,
            combined_total: totals.combined_total(),
            visit_count: totals.visit_count,
            last_sale,
        })
    }

    /// Totals for an arbitrary business date.
    pub async fn totals_for(&self, date: NaiveDate) -> DbResult<DayTotals> {
        let mut tx = self.pool.begin().await?;
        let totals = totals_on(&mut *tx, date).await?;
        tx.commit().await?;
        Ok(totals)
    }

    /// Today's sales split by mode, ascending by time.
    pub async fn today_itemized(&self) -> DbResult<TodayItemized> {
        let sales = sale_event::for_date(&self.pool, self.clock.today()).await?;
        Ok(aggregate::itemize(&sales))
    }

    /// Visits grouped by local hour over all history.
    pub async fn peak_hours(&self) -> DbResult<Vec<HourBucket>> {
        let visits = self.visits().list_records().await?;
        Ok(aggregate::peak_hours(&visits))
    }

    /// Visits grouped by day of week over all history, Monday first.
    pub async fn weekday_distribution(&self) -> DbResult<Vec<WeekdayBucket>> {
        let visits = self.visits().list_records().await?;
        Ok(aggregate::weekday_distribution(&visits))
    }

    fn visits(&self) -> VisitRepository {
        VisitRepository::new(self.pool.clone())
    }
}

/// Totals for `date` read on an open transaction.
pub(crate) async fn totals_on(
    conn: &mut sqlx::SqliteConnection,
    date: NaiveDate,
) -> DbResult<DayTotals> {
    let sales = sale_event::for_date(&mut *conn, date).await?;
    let visits = visit::count_by_date(&mut *conn, date).await?;
    Ok(aggregate::day_totals(date, &sales, visits))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use chrono::{Duration, TimeZone, Utc};
    use chrono_tz::Asia::Kolkata;
    use std::sync::Arc;
    use tally_core::{FixedClock, Money, NewSale, PaymentMode};

    /// 2024-06-03 (Monday) 10:00 in Kolkata.
    async fn setup() -> (Database, Arc<FixedClock>, BusinessClock) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let fixed = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 6, 3, 4, 30, 0).unwrap(),
        ));
        let clock = BusinessClock::new(Kolkata, fixed.clone());
        (db, fixed, clock)
    }

    async fn ingest(db: &Database, clock: &BusinessClock, amount: &str, mode: PaymentMode) {
        db.ingest_sale(NewSale {
            amount: Money::parse(amount).unwrap(),
            mode,
            occurred_at: clock.now(),
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_today_on_empty_store() {
        let (db, _, clock) = setup().await;
        let today = db.aggregation(clock).today().await.unwrap();

        assert!(today.cash_total.is_zero());
        assert!(today.electronic_total.is_zero());
        assert!(today.combined_total.is_zero());
        assert_eq!(today.visit_count, 0);
        assert!(today.last_sale.is_none());
    }

    #[tokio::test]
    async fn test_today_cash_and_electronic() {
        let (db, fixed, clock) = setup().await;
        ingest(&db, &clock, "150.50", PaymentMode::Cash).await;
        fixed.advance(Duration::minutes(3));
        ingest(&db, &clock, "99.00", PaymentMode::Electronic).await;

        let today = db.aggregation(clock).today().await.unwrap();
        assert_eq!(today.cash_total.to_string(), "150.50");
        assert_eq!(today.electronic_total.to_string(), "99.00");
        assert_eq!(today.combined_total.to_string(), "249.50");
        assert_eq!(today.visit_count, 2);
        assert_eq!(
            today.last_sale.map(|s| s.mode),
            Some(PaymentMode::Electronic)
        );
    }

    #[tokio::test]
    async fn test_today_rolls_over_with_clock() {
        let (db, fixed, clock) = setup().await;
        ingest(&db, &clock, "40", PaymentMode::Cash).await;
        let engine = db.aggregation(clock);

        fixed.advance(Duration::days(1));
        let today = engine.today().await.unwrap();
        assert_eq!(today.visit_count, 0);
        assert!(today.combined_total.is_zero());
        // last sale is system-wide, not only today's
        assert!(today.last_sale.is_some());

        let yesterday = engine
            .totals_for(today.business_date.pred_opt().unwrap())
            .await
            .unwrap();
        assert_eq!(yesterday.cash_total, Money::from_cents(4000));
    }

    #[tokio::test]
    async fn test_peak_hours_idempotent_and_complete() {
        let (db, fixed, clock) = setup().await;
        ingest(&db, &clock, "10", PaymentMode::Cash).await;
        fixed.advance(Duration::minutes(20));
        ingest(&db, &clock, "20", PaymentMode::Electronic).await;
        fixed.advance(Duration::hours(7));
        ingest(&db, &clock, "30", PaymentMode::Cash).await;

        let engine = db.aggregation(clock);
        let first = engine.peak_hours().await.unwrap();
        let second = engine.peak_hours().await.unwrap();
        assert_eq!(first, second);

        assert_eq!(first.iter().map(|b| b.hour).collect::<Vec<_>>(), vec![10, 17]);
        assert_eq!(first[0].visit_count, 2);
        assert_eq!(first[0].electronic_total, Money::from_cents(2000));
        let lifetime = db.visits().count_all().await.unwrap();
        assert_eq!(first.iter().map(|b| b.visit_count).sum::<i64>(), lifetime);
    }

    #[tokio::test]
    async fn test_itemized_and_weekdays() {
        let (db, fixed, clock) = setup().await;
        ingest(&db, &clock, "5", PaymentMode::Cash).await;
        fixed.advance(Duration::hours(1));
        ingest(&db, &clock, "7.25", PaymentMode::Electronic).await;
        fixed.advance(Duration::minutes(1));
        ingest(&db, &clock, "3", PaymentMode::Cash).await;

        let engine = db.aggregation(clock);
        let items = engine.today_itemized().await.unwrap();
        assert_eq!(items.cash.len(), 2);
        assert!(items.cash[0].time < items.cash[1].time);
        assert_eq!(items.electronic[0].amount, Money::from_cents(725));

        let days = engine.weekday_distribution().await.unwrap();
        assert_eq!(days.len(), 1);
        assert_eq!(days[0].weekday, "Monday");
        assert_eq!(days[0].visit_count, 3);
        assert_eq!(days[0].combined_total, Money::from_cents(1525));
    }
}
