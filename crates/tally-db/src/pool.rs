//! # Database Pool Management
//!
//! Connection pool creation, configuration and the write boundary.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Database Connection Pool                           │
//! │                                                                         │
//! │  Server Startup                                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbConfig::new(path) ← Configure pool settings                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::new(config).await ← Create pool + run migrations            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────┐                           │
//! │  │            SqlitePool                    │                           │
//! │  │  ┌─────┐ ┌─────┐ ┌─────┐ ┌─────┐       │                           │
//! │  │  │Conn1│ │Conn2│ │Conn3│ │Conn4│ ...   │  (max_connections)        │
//! │  │  └─────┘ └─────┘ └─────┘ └─────┘       │                           │
//! │  └─────────────────────────────────────────┘                           │
//! │       │                                                                 │
//! │       ├── Readers (dashboard, reports) ──► any connection, in parallel │
//! │       │                                                                 │
//! │       └── Writers (ingest_sale, close_business_day)                    │
//! │             └── write gate (one at a time) ──► one transaction each    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## WAL Mode
//! SQLite WAL (Write-Ahead Logging) mode is enabled so readers never block
//! behind the single writer and always see a committed snapshot.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::aggregation::{self, AggregationEngine};
use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::{daily_report, DailyReportRepository, SaleEventRepository, VisitRepository};
use tally_core::{BusinessClock, DailyReport, NewSale, SaleEvent};

// =============================================================================
// Configuration
// =============================================================================

/// Database configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = DbConfig::new("/path/to/tally.db")
///     .max_connections(5)
///     .busy_timeout(Duration::from_secs(5));
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Path to the SQLite database file.
    pub database_path: PathBuf,

    /// Maximum number of connections in the pool.
    /// Default: 5
    pub max_connections: u32,

    /// Minimum number of connections to keep alive.
    /// Default: 1
    pub min_connections: u32,

    /// How long a caller waits for a free connection.
    /// Default: 30 seconds
    pub connect_timeout: Duration,

    /// Idle timeout before closing a connection.
    /// Default: 10 minutes
    pub idle_timeout: Duration,

    /// How long SQLite waits on a locked database before failing.
    /// Default: 5 seconds
    pub busy_timeout: Duration,

    /// Whether to run migrations on connect.
    /// Default: true
    pub run_migrations: bool,
}

impl DbConfig {
    /// Creates a new database configuration with the given path.
    /// The file is created if it doesn't exist.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            busy_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }

    /// Sets the maximum number of connections.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets the minimum number of connections.
    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    /// Sets the connection acquire timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the SQLite busy timeout.
    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Sets whether to run migrations on connect.
    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// Creates an in-memory database configuration (for testing).
    ///
    /// Each call gets its own isolated database.
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(":memory:"),
            max_connections: 1, // In-memory requires single connection
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(60),
            busy_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }
}

// =============================================================================
// Database
// =============================================================================

/// Main database handle providing repository access and the write boundary.
///
/// ## Write Gate
/// Every write goes through one process-wide async mutex plus one SQLite
/// transaction. A reader therefore never observes a sale without its visit,
/// and a report close-out never interleaves with an ingestion.
///
/// ## Usage
/// ```rust,ignore
/// let event = db.ingest_sale(new_sale).await?;
/// let report = db.reports().get(date).await?;
/// let today = db.aggregation(clock).today().await?;
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    /// The SQLite connection pool.
    pool: SqlitePool,

    /// Serializes writers across all clones of this handle.
    write_gate: Arc<Mutex<()>>,
}

impl Database {
    /// Creates a new database connection pool.
    ///
    /// ## What This Does
    /// 1. Creates the database file if it doesn't exist
    /// 2. Configures SQLite:
    ///    - WAL mode for concurrent reads
    ///    - NORMAL synchronous (balance of safety/speed)
    ///    - Foreign keys enabled
    ///    - Busy timeout so no call blocks without bound
    /// 3. Creates the connection pool
    /// 4. Runs migrations (if enabled)
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(
            path = %config.database_path.display(),
            "Initializing database connection"
        );

        // sqlite://path creates file if not exists
        let connect_url = format!("sqlite://{}?mode=rwc", config.database_path.display());

        let connect_options = SqliteConnectOptions::from_str(&connect_url)
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            // SQLite has them disabled by default for backwards compatibility
            .foreign_keys(true)
            .busy_timeout(config.busy_timeout)
            .create_if_missing(true);

        debug!("Connection options configured");

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(Some(config.idle_timeout))
            .connect_with(connect_options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        info!(
            max_connections = config.max_connections,
            "Database pool created"
        );

        let db = Database {
            pool,
            write_gate: Arc::new(Mutex::new(())),
        };

        if config.run_migrations {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    /// Runs database migrations. Idempotent.
    pub async fn run_migrations(&self) -> DbResult<()> {
        info!("Running database migrations");
        migrations::run_migrations(&self.pool).await?;
        info!("Migrations complete");
        Ok(())
    }

    /// Returns `(embedded, applied)` migration counts.
    pub async fn migration_status(&self) -> DbResult<(usize, usize)> {
        migrations::migration_status(&self.pool).await
    }

    /// Returns a reference to the connection pool.
    ///
    /// Prefer repository methods when available.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Returns the sale event repository.
    pub fn sale_events(&self) -> SaleEventRepository {
        SaleEventRepository::new(self.pool.clone())
    }

    /// Returns the customer visit repository.
    pub fn visits(&self) -> VisitRepository {
        VisitRepository::new(self.pool.clone())
    }

    /// Returns the daily report archive.
    pub fn reports(&self) -> DailyReportRepository {
        DailyReportRepository::new(self.pool.clone())
    }

    /// Returns an aggregation engine that evaluates "today" with `clock`.
    pub fn aggregation(&self, clock: BusinessClock) -> AggregationEngine {
        AggregationEngine::new(self.pool.clone(), clock)
    }

    /// Stores a sale and its customer visit atomically.
    ///
    /// ## What This Does
    /// 1. Takes the write gate
    /// 2. Opens one transaction
    /// 3. Inserts the sale event, then its visit
    /// 4. Commits; the event is durable when this returns
    ///
    /// A sale landing on a date that already has a report does not touch
    /// the report. It is logged so an operator can rerun the close-out.
    pub async fn ingest_sale(&self, sale: NewSale) -> DbResult<SaleEvent> {
        let _gate = self.write_gate.lock().await;

        let mut tx = self.pool.begin().await?;
        let event = SaleEventRepository::record(&mut tx, &sale, Utc::now()).await?;
        VisitRepository::record_visit(&mut tx, event.id, &event.occurred_at).await?;
        let reported = daily_report::exists(&mut *tx, event.occurred_at.date()).await?;
        tx.commit().await?;

        if reported {
            warn!(
                sale_id = event.id,
                date = %event.occurred_at.date(),
                "Sale recorded for a date that already has a report; report is now stale"
            );
        }

        Ok(event)
    }

    /// Computes the totals for `date` and writes them to the archive,
    /// replacing any previous report for that date.
    pub async fn close_business_day(
        &self,
        date: NaiveDate,
        generated_at: DateTime<Utc>,
    ) -> DbResult<DailyReport> {
        let _gate = self.write_gate.lock().await;

        let mut tx = self.pool.begin().await?;
        let totals = aggregation::totals_on(&mut tx, date).await?;
        let report = DailyReport::from_totals(&totals, generated_at);
        daily_report::upsert(&mut *tx, &report).await?;
        tx.commit().await?;

        info!(
            date = %date,
            visits = report.visit_count,
            cash = %report.cash_total,
            electronic = %report.electronic_total,
            combined = %report.combined_total,
            "Business day closed"
        );

        Ok(report)
    }

    /// Closes the database connection pool.
    ///
    /// After calling close, all repository operations will fail.
    pub async fn close(&self) {
        info!("Closing database connection pool");
        self.pool.close().await;
    }

    /// Checks if the database is healthy (can execute queries).
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::SaleFilter;
    use chrono::{Duration as ChronoDuration, TimeZone};
    use chrono_tz::Asia::Kolkata;
    use tally_core::{FixedClock, Money, PaymentMode};

    /// 2024-06-01 15:00 in Kolkata.
    fn clock() -> (Arc<FixedClock>, BusinessClock) {
        let fixed = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 6, 1, 9, 30, 0).unwrap(),
        ));
        (fixed.clone(), BusinessClock::new(Kolkata, fixed))
    }

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn sale(clock: &BusinessClock, cents: i64, mode: PaymentMode) -> NewSale {
        NewSale {
            amount: Money::from_cents(cents),
            mode,
            occurred_at: clock.now(),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_in_memory_database() {
        let db = db().await;
        assert!(db.health_check().await);

        let (total, applied) = db.migration_status().await.unwrap();
        assert_eq!(total, applied);
    }

    #[tokio::test]
    async fn test_config_builder() {
        let config = DbConfig::new("/tmp/test.db")
            .max_connections(10)
            .min_connections(2)
            .busy_timeout(Duration::from_secs(1));

        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 2);
        assert_eq!(config.busy_timeout, Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_ingest_creates_event_and_visit() {
        let db = db().await;
        let (_, clock) = clock();

        let event = db.ingest_sale(sale(&clock, 15050, PaymentMode::Cash)).await.unwrap();

        assert_eq!(event.amount, Money::from_cents(15050));
        assert_eq!(event.occurred_at, clock.now());
        assert_eq!(db.sale_events().count().await.unwrap(), 1);
        assert_eq!(db.visits().count_all().await.unwrap(), 1);
        assert_eq!(db.visits().count_by_date(clock.today()).await.unwrap(), 1);

        let stored = db.sale_events().latest().await.unwrap().unwrap();
        assert_eq!(stored, event);
    }

    #[tokio::test]
    async fn test_ids_increase_with_insertion() {
        let db = db().await;
        let (_, clock) = clock();

        let a = db.ingest_sale(sale(&clock, 100, PaymentMode::Cash)).await.unwrap();
        let b = db.ingest_sale(sale(&clock, 200, PaymentMode::Cash)).await.unwrap();
        assert!(b.id > a.id);
    }

    #[tokio::test]
    async fn test_invalid_amount_writes_nothing() {
        let db = db().await;
        let (_, clock) = clock();

        let err = db.ingest_sale(sale(&clock, 0, PaymentMode::Cash)).await.unwrap_err();
        assert!(matches!(err, DbError::Validation(_)));
        assert_eq!(db.sale_events().count().await.unwrap(), 0);
        assert_eq!(db.visits().count_all().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_ingestion_is_exact() {
        let db = db().await;
        let (_, clock) = clock();

        let mut handles = Vec::new();
        for i in 0..40i64 {
            let db = db.clone();
            let new_sale = sale(
                &clock,
                1001 + i,
                if i % 2 == 0 { PaymentMode::Cash } else { PaymentMode::Electronic },
            );
            handles.push(tokio::spawn(async move { db.ingest_sale(new_sale).await }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let expected: Money = (0..40i64).map(|i| Money::from_cents(1001 + i)).sum();
        let today = db.aggregation(clock.clone()).today().await.unwrap();
        assert_eq!(today.combined_total, expected);
        assert_eq!(today.visit_count, 40);
        assert_eq!(db.sale_events().count().await.unwrap(), 40);
        assert_eq!(db.visits().count_all().await.unwrap(), 40);
    }

    #[tokio::test]
    async fn test_query_filters_and_order() {
        let db = db().await;
        let (fixed, clock) = clock();

        // 2024-06-01, then two on 2024-06-02 ingested out of time order
        db.ingest_sale(sale(&clock, 100, PaymentMode::Cash)).await.unwrap();
        fixed.advance(ChronoDuration::days(1));
        let later = sale(&clock, 300, PaymentMode::Electronic);
        fixed.advance(ChronoDuration::hours(-1));
        let earlier = sale(&clock, 200, PaymentMode::Cash);
        db.ingest_sale(later).await.unwrap();
        db.ingest_sale(earlier).await.unwrap();

        let all = db.sale_events().list_all().await.unwrap();
        let amounts: Vec<_> = all.iter().map(|e| e.amount).collect();
        assert_eq!(
            amounts,
            vec![Money::from_cents(100), Money::from_cents(200), Money::from_cents(300)]
        );

        let cash = db
            .sale_events()
            .query(SaleFilter {
                mode: Some(PaymentMode::Cash),
                ..SaleFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(cash.len(), 2);

        let second_day = db
            .sale_events()
            .query(SaleFilter {
                from: Some(date(2024, 6, 2)),
                to: Some(date(2024, 6, 2)),
                ..SaleFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(second_day.len(), 2);
        assert_eq!(
            db.sale_events().list_for_date(date(2024, 6, 1)).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn test_close_business_day_and_rerun_overwrites() {
        let db = db().await;
        let (fixed, clock) = clock();
        let day = clock.today();

        db.ingest_sale(sale(&clock, 15050, PaymentMode::Cash)).await.unwrap();
        let first = db.close_business_day(day, clock.now_utc()).await.unwrap();
        assert_eq!(first.combined_total, Money::from_cents(15050));
        assert_eq!(first.visit_count, 1);

        db.ingest_sale(sale(&clock, 9900, PaymentMode::Electronic)).await.unwrap();
        // Late event does not change the stored snapshot
        assert_eq!(db.reports().get(day).await.unwrap(), first);

        fixed.advance(ChronoDuration::minutes(5));
        let second = db.close_business_day(day, clock.now_utc()).await.unwrap();
        assert_eq!(second.combined_total, Money::from_cents(24950));
        assert_eq!(second.visit_count, 2);
        assert_eq!(db.reports().get(day).await.unwrap(), second);
        assert_eq!(db.reports().list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_day_report_is_zero_but_missing_is_not_found() {
        let db = db().await;
        let (_, clock) = clock();

        let report = db
            .close_business_day(date(2024, 5, 20), clock.now_utc())
            .await
            .unwrap();
        assert!(report.combined_total.is_zero());
        assert_eq!(report.visit_count, 0);

        let missing = db.reports().get(date(2024, 5, 21)).await.unwrap_err();
        assert!(matches!(missing, DbError::NotFound { .. }));
    }
}
