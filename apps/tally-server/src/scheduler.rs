//! # Daily Report Scheduler
//!
//! Closes out the previous business day once a day at the cutover time.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Daily Report Scheduler                             │
//! │                                                                         │
//! │  start ──► catch_up(N) ──► fill dates with sales but no report         │
//! │                │                                                        │
//! │                ▼                                                        │
//! │        ┌── sleep until next cutover (23:00 local) ◄──────────┐         │
//! │        │        │                          │                  │         │
//! │        │   shutdown token             timer fires             │         │
//! │        │        │                          │                  │         │
//! │        │        ▼                          ▼                  │         │
//! │        │      stop          ReportRunner::fire()              │         │
//! │        │                    target = yesterday (local)        │         │
//! │        │                    Idle ──► RunningReport ──► Idle ──┘         │
//! │        │                                                                │
//! │  POST /api/reports/{date}/generate ──► ReportRunner::run_for(date)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Failure Handling
//! A failed or panicking run is logged with `error!` and the loop goes back
//! to sleep. There is no immediate retry; the next attempt is the next
//! cutover, a manual rerun, or the catch-up at the next start.
//!
//! ## Overlap
//! Only one close-out runs at a time. A firing or rerun that arrives while
//! one is in progress returns [`FireOutcome::Skipped`] and is not queued.

use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use futures_util::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::tasks::panic_message;
use tally_core::{BusinessClock, DailyReport};
use tally_db::{Database, DbResult};

// =============================================================================
// Runner
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerState {
    Idle,
    RunningReport,
}

/// What happened to one close-out request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FireOutcome {
    Generated(DailyReport),
    /// Another close-out was already running.
    Skipped,
    Failed(String),
}

/// The single entry point that writes the report archive.
///
/// Shared by the scheduler loop, startup catch-up and manual reruns so all
/// three respect the same Idle / RunningReport guard.
#[derive(Debug, Clone)]
pub struct ReportRunner {
    inner: Arc<RunnerInner>,
}

#[derive(Debug)]
struct RunnerInner {
    db: Database,
    clock: BusinessClock,
    running: AtomicBool,
}

/// Flips the runner back to idle when dropped, including on panic.
struct RunGuard<'a>(&'a AtomicBool);

impl<'a> RunGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunGuard(flag))
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl ReportRunner {
    pub fn new(db: Database, clock: BusinessClock) -> Self {
        ReportRunner {
            inner: Arc::new(RunnerInner {
                db,
                clock,
                running: AtomicBool::new(false),
            }),
        }
    }

    pub fn state(&self) -> RunnerState {
        if self.inner.running.load(Ordering::Acquire) {
            RunnerState::RunningReport
        } else {
            RunnerState::Idle
        }
    }

    /// Closes out the business date before the current one.
    pub async fn fire(&self) -> FireOutcome {
        let target = self.inner.clock.yesterday();
        info!(date = %target, "Running daily report");
        self.run_for(target).await
    }

    /// Computes and upserts the report for `date`, replacing any earlier one.
    pub async fn run_for(&self, date: NaiveDate) -> FireOutcome {
        let generated_at = self.inner.clock.now_utc();
        let db = self.inner.db.clone();
        self.guarded(date, async move { db.close_business_day(date, generated_at).await })
            .await
    }

    /// Generates reports for closed dates in the last `days` that have sales
    /// but no report. Existing reports are left alone.
    ///
    /// Returns the dates that were generated.
    pub async fn catch_up(&self, days: u32) -> Vec<NaiveDate> {
        if days == 0 {
            return Vec::new();
        }

        let to = self.inner.clock.yesterday();
        let Some(from) = to.checked_sub_days(Days::new(u64::from(days) - 1)) else {
            warn!(days, %to, "Catch-up window reaches past the calendar range, skipping");
            return Vec::new();
        };

        let missing = match self.inner.db.reports().missing_dates(from, to).await {
            Ok(dates) => dates,
            Err(e) => {
                error!(error = %e, "Report catch-up could not list missing dates");
                return Vec::new();
            }
        };

        if missing.is_empty() {
            debug!(%from, %to, "Daily reports up to date");
            return Vec::new();
        }

        info!(count = missing.len(), %from, %to, "Catching up missing daily reports");

        let mut generated = Vec::with_capacity(missing.len());
        for date in missing {
            if let FireOutcome::Generated(report) = self.run_for(date).await {
                generated.push(report.business_date);
            }
        }
        generated
    }

    async fn guarded<F>(&self, date: NaiveDate, job: F) -> FireOutcome
    where
        F: Future<Output = DbResult<DailyReport>>,
    {
        let Some(_guard) = RunGuard::acquire(&self.inner.running) else {
            warn!(date = %date, "Daily report already running, skipping");
            return FireOutcome::Skipped;
        };

        match AssertUnwindSafe(job).catch_unwind().await {
            Ok(Ok(report)) => FireOutcome::Generated(report),
            Ok(Err(e)) => {
                error!(date = %date, error = %e, "Daily report failed");
                FireOutcome::Failed(e.to_string())
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(date = %date, panic = %message, "Daily report panicked");
                FireOutcome::Failed(message)
            }
        }
    }
}

// =============================================================================
// Scheduler Loop
// =============================================================================

/// Wakes at the cutover every day and asks the runner to close out.
pub struct DailyReportScheduler {
    runner: ReportRunner,
    clock: BusinessClock,
    cutover: NaiveTime,
    catch_up_days: u32,
    shutdown: CancellationToken,
}

impl DailyReportScheduler {
    pub fn new(
        runner: ReportRunner,
        clock: BusinessClock,
        cutover: NaiveTime,
        catch_up_days: u32,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            runner,
            clock,
            cutover,
            catch_up_days,
            shutdown,
        }
    }

    /// Main loop: startup catch-up, then one firing per cutover until shutdown.
    pub async fn run(self) {
        info!(cutover = %self.cutover, "Daily report scheduler started");

        let caught_up = self.runner.catch_up(self.catch_up_days).await;
        if !caught_up.is_empty() {
            info!(count = caught_up.len(), "Startup catch-up generated reports");
        }

        let mut last_fired: Option<DateTime<Utc>> = None;
        loop {
            let now = self.clock.now_utc();
            // Never schedule the same cutover twice if the timer woke early
            let after = match last_fired {
                Some(prev) if prev >= now => prev,
                _ => now,
            };
            let next = self.clock.next_occurrence(after, self.cutover);
            let wait = (next - now).to_std().unwrap_or_default();

            info!(
                next = %next.with_timezone(&self.clock.timezone()),
                minutes = wait.as_secs() / 60,
                "Next daily report scheduled"
            );

            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = self.shutdown.cancelled() => {
                    info!("Daily report scheduler received shutdown signal");
                    return;
                }
            }

            last_fired = Some(next);
            match self.runner.fire().await {
                FireOutcome::Generated(report) => {
                    debug!(date = %report.business_date, "Scheduled daily report stored");
                }
                // logged by the runner; wait for the next cutover
                FireOutcome::Skipped | FireOutcome::Failed(_) => {}
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use chrono_tz::Asia::Kolkata;
    use std::time::Duration as StdDuration;
    use tally_core::{FixedClock, Money, NewSale, PaymentMode};
    use tally_db::{DbConfig, DbError};
    use tokio::sync::oneshot;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, day).unwrap()
    }

    /// 2024-06-05 12:00 in Kolkata.
    async fn setup() -> (Database, Arc<FixedClock>, BusinessClock, ReportRunner) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let fixed = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2024, 6, 5, 6, 30, 0).unwrap()));
        let clock = BusinessClock::new(Kolkata, fixed.clone());
        let runner = ReportRunner::new(db.clone(), clock.clone());
        (db, fixed, clock, runner)
    }

    async fn sale_on(db: &Database, clock: &BusinessClock, day: u32, cents: i64) {
        let occurred_at = clock
            .resolve_local(d(day), NaiveTime::from_hms_opt(10, 0, 0).unwrap())
            .unwrap();
        db.ingest_sale(NewSale {
            amount: Money::from_cents(cents),
            mode: PaymentMode::Cash,
            occurred_at,
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_fire_closes_yesterday() {
        let (db, _, clock, runner) = setup().await;
        sale_on(&db, &clock, 4, 15050).await;
        sale_on(&db, &clock, 5, 999).await;

        let FireOutcome::Generated(report) = runner.fire().await else {
            panic!("expected a report");
        };
        assert_eq!(report.business_date, d(4));
        assert_eq!(report.visit_count, 1);
        assert_eq!(report.cash_total, Money::from_cents(15050));
        assert_eq!(runner.state(), RunnerState::Idle);

        // today is still open
        assert!(matches!(db.reports().get(d(5)).await, Err(DbError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_quiet_day_gets_zero_report() {
        let (db, _, _, runner) = setup().await;

        let FireOutcome::Generated(report) = runner.fire().await else {
            panic!("expected a report");
        };
        assert_eq!(report.visit_count, 0);
        assert!(report.combined_total.is_zero());
        assert_eq!(db.reports().get(d(4)).await.unwrap(), report);
    }

    #[tokio::test]
    async fn test_overlapping_run_is_skipped() {
        let (_, _, _, runner) = setup().await;
        let (release, hold) = oneshot::channel::<()>();

        let busy = runner.clone();
        let first = tokio::spawn(async move {
            busy.guarded(d(3), async move {
                let _ = hold.await;
                Err(DbError::Internal("released".into()))
            })
            .await
        });

        while runner.state() != RunnerState::RunningReport {
            tokio::time::sleep(StdDuration::from_millis(1)).await;
        }
        assert_eq!(runner.run_for(d(4)).await, FireOutcome::Skipped);

        release.send(()).unwrap();
        assert!(matches!(first.await.unwrap(), FireOutcome::Failed(_)));
        assert_eq!(runner.state(), RunnerState::Idle);
    }

    async fn explode() -> DbResult<DailyReport> {
        panic!("aggregation exploded")
    }

    #[tokio::test]
    async fn test_panic_is_contained_and_runner_recovers() {
        let (db, _, clock, runner) = setup().await;
        sale_on(&db, &clock, 4, 500).await;

        let outcome = runner.guarded(d(4), explode()).await;
        assert_eq!(outcome, FireOutcome::Failed("aggregation exploded".into()));
        assert_eq!(runner.state(), RunnerState::Idle);

        assert!(matches!(runner.fire().await, FireOutcome::Generated(_)));
    }

    #[tokio::test]
    async fn test_catch_up_fills_only_gaps() {
        let (db, _, clock, runner) = setup().await;
        for day in [1, 2, 3, 4] {
            sale_on(&db, &clock, day, 1000).await;
        }
        let kept = db.close_business_day(d(2), clock.now_utc()).await.unwrap();
        // late sale after the 2nd was closed
        sale_on(&db, &clock, 2, 1).await;

        let generated = runner.catch_up(3).await;
        assert_eq!(generated, vec![d(3), d(4)]);

        // outside the window
        assert!(db.reports().get(d(1)).await.is_err());
        // existing snapshot untouched
        assert_eq!(db.reports().get(d(2)).await.unwrap(), kept);

        assert!(runner.catch_up(3).await.is_empty());
        assert!(runner.catch_up(0).await.is_empty());
    }

    #[tokio::test]
    async fn test_catch_up_out_of_range_window_is_skipped() {
        let (db, _, clock, runner) = setup().await;
        sale_on(&db, &clock, 4, 1000).await;

        assert!(runner.catch_up(u32::MAX).await.is_empty());
        assert_eq!(runner.state(), RunnerState::Idle);

        // the runner still works afterwards
        assert_eq!(runner.catch_up(3).await, vec![d(4)]);
    }

    #[tokio::test]
    async fn test_scheduler_fires_at_cutover_and_stops() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        // 22:59:59.900 local on the 5th
        let fixed = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 6, 5, 17, 29, 59).unwrap()
                + Duration::milliseconds(900),
        ));
        let clock = BusinessClock::new(Kolkata, fixed);
        sale_on(&db, &clock, 4, 2500).await;

        let runner = ReportRunner::new(db.clone(), clock.clone());
        let token = CancellationToken::new();
        let scheduler = DailyReportScheduler::new(
            runner,
            clock,
            NaiveTime::from_hms_opt(23, 0, 0).unwrap(),
            0,
            token.clone(),
        );
        let handle = tokio::spawn(scheduler.run());

        let mut report = None;
        for _ in 0..200 {
            if let Ok(r) = db.reports().get(d(4)).await {
                report = Some(r);
                break;
            }
            tokio::time::sleep(StdDuration::from_millis(10)).await;
        }
        assert_eq!(report.unwrap().cash_total, Money::from_cents(2500));

        token.cancel();
        tokio::time::timeout(StdDuration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
