//! # Clock Module
//!
//! The single source of "now" and "today" for the ledger.
//!
//! ## Layers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Clock (trait)        raw UTC instant                                  │
//! │  ├── SystemClock      Utc::now()                                       │
//! │  └── FixedClock       settable, for tests                              │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  BusinessClock        Clock + business timezone                        │
//! │  ├── now()        →   OccurredAt (instant + local date/time)           │
//! │  ├── today()      →   local calendar date                              │
//! │  ├── yesterday()  →   today − 1                                        │
//! │  └── next_occurrence(cutover) → next UTC instant of a local wall time  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! "Today" is always evaluated at call time, never cached.

use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::fmt;
use std::sync::{Arc, Mutex};

use crate::types::OccurredAt;

// =============================================================================
// Raw Clocks
// =============================================================================

/// A source of the current UTC instant.
pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        FixedClock {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut guard = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *guard += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

// =============================================================================
// Business Clock
// =============================================================================

/// A clock bound to the business timezone.
///
/// Cheap to clone; all clones share the same underlying source.
#[derive(Debug, Clone)]
pub struct BusinessClock {
    tz: Tz,
    source: Arc<dyn Clock>,
}

impl BusinessClock {
    pub fn new(tz: Tz, source: Arc<dyn Clock>) -> Self {
        BusinessClock { tz, source }
    }

    /// Business clock over the system wall clock.
    pub fn system(tz: Tz) -> Self {
        BusinessClock::new(tz, Arc::new(SystemClock))
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    pub fn now_utc(&self) -> DateTime<Utc> {
        self.source.now()
    }

    /// The current instant, stamped in the business timezone.
    pub fn now(&self) -> OccurredAt {
        self.stamp(self.source.now())
    }

    /// Stamps an arbitrary instant in the business timezone.
    pub fn stamp(&self, instant: DateTime<Utc>) -> OccurredAt {
        OccurredAt::new(instant, self.tz)
    }

    /// The current business-local date.
    pub fn today(&self) -> NaiveDate {
        self.now().date()
    }

    /// The business date before today.
    pub fn yesterday(&self) -> NaiveDate {
        let today = self.today();
        today.pred_opt().unwrap_or(today)
    }

    /// Resolves a local wall-clock date and time to a stamped instant.
    ///
    /// Ambiguous times (DST fall-back) take the earlier instant. Times inside
    /// a DST gap resolve to the first valid instant after the gap.
    pub fn resolve_local(&self, date: NaiveDate, time: NaiveTime) -> Option<OccurredAt> {
        resolve_in(self.tz, date.and_time(time)).map(|instant| self.stamp(instant))
    }

    /// The first UTC instant strictly after `after` whose local wall time is
    /// `at`.
    pub fn next_occurrence(&self, after: DateTime<Utc>, at: NaiveTime) -> DateTime<Utc> {
        let local_date = after.with_timezone(&self.tz).date_naive();
        // Three days covers a skipped wall time on the first candidate day
        for offset in 0..3 {
            let Some(date) = local_date.checked_add_signed(Duration::days(offset)) else {
                break;
            };
            if let Some(candidate) = resolve_in(self.tz, date.and_time(at)) {
                if candidate > after {
                    return candidate;
                }
            }
        }
        after + Duration::days(1)
    }
}

fn resolve_in(tz: Tz, local: NaiveDateTime) -> Option<DateTime<Utc>> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(dt) => Some(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(earliest, _) => Some(earliest.with_timezone(&Utc)),
        LocalResult::None => {
            // Walk forward out of the gap, minute by minute, at most two hours
            (1..=120).find_map(|minutes| {
                tz.from_local_datetime(&(local + Duration::minutes(minutes)))
                    .earliest()
                    .map(|dt| dt.with_timezone(&Utc))
            })
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
