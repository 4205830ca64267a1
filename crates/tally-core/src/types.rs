//! # Domain Types
//!
//! Core domain types used throughout the Tally ledger.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   SaleEvent     │   │ CustomerVisit   │   │  DailyReport    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (i64)       │◄──│  sale_event_id  │   │  business_date  │       │
//! │  │  amount (Money) │   │  occurred_at    │   │  visit_count    │       │
//! │  │  mode           │   └─────────────────┘   │  cash/elec/comb │       │
//! │  │  occurred_at    │                         │  generated_at   │       │
//! │  └─────────────────┘                         └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  PaymentMode    │   │   OccurredAt    │   │   DayTotals     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  Cash           │   │  instant (UTC)  │   │  date           │       │
//! │  │  Electronic     │   │  date  (local)  │   │  cash_total     │       │
//! │  │  ("upi" alias)  │   │  time  (local)  │   │  electronic_... │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Time Representation
//! Every event carries one canonical UTC instant. The business-local date
//! and time are derived from it by the clock and cannot be set on their own,
//! so the three can never disagree.

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Timelike, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Payment Mode
// =============================================================================

/// How a sale was paid.
///
/// Wire names are `"cash"` and `"electronic"`. The legacy name `"upi"`
/// is accepted on input and maps to [`PaymentMode::Electronic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMode {
    /// Physical cash.
    Cash,
    /// UPI / card / any electronic transfer.
    #[serde(alias = "upi")]
    Electronic,
}

impl PaymentMode {
    /// All modes, in reporting order.
    pub const ALL: [PaymentMode; 2] = [PaymentMode::Cash, PaymentMode::Electronic];

    /// Canonical wire and storage name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentMode::Cash => "cash",
            PaymentMode::Electronic => "electronic",
        }
    }
}

impl fmt::Display for PaymentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cash" => Ok(PaymentMode::Cash),
            "electronic" | "upi" => Ok(PaymentMode::Electronic),
            _ => Err(ValidationError::NotAllowed {
                field: "mode".to_string(),
                allowed: vec!["cash".to_string(), "electronic".to_string()],
            }),
        }
    }
}

// =============================================================================
// Occurrence Time
// =============================================================================

/// When an event happened: a UTC instant plus its business-local date and time.
///
/// Built only through [`OccurredAt::new`] (or the clock), which derives the
/// local fields from the instant. Instants are kept at millisecond precision
/// and local times at second precision, matching what storage round-trips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct OccurredAt {
    #[ts(type = "string")]
    instant: DateTime<Utc>,
    #[ts(type = "string")]
    date: NaiveDate,
    #[ts(type = "string")]
    time: NaiveTime,
}

impl OccurredAt {
    /// Stamps `instant` in the business timezone `tz`.
    pub fn new(instant: DateTime<Utc>, tz: Tz) -> Self {
        let millis = instant.timestamp_millis();
        let instant = DateTime::<Utc>::from_timestamp_millis(millis).unwrap_or(instant);
        let local = instant.with_timezone(&tz).naive_local();
        let time = local.time().with_nanosecond(0).unwrap_or(local.time());
        OccurredAt {
            instant,
            date: local.date(),
            time,
        }
    }

    /// Rebuilds a persisted value. Storage is the only caller; it wrote the
    /// three parts together from a value built by [`OccurredAt::new`].
    pub fn from_stored(millis: i64, date: NaiveDate, time: NaiveTime) -> Option<Self> {
        DateTime::<Utc>::from_timestamp_millis(millis).map(|instant| OccurredAt {
            instant,
            date,
            time,
        })
    }

    pub fn instant(&self) -> DateTime<Utc> {
        self.instant
    }

    /// Business-local calendar date.
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Business-local clock time (second precision).
    pub fn time(&self) -> NaiveTime {
        self.time
    }

    pub fn hour(&self) -> u32 {
        self.time.hour()
    }

    pub fn weekday(&self) -> Weekday {
        self.date.weekday()
    }

    pub fn timestamp_millis(&self) -> i64 {
        self.instant.timestamp_millis()
    }
}

// =============================================================================
// Sale Event & Visit
// =============================================================================

/// One recorded sale. Created once, never changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SaleEvent {
    /// Store-assigned, increasing with insertion order.
    pub id: i64,
    #[ts(type = "number")]
    pub amount: Money,
    pub mode: PaymentMode,
    pub occurred_at: OccurredAt,
}

/// A validated sale waiting to be stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewSale {
    pub amount: Money,
    pub mode: PaymentMode,
    pub occurred_at: OccurredAt,
}

/// The visit produced by a sale, one per [`SaleEvent`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CustomerVisit {
    pub id: i64,
    /// Weak link back to the producing sale.
    pub sale_event_id: i64,
    pub occurred_at: OccurredAt,
}

/// A visit joined with its sale's mode and amount, the input to the
/// hour and weekday folds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisitRecord {
    pub occurred_at: OccurredAt,
    pub mode: PaymentMode,
    pub amount: Money,
}

// =============================================================================
// Aggregates
// =============================================================================

/// Exact totals for one business date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DayTotals {
    #[ts(type = "string")]
    pub date: NaiveDate,
    #[ts(type = "number")]
    pub cash_total: Money,
    #[ts(type = "number")]
    pub electronic_total: Money,
    pub visit_count: i64,
}

impl DayTotals {
    /// Totals for a date with no activity.
    pub fn empty(date: NaiveDate) -> Self {
        DayTotals {
            date,
            cash_total: Money::zero(),
            electronic_total: Money::zero(),
            visit_count: 0,
        }
    }

    /// Sum of both modes, computed from the exact parts.
    pub fn combined_total(&self) -> Money {
        self.cash_total + self.electronic_total
    }
}

/// Finalized snapshot of one business date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DailyReport {
    #[ts(type = "string")]
    pub business_date: NaiveDate,
    pub visit_count: i64,
    #[ts(type = "number")]
    pub cash_total: Money,
    #[ts(type = "number")]
    pub electronic_total: Money,
    #[ts(type = "number")]
    pub combined_total: Money,
    #[ts(type = "string")]
    pub generated_at: DateTime<Utc>,
}

impl DailyReport {
    /// Freezes `totals` into a report computed at `generated_at`.
    pub fn from_totals(totals: &DayTotals, generated_at: DateTime<Utc>) -> Self {
        DailyReport {
            business_date: totals.date,
            visit_count: totals.visit_count,
            cash_total: totals.cash_total,
            electronic_total: totals.electronic_total,
            combined_total: totals.combined_total(),
            generated_at,
        }
    }
}

/// Live figures for the current business date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct TodaySummary {
    #[ts(type = "string")]
    pub business_date: NaiveDate,
    #[ts(type = "number")]
    pub cash_total: Money,
    #[ts(type = "number")]
    pub electronic_total: Money,
    #[ts(type = "number")]
    pub combined_total: Money,
    pub visit_count: i64,
    /// Most recent sale system-wide, not only today's.
    pub last_sale: Option<SaleEvent>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct ItemizedSale {
    #[ts(type = "string")]
    pub time: NaiveTime,
    #[ts(type = "number")]
    pub amount: Money,
}

/// Today's sales split by mode, each list ascending by time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct TodayItemized {
    pub cash: Vec<ItemizedSale>,
    pub electronic: Vec<ItemizedSale>,
}

/// Activity within one hour of the day (0..=23), across all history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct HourBucket {
    pub hour: u32,
    pub visit_count: i64,
    #[ts(type = "number")]
    pub cash_total: Money,
    #[ts(type = "number")]
    pub electronic_total: Money,
}

/// Activity on one day of the week, across all history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct WeekdayBucket {
    /// English day name, `"Monday"` .. `"Sunday"`.
    pub weekday: String,
    pub visit_count: i64,
    #[ts(type = "number")]
    pub cash_total: Money,
    #[ts(type = "number")]
    pub electronic_total: Money,
    #[ts(type = "number")]
    pub combined_total: Money,
}

/// A payment pulled out of free text by a classifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct SaleCandidate {
    #[ts(type = "number")]
    pub amount: Money,
    pub mode: PaymentMode,
    /// The fragment the amount was read from.
    pub matched: String,
}

// =============================================================================
// Unit Tests
// =============================================================================
