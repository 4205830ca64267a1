//! # tally-core: Pure Domain Logic for the Tally Ledger
//!
//! Everything the ledger knows about sales, days and money, with no I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally Ledger Architecture                        │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              tally-server (axum + scheduler)                    │   │
//! │  │   POST /api/sales ──► dashboard ──► reports ──► CSV / ws feed   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tally-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌──────────┐ ┌──────────┐ ┌────────┐ │   │
//! │  │   │  types  │ │  money  │ │  clock   │ │aggregate │ │ export │ │   │
//! │  │   │SaleEvent│ │  Money  │ │ Business │ │  folds   │ │  CSV   │ │   │
//! │  │   │ Report  │ │(Decimal)│ │  Clock   │ │          │ │        │ │   │
//! │  │   └─────────┘ └─────────┘ └──────────┘ └──────────┘ └────────┘ │   │
//! │  │                                                                 │   │
//! │  │   NO DATABASE • NO NETWORK • DETERMINISTIC GIVEN A CLOCK        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    tally-db (Database Layer)                    │   │
//! │  │         SQLite, migrations, repositories, close-out             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (SaleEvent, CustomerVisit, DailyReport, ...)
//! - [`money`] - Exact decimal money
//! - [`clock`] - Business-timezone clock, "today" and cutover instants
//! - [`validation`] - Ingestion input rules
//! - [`aggregate`] - Totals, hour and weekday folds
//! - [`classifier`] - Payment text recognition
//! - [`export`] - CSV rendering
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use tally_core::money::Money;
//! use tally_core::types::DayTotals;
//! use chrono::NaiveDate;
//!
//! let totals = DayTotals {
//!     date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
//!     cash_total: Money::parse("150.50").unwrap(),
//!     electronic_total: Money::parse("99.00").unwrap(),
//!     visit_count: 2,
//! };
//! assert_eq!(totals.combined_total().to_string(), "249.50");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod aggregate;
pub mod classifier;
pub mod clock;
pub mod error;
pub mod export;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use clock::{BusinessClock, Clock, FixedClock, SystemClock};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Business timezone used when none is configured.
pub const DEFAULT_TIMEZONE: &str = "Asia/Kolkata";

/// Local hour at which the previous business day is closed out.
pub const DEFAULT_CUTOVER_HOUR: u32 = 23;

/// Largest single sale accepted, in whole currency units.
///
/// Catches typos like an extra zero or a pasted phone number.
pub const MAX_SALE_AMOUNT: i64 = 10_000_000;
