//! # Repository Module
//!
//! Database repository implementations for the ledger.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  HTTP handler / scheduler                                              │
//! │       │                                                                 │
//! │       │  db.reports().get(date)                                        │
//! │       ▼                                                                 │
//! │  DailyReportRepository                                                 │
//! │  ├── get(&self, date)                                                  │
//! │  ├── latest(&self)                                                     │
//! │  └── list(&self, limit)                                                │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Reads take the pool. Sale and visit inserts take a                    │
//! │  `&mut SqliteConnection` so they run inside the caller's transaction.  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`SaleEventRepository`] - Append-only sale events
//! - [`VisitRepository`] - Customer visits, one per sale
//! - [`DailyReportRepository`] - End-of-day snapshots

pub mod daily_report;
pub mod sale_event;
pub mod visit;

pub use daily_report::DailyReportRepository;
pub use sale_event::{SaleEventRepository, SaleFilter};
pub use visit::VisitRepository;
