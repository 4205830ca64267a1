//! # tally-db: Database Layer for the Tally Ledger
//!
//! SQLite storage for sale events, customer visits and daily reports,
//! plus the aggregation queries the dashboard and scheduler run.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally Ledger Data Flow                           │
//! │                                                                         │
//! │  POST /api/sales            scheduler (23:00)       GET /api/dashboard  │
//! │       │                          │                        │             │
//! │       ▼                          ▼                        ▼             │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     tally-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐  ┌────────────────┐  ┌──────────────────┐  │   │
//! │  │   │   Database    │  │  Repositories  │  │   Aggregation    │  │   │
//! │  │   │   (pool.rs)   │  │                │  │     Engine       │  │   │
//! │  │   │               │  │ SaleEventRepo  │  │                  │  │   │
//! │  │   │ ingest_sale   │──│ VisitRepo      │◄─│ today()          │  │   │
//! │  │   │ close_bus...  │  │ DailyReportRepo│  │ peak_hours()     │  │   │
//! │  │   │ write gate    │  │                │  │ weekday_dist...  │  │   │
//! │  │   └───────────────┘  └────────────────┘  └──────────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  │      sale_events · customer_visits · daily_reports              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool, configuration, write gate
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Sale event, visit and report repositories
//! - [`aggregation`] - Dashboard aggregation engine
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tally_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("tally.db")).await?;
//! let event = db.ingest_sale(new_sale).await?;
//! let summary = db.aggregation(clock).today().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod aggregation;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use aggregation::AggregationEngine;
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::daily_report::DailyReportRepository;
pub use repository::sale_event::{SaleEventRepository, SaleFilter};
pub use repository::visit::VisitRepository;
