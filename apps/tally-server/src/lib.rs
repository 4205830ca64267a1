//! # tally-server
//!
//! HTTP API and daily close-out for the Tally ledger.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Tally Server                                   │
//! │                                                                         │
//! │  POS / bridge / dashboard                                              │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  axum Router (routes/) ──► AppState ──► tally-db ──► SQLite (WAL)      │
//! │        │                      │                                         │
//! │        │                      └── broadcast ──► /ws/sales               │
//! │        │                                                                │
//! │  BackgroundTasks (tasks.rs)                                            │
//! │        └── DailyReportScheduler (scheduler.rs) ── 23:00 ──► archive    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod routes;
pub mod scheduler;
pub mod state;
pub mod tasks;

pub use config::{ConfigError, TallyConfig};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use routes::router;
pub use scheduler::{DailyReportScheduler, FireOutcome, ReportRunner, RunnerState};
pub use state::AppState;
pub use tasks::BackgroundTasks;
