//! # kasir-core: Pure Settlement Logic for Kasir POS
//!
//! This crate holds the settlement and reporting rules as pure functions
//! with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Kasir POS Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Web UI (browser)                             │   │
//! │  │    Checkout ──► Settlement screen ──► Dashboard                │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ HTTP/JSON                              │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    kasir-api (axum)                             │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    kasir-engine                                 │   │
//! │  │    SettlementEngine, ReportingAggregator                       │   │
//! │  └──────────────┬──────────────────────────────┬───────────────────┘   │
//! │                 │                              │                        │
//! │  ┌──────────────▼──────────────┐  ┌────────────▼────────────────────┐  │
//! │  │  ★ kasir-core (THIS CRATE) ★│  │  kasir-db                       │  │
//! │  │  money, types, calendar,    │  │  SQLite / Redis / Local stores  │  │
//! │  │  tally, settlement, report  │  │                                 │  │
//! │  │  NO I/O • PURE FUNCTIONS    │  │                                 │  │
//! │  └─────────────────────────────┘  └─────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Transaction, SettlementRecord, Operator, ...)
//! - [`money`] - Money type with integer arithmetic
//! - [`calendar`] - Business-local day boundaries
//! - [`tally`] - Completed-sales sums by payment method
//! - [`settlement`] - Cutoff resolution, window summing, variance
//! - [`report`] - Dashboard rollups over date ranges
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use kasir_core::calendar::BusinessCalendar;
//! use kasir_core::settlement::{resolve_cutoff, summarize_window, CutoffPolicy};
//!
//! let cal = BusinessCalendar::utc();
//! let now = Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap();
//! let cutoff = resolve_cutoff(CutoffPolicy::StartOfDay, &cal, None, now);
//!
//! let window = summarize_window(&[], cutoff, now, None).unwrap();
//! assert_eq!(window.transaction_count, 0);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod calendar;
pub mod error;
pub mod money;
pub mod report;
pub mod settlement;
pub mod tally;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use calendar::BusinessCalendar;
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use report::{DateRange, ReportPeriod, SalesBucket, SalesReport};
pub use settlement::{CutoffPolicy, UnsettledWindow, Variance};
pub use tally::SalesTally;
pub use types::*;
