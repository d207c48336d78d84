//! # kasir-engine: Settlement Engine for Kasir POS
//!
//! Cash reconciliation, sales reporting and transaction capture, written
//! once against `Arc<dyn PosStore>` so any backend from kasir-db plugs in.
//!
//! ## Settlement Windows
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  One business day                                                       │
//! │                                                                         │
//! │  00:00          10:00                 15:00                 now         │
//! │    │  window 1    │      window 2       │     pending         │         │
//! │    ├──────────────┼─────────────────────┼─────────────────────┤         │
//! │    │ (start, S1]  │      (S1, S2]       │     (S2, now]       │         │
//! │                   ▲                     ▲                               │
//! │             settlement S1         settlement S2                         │
//! │                                                                         │
//! │  Every completed sale lands in exactly one window.                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`settlement`] - [`SettlementEngine`]: pending window, commit, history
//! - [`report`] - [`ReportingAggregator`]: today / 7d / 30d / custom rollups
//! - [`capture`] - [`TransactionRecorder`]: checkout capture and status changes
//! - [`error`] - [`EngineError`]
//!
//! ## Usage
//!
//! ```rust,ignore
//! use kasir_engine::{SettlementEngine, SettlementRequest};
//! use kasir_core::Operator;
//!
//! let engine = SettlementEngine::new(store);
//! let pending = engine.compute_unsettled_window("store-1").await?;
//! let record = engine
//!     .commit_settlement("store-1", SettlementRequest::new(Operator::new("u1", "Alice"), 14_500))
//!     .await?;
//! ```

pub mod capture;
pub mod error;
pub mod report;
pub mod settlement;

#[cfg(test)]
mod test_support;

pub use capture::{TransactionDraft, TransactionRecorder};
pub use error::{EngineError, EngineResult};
pub use report::ReportingAggregator;
pub use settlement::{SettlementEngine, SettlementRequest};
