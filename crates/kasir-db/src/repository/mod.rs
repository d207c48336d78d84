//! # Repository Module
//!
//! SQLite repository implementations for Kasir POS.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  SettlementEngine                                                      │
//! │       │                                                                 │
//! │       │  store.get_last_settlement("store-1")   (dyn PosStore)         │
//! │       ▼                                                                 │
//! │  Database ── impl PosStore ──► db.settlements().last_for_store(..)     │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`TransactionRepository`](transaction::TransactionRepository) - capture and status changes
//! - [`SettlementRepository`](settlement::SettlementRepository) - append-only ledger

pub mod settlement;
pub mod transaction;
