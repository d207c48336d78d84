//! # Store Contracts
//!
//! The data-access interface the settlement engine is written against.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         PosStore                                        │
//! │                                                                         │
//! │   TransactionStore                      SettlementLedger                │
//! │   ├── list_completed_transactions       ├── get_last_settlement         │
//! │   ├── list_completed_between            ├── append_settlement (atomic)  │
//! │   ├── insert_transaction                └── list_settlements            │
//! │   ├── get_transaction                                                   │
//! │   └── update_payment_status                                             │
//! │                                                                         │
//! │   Implementations:                                                      │
//! │   Database (SQLite) │ RedisStore │ LocalStore │ NotConfiguredStore      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every method is scoped to one store id. Implementations never return
//! another store's rows.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use kasir_core::{NewSettlement, PaymentStatus, SettlementRecord, Transaction};

use crate::error::DbResult;

// =============================================================================
// Backend Kind
// =============================================================================

/// Which backend a store talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Sqlite,
    Redis,
    Local,
    NotConfigured,
}

impl BackendKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Sqlite => "sqlite",
            BackendKind::Redis => "redis",
            BackendKind::Local => "local",
            BackendKind::NotConfigured => "not_configured",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Contracts
// =============================================================================

/// Completed sales captured at checkout.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// All transactions for `store_id` with `payment_status == completed`.
    async fn list_completed_transactions(&self, store_id: &str) -> DbResult<Vec<Transaction>>;

    /// Completed transactions with `start <= counted_at <= end`.
    ///
    /// `counted_at` is the completion instant (`Transaction::counted_at`).
    /// Backends that can index by time should override this.
    async fn list_completed_between(
        &self,
        store_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DbResult<Vec<Transaction>> {
        let all = self.list_completed_transactions(store_id).await?;
        Ok(all
            .into_iter()
            .filter(|tx| {
                let counted_at = tx.counted_at();
                counted_at >= start && counted_at <= end
            })
            .collect())
    }

    /// Appends a new transaction. Fails with `UniqueViolation` on a reused id.
    async fn insert_transaction(&self, tx: &Transaction) -> DbResult<()>;

    async fn get_transaction(&self, store_id: &str, id: &str) -> DbResult<Option<Transaction>>;

    /// Moves `id` from `from` to `to` and returns the updated transaction.
    ///
    /// Compare-and-set: fails with `NotFound` when the transaction does not
    /// exist and `Conflict` when its status is no longer `from`. A move to
    /// `completed` stamps `completed_at = at`.
    async fn update_payment_status(
        &self,
        store_id: &str,
        id: &str,
        from: PaymentStatus,
        to: PaymentStatus,
        at: DateTime<Utc>,
    ) -> DbResult<Transaction>;
}

/// The append-only settlement ledger.
#[async_trait]
pub trait SettlementLedger: Send + Sync {
    /// Most recent record by `settled_at` (ties: latest `recorded_at`).
    async fn get_last_settlement(&self, store_id: &str) -> DbResult<Option<SettlementRecord>>;

    /// Atomically persists `settlement`, assigning `id` and `recorded_at`.
    ///
    /// Either the full record is written or nothing is.
    async fn append_settlement(
        &self,
        store_id: &str,
        settlement: NewSettlement,
    ) -> DbResult<SettlementRecord>;

    /// Up to `limit` records, newest first.
    async fn list_settlements(&self, store_id: &str, limit: u32)
        -> DbResult<Vec<SettlementRecord>>;
}

/// A full backend: transactions plus ledger.
#[async_trait]
pub trait PosStore: TransactionStore + SettlementLedger {
    fn backend(&self) -> BackendKind;

    /// Whether the backend is reachable.
    async fn health_check(&self) -> bool;
}

// =============================================================================
// Helpers shared by backends
// =============================================================================

/// Mints a ledger id.
pub(crate) fn new_record_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Sorts newest first: `settled_at` desc, then `recorded_at` desc.
pub(crate) fn sort_newest_first(records: &mut [SettlementRecord]) {
    records.sort_by(|a, b| {
        b.settled_at
            .cmp(&a.settled_at)
            .then_with(|| b.recorded_at.cmp(&a.recorded_at))
    });
}

/// Encodes a timestamp as unix microseconds.
#[inline]
pub(crate) fn to_micros(at: DateTime<Utc>) -> i64 {
    at.timestamp_micros()
}

/// Decodes unix microseconds.
pub(crate) fn from_micros(field: &str, micros: i64) -> DbResult<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_micros(micros).ok_or_else(|| {
        crate::error::DbError::Corrupt(format!("{} out of range: {}", field, micros))
    })
}
