//! # Not-Configured Store
//!
//! Stand-in used when no backend is configured or reachable.
//!
//! Reads return empty results so the settlement screen and dashboard show
//! "no data". Writes fail with [`DbError::NotConfigured`] because dropping
//! a transaction or a settlement silently would corrupt the audit trail.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::warn;

use kasir_core::{NewSettlement, PaymentStatus, SettlementRecord, Transaction};

use crate::error::{DbError, DbResult};
use crate::store::{BackendKind, PosStore, SettlementLedger, TransactionStore};

/// A [`PosStore`] with nothing behind it.
#[derive(Debug, Clone, Default)]
pub struct NotConfiguredStore {
    reason: String,
}

impl NotConfiguredStore {
    pub fn new(reason: impl Into<String>) -> Self {
        NotConfiguredStore {
            reason: reason.into(),
        }
    }

    /// Why the store is unconfigured, for health output.
    pub fn reason(&self) -> &str {
        &self.reason
    }

    fn reject_write(&self, what: &str, store_id: &str) -> DbError {
        warn!(store_id = %store_id, reason = %self.reason, "Rejected {} on unconfigured store", what);
        DbError::NotConfigured
    }
}

#[async_trait]
impl TransactionStore for NotConfiguredStore {
    async fn list_completed_transactions(&self, _store_id: &str) -> DbResult<Vec<Transaction>> {
        Ok(Vec::new())
    }

    async fn insert_transaction(&self, tx: &Transaction) -> DbResult<()> {
        Err(self.reject_write("transaction insert", &tx.store_id))
    }

    async fn get_transaction(&self, _store_id: &str, _id: &str) -> DbResult<Option<Transaction>> {
        Ok(None)
    }

    async fn update_payment_status(
        &self,
        store_id: &str,
        _id: &str,
        _from: PaymentStatus,
        _to: PaymentStatus,
        _at: DateTime<Utc>,
    ) -> DbResult<Transaction> {
        Err(self.reject_write("status update", store_id))
    }
}

#[async_trait]
impl SettlementLedger for NotConfiguredStore {
    async fn get_last_settlement(&self, _store_id: &str) -> DbResult<Option<SettlementRecord>> {
        Ok(None)
    }

    async fn append_settlement(
        &self,
        store_id: &str,
        _settlement: NewSettlement,
    ) -> DbResult<SettlementRecord> {
        Err(self.reject_write("settlement append", store_id))
    }

    async fn list_settlements(
        &self,
        _store_id: &str,
        _limit: u32,
    ) -> DbResult<Vec<SettlementRecord>> {
        Ok(Vec::new())
    }
}

#[async_trait]
impl PosStore for NotConfiguredStore {
    fn backend(&self) -> BackendKind {
        BackendKind::NotConfigured
    }

    async fn health_check(&self) -> bool {
        false
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
