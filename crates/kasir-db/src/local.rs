//! # Local Store
//!
//! In-process backend with optional JSON-file persistence. This is the
//! fallback when no server-side database is configured, and the fake used
//! by engine and HTTP tests.
//!
//! ```text
//!   write ──► RwLock<Snapshot> (mutate copy) ──► persist(tmp) ──► rename ──► swap in
//!                                                    │
//!                                                    └── failure: in-memory state untouched
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use kasir_core::{normalize_timestamp, NewSettlement, PaymentStatus, SettlementRecord, Transaction};

use crate::error::{DbError, DbResult};
use crate::store::{
    new_record_id, sort_newest_first, BackendKind, PosStore, SettlementLedger, TransactionStore,
};

/// Everything the local store holds. Serialized as-is to the snapshot file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snapshot {
    #[serde(default)]
    transactions: Vec<Transaction>,
    #[serde(default)]
    settlements: Vec<SettlementRecord>,
}

/// In-process [`PosStore`].
#[derive(Debug, Default)]
pub struct LocalStore {
    state: RwLock<Snapshot>,
    path: Option<PathBuf>,
}

impl LocalStore {
    /// Volatile store. Nothing survives the process.
    pub fn in_memory() -> Self {
        LocalStore::default()
    }

    /// Store backed by a JSON file. Loads the file if it exists.
    pub async fn open(path: impl Into<PathBuf>) -> DbResult<Self> {
        let path = path.into();

        let snapshot = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice::<Snapshot>(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Snapshot::default(),
            Err(e) => return Err(e.into()),
        };

        info!(
            path = %path.display(),
            transactions = snapshot.transactions.len(),
            settlements = snapshot.settlements.len(),
            "Local store opened"
        );

        Ok(LocalStore {
            state: RwLock::new(snapshot),
            path: Some(path),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Writes `snapshot` to disk atomically (temp file + rename).
    async fn persist(&self, snapshot: &Snapshot) -> DbResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let bytes = serde_json::to_vec_pretty(snapshot)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, path).await?;

        debug!(path = %path.display(), "Local store persisted");
        Ok(())
    }

    /// Applies `change` to a copy, persists it, then swaps it in.
    async fn commit<T>(&self, change: impl FnOnce(&mut Snapshot) -> DbResult<T>) -> DbResult<T> {
        let mut guard = self.state.write().await;
        let mut next = guard.clone();
        let out = change(&mut next)?;
        self.persist(&next).await?;
        *guard = next;
        Ok(out)
    }
}

#[async_trait]
impl TransactionStore for LocalStore {
    async fn list_completed_transactions(&self, store_id: &str) -> DbResult<Vec<Transaction>> {
        let state = self.state.read().await;
        Ok(state
            .transactions
            .iter()
            .filter(|tx| tx.store_id == store_id && tx.is_completed())
            .cloned()
            .collect())
    }

    async fn list_completed_between(
        &self,
        store_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DbResult<Vec<Transaction>> {
        let state = self.state.read().await;
        Ok(state
            .transactions
            .iter()
            .filter(|tx| tx.store_id == store_id && tx.is_completed())
            .filter(|tx| {
                let counted_at = tx.counted_at();
                counted_at >= start && counted_at <= end
            })
            .cloned()
            .collect())
    }

    async fn insert_transaction(&self, tx: &Transaction) -> DbResult<()> {
        self.commit(|snapshot| {
            if snapshot.transactions.iter().any(|t| t.id == tx.id) {
                return Err(DbError::duplicate("transaction.id", &tx.id));
            }
            snapshot.transactions.push(tx.clone());
            Ok(())
        })
        .await
    }

    async fn get_transaction(&self, store_id: &str, id: &str) -> DbResult<Option<Transaction>> {
        let state = self.state.read().await;
        Ok(state
            .transactions
            .iter()
            .find(|tx| tx.store_id == store_id && tx.id == id)
            .cloned())
    }

    async fn update_payment_status(
        &self,
        store_id: &str,
        id: &str,
        from: PaymentStatus,
        to: PaymentStatus,
        at: DateTime<Utc>,
    ) -> DbResult<Transaction> {
        self.commit(|snapshot| {
            let tx = snapshot
                .transactions
                .iter_mut()
                .find(|tx| tx.store_id == store_id && tx.id == id)
                .ok_or_else(|| DbError::not_found("Transaction", id))?;

            if tx.payment_status != from {
                return Err(DbError::Conflict(format!(
                    "transaction {} is {}, expected {}",
                    id, tx.payment_status, from
                )));
            }

            tx.payment_status = to;
            if to == PaymentStatus::Completed {
                tx.completed_at = Some(normalize_timestamp(at));
            }
            Ok(tx.clone())
        })
        .await
    }
}

#[async_trait]
impl SettlementLedger for LocalStore {
    async fn get_last_settlement(&self, store_id: &str) -> DbResult<Option<SettlementRecord>> {
        let state = self.state.read().await;
        Ok(state
            .settlements
            .iter()
            .filter(|s| s.store_id == store_id)
            .max_by(|a, b| {
                a.settled_at
                    .cmp(&b.settled_at)
                    .then_with(|| a.recorded_at.cmp(&b.recorded_at))
            })
            .cloned())
    }

    async fn append_settlement(
        &self,
        store_id: &str,
        settlement: NewSettlement,
    ) -> DbResult<SettlementRecord> {
        if settlement.store_id != store_id {
            return Err(DbError::Internal(format!(
                "settlement for {} appended to {}",
                settlement.store_id, store_id
            )));
        }

        let record = settlement.into_record(new_record_id(), normalize_timestamp(Utc::now()));

        self.commit(|snapshot| {
            snapshot.settlements.push(record.clone());
            Ok(record)
        })
        .await
    }

    async fn list_settlements(
        &self,
        store_id: &str,
        limit: u32,
    ) -> DbResult<Vec<SettlementRecord>> {
        let state = self.state.read().await;
        let mut records: Vec<SettlementRecord> = state
            .settlements
            .iter()
            .filter(|s| s.store_id == store_id)
            .cloned()
            .collect();

        sort_newest_first(&mut records);
        records.truncate(limit as usize);
        Ok(records)
    }
}

#[async_trait]
impl PosStore for LocalStore {
    fn backend(&self) -> BackendKind {
        BackendKind::Local
    }

    async fn health_check(&self) -> bool {
        true
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
