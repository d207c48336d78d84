//! # Transaction Repository
//!
//! SQLite operations for checkout transactions.
//!
//! ## Transaction Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Transaction Lifecycle                                │
//! │                                                                         │
//! │  1. CAPTURE                                                            │
//! │     └── insert() → row with payment_status pending | completed         │
//! │                                                                         │
//! │  2. CONFIRM (manual transfer / QRIS check)                             │
//! │     └── update_status(pending → completed | failed)                    │
//! │                                                                         │
//! │  3. (OPTIONAL) REFUND                                                  │
//! │     └── update_status(completed → refunded)                            │
//! │                                                                         │
//! │  Every other column is frozen by the transactions_immutable_fields     │
//! │  trigger.                                                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use kasir_core::{Money, PaymentMethod, PaymentStatus, Transaction};

use crate::error::{DbError, DbResult};
use crate::pool::Database;
use crate::store::{from_micros, to_micros, TransactionStore};

const SELECT_COLUMNS: &str = r#"
    SELECT id, store_id, total, cost_total, payment_method, payment_status,
           cashier_id, created_at, completed_at
    FROM transactions
"#;

/// Row shape of the `transactions` table.
#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    id: String,
    store_id: String,
    total: i64,
    cost_total: i64,
    payment_method: PaymentMethod,
    payment_status: PaymentStatus,
    cashier_id: Option<String>,
    created_at: i64,
    completed_at: Option<i64>,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = DbError;

    fn try_from(row: TransactionRow) -> DbResult<Self> {
        Ok(Transaction {
            id: row.id,
            store_id: row.store_id,
            total: Money::from_minor(row.total),
            cost_total: Money::from_minor(row.cost_total),
            payment_method: row.payment_method,
            payment_status: row.payment_status,
            cashier_id: row.cashier_id,
            created_at: from_micros("created_at", row.created_at)?,
            completed_at: row
                .completed_at
                .map(|micros| from_micros("completed_at", micros))
                .transpose()?,
        })
    }
}

fn rows_to_transactions(rows: Vec<TransactionRow>) -> DbResult<Vec<Transaction>> {
    rows.into_iter().map(Transaction::try_from).collect()
}

/// Repository for transaction database operations.
#[derive(Debug, Clone)]
pub struct TransactionRepository {
    pool: SqlitePool,
}

impl TransactionRepository {
    /// Creates a new TransactionRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TransactionRepository { pool }
    }

    /// Gets a transaction by ID, scoped to a store.
    pub async fn get_by_id(&self, store_id: &str, id: &str) -> DbResult<Option<Transaction>> {
        let sql = format!("{} WHERE store_id = ?1 AND id = ?2", SELECT_COLUMNS);

        let row: Option<TransactionRow> = sqlx::query_as(&sql)
            .bind(store_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Transaction::try_from).transpose()
    }

    /// Inserts a transaction.
    ///
    /// A row inserted as completed gets `completed_at` even when the caller
    /// left it unset, so every completed row is indexed by completion time.
    pub async fn insert(&self, tx: &Transaction) -> DbResult<()> {
        debug!(id = %tx.id, store_id = %tx.store_id, total = %tx.total, "Inserting transaction");

        let created_at = to_micros(tx.created_at);
        let completed_at = match (tx.completed_at, tx.is_completed()) {
            (Some(at), _) => Some(to_micros(at)),
            (None, true) => Some(created_at),
            (None, false) => None,
        };

        let result = sqlx::query(
            r#"
            INSERT INTO transactions (
                id, store_id, total, cost_total,
                payment_method, payment_status, cashier_id,
                created_at, completed_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4,
                ?5, ?6, ?7,
                ?8, ?9, ?8
            )
            "#,
        )
        .bind(&tx.id)
        .bind(&tx.store_id)
        .bind(tx.total.minor())
        .bind(tx.cost_total.minor())
        .bind(tx.payment_method)
        .bind(tx.payment_status)
        .bind(&tx.cashier_id)
        .bind(created_at)
        .bind(completed_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) => match DbError::from(e) {
                DbError::UniqueViolation { field, .. } => Err(DbError::duplicate(field, &tx.id)),
                other => Err(other),
            },
        }
    }

    /// All completed transactions for a store, oldest first.
    pub async fn list_completed(&self, store_id: &str) -> DbResult<Vec<Transaction>> {
        let sql = format!(
            "{} WHERE store_id = ?1 AND payment_status = 'completed' ORDER BY completed_at, id",
            SELECT_COLUMNS
        );

        let rows: Vec<TransactionRow> = sqlx::query_as(&sql)
            .bind(store_id)
            .fetch_all(&self.pool)
            .await?;

        rows_to_transactions(rows)
    }

    /// Completed transactions with `start <= completed_at <= end`, oldest first.
    pub async fn list_completed_between(
        &self,
        store_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DbResult<Vec<Transaction>> {
        let sql = format!(
            "{} WHERE store_id = ?1 AND payment_status = 'completed' \
             AND completed_at >= ?2 AND completed_at <= ?3 ORDER BY completed_at, id",
            SELECT_COLUMNS
        );

        let rows: Vec<TransactionRow> = sqlx::query_as(&sql)
            .bind(store_id)
            .bind(to_micros(start))
            .bind(to_micros(end))
            .fetch_all(&self.pool)
            .await?;

        rows_to_transactions(rows)
    }

    /// Compare-and-set status update. Moving to `completed` stamps
    /// `completed_at = at`.
    ///
    /// ## Returns
    /// * `Ok(tx)` - updated transaction
    /// * `Err(NotFound)` - no such transaction in this store
    /// * `Err(Conflict)` - status was no longer `from`
    pub async fn update_status(
        &self,
        store_id: &str,
        id: &str,
        from: PaymentStatus,
        to: PaymentStatus,
        at: DateTime<Utc>,
    ) -> DbResult<Transaction> {
        let at = to_micros(at);

        let result = sqlx::query(
            r#"
            UPDATE transactions SET
                payment_status = ?4,
                completed_at = CASE WHEN ?4 = 'completed' THEN ?5 ELSE completed_at END,
                updated_at = ?5
            WHERE store_id = ?1 AND id = ?2 AND payment_status = ?3
            "#,
        )
        .bind(store_id)
        .bind(id)
        .bind(from)
        .bind(to)
        .bind(at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return match self.get_by_id(store_id, id).await? {
                None => Err(DbError::not_found("Transaction", id)),
                Some(current) => Err(DbError::Conflict(format!(
                    "transaction {} is {}, expected {}",
                    id, current.payment_status, from
                ))),
            };
        }

        debug!(id = %id, from = %from, to = %to, "Transaction status updated");

        self.get_by_id(store_id, id)
            .await?
            .ok_or_else(|| DbError::not_found("Transaction", id))
    }
}

// =============================================================================
// Store contract
// =============================================================================

#[async_trait]
impl TransactionStore for Database {
    async fn list_completed_transactions(&self, store_id: &str) -> DbResult<Vec<Transaction>> {
        self.transactions().list_completed(store_id).await
    }

    async fn list_completed_between(
        &self,
        store_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DbResult<Vec<Transaction>> {
        self.transactions()
            .list_completed_between(store_id, start, end)
            .await
    }

    async fn insert_transaction(&self, tx: &Transaction) -> DbResult<()> {
        self.transactions().insert(tx).await
    }

    async fn get_transaction(&self, store_id: &str, id: &str) -> DbResult<Option<Transaction>> {
        self.transactions().get_by_id(store_id, id).await
    }

    async fn update_payment_status(
        &self,
        store_id: &str,
        id: &str,
        from: PaymentStatus,
        to: PaymentStatus,
        at: DateTime<Utc>,
    ) -> DbResult<Transaction> {
        self.transactions()
            .update_status(store_id, id, from, to, at)
            .await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
