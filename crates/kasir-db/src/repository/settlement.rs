//! # Settlement Repository
//!
//! SQLite operations for the append-only settlement ledger.
//!
//! Rows are only ever inserted. The `settlements_no_update` and
//! `settlements_no_delete` triggers reject everything else.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use kasir_core::{normalize_timestamp, Money, NewSettlement, SettlementRecord};

use crate::error::{DbError, DbResult};
use crate::pool::Database;
use crate::store::{from_micros, new_record_id, to_micros, BackendKind, PosStore, SettlementLedger};

const SELECT_COLUMNS: &str = r#"
    SELECT id, store_id, settled_at,
           cash_sales, transfer_sales, qris_sales, total_sales, transaction_count,
           actual_cash, difference, operator_id, operator_name, notes, recorded_at
    FROM settlements
"#;

/// Row shape of the `settlements` table.
#[derive(Debug, sqlx::FromRow)]
struct SettlementRow {
    id: String,
    store_id: String,
    settled_at: i64,
    cash_sales: i64,
    transfer_sales: i64,
    qris_sales: i64,
    total_sales: i64,
    transaction_count: i64,
    actual_cash: i64,
    difference: i64,
    operator_id: String,
    operator_name: String,
    notes: Option<String>,
    recorded_at: i64,
}

impl TryFrom<SettlementRow> for SettlementRecord {
    type Error = DbError;

    fn try_from(row: SettlementRow) -> DbResult<Self> {
        let transaction_count = u64::try_from(row.transaction_count).map_err(|_| {
            DbError::Corrupt(format!("negative transaction_count on settlement {}", row.id))
        })?;

        Ok(SettlementRecord {
            settled_at: from_micros("settled_at", row.settled_at)?,
            recorded_at: from_micros("recorded_at", row.recorded_at)?,
            id: row.id,
            store_id: row.store_id,
            cash_sales: Money::from_minor(row.cash_sales),
            transfer_sales: Money::from_minor(row.transfer_sales),
            qris_sales: Money::from_minor(row.qris_sales),
            total_sales: Money::from_minor(row.total_sales),
            transaction_count,
            actual_cash: Money::from_minor(row.actual_cash),
            difference: Money::from_minor(row.difference),
            operator_id: row.operator_id,
            operator_name: row.operator_name,
            notes: row.notes,
        })
    }
}

/// Repository for the settlement ledger.
#[derive(Debug, Clone)]
pub struct SettlementRepository {
    pool: SqlitePool,
}

impl SettlementRepository {
    /// Creates a new SettlementRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SettlementRepository { pool }
    }

    /// Latest record for a store.
    pub async fn last_for_store(&self, store_id: &str) -> DbResult<Option<SettlementRecord>> {
        let sql = format!(
            "{} WHERE store_id = ?1 ORDER BY settled_at DESC, recorded_at DESC LIMIT 1",
            SELECT_COLUMNS
        );

        let row: Option<SettlementRow> = sqlx::query_as(&sql)
            .bind(store_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(SettlementRecord::try_from).transpose()
    }

    /// Up to `limit` records, newest first.
    pub async fn list_for_store(&self, store_id: &str, limit: u32) -> DbResult<Vec<SettlementRecord>> {
        let sql = format!(
            "{} WHERE store_id = ?1 ORDER BY settled_at DESC, recorded_at DESC LIMIT ?2",
            SELECT_COLUMNS
        );

        let rows: Vec<SettlementRow> = sqlx::query_as(&sql)
            .bind(store_id)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(SettlementRecord::try_from).collect()
    }

    /// Appends a record. A single INSERT, so it is all-or-nothing.
    pub async fn append(&self, settlement: NewSettlement) -> DbResult<SettlementRecord> {
        let transaction_count = i64::try_from(settlement.transaction_count)
            .map_err(|_| DbError::Internal("transaction_count overflows i64".to_string()))?;

        let record = settlement.into_record(new_record_id(), normalize_timestamp(Utc::now()));

        debug!(
            id = %record.id,
            store_id = %record.store_id,
            settled_at = %record.settled_at,
            "Appending settlement"
        );

        sqlx::query(
            r#"
            INSERT INTO settlements (
                id, store_id, settled_at,
                cash_sales, transfer_sales, qris_sales, total_sales, transaction_count,
                actual_cash, difference, operator_id, operator_name, notes,
                recorded_at
            ) VALUES (
                ?1, ?2, ?3,
                ?4, ?5, ?6, ?7, ?8,
                ?9, ?10, ?11, ?12, ?13,
                ?14
            )
            "#,
        )
        .bind(&record.id)
        .bind(&record.store_id)
        .bind(to_micros(record.settled_at))
        .bind(record.cash_sales.minor())
        .bind(record.transfer_sales.minor())
        .bind(record.qris_sales.minor())
        .bind(record.total_sales.minor())
        .bind(transaction_count)
        .bind(record.actual_cash.minor())
        .bind(record.difference.minor())
        .bind(&record.operator_id)
        .bind(&record.operator_name)
        .bind(&record.notes)
        .bind(to_micros(record.recorded_at))
        .execute(&self.pool)
        .await?;

        Ok(record)
    }
}

// =============================================================================
// Store contract
// =============================================================================

#[async_trait]
impl SettlementLedger for Database {
    async fn get_last_settlement(&self, store_id: &str) -> DbResult<Option<SettlementRecord>> {
        self.settlements().last_for_store(store_id).await
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
        self.settlements().append(settlement).await
    }

    async fn list_settlements(
        &self,
        store_id: &str,
        limit: u32,
    ) -> DbResult<Vec<SettlementRecord>> {
        self.settlements().list_for_store(store_id, limit).await
    }
}

#[async_trait]
impl PosStore for Database {
    fn backend(&self) -> BackendKind {
        BackendKind::Sqlite
    }

    async fn health_check(&self) -> bool {
        Database::health_check(self).await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::DbConfig;
    use chrono::{DateTime, Duration, TimeZone};

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn draft(store_id: &str, settled_at: DateTime<Utc>, cash: i64, actual: i64) -> NewSettlement {
        NewSettlement {
            store_id: store_id.to_string(),
            settled_at,
            cash_sales: Money::from_minor(cash),
            transfer_sales: Money::zero(),
            qris_sales: Money::from_minor(20_000),
            total_sales: Money::from_minor(cash + 20_000),
            transaction_count: 2,
            actual_cash: Money::from_minor(actual),
            difference: Money::from_minor(actual - cash),
            operator_id: "u1".to_string(),
            operator_name: "Alice".to_string(),
            notes: Some("shift 1".to_string()),
        }
    }

    #[tokio::test]
    async fn test_append_assigns_id_and_recorded_at() {
        let db = test_db().await;
        let settled_at = Utc.with_ymd_and_hms(2026, 10, 18, 10, 0, 0).unwrap();

        let record = db
            .append_settlement("store-1", draft("store-1", settled_at, 15_000, 14_500))
            .await
            .unwrap();

        assert!(!record.id.is_empty());
        assert_eq!(record.settled_at, settled_at);
        assert_eq!(record.difference.minor(), -500);

        let last = db.get_last_settlement("store-1").await.unwrap();
        assert_eq!(last, Some(record));
    }

    #[tokio::test]
    async fn test_last_is_by_settled_at() {
        let db = test_db().await;
        let early = Utc.with_ymd_and_hms(2026, 10, 18, 10, 0, 0).unwrap();
        let late = early + Duration::hours(2);

        db.append_settlement("store-1", draft("store-1", late, 1, 1)).await.unwrap();
        db.append_settlement("store-1", draft("store-1", early, 2, 2)).await.unwrap();
        db.append_settlement("store-2", draft("store-2", late + Duration::hours(1), 3, 3))
            .await
            .unwrap();

        let last = db.get_last_settlement("store-1").await.unwrap().unwrap();
        assert_eq!(last.settled_at, late);

        let history = db.list_settlements("store-1", 10).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].settled_at, late);
        assert_eq!(history[1].settled_at, early);

        assert_eq!(db.list_settlements("store-1", 1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_ledger() {
        let db = test_db().await;
        assert!(db.get_last_settlement("store-1").await.unwrap().is_none());
        assert!(db.list_settlements("store-1", 50).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ledger_is_append_only() {
        let db = test_db().await;
        let record = db
            .append_settlement("store-1", draft("store-1", Utc::now(), 1, 1))
            .await
            .unwrap();

        let update = sqlx::query("UPDATE settlements SET actual_cash = 0 WHERE id = ?1")
            .bind(&record.id)
            .execute(db.pool())
            .await;
        assert!(update.is_err());

        let delete = sqlx::query("DELETE FROM settlements WHERE id = ?1")
            .bind(&record.id)
            .execute(db.pool())
            .await;
        assert!(delete.is_err());
    }

    #[tokio::test]
    async fn test_store_mismatch_is_rejected() {
        let db = test_db().await;
        let err = db
            .append_settlement("store-2", draft("store-1", Utc::now(), 1, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Internal(_)));
        assert!(db.get_last_settlement("store-2").await.unwrap().is_none());
    }
}
