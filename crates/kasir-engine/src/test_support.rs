//! Fixtures shared by the engine's unit tests.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

use kasir_core::{
    BusinessCalendar, Money, NewSettlement, PaymentMethod, PaymentStatus, SettlementRecord,
    Transaction,
};
use kasir_db::{BackendKind, DbError, DbResult, PosStore, SettlementLedger, TransactionStore};

use crate::settlement::SettlementEngine;

/// 2026-10-18 at `h:m:s` UTC.
pub fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 18, h, m, s)
        .single()
        .unwrap_or_else(|| panic!("invalid test time {}:{}:{}", h, m, s))
}

pub fn completed(store_id: &str, total: i64, method: PaymentMethod, created_at: DateTime<Utc>) -> Transaction {
    Transaction {
        id: Uuid::new_v4().to_string(),
        store_id: store_id.to_string(),
        total: Money::from_minor(total),
        cost_total: Money::zero(),
        payment_method: method,
        payment_status: PaymentStatus::Completed,
        cashier_id: None,
        created_at,
        completed_at: Some(created_at),
    }
}

pub fn pending(store_id: &str, total: i64, method: PaymentMethod, created_at: DateTime<Utc>) -> Transaction {
    Transaction {
        payment_status: PaymentStatus::Pending,
        completed_at: None,
        ..completed(store_id, total, method, created_at)
    }
}

/// Engine on the UTC calendar so test instants read as local time.
pub fn engine_with(store: Arc<dyn PosStore>) -> SettlementEngine {
    SettlementEngine::new(store).with_calendar(BusinessCalendar::utc())
}

/// A backend whose every call fails as if the server were down.
pub struct FailingStore;

fn down() -> DbError {
    DbError::ConnectionFailed("connection refused".to_string())
}

#[async_trait]
impl TransactionStore for FailingStore {
    async fn list_completed_transactions(&self, _store_id: &str) -> DbResult<Vec<Transaction>> {
        Err(down())
    }

    async fn insert_transaction(&self, _tx: &Transaction) -> DbResult<()> {
        Err(down())
    }

    async fn get_transaction(&self, _store_id: &str, _id: &str) -> DbResult<Option<Transaction>> {
        Err(down())
    }

    async fn update_payment_status(
        &self,
        _store_id: &str,
        _id: &str,
        _from: PaymentStatus,
        _to: PaymentStatus,
        _at: DateTime<Utc>,
    ) -> DbResult<Transaction> {
        Err(down())
    }
}

#[async_trait]
impl SettlementLedger for FailingStore {
    async fn get_last_settlement(&self, _store_id: &str) -> DbResult<Option<SettlementRecord>> {
        Err(down())
    }

    async fn append_settlement(
        &self,
        _store_id: &str,
        _settlement: NewSettlement,
    ) -> DbResult<SettlementRecord> {
        Err(down())
    }

    async fn list_settlements(&self, _store_id: &str, _limit: u32) -> DbResult<Vec<SettlementRecord>> {
        Err(down())
    }
}

#[async_trait]
impl PosStore for FailingStore {
    fn backend(&self) -> BackendKind {
        BackendKind::Redis
    }

    async fn health_check(&self) -> bool {
        false
    }
}
