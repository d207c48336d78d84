//! # Transaction Capture
//!
//! Records sales rung up at checkout and applies payment status changes.
//!
//! ```text
//!   checkout ──► record_transaction ──► insert (immutable from here on)
//!
//!   confirm transfer / refund ──► set_payment_status
//!        │
//!        ├── unknown id          ──► NotFound
//!        ├── illegal transition  ──► InvalidTransition
//!        ├── at/before settledAt ──► Validation (completions only)
//!        └── compare-and-set     ──► Conflict if someone else moved it first
//! ```
//!
//! The server stamps `createdAt` and `completedAt`; a client clock never
//! places a sale. A sale is counted at its completion instant, and that
//! instant must fall after the store's last `settledAt`. Anything earlier
//! would land in a window that is already closed and never be counted.
//!
//! A refund never edits the settlement ledger. A refund of a transaction
//! that was already settled shows up as a lower total in reports only.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use kasir_core::validation::{
    validate_amount, validate_store_id, validate_uuid, MAX_OPERATOR_FIELD_LEN,
};
use kasir_core::{
    normalize_timestamp, CoreError, Money, PaymentMethod, PaymentStatus, Transaction,
    ValidationError,
};
use kasir_db::PosStore;

use crate::error::{EngineError, EngineResult};

/// A sale as submitted by the checkout screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDraft {
    /// Client-minted UUID. Generated when absent.
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub total: Option<i64>,

    #[serde(default)]
    pub cost_total: Option<i64>,

    pub payment_method: PaymentMethod,

    /// Defaults to `completed`.
    #[serde(default)]
    pub payment_status: Option<PaymentStatus>,

    #[serde(default)]
    pub cashier_id: Option<String>,
}

impl TransactionDraft {
    pub fn new(total: i64, payment_method: PaymentMethod) -> Self {
        TransactionDraft {
            id: None,
            total: Some(total),
            cost_total: None,
            payment_method,
            payment_status: None,
            cashier_id: None,
        }
    }
}

/// Writes transactions through a store backend.
#[derive(Clone)]
pub struct TransactionRecorder {
    store: Arc<dyn PosStore>,
}

impl TransactionRecorder {
    pub fn new(store: Arc<dyn PosStore>) -> Self {
        TransactionRecorder { store }
    }

    pub async fn record_transaction(
        &self,
        store_id: &str,
        draft: TransactionDraft,
    ) -> EngineResult<Transaction> {
        self.record_transaction_at(store_id, draft, Utc::now()).await
    }

    /// Validates and appends a transaction stamped at `now`.
    pub async fn record_transaction_at(
        &self,
        store_id: &str,
        draft: TransactionDraft,
        now: DateTime<Utc>,
    ) -> EngineResult<Transaction> {
        let tx = build_transaction(store_id, draft, now).map_err(|e| {
            warn!(store_id = %store_id, error = %e, "Rejected transaction");
            EngineError::Validation(e)
        })?;

        if tx.payment_status == PaymentStatus::Completed {
            self.ensure_after_last_settlement(store_id, "createdAt", tx.counted_at())
                .await?;
        }

        self.store.insert_transaction(&tx).await?;

        debug!(
            store_id = %store_id,
            transaction_id = %tx.id,
            total = tx.total.minor(),
            method = %tx.payment_method,
            status = %tx.payment_status,
            "Transaction recorded"
        );

        Ok(tx)
    }

    /// Moves a transaction to `to` if the lifecycle allows it.
    pub async fn set_payment_status(
        &self,
        store_id: &str,
        transaction_id: &str,
        to: PaymentStatus,
    ) -> EngineResult<Transaction> {
        self.set_payment_status_at(store_id, transaction_id, to, Utc::now())
            .await
    }

    /// Same as [`set_payment_status`](Self::set_payment_status); a move to
    /// `completed` is stamped at `now`.
    pub async fn set_payment_status_at(
        &self,
        store_id: &str,
        transaction_id: &str,
        to: PaymentStatus,
        now: DateTime<Utc>,
    ) -> EngineResult<Transaction> {
        validate_store_id(store_id)?;
        let now = normalize_timestamp(now);
        if transaction_id.trim().is_empty() {
            return Err(ValidationError::required("transactionId").into());
        }

        let current = self
            .store
            .get_transaction(store_id, transaction_id)
            .await?
            .ok_or_else(|| EngineError::NotFound {
                entity: "Transaction".to_string(),
                id: transaction_id.to_string(),
            })?;

        let from = current.payment_status;
        if !from.can_transition_to(to) {
            return Err(CoreError::InvalidStatusTransition {
                transaction_id: transaction_id.to_string(),
                from,
                to,
            }
            .into());
        }

        if to == PaymentStatus::Completed {
            self.ensure_after_last_settlement(store_id, "completedAt", now)
                .await?;
        }

        let updated = self
            .store
            .update_payment_status(store_id, transaction_id, from, to, now)
            .await?;

        if to == PaymentStatus::Refunded {
            self.note_settled_refund(store_id, &updated).await;
        }

        info!(
            store_id = %store_id,
            transaction_id = %transaction_id,
            from = %from,
            to = %to,
            "Payment status changed"
        );

        Ok(updated)
    }

    /// Rejects a completion instant that an existing settlement already covers.
    async fn ensure_after_last_settlement(
        &self,
        store_id: &str,
        field: &str,
        counted_at: DateTime<Utc>,
    ) -> EngineResult<()> {
        let Some(last) = self.store.get_last_settlement(store_id).await? else {
            return Ok(());
        };
        if counted_at > last.settled_at {
            return Ok(());
        }

        warn!(
            store_id = %store_id,
            settlement_id = %last.id,
            counted_at = %counted_at,
            settled_at = %last.settled_at,
            "Completion falls inside a settled window"
        );
        Err(ValidationError::NotAfterLastSettlement {
            field: field.to_string(),
            settled_at: last.settled_at.to_rfc3339(),
        }
        .into())
    }

    async fn note_settled_refund(&self, store_id: &str, tx: &Transaction) {
        match self.store.get_last_settlement(store_id).await {
            Ok(Some(last)) if tx.counted_at() <= last.settled_at => {
                warn!(
                    store_id = %store_id,
                    transaction_id = %tx.id,
                    settlement_id = %last.id,
                    amount = tx.total.minor(),
                    "Refunded transaction was already settled; ledger is not adjusted"
                );
            }
            Ok(_) => {}
            Err(e) => debug!(store_id = %store_id, error = %e, "Could not check ledger for refund"),
        }
    }
}

fn build_transaction(
    store_id: &str,
    draft: TransactionDraft,
    now: DateTime<Utc>,
) -> Result<Transaction, ValidationError> {
    validate_store_id(store_id)?;

    let total = draft
        .total
        .ok_or_else(|| ValidationError::required("total"))
        .and_then(|t| validate_amount("total", t))?;
    let cost_total = match draft.cost_total {
        Some(cost) => validate_amount("costTotal", cost)?,
        None => Money::zero(),
    };

    let id = match draft.id.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(id) => {
            validate_uuid("id", id)?;
            id.to_string()
        }
        None => Uuid::new_v4().to_string(),
    };

    let payment_status = draft.payment_status.unwrap_or(PaymentStatus::Completed);
    if payment_status == PaymentStatus::Refunded {
        return Err(ValidationError::NotAllowed {
            field: "paymentStatus".to_string(),
            allowed: ["pending", "completed", "failed"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        });
    }

    let cashier_id = draft
        .cashier_id
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());
    if cashier_id
        .as_deref()
        .is_some_and(|c| c.chars().count() > MAX_OPERATOR_FIELD_LEN)
    {
        return Err(ValidationError::TooLong {
            field: "cashierId".to_string(),
            max: MAX_OPERATOR_FIELD_LEN,
        });
    }

    let created_at = normalize_timestamp(now);
    Ok(Transaction {
        id,
        store_id: store_id.to_string(),
        total,
        cost_total,
        payment_method: draft.payment_method,
        payment_status,
        cashier_id,
        created_at,
        completed_at: (payment_status == PaymentStatus::Completed).then_some(created_at),
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::at;
    use kasir_core::NewSettlement;
    use kasir_db::{LocalStore, NotConfiguredStore, SettlementLedger, TransactionStore};

    const STORE: &str = "store-1";

    fn recorder() -> (Arc<LocalStore>, TransactionRecorder) {
        let store = Arc::new(LocalStore::in_memory());
        (store.clone(), TransactionRecorder::new(store))
    }

    #[tokio::test]
    async fn test_record_defaults() {
        let (store, recorder) = recorder();
        let tx = recorder
            .record_transaction_at(STORE, TransactionDraft::new(12_000, PaymentMethod::Qris), at(3, 0, 0))
            .await
            .unwrap();

        assert_eq!(tx.payment_status, PaymentStatus::Completed);
        assert_eq!(tx.created_at, at(3, 0, 0));
        assert_eq!(tx.completed_at, Some(at(3, 0, 0)));
        assert_eq!(tx.cost_total, Money::zero());
        assert!(Uuid::parse_str(&tx.id).is_ok());
        assert_eq!(store.get_transaction(STORE, &tx.id).await.unwrap(), Some(tx));
    }

    #[tokio::test]
    async fn test_record_rejects_bad_input() {
        let (_, recorder) = recorder();

        let mut negative = TransactionDraft::new(-5, PaymentMethod::Cash);
        let err = recorder.record_transaction(STORE, negative.clone()).await.unwrap_err();
        assert!(matches!(err, EngineError::Validation(ValidationError::MustNotBeNegative { .. })));

        negative.total = None;
        let err = recorder.record_transaction(STORE, negative).await.unwrap_err();
        assert!(matches!(err, EngineError::Validation(ValidationError::Required { .. })));

        let mut refunded = TransactionDraft::new(100, PaymentMethod::Cash);
        refunded.payment_status = Some(PaymentStatus::Refunded);
        let err = recorder.record_transaction(STORE, refunded).await.unwrap_err();
        assert!(matches!(err, EngineError::Validation(ValidationError::NotAllowed { .. })));

        let mut bad_id = TransactionDraft::new(100, PaymentMethod::Cash);
        bad_id.id = Some("not-a-uuid".to_string());
        let err = recorder.record_transaction(STORE, bad_id).await.unwrap_err();
        assert!(matches!(err, EngineError::Validation(ValidationError::InvalidFormat { .. })));

        let huge = TransactionDraft::new(i64::MAX, PaymentMethod::Cash);
        let err = recorder.record_transaction(STORE, huge).await.unwrap_err();
        assert!(matches!(err, EngineError::Validation(ValidationError::OutOfRange { .. })));
    }

    fn settled_at(store_id: &str, when: DateTime<Utc>) -> NewSettlement {
        NewSettlement {
            store_id: store_id.to_string(),
            settled_at: when,
            cash_sales: Money::zero(),
            transfer_sales: Money::zero(),
            qris_sales: Money::zero(),
            total_sales: Money::zero(),
            transaction_count: 0,
            actual_cash: Money::zero(),
            difference: Money::zero(),
            operator_id: "u1".to_string(),
            operator_name: "Alice".to_string(),
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_client_created_at_is_ignored() {
        let (_, recorder) = recorder();
        let draft: TransactionDraft = serde_json::from_str(
            r#"{"total": 5000, "paymentMethod": "cash", "createdAt": "2020-01-01T00:00:00Z"}"#,
        )
        .unwrap();

        let tx = recorder
            .record_transaction_at(STORE, draft, at(11, 0, 0))
            .await
            .unwrap();
        assert_eq!(tx.created_at, at(11, 0, 0));
    }

    #[tokio::test]
    async fn test_sale_at_or_before_last_settlement_is_rejected() {
        let (store, recorder) = recorder();
        store
            .append_settlement(STORE, settled_at(STORE, at(10, 0, 0)))
            .await
            .unwrap();

        for when in [at(9, 0, 0), at(10, 0, 0)] {
            let err = recorder
                .record_transaction_at(STORE, TransactionDraft::new(100, PaymentMethod::Cash), when)
                .await
                .unwrap_err();
            assert!(matches!(
                err,
                EngineError::Validation(ValidationError::NotAfterLastSettlement { .. })
            ));
        }
        assert!(store.list_completed_transactions(STORE).await.unwrap().is_empty());

        // Other stores have their own ledger.
        recorder
            .record_transaction_at("store-2", TransactionDraft::new(100, PaymentMethod::Cash), at(9, 0, 0))
            .await
            .unwrap();

        recorder
            .record_transaction_at(STORE, TransactionDraft::new(100, PaymentMethod::Cash), at(10, 0, 1))
            .await
            .unwrap();
        assert_eq!(store.list_completed_transactions(STORE).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_confirmation_is_stamped_after_last_settlement() {
        let (store, recorder) = recorder();
        let mut draft = TransactionDraft::new(40_000, PaymentMethod::Transfer);
        draft.payment_status = Some(PaymentStatus::Pending);
        let tx = recorder
            .record_transaction_at(STORE, draft, at(9, 0, 0))
            .await
            .unwrap();
        assert_eq!(tx.completed_at, None);

        store
            .append_settlement(STORE, settled_at(STORE, at(10, 0, 0)))
            .await
            .unwrap();

        let err = recorder
            .set_payment_status_at(STORE, &tx.id, PaymentStatus::Completed, at(9, 30, 0))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Validation(ValidationError::NotAfterLastSettlement { .. })
        ));

        let confirmed = recorder
            .set_payment_status_at(STORE, &tx.id, PaymentStatus::Completed, at(10, 5, 0))
            .await
            .unwrap();
        assert_eq!(confirmed.created_at, at(9, 0, 0));
        assert_eq!(confirmed.completed_at, Some(at(10, 5, 0)));
        assert_eq!(confirmed.counted_at(), at(10, 5, 0));

        // Pending sales and failures are not counted, so the guard leaves them alone.
        let mut late_pending = TransactionDraft::new(100, PaymentMethod::Qris);
        late_pending.payment_status = Some(PaymentStatus::Pending);
        let pending = recorder
            .record_transaction_at(STORE, late_pending, at(9, 0, 0))
            .await
            .unwrap();
        recorder
            .set_payment_status_at(STORE, &pending.id, PaymentStatus::Failed, at(9, 30, 0))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_duplicate_id_conflicts() {
        let (_, recorder) = recorder();
        let mut draft = TransactionDraft::new(100, PaymentMethod::Cash);
        draft.id = Some(Uuid::new_v4().to_string());

        recorder.record_transaction(STORE, draft.clone()).await.unwrap();
        let err = recorder.record_transaction(STORE, draft).await.unwrap_err();
        assert!(matches!(err, EngineError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_status_lifecycle() {
        let (_, recorder) = recorder();
        let mut draft = TransactionDraft::new(50_000, PaymentMethod::Transfer);
        draft.payment_status = Some(PaymentStatus::Pending);
        let tx = recorder.record_transaction(STORE, draft).await.unwrap();

        let confirmed = recorder
            .set_payment_status(STORE, &tx.id, PaymentStatus::Completed)
            .await
            .unwrap();
        assert_eq!(confirmed.payment_status, PaymentStatus::Completed);

        let err = recorder
            .set_payment_status(STORE, &tx.id, PaymentStatus::Failed)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidTransition { .. }));

        let refunded = recorder
            .set_payment_status(STORE, &tx.id, PaymentStatus::Refunded)
            .await
            .unwrap();
        assert_eq!(refunded.payment_status, PaymentStatus::Refunded);
    }

    #[tokio::test]
    async fn test_unknown_transaction() {
        let (_, recorder) = recorder();
        let err = recorder
            .set_payment_status(STORE, "missing", PaymentStatus::Completed)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_not_configured_write_fails() {
        let recorder = TransactionRecorder::new(Arc::new(NotConfiguredStore::new("none")));
        let err = recorder
            .record_transaction(STORE, TransactionDraft::new(100, PaymentMethod::Cash))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotConfigured));
    }
}
