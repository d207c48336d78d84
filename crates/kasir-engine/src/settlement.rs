//! # Settlement Engine
//!
//! Computes the unsettled window for a store and commits settlements to
//! the append-only ledger.
//!
//! ## Commit Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  commit_settlement(store_id, request)                                   │
//! │                                                                         │
//! │  1. validate storeId, actualCash, operator, notes   ── nothing read yet │
//! │  2. get_last_settlement ──► resolve_cutoff(policy, calendar, now)       │
//! │  3. list_completed_between(cutoff, now) ──► summarize (cutoff, now]     │
//! │     by completion instant; an overflowing sum is an error            │
//! │  4. draft: difference = actualCash - cashSales, settledAt = now         │
//! │  5. append_settlement (atomic)                                          │
//! │                                                                         │
//! │  The window is always recomputed here, never taken from the caller.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Concurrency
//! There is no cross-request lock. Two commits for the same store whose
//! reads both happen before either append will count the same
//! transactions twice. Stores are operated by one cashier at a time; the
//! race is accepted and not masked.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use kasir_core::settlement::{draft_settlement, resolve_cutoff, summarize_window};
use kasir_core::validation::{
    validate_actual_cash, validate_history_limit, validate_notes, validate_operator,
    validate_store_id,
};
use kasir_core::{
    normalize_timestamp, BusinessCalendar, CutoffPolicy, Operator, SettlementRecord,
    UnsettledWindow, ValidationError, Variance,
};
use kasir_db::PosStore;

use crate::error::{EngineError, EngineResult};

// =============================================================================
// Request
// =============================================================================

/// What the operator submits to close a window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementRequest {
    #[serde(default)]
    pub operator: Option<Operator>,

    /// Cash counted in the drawer, minor units.
    #[serde(default)]
    pub actual_cash: Option<i64>,

    #[serde(default)]
    pub notes: Option<String>,
}

impl SettlementRequest {
    pub fn new(operator: Operator, actual_cash: i64) -> Self {
        SettlementRequest {
            operator: Some(operator),
            actual_cash: Some(actual_cash),
            notes: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

// =============================================================================
// Engine
// =============================================================================

/// Settlement engine bound to one store backend.
///
/// Holds no per-store state. Every call re-reads the ledger.
#[derive(Clone)]
pub struct SettlementEngine {
    store: Arc<dyn PosStore>,
    calendar: BusinessCalendar,
    policy: CutoffPolicy,
}

impl SettlementEngine {
    pub fn new(store: Arc<dyn PosStore>) -> Self {
        SettlementEngine {
            store,
            calendar: BusinessCalendar::default(),
            policy: CutoffPolicy::default(),
        }
    }

    pub fn with_calendar(mut self, calendar: BusinessCalendar) -> Self {
        self.calendar = calendar;
        self
    }

    pub fn with_policy(mut self, policy: CutoffPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn store(&self) -> &Arc<dyn PosStore> {
        &self.store
    }

    pub fn calendar(&self) -> &BusinessCalendar {
        &self.calendar
    }

    pub fn policy(&self) -> CutoffPolicy {
        self.policy
    }

    // =========================================================================
    // Pending Window
    // =========================================================================

    /// Aggregates of completed sales since the current cutoff.
    pub async fn compute_unsettled_window(&self, store_id: &str) -> EngineResult<UnsettledWindow> {
        self.compute_unsettled_window_at(store_id, Utc::now()).await
    }

    /// [`compute_unsettled_window`](Self::compute_unsettled_window) evaluated at `now`.
    pub async fn compute_unsettled_window_at(
        &self,
        store_id: &str,
        now: DateTime<Utc>,
    ) -> EngineResult<UnsettledWindow> {
        validate_store_id(store_id).map_err(|e| rejected(store_id, e))?;
        self.window_at(store_id, normalize_timestamp(now)).await
    }

    async fn window_at(&self, store_id: &str, now: DateTime<Utc>) -> EngineResult<UnsettledWindow> {
        let last = self.store.get_last_settlement(store_id).await.map_err(|e| {
            warn!(store_id = %store_id, error = %e, "Failed to read last settlement");
            EngineError::from(e)
        })?;

        let cutoff = resolve_cutoff(self.policy, &self.calendar, last.as_ref(), now);

        let transactions = self
            .store
            .list_completed_between(store_id, cutoff, now)
            .await
            .map_err(|e| {
                warn!(store_id = %store_id, error = %e, "Failed to read transactions");
                EngineError::from(e)
            })?;

        let window = summarize_window(&transactions, cutoff, now, last).map_err(|e| {
            error!(store_id = %store_id, error = %e, "Failed to sum unsettled window");
            EngineError::from(e)
        })?;

        debug!(
            store_id = %store_id,
            policy = %self.policy,
            cutoff = %window.cutoff,
            window_end = %window.window_end,
            transactions = window.transaction_count,
            "Computed unsettled window"
        );

        Ok(window)
    }

    // =========================================================================
    // Commit
    // =========================================================================

    /// Closes the current window with the operator's drawer count.
    pub async fn commit_settlement(
        &self,
        store_id: &str,
        request: SettlementRequest,
    ) -> EngineResult<SettlementRecord> {
        self.commit_settlement_at(store_id, request, Utc::now()).await
    }

    /// [`commit_settlement`](Self::commit_settlement) evaluated at `now`.
    pub async fn commit_settlement_at(
        &self,
        store_id: &str,
        request: SettlementRequest,
        now: DateTime<Utc>,
    ) -> EngineResult<SettlementRecord> {
        let (actual_cash, operator, notes) =
            validate_request(store_id, request).map_err(|e| rejected(store_id, e))?;

        let window = self.window_at(store_id, normalize_timestamp(now)).await?;
        let draft = draft_settlement(store_id, &window, actual_cash, &operator, notes);
        let variance = Variance::from_difference(draft.difference);

        match self.store.append_settlement(store_id, draft).await {
            Ok(record) => {
                info!(
                    store_id = %store_id,
                    settlement_id = %record.id,
                    operator_id = %record.operator_id,
                    cutoff = %window.cutoff,
                    settled_at = %record.settled_at,
                    cash_sales = record.cash_sales.minor(),
                    total_sales = record.total_sales.minor(),
                    transactions = record.transaction_count,
                    difference = record.difference.minor(),
                    variance = %variance,
                    "Settlement committed"
                );
                Ok(record)
            }
            Err(e) => {
                error!(
                    store_id = %store_id,
                    backend = %self.store.backend(),
                    error = %e,
                    "Failed to save settlement"
                );
                Err(e.into())
            }
        }
    }

    // =========================================================================
    // History
    // =========================================================================

    /// Ledger records, newest first.
    pub async fn settlement_history(
        &self,
        store_id: &str,
        limit: Option<u32>,
    ) -> EngineResult<Vec<SettlementRecord>> {
        validate_store_id(store_id).map_err(|e| rejected(store_id, e))?;
        let limit = validate_history_limit(limit).map_err(|e| rejected(store_id, e))?;

        Ok(self.store.list_settlements(store_id, limit).await?)
    }
}

/// Checks every input before anything is read.
fn validate_request(
    store_id: &str,
    request: SettlementRequest,
) -> Result<(kasir_core::Money, Operator, Option<String>), ValidationError> {
    validate_store_id(store_id)?;
    let actual_cash = validate_actual_cash(request.actual_cash)?;
    let operator = request
        .operator
        .ok_or_else(|| ValidationError::required("operator"))?;
    validate_operator(&operator)?;
    let notes = validate_notes(request.notes.as_deref())?;

    Ok((actual_cash, operator, notes))
}

fn rejected(store_id: &str, err: ValidationError) -> EngineError {
    warn!(store_id = %store_id, error = %err, "Rejected settlement input");
    EngineError::Validation(err)
}

// =============================================================================
// Unit Tests
// =============================================================================
