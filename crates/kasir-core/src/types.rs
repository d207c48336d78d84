//! # Domain Types
//!
//! Core domain types used throughout Kasir POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐          ┌──────────────────────┐                  │
//! │  │  Transaction    │          │  SettlementRecord    │                  │
//! │  │  ─────────────  │  owns    │  ──────────────────  │                  │
//! │  │  id (UUID)      │◄─ ─ ─ ─ ─│  id (UUID)           │                  │
//! │  │  store_id       │ (derived │  store_id            │                  │
//! │  │  total          │  by time)│  settled_at (cutoff) │                  │
//! │  │  payment_method │          │  cash/transfer/qris  │                  │
//! │  │  payment_status │          │  actual_cash         │                  │
//! │  │  created_at     │          │  difference          │                  │
//! │  └─────────────────┘          │  operator_id/name    │                  │
//! │                               └──────────────────────┘                  │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │ PaymentMethod   │   │ PaymentStatus   │   │    Operator     │       │
//! │  │  Cash           │   │  Pending        │   │  id             │       │
//! │  │  Transfer       │   │  Completed      │   │  name           │       │
//! │  │  Qris           │   │  Failed         │   └─────────────────┘       │
//! │  └─────────────────┘   │  Refunded       │                              │
//! │                        └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A settlement record owns the completed transactions whose
//! [`Transaction::counted_at`] falls in `(previous settled_at, settled_at]`.
//! There is no foreign key; membership is recomputed from timestamps.
//!
//! `counted_at` is the completion instant. A sale rung up as completed is
//! counted from its `created_at`; a pending sale confirmed later is counted
//! from its confirmation, so a confirmation after a settlement lands in the
//! next window instead of behind the cutoff.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;

/// Truncates a timestamp to microsecond precision.
///
/// Every backend stores microseconds, so transactions and cutoffs are
/// normalized before they are compared or persisted.
#[inline]
pub fn normalize_timestamp(at: DateTime<Utc>) -> DateTime<Utc> {
    at.trunc_subsecs(6)
}

// =============================================================================
// Payment Method
// =============================================================================

/// How the customer paid.
///
/// QRIS and bank transfer are recorded manually; there is no gateway.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Physical cash into the drawer.
    Cash,
    /// Bank transfer.
    Transfer,
    /// QRIS scan.
    Qris,
}

impl PaymentMethod {
    /// Every method, in display order.
    pub const ALL: [PaymentMethod; 3] = [
        PaymentMethod::Cash,
        PaymentMethod::Transfer,
        PaymentMethod::Qris,
    ];

    /// Lowercase wire name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Transfer => "transfer",
            PaymentMethod::Qris => "qris",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cash" | "tunai" => Ok(PaymentMethod::Cash),
            "transfer" | "bank_transfer" => Ok(PaymentMethod::Transfer),
            "qris" => Ok(PaymentMethod::Qris),
            _ => Err(ValidationError::NotAllowed {
                field: "paymentMethod".to_string(),
                allowed: PaymentMethod::ALL
                    .iter()
                    .map(|m| m.as_str().to_string())
                    .collect(),
            }),
        }
    }
}

// =============================================================================
// Payment Status
// =============================================================================

/// Lifecycle state of a transaction's payment.
///
/// ## Allowed Transitions
/// ```text
///   Pending ──► Completed ──► Refunded
///      │
///      └──────► Failed
/// ```
/// Only `Completed` counts toward settlement and reports.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Awaiting manual confirmation (e.g. transfer not yet seen).
    #[default]
    Pending,
    /// Paid.
    Completed,
    /// Payment did not go through.
    Failed,
    /// Money returned to the customer after completion.
    Refunded,
}

impl PaymentStatus {
    /// Lowercase wire name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }

    /// Whether a transaction in this state is counted as a sale.
    #[inline]
    pub const fn counts_as_sale(&self) -> bool {
        matches!(self, PaymentStatus::Completed)
    }

    /// Whether moving from `self` to `next` is a legal status transition.
    pub const fn can_transition_to(&self, next: PaymentStatus) -> bool {
        matches!(
            (self, next),
            (PaymentStatus::Pending, PaymentStatus::Completed)
                | (PaymentStatus::Pending, PaymentStatus::Failed)
                | (PaymentStatus::Completed, PaymentStatus::Refunded)
        )
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(PaymentStatus::Pending),
            "completed" => Ok(PaymentStatus::Completed),
            "failed" => Ok(PaymentStatus::Failed),
            "refunded" => Ok(PaymentStatus::Refunded),
            _ => Err(ValidationError::NotAllowed {
                field: "paymentStatus".to_string(),
                allowed: ["pending", "completed", "failed", "refunded"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            }),
        }
    }
}

// =============================================================================
// Transaction
// =============================================================================

/// A completed (or pending) sale captured at checkout.
///
/// Immutable once created except for `payment_status` transitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Store (tenant) that owns the sale.
    pub store_id: String,

    /// Amount charged, in minor units. Never negative.
    pub total: Money,

    /// Cost of goods sold for the sale, used only for profit rollups.
    #[serde(default)]
    pub cost_total: Money,

    pub payment_method: PaymentMethod,

    pub payment_status: PaymentStatus,

    /// Cashier who rang up the sale.
    #[serde(default)]
    pub cashier_id: Option<String>,

    /// Creation instant, microsecond precision.
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    /// When the payment reached `completed`. Stamped by the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(as = "Option<String>")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Transaction {
    /// Whether this transaction counts toward sales totals.
    #[inline]
    pub fn is_completed(&self) -> bool {
        self.payment_status.counts_as_sale()
    }

    /// Instant the sale is counted at: completion, else creation.
    #[inline]
    pub fn counted_at(&self) -> DateTime<Utc> {
        self.completed_at.unwrap_or(self.created_at)
    }
}

// =============================================================================
// Operator
// =============================================================================

/// The person performing a settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Operator {
    pub id: String,
    pub name: String,
}

impl Operator {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Operator {
            id: id.into(),
            name: name.into(),
        }
    }
}

// =============================================================================
// Settlement Record
// =============================================================================

/// One reconciliation event in the append-only settlement ledger.
///
/// `settled_at` closes the reconciled window and is the cutoff for the
/// store's next window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SettlementRecord {
    /// Store-assigned identifier.
    pub id: String,

    pub store_id: String,

    /// End of the reconciled window.
    #[ts(as = "String")]
    pub settled_at: DateTime<Utc>,

    pub cash_sales: Money,
    pub transfer_sales: Money,
    pub qris_sales: Money,
    pub total_sales: Money,
    pub transaction_count: u64,

    /// Cash counted in the drawer by the operator.
    pub actual_cash: Money,

    /// `actual_cash - cash_sales`. Positive = overage, negative = shortage.
    pub difference: Money,

    pub operator_id: String,
    pub operator_name: String,

    #[serde(default)]
    pub notes: Option<String>,

    /// When the store persisted the record.
    #[ts(as = "String")]
    pub recorded_at: DateTime<Utc>,
}

impl SettlementRecord {
    /// Identity of the operator who settled.
    pub fn operator(&self) -> Operator {
        Operator::new(self.operator_id.clone(), self.operator_name.clone())
    }
}

/// A settlement that has been computed and validated but not yet appended.
///
/// The ledger assigns `id` and `recorded_at` when it persists the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSettlement {
    pub store_id: String,
    pub settled_at: DateTime<Utc>,
    pub cash_sales: Money,
    pub transfer_sales: Money,
    pub qris_sales: Money,
    pub total_sales: Money,
    pub transaction_count: u64,
    pub actual_cash: Money,
    pub difference: Money,
    pub operator_id: String,
    pub operator_name: String,
    pub notes: Option<String>,
}

impl NewSettlement {
    /// Materializes the ledger record with the store-assigned fields.
    pub fn into_record(self, id: String, recorded_at: DateTime<Utc>) -> SettlementRecord {
        SettlementRecord {
            id,
            store_id: self.store_id,
            settled_at: self.settled_at,
            cash_sales: self.cash_sales,
            transfer_sales: self.transfer_sales,
            qris_sales: self.qris_sales,
            total_sales: self.total_sales,
            transaction_count: self.transaction_count,
            actual_cash: self.actual_cash,
            difference: self.difference,
            operator_id: self.operator_id,
            operator_name: self.operator_name,
            notes: self.notes,
            recorded_at,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_payment_method_parsing() {
        assert_eq!("cash".parse::<PaymentMethod>().unwrap(), PaymentMethod::Cash);
        assert_eq!("QRIS".parse::<PaymentMethod>().unwrap(), PaymentMethod::Qris);
        assert_eq!(
            " transfer ".parse::<PaymentMethod>().unwrap(),
            PaymentMethod::Transfer
        );
        assert!("card".parse::<PaymentMethod>().is_err());
    }

    #[test]
    fn test_only_completed_counts() {
        assert!(PaymentStatus::Completed.counts_as_sale());
        assert!(!PaymentStatus::Pending.counts_as_sale());
        assert!(!PaymentStatus::Failed.counts_as_sale());
        assert!(!PaymentStatus::Refunded.counts_as_sale());
    }

    #[test]
    fn test_status_transitions() {
        use PaymentStatus::*;

        assert!(Pending.can_transition_to(Completed));
        assert!(Pending.can_transition_to(Failed));
        assert!(Completed.can_transition_to(Refunded));

        assert!(!Completed.can_transition_to(Pending));
        assert!(!Refunded.can_transition_to(Completed));
        assert!(!Failed.can_transition_to(Completed));
        assert!(!Pending.can_transition_to(Refunded));
        assert!(!Completed.can_transition_to(Completed));
    }

    #[test]
    fn test_wire_format_is_camel_case() {
        let tx = Transaction {
            id: "t1".into(),
            store_id: "s1".into(),
            total: Money::from_minor(15_000),
            cost_total: Money::zero(),
            payment_method: PaymentMethod::Qris,
            payment_status: PaymentStatus::Completed,
            cashier_id: None,
            created_at: Utc.with_ymd_and_hms(2026, 10, 18, 3, 0, 0).unwrap(),
            completed_at: None,
        };

        let json = serde_json::to_value(&tx).unwrap();
        assert_eq!(json["storeId"], "s1");
        assert_eq!(json["total"], 15_000);
        assert_eq!(json["paymentMethod"], "qris");
        assert_eq!(json["paymentStatus"], "completed");
        assert!(json.get("completedAt").is_none());
    }

    #[test]
    fn test_counted_at_prefers_completion() {
        let created_at = Utc.with_ymd_and_hms(2026, 10, 18, 3, 0, 0).unwrap();
        let mut tx = Transaction {
            id: "t1".into(),
            store_id: "s1".into(),
            total: Money::from_minor(50_000),
            cost_total: Money::zero(),
            payment_method: PaymentMethod::Transfer,
            payment_status: PaymentStatus::Completed,
            cashier_id: None,
            created_at,
            completed_at: None,
        };
        assert_eq!(tx.counted_at(), created_at);

        let confirmed = created_at + chrono::Duration::hours(2);
        tx.completed_at = Some(confirmed);
        assert_eq!(tx.counted_at(), confirmed);
    }

    #[test]
    fn test_normalize_timestamp_drops_nanoseconds() {
        let at = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();
        let normalized = normalize_timestamp(at);
        assert_eq!(normalized.timestamp_subsec_nanos(), 123_456_000);
    }
}
