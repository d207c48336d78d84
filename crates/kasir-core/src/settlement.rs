//! # Settlement Rules
//!
//! Pure settlement math: cutoff resolution, window summing, variance.
//!
//! ## Window Timeline
//! ```text
//!   start of day      last settled_at                      now
//!        │                  │                               │
//!  ──────┼──────────────────┼───────────────────────────────┼──────►
//!        │   settled        │( unsettled window             ]
//!        │                  │  counted_at >  cutoff         │
//!        │                  │  counted_at <= now            │
//!
//!   A transaction counted exactly at the cutoff was closed by the
//!   previous settlement; committing at `now` makes `now` the next cutoff.
//!   `counted_at` is the completion instant (see `Transaction::counted_at`).
//! ```
//!
//! No I/O happens here. `kasir-engine` fetches the inputs and persists the
//! [`NewSettlement`] produced by [`draft_settlement`].

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::calendar::BusinessCalendar;
use crate::error::{CoreResult, ValidationError};
use crate::money::Money;
use crate::tally::SalesTally;
use crate::types::{NewSettlement, Operator, SettlementRecord, Transaction};

// =============================================================================
// Cutoff Policy
// =============================================================================

/// How the start of the unsettled window is chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CutoffPolicy {
    /// Last settlement if it happened today, else the start of today.
    ///
    /// Sales left unsettled before midnight do not show up in today's window.
    #[default]
    StartOfDay,

    /// Last settlement whenever one exists, else the start of today.
    ///
    /// Sales left unsettled before midnight roll into today's first settlement.
    CarryForward,
}

impl CutoffPolicy {
    pub const fn as_str(&self) -> &'static str {
        match self {
            CutoffPolicy::StartOfDay => "start_of_day",
            CutoffPolicy::CarryForward => "carry_forward",
        }
    }
}

impl fmt::Display for CutoffPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CutoffPolicy {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "start_of_day" => Ok(CutoffPolicy::StartOfDay),
            "carry_forward" => Ok(CutoffPolicy::CarryForward),
            _ => Err(ValidationError::NotAllowed {
                field: "cutoffPolicy".to_string(),
                allowed: vec!["start_of_day".to_string(), "carry_forward".to_string()],
            }),
        }
    }
}

/// Resolves the exclusive lower bound of the unsettled window.
///
/// ## Example
/// ```rust
/// use chrono::{TimeZone, Utc};
/// use kasir_core::calendar::BusinessCalendar;
/// use kasir_core::settlement::{resolve_cutoff, CutoffPolicy};
///
/// let cal = BusinessCalendar::utc();
/// let now = Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap();
///
/// // No ledger entries: the window starts at midnight
/// let cutoff = resolve_cutoff(CutoffPolicy::StartOfDay, &cal, None, now);
/// assert_eq!(cutoff, Utc.with_ymd_and_hms(2026, 10, 18, 0, 0, 0).unwrap());
/// ```
pub fn resolve_cutoff(
    policy: CutoffPolicy,
    calendar: &BusinessCalendar,
    last: Option<&SettlementRecord>,
    now: DateTime<Utc>,
) -> DateTime<Utc> {
    let day_start = calendar.start_of_day(now);

    match (policy, last) {
        (CutoffPolicy::StartOfDay, Some(record)) if record.settled_at >= day_start => {
            record.settled_at
        }
        (CutoffPolicy::CarryForward, Some(record)) => record.settled_at,
        _ => day_start,
    }
}

/// Whether `counted_at` falls in `(cutoff, end]`.
#[inline]
pub fn in_window(counted_at: DateTime<Utc>, cutoff: DateTime<Utc>, end: DateTime<Utc>) -> bool {
    counted_at > cutoff && counted_at <= end
}

// =============================================================================
// Unsettled Window
// =============================================================================

/// Aggregates of completed sales not yet covered by a settlement.
///
/// ## Wire Shape
/// ```json
/// {
///   "cashSales": 15000, "transferSales": 0, "qrisSales": 20000,
///   "totalSales": 35000, "transactionCount": 2,
///   "cutoff": "2026-10-17T17:00:00Z", "windowEnd": "2026-10-18T05:00:00Z",
///   "lastSettlement": null
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct UnsettledWindow {
    pub cash_sales: Money,
    pub transfer_sales: Money,
    pub qris_sales: Money,
    pub total_sales: Money,
    pub transaction_count: u64,

    /// Exclusive lower bound.
    #[ts(as = "String")]
    pub cutoff: DateTime<Utc>,

    /// Inclusive upper bound; becomes `settled_at` on commit.
    #[ts(as = "String")]
    pub window_end: DateTime<Utc>,

    pub last_settlement: Option<SettlementRecord>,
}

impl UnsettledWindow {
    /// Builds a window from a tally and its bounds.
    pub fn from_tally(
        tally: SalesTally,
        cutoff: DateTime<Utc>,
        window_end: DateTime<Utc>,
        last_settlement: Option<SettlementRecord>,
    ) -> Self {
        UnsettledWindow {
            cash_sales: tally.cash_sales,
            transfer_sales: tally.transfer_sales,
            qris_sales: tally.qris_sales,
            total_sales: tally.total_sales,
            transaction_count: tally.transaction_count,
            cutoff,
            window_end,
            last_settlement,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.transaction_count == 0
    }
}

/// Sums the completed transactions counted in `(cutoff, now]`.
///
/// Non-completed transactions are ignored even if the caller passes them in.
/// Fails only if a sum overflows.
pub fn summarize_window<'a, I>(
    transactions: I,
    cutoff: DateTime<Utc>,
    now: DateTime<Utc>,
    last_settlement: Option<SettlementRecord>,
) -> CoreResult<UnsettledWindow>
where
    I: IntoIterator<Item = &'a Transaction>,
{
    let tally = SalesTally::from_transactions(
        transactions
            .into_iter()
            .filter(|tx| in_window(tx.counted_at(), cutoff, now)),
    )?;

    Ok(UnsettledWindow::from_tally(tally, cutoff, now, last_settlement))
}

// =============================================================================
// Variance
// =============================================================================

/// Classification of `actual_cash - cash_sales`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", content = "amount", rename_all = "lowercase")]
pub enum Variance {
    /// Drawer matches the system.
    Balanced,
    /// More cash than expected.
    Overage(Money),
    /// Less cash than expected. Amount is positive.
    Shortage(Money),
}

impl Variance {
    /// Computes the signed difference and classifies it.
    ///
    /// ```rust
    /// use kasir_core::money::Money;
    /// use kasir_core::settlement::Variance;
    ///
    /// let (diff, v) = Variance::compute(Money::from_minor(14_500), Money::from_minor(15_000));
    /// assert_eq!(diff.minor(), -500);
    /// assert_eq!(v, Variance::Shortage(Money::from_minor(500)));
    /// ```
    pub fn compute(actual_cash: Money, cash_sales: Money) -> (Money, Variance) {
        let difference = actual_cash - cash_sales;
        (difference, Variance::from_difference(difference))
    }

    pub fn from_difference(difference: Money) -> Variance {
        if difference.is_positive() {
            Variance::Overage(difference)
        } else if difference.is_negative() {
            Variance::Shortage(difference.abs())
        } else {
            Variance::Balanced
        }
    }
}

impl fmt::Display for Variance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variance::Balanced => write!(f, "balanced"),
            Variance::Overage(amount) => write!(f, "overage of {}", amount),
            Variance::Shortage(amount) => write!(f, "shortage of {}", amount),
        }
    }
}

// =============================================================================
// Draft
// =============================================================================

/// Turns a freshly computed window into the record to append.
///
/// `settled_at` is the window's upper bound so the stored cutoff is exactly
/// the instant the sums were taken at.
pub fn draft_settlement(
    store_id: &str,
    window: &UnsettledWindow,
    actual_cash: Money,
    operator: &Operator,
    notes: Option<String>,
) -> NewSettlement {
    let (difference, _) = Variance::compute(actual_cash, window.cash_sales);

    NewSettlement {
        store_id: store_id.to_string(),
        settled_at: window.window_end,
        cash_sales: window.cash_sales,
        transfer_sales: window.transfer_sales,
        qris_sales: window.qris_sales,
        total_sales: window.total_sales,
        transaction_count: window.transaction_count,
        actual_cash,
        difference,
        operator_id: operator.id.trim().to_string(),
        operator_name: operator.name.trim().to_string(),
        notes,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
