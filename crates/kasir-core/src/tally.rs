//! # Sales Tally
//!
//! The filter-and-sum step shared by settlement windows and reports.
//!
//! ```text
//! transactions ──► completed only ──► partition by method ──► SalesTally
//!                                      cash / transfer / qris
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{PaymentMethod, Transaction};

/// Sums of completed sales, partitioned by payment method.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SalesTally {
    pub cash_sales: Money,
    pub transfer_sales: Money,
    pub qris_sales: Money,
    pub total_sales: Money,
    pub total_cost: Money,
    pub transaction_count: u64,
}

impl SalesTally {
    /// Empty tally.
    pub fn new() -> Self {
        SalesTally::default()
    }

    /// Tallies every completed transaction in `transactions`.
    pub fn from_transactions<'a, I>(transactions: I) -> CoreResult<Self>
    where
        I: IntoIterator<Item = &'a Transaction>,
    {
        let mut tally = SalesTally::new();
        for tx in transactions {
            tally.record(tx)?;
        }
        Ok(tally)
    }

    /// Adds one transaction. Non-completed transactions are ignored.
    ///
    /// On overflow the tally is left unchanged.
    pub fn record(&mut self, tx: &Transaction) -> CoreResult<()> {
        if !tx.is_completed() {
            return Ok(());
        }

        let mut next = *self;
        let method_sales = match tx.payment_method {
            PaymentMethod::Cash => &mut next.cash_sales,
            PaymentMethod::Transfer => &mut next.transfer_sales,
            PaymentMethod::Qris => &mut next.qris_sales,
        };
        *method_sales = add(*method_sales, tx.total, tx.payment_method.as_str())?;
        next.total_sales = add(next.total_sales, tx.total, "totalSales")?;
        next.total_cost = add(next.total_cost, tx.cost_total, "totalCost")?;
        next.transaction_count += 1;

        *self = next;
        Ok(())
    }

    /// Sales for one method.
    pub fn sales_for(&self, method: PaymentMethod) -> Money {
        match method {
            PaymentMethod::Cash => self.cash_sales,
            PaymentMethod::Transfer => self.transfer_sales,
            PaymentMethod::Qris => self.qris_sales,
        }
    }

    /// `total_sales - total_cost`.
    pub fn gross_profit(&self) -> CoreResult<Money> {
        self.total_sales
            .checked_sub(self.total_cost)
            .ok_or_else(|| CoreError::AmountOverflow {
                field: "grossProfit".to_string(),
            })
    }

    pub fn is_empty(&self) -> bool {
        self.transaction_count == 0
    }
}

fn add(sum: Money, amount: Money, field: &str) -> CoreResult<Money> {
    sum.checked_add(amount).ok_or_else(|| CoreError::AmountOverflow {
        field: field.to_string(),
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PaymentStatus;
    use chrono::Utc;

    fn tx(total: i64, method: PaymentMethod, status: PaymentStatus) -> Transaction {
        Transaction {
            id: uuid::Uuid::new_v4().to_string(),
            store_id: "store-1".into(),
            total: Money::from_minor(total),
            cost_total: Money::from_minor(total / 2),
            payment_method: method,
            payment_status: status,
            cashier_id: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    #[test]
    fn test_pending_is_excluded() {
        let txs = vec![
            tx(15_000, PaymentMethod::Cash, PaymentStatus::Completed),
            tx(20_000, PaymentMethod::Qris, PaymentStatus::Completed),
            tx(5_000, PaymentMethod::Cash, PaymentStatus::Pending),
        ];

        let tally = SalesTally::from_transactions(&txs).unwrap();

        assert_eq!(tally.cash_sales.minor(), 15_000);
        assert_eq!(tally.transfer_sales.minor(), 0);
        assert_eq!(tally.qris_sales.minor(), 20_000);
        assert_eq!(tally.total_sales.minor(), 35_000);
        assert_eq!(tally.transaction_count, 2);
    }

    #[test]
    fn test_refunded_and_failed_are_excluded() {
        let txs = vec![
            tx(10_000, PaymentMethod::Transfer, PaymentStatus::Refunded),
            tx(7_000, PaymentMethod::Transfer, PaymentStatus::Failed),
            tx(3_000, PaymentMethod::Transfer, PaymentStatus::Completed),
        ];

        let tally = SalesTally::from_transactions(&txs).unwrap();
        assert_eq!(tally.transfer_sales.minor(), 3_000);
        assert_eq!(tally.sales_for(PaymentMethod::Transfer).minor(), 3_000);
        assert_eq!(tally.transaction_count, 1);
    }

    #[test]
    fn test_gross_profit() {
        let txs = vec![tx(10_000, PaymentMethod::Cash, PaymentStatus::Completed)];
        let tally = SalesTally::from_transactions(&txs).unwrap();
        assert_eq!(tally.total_cost.minor(), 5_000);
        assert_eq!(tally.gross_profit().unwrap().minor(), 5_000);
    }

    #[test]
    fn test_overflow_is_an_error_and_leaves_tally_unchanged() {
        let mut tally = SalesTally::new();
        tally.record(&tx(i64::MAX, PaymentMethod::Cash, PaymentStatus::Completed)).unwrap();
        let before = tally;

        let err = tally
            .record(&tx(1, PaymentMethod::Cash, PaymentStatus::Completed))
            .unwrap_err();
        assert!(matches!(err, CoreError::AmountOverflow { .. }));
        assert_eq!(tally, before);

        let txs = vec![
            tx(i64::MAX, PaymentMethod::Qris, PaymentStatus::Completed),
            tx(i64::MAX, PaymentMethod::Cash, PaymentStatus::Completed),
        ];
        assert!(SalesTally::from_transactions(&txs).is_err());
    }

    #[test]
    fn test_empty() {
        let tally = SalesTally::new();
        assert!(tally.is_empty());
        assert!(tally.total_sales.is_zero());
    }
}
