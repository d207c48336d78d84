//! # Sales Reports
//!
//! Dashboard rollups over a caller-chosen date range.
//!
//! Report periods are independent of settlement windows: a `7d` report and
//! today's unsettled window may cover the same sales.
//!
//! ```text
//!   ReportPeriod ──resolve(calendar, now)──► DateRange ──┐
//!                                                        ▼
//!   transactions ───────────────────────────► build_sales_report ──► SalesReport
//!                                               (completed, in range)   totals
//!                                                                       daily[]
//!                                                                       monthly[]
//! ```

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::calendar::BusinessCalendar;
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::tally::SalesTally;
use crate::types::Transaction;

/// Longest custom range accepted, in days.
pub const MAX_REPORT_DAYS: i64 = 366;

// =============================================================================
// Report Period
// =============================================================================

/// A named or custom reporting period, in business-local days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportPeriod {
    Today,
    /// Today and the six days before it.
    Last7Days,
    /// Today and the 29 days before it.
    Last30Days,
    /// Inclusive on both ends.
    Custom { from: NaiveDate, to: NaiveDate },
}

impl ReportPeriod {
    /// Parses query parameters: `period=today|7d|30d|custom&from=YYYY-MM-DD&to=YYYY-MM-DD`.
    ///
    /// A missing period defaults to `today`. Giving `from`/`to` without a
    /// period implies `custom`.
    pub fn parse(
        period: Option<&str>,
        from: Option<&str>,
        to: Option<&str>,
    ) -> Result<ReportPeriod, ValidationError> {
        let period = match period.map(str::trim) {
            Some(p) if !p.is_empty() => p.to_lowercase(),
            _ if from.is_some() || to.is_some() => "custom".to_string(),
            _ => "today".to_string(),
        };

        match period.as_str() {
            "today" => Ok(ReportPeriod::Today),
            "7d" => Ok(ReportPeriod::Last7Days),
            "30d" => Ok(ReportPeriod::Last30Days),
            "custom" => {
                let from = parse_date("from", from)?;
                let to = parse_date("to", to)?;
                Ok(ReportPeriod::Custom { from, to })
            }
            _ => Err(ValidationError::NotAllowed {
                field: "period".to_string(),
                allowed: ["today", "7d", "30d", "custom"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            }),
        }
    }

    /// Resolves the period to concrete instants using the store calendar.
    pub fn resolve(&self, calendar: &BusinessCalendar, now: DateTime<Utc>) -> CoreResult<DateRange> {
        let today = calendar.local_date(now);

        let (from, to) = match *self {
            ReportPeriod::Today => (today, today),
            ReportPeriod::Last7Days => (today - Duration::days(6), today),
            ReportPeriod::Last30Days => (today - Duration::days(29), today),
            ReportPeriod::Custom { from, to } => {
                if from > to {
                    return Err(CoreError::InvalidDateRange {
                        reason: format!("from ({}) is after to ({})", from, to),
                    });
                }
                if (to - from).num_days() >= MAX_REPORT_DAYS {
                    return Err(CoreError::InvalidDateRange {
                        reason: format!("range exceeds {} days", MAX_REPORT_DAYS),
                    });
                }
                (from, to)
            }
        };

        Ok(DateRange::new(calendar, from, to))
    }
}

impl fmt::Display for ReportPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportPeriod::Today => f.write_str("today"),
            ReportPeriod::Last7Days => f.write_str("7d"),
            ReportPeriod::Last30Days => f.write_str("30d"),
            ReportPeriod::Custom { from, to } => write!(f, "{}..{}", from, to),
        }
    }
}

fn parse_date(field: &str, value: Option<&str>) -> Result<NaiveDate, ValidationError> {
    let value = value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ValidationError::required(field))?;

    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "expected YYYY-MM-DD".to_string(),
    })
}

// =============================================================================
// Date Range
// =============================================================================

/// Inclusive business-local date range with its UTC bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    #[ts(as = "String")]
    pub from_date: NaiveDate,
    #[ts(as = "String")]
    pub to_date: NaiveDate,
    /// First instant of `from_date`.
    #[ts(as = "String")]
    pub start: DateTime<Utc>,
    /// Last instant of `to_date`.
    #[ts(as = "String")]
    pub end: DateTime<Utc>,
}

impl DateRange {
    pub fn new(calendar: &BusinessCalendar, from_date: NaiveDate, to_date: NaiveDate) -> Self {
        DateRange {
            from_date,
            to_date,
            start: calendar.start_of_date(from_date),
            end: calendar.end_of_date(to_date),
        }
    }

    #[inline]
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at <= self.end
    }

    /// Every date in the range, in order.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let to = self.to_date;
        self.from_date.iter_days().take_while(move |d| *d <= to)
    }
}

// =============================================================================
// Sales Report
// =============================================================================

/// One bucket of a daily or monthly rollup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SalesBucket {
    /// `YYYY-MM-DD` or `YYYY-MM`.
    pub key: String,
    pub total_sales: Money,
    pub gross_profit: Money,
    pub transaction_count: u64,
}

impl SalesBucket {
    fn empty(key: String) -> Self {
        SalesBucket {
            key,
            total_sales: Money::zero(),
            gross_profit: Money::zero(),
            transaction_count: 0,
        }
    }

    fn add(&mut self, tx: &Transaction) -> CoreResult<()> {
        let overflow = || CoreError::AmountOverflow {
            field: format!("bucket {}", self.key),
        };
        let profit = tx.total.checked_sub(tx.cost_total).ok_or_else(overflow)?;
        let total_sales = self.total_sales.checked_add(tx.total).ok_or_else(overflow)?;
        let gross_profit = self.gross_profit.checked_add(profit).ok_or_else(overflow)?;

        self.total_sales = total_sales;
        self.gross_profit = gross_profit;
        self.transaction_count += 1;
        Ok(())
    }
}

/// Aggregated sales for a date range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SalesReport {
    pub range: DateRange,
    pub cash_sales: Money,
    pub transfer_sales: Money,
    pub qris_sales: Money,
    pub total_sales: Money,
    pub total_cost: Money,
    pub gross_profit: Money,
    pub transaction_count: u64,
    pub average_ticket: Money,
    pub daily: Vec<SalesBucket>,
    pub monthly: Vec<SalesBucket>,
    /// True when the data could not be read and the report is empty.
    pub degraded: bool,
}

impl SalesReport {
    /// An all-zero report flagged as degraded.
    pub fn degraded(range: DateRange) -> Self {
        let (daily, monthly) = empty_buckets(&range);
        SalesReport {
            range,
            cash_sales: Money::zero(),
            transfer_sales: Money::zero(),
            qris_sales: Money::zero(),
            total_sales: Money::zero(),
            total_cost: Money::zero(),
            gross_profit: Money::zero(),
            transaction_count: 0,
            average_ticket: Money::zero(),
            daily: daily.into_values().collect(),
            monthly: monthly.into_values().collect(),
            degraded: true,
        }
    }
}

type Buckets = BTreeMap<String, SalesBucket>;

/// Zeroed daily and monthly buckets covering every date of `range`.
fn empty_buckets(range: &DateRange) -> (Buckets, Buckets) {
    let mut daily = Buckets::new();
    let mut monthly = Buckets::new();

    for day in range.days() {
        let day_key = day.format("%Y-%m-%d").to_string();
        let month_key = day.format("%Y-%m").to_string();
        daily.insert(day_key.clone(), SalesBucket::empty(day_key));
        monthly
            .entry(month_key.clone())
            .or_insert_with(|| SalesBucket::empty(month_key));
    }

    (daily, monthly)
}

/// Sums completed transactions counted within `range`.
///
/// A sale is placed by [`Transaction::counted_at`], the same instant that
/// decides its settlement window. Every day and month of the range gets a
/// bucket, including empty ones, so charts have no gaps. Fails only if a
/// sum overflows.
pub fn build_sales_report<'a, I>(
    transactions: I,
    range: DateRange,
    calendar: &BusinessCalendar,
) -> CoreResult<SalesReport>
where
    I: IntoIterator<Item = &'a Transaction>,
{
    let (mut daily, mut monthly) = empty_buckets(&range);

    let mut tally = SalesTally::new();
    for tx in transactions {
        let counted_at = tx.counted_at();
        if !tx.is_completed() || !range.contains(counted_at) {
            continue;
        }

        tally.record(tx)?;
        if let Some(bucket) = daily.get_mut(&calendar.day_key(counted_at)) {
            bucket.add(tx)?;
        }
        if let Some(bucket) = monthly.get_mut(&calendar.month_key(counted_at)) {
            bucket.add(tx)?;
        }
    }

    Ok(SalesReport {
        range,
        cash_sales: tally.cash_sales,
        transfer_sales: tally.transfer_sales,
        qris_sales: tally.qris_sales,
        total_sales: tally.total_sales,
        total_cost: tally.total_cost,
        gross_profit: tally.gross_profit()?,
        transaction_count: tally.transaction_count,
        average_ticket: tally.total_sales.average_over(tally.transaction_count),
        daily: daily.into_values().collect(),
        monthly: monthly.into_values().collect(),
        degraded: false,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PaymentMethod, PaymentStatus};
    use chrono::TimeZone;

    fn tx(total: i64, cost: i64, status: PaymentStatus, created_at: DateTime<Utc>) -> Transaction {
        Transaction {
            id: uuid::Uuid::new_v4().to_string(),
            store_id: "store-1".into(),
            total: Money::from_minor(total),
            cost_total: Money::from_minor(cost),
            payment_method: PaymentMethod::Cash,
            payment_status: status,
            cashier_id: None,
            created_at,
            completed_at: None,
        }
    }

    #[test]
    fn test_parse_period() {
        assert_eq!(ReportPeriod::parse(None, None, None).unwrap(), ReportPeriod::Today);
        assert_eq!(ReportPeriod::parse(Some("7D"), None, None).unwrap(), ReportPeriod::Last7Days);
        assert_eq!(
            ReportPeriod::parse(None, Some("2026-10-01"), Some("2026-10-18")).unwrap(),
            ReportPeriod::Custom {
                from: NaiveDate::from_ymd_opt(2026, 10, 1).unwrap(),
                to: NaiveDate::from_ymd_opt(2026, 10, 18).unwrap(),
            }
        );
        assert!(ReportPeriod::parse(Some("custom"), Some("2026-10-01"), None).is_err());
        assert!(ReportPeriod::parse(Some("year"), None, None).is_err());
        assert!(ReportPeriod::parse(Some("custom"), Some("01/10/2026"), Some("2026-10-18")).is_err());
    }

    #[test]
    fn test_resolve_7d_in_wib() {
        let cal = BusinessCalendar::default();
        // 2026-10-18 02:00 WIB
        let now = Utc.with_ymd_and_hms(2026, 10, 17, 19, 0, 0).unwrap();
        let range = ReportPeriod::Last7Days.resolve(&cal, now).unwrap();

        assert_eq!(range.from_date, NaiveDate::from_ymd_opt(2026, 10, 12).unwrap());
        assert_eq!(range.to_date, NaiveDate::from_ymd_opt(2026, 10, 18).unwrap());
        assert_eq!(range.start, Utc.with_ymd_and_hms(2026, 10, 11, 17, 0, 0).unwrap());
        assert_eq!(range.days().count(), 7);
    }

    #[test]
    fn test_inverted_custom_range() {
        let cal = BusinessCalendar::utc();
        let period = ReportPeriod::Custom {
            from: NaiveDate::from_ymd_opt(2026, 10, 18).unwrap(),
            to: NaiveDate::from_ymd_opt(2026, 10, 1).unwrap(),
        };
        assert!(matches!(
            period.resolve(&cal, Utc::now()),
            Err(CoreError::InvalidDateRange { .. })
        ));
    }

    #[test]
    fn test_report_totals_and_buckets() {
        let cal = BusinessCalendar::utc();
        let range = DateRange::new(
            &cal,
            NaiveDate::from_ymd_opt(2026, 9, 30).unwrap(),
            NaiveDate::from_ymd_opt(2026, 10, 1).unwrap(),
        );

        let txs = vec![
            tx(10_000, 6_000, PaymentStatus::Completed, Utc.with_ymd_and_hms(2026, 9, 30, 9, 0, 0).unwrap()),
            tx(20_000, 12_000, PaymentStatus::Completed, Utc.with_ymd_and_hms(2026, 10, 1, 9, 0, 0).unwrap()),
            tx(5_000, 0, PaymentStatus::Refunded, Utc.with_ymd_and_hms(2026, 10, 1, 10, 0, 0).unwrap()),
            tx(7_000, 0, PaymentStatus::Completed, Utc.with_ymd_and_hms(2026, 10, 2, 0, 0, 0).unwrap()),
        ];

        let report = build_sales_report(&txs, range, &cal).unwrap();

        assert_eq!(report.total_sales.minor(), 30_000);
        assert_eq!(report.total_cost.minor(), 18_000);
        assert_eq!(report.gross_profit.minor(), 12_000);
        assert_eq!(report.transaction_count, 2);
        assert_eq!(report.average_ticket.minor(), 15_000);
        assert!(!report.degraded);

        let keys: Vec<_> = report.daily.iter().map(|b| b.key.as_str()).collect();
        assert_eq!(keys, vec!["2026-09-30", "2026-10-01"]);
        assert_eq!(report.daily[1].total_sales.minor(), 20_000);

        let months: Vec<_> = report.monthly.iter().map(|b| b.key.as_str()).collect();
        assert_eq!(months, vec!["2026-09", "2026-10"]);
        assert_eq!(report.monthly[0].gross_profit.minor(), 4_000);
    }

    #[test]
    fn test_degraded_report_is_empty() {
        let cal = BusinessCalendar::utc();
        let range = ReportPeriod::Today.resolve(&cal, Utc::now()).unwrap();
        let report = SalesReport::degraded(range);

        assert!(report.degraded);
        assert_eq!(report.transaction_count, 0);
        assert_eq!(report.average_ticket, Money::zero());
        assert_eq!(report.daily.len(), 1);
    }

    #[test]
    fn test_report_overflow_is_an_error() {
        let cal = BusinessCalendar::utc();
        let day = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        let range = DateRange::new(&cal, day, day);
        let noon = Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap();
        let txs = vec![
            tx(i64::MAX, 0, PaymentStatus::Completed, noon),
            tx(i64::MAX, 0, PaymentStatus::Completed, noon),
        ];

        assert!(matches!(
            build_sales_report(&txs, range, &cal),
            Err(CoreError::AmountOverflow { .. })
        ));
    }
}
