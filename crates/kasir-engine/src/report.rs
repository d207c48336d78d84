//! # Reporting Aggregator
//!
//! Sales rollups over a caller-chosen period for dashboards.
//!
//! Independent of settlement: a report period and a settlement window may
//! overlap, and reports never touch the ledger. Read failures and sums
//! that overflow degrade to an empty report flagged `degraded` instead of
//! an error.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use kasir_core::report::build_sales_report;
use kasir_core::validation::validate_store_id;
use kasir_core::{BusinessCalendar, ReportPeriod, SalesReport};
use kasir_db::{BackendKind, PosStore};

use crate::error::EngineResult;

/// Builds [`SalesReport`]s from a store backend.
#[derive(Clone)]
pub struct ReportingAggregator {
    store: Arc<dyn PosStore>,
    calendar: BusinessCalendar,
}

impl ReportingAggregator {
    pub fn new(store: Arc<dyn PosStore>) -> Self {
        ReportingAggregator {
            store,
            calendar: BusinessCalendar::default(),
        }
    }

    pub fn with_calendar(mut self, calendar: BusinessCalendar) -> Self {
        self.calendar = calendar;
        self
    }

    pub async fn aggregate_sales(
        &self,
        store_id: &str,
        period: ReportPeriod,
    ) -> EngineResult<SalesReport> {
        self.aggregate_sales_at(store_id, period, Utc::now()).await
    }

    /// Sums completed sales in `period`, resolved against `now`.
    ///
    /// Fails only on bad input. Storage problems yield a degraded report.
    pub async fn aggregate_sales_at(
        &self,
        store_id: &str,
        period: ReportPeriod,
        now: DateTime<Utc>,
    ) -> EngineResult<SalesReport> {
        validate_store_id(store_id)?;
        let range = period.resolve(&self.calendar, now)?;

        if self.store.backend() == BackendKind::NotConfigured {
            return Ok(SalesReport::degraded(range));
        }

        let transactions = match self
            .store
            .list_completed_between(store_id, range.start, range.end)
            .await
        {
            Ok(transactions) => transactions,
            Err(e) => {
                warn!(
                    store_id = %store_id,
                    period = %period,
                    error = %e,
                    "Sales report degraded: failed to read transactions"
                );
                return Ok(SalesReport::degraded(range));
            }
        };

        let report = match build_sales_report(&transactions, range, &self.calendar) {
            Ok(report) => report,
            Err(e) => {
                warn!(
                    store_id = %store_id,
                    period = %period,
                    error = %e,
                    "Sales report degraded: stored amounts overflowed"
                );
                return Ok(SalesReport::degraded(range));
            }
        };

        debug!(
            store_id = %store_id,
            period = %period,
            transactions = report.transaction_count,
            total_sales = report.total_sales.minor(),
            "Sales report built"
        );

        Ok(report)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
