//! Route table.

pub mod health;
pub mod report;
pub mod settlement;
pub mod transaction;

use axum::routing::{get, patch, post};
use axum::Router;

use crate::AppState;

/// Every route, without state or middleware.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        // Settlement
        .route(
            "/stores/{id}/settlement/pending",
            get(settlement::pending_window),
        )
        .route("/stores/{id}/settlement", post(settlement::commit))
        .route("/stores/{id}/settlements", get(settlement::history))
        // Reports
        .route("/stores/{id}/reports/sales", get(report::sales_report))
        // Transactions
        .route("/stores/{id}/transactions", post(transaction::record))
        .route(
            "/stores/{id}/transactions/{tx_id}/status",
            patch(transaction::set_status),
        )
}

// =============================================================================
// Route Tests
// =============================================================================
