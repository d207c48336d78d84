//! # Kasir API
//!
//! HTTP service for cash settlement, sales reports and checkout capture.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           Kasir API Routes                              │
//! │                                                                         │
//! │  ┌────────────────────────┐  ┌────────────────────────────────────────┐│
//! │  │  Settlement            │  │  Transactions                          ││
//! │  │                        │  │                                        ││
//! │  │ • GET  settlement/     │  │ • POST  transactions                   ││
//! │  │        pending         │  │ • PATCH transactions/{txId}/status     ││
//! │  │ • POST settlement      │  │                                        ││
//! │  │ • GET  settlements     │  └────────────────────────────────────────┘│
//! │  └────────────────────────┘                                            │
//! │  ┌────────────────────────┐  ┌────────────────────────────────────────┐│
//! │  │  Reports               │  │  Health                                ││
//! │  │ • GET reports/sales    │  │ • GET /health                          ││
//! │  └────────────────────────┘  └────────────────────────────────────────┘│
//! │                                                                         │
//! │  All store routes live under /stores/{id}/                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! See [`config`]: defaults, then `kasir.toml` (or `KASIR_CONFIG`), then
//! `KASIR__*` environment variables.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use tower_http::trace::TraceLayer;

use kasir_core::{BusinessCalendar, CutoffPolicy};
use kasir_db::PosStore;
use kasir_engine::{ReportingAggregator, SettlementEngine, TransactionRecorder};

// Re-exports
pub use config::AppConfig;
pub use error::{ApiError, ApiResult};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn PosStore>,
    pub settlement: SettlementEngine,
    pub reports: ReportingAggregator,
    pub transactions: TransactionRecorder,
}

impl AppState {
    pub fn new(store: Arc<dyn PosStore>, calendar: BusinessCalendar, policy: CutoffPolicy) -> Self {
        AppState {
            settlement: SettlementEngine::new(store.clone())
                .with_calendar(calendar)
                .with_policy(policy),
            reports: ReportingAggregator::new(store.clone()).with_calendar(calendar),
            transactions: TransactionRecorder::new(store.clone()),
            store,
        }
    }
}

/// Builds the router with request tracing.
pub fn app(state: AppState) -> Router {
    routes::router()
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
