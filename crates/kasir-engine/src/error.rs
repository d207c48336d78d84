//! # Engine Error Types
//!
//! What the settlement engine and reporting aggregator surface to callers.
//!
//! ## Error Taxonomy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Engine Error Categories                           │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Validation     │  │  NotConfigured  │  │  Storage                │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  Rejected before│  │  No backend.    │  │  Backend failed.        │ │
//! │  │  any read/write │  │  Writes only;   │  │  "failed to save,       │ │
//! │  │                 │  │  reads are empty│  │   retry". No auto retry │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  NotFound       │  │ InvalidTransition│ │  Conflict               │ │
//! │  │  unknown tx id  │  │ refund pending   │ │  concurrent status      │ │
//! │  └─────────────────┘  └─────────────────┘  │  change, duplicate id   │ │
//! │                                            └─────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use kasir_core::{CoreError, PaymentStatus, ValidationError};
use kasir_db::DbError;

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Engine error type.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Input rejected before touching the store.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// Report range is inverted or too long.
    #[error("Invalid date range: {0}")]
    InvalidDateRange(String),

    /// No data store is configured or reachable.
    #[error("Data store is not configured")]
    NotConfigured,

    /// The backend failed. The operator should retry.
    #[error("Storage error: {0}")]
    Storage(#[source] DbError),

    /// Entity not found.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Payment status change the lifecycle does not allow.
    #[error("Cannot move transaction {transaction_id} from {from} to {to}")]
    InvalidTransition {
        transaction_id: String,
        from: PaymentStatus,
        to: PaymentStatus,
    },

    /// The store state changed underneath the request.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A sum over stored sales no longer fits in minor units.
    #[error("Amount overflow: {0} overflowed while summing")]
    AmountOverflow(String),
}

impl EngineError {
    /// Whether retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::Storage(e) if e.is_transient())
    }
}

impl From<DbError> for EngineError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotConfigured => EngineError::NotConfigured,
            DbError::NotFound { entity, id } => EngineError::NotFound { entity, id },
            DbError::Conflict(msg) => EngineError::Conflict(msg),
            DbError::UniqueViolation { field, value } => {
                EngineError::Conflict(format!("{} '{}' already exists", field, value))
            }
            other => EngineError::Storage(other),
        }
    }
}

impl From<CoreError> for EngineError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(v) => EngineError::Validation(v),
            CoreError::InvalidDateRange { reason } => EngineError::InvalidDateRange(reason),
            CoreError::InvalidStatusTransition {
                transaction_id,
                from,
                to,
            } => EngineError::InvalidTransition {
                transaction_id,
                from,
                to,
            },
            CoreError::AmountOverflow { field } => EngineError::AmountOverflow(field),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
