//! # Error Types
//!
//! Domain-specific error types for kasir-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  kasir-core errors (this file)                                         │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  kasir-db errors (separate crate)                                      │
//! │  └── DbError          - Storage failures, NotConfigured                │
//! │                                                                         │
//! │  kasir-engine errors                                                   │
//! │  └── EngineError      - What the settlement engine surfaces            │
//! │                                                                         │
//! │  kasir-api errors                                                      │
//! │  └── ApiError         - What the web UI sees (serialized)              │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → EngineError → ApiError → UI       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::types::PaymentStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A payment status change that the lifecycle does not allow.
    ///
    /// ## When This Occurs
    /// - Refunding a transaction that was never completed
    /// - Re-completing a refunded transaction
    #[error("Cannot move transaction {transaction_id} from {from} to {to}")]
    InvalidStatusTransition {
        transaction_id: String,
        from: PaymentStatus,
        to: PaymentStatus,
    },

    /// Report range is inverted or otherwise unusable.
    #[error("Invalid date range: {reason}")]
    InvalidDateRange { reason: String },

    /// A running total no longer fits in minor units.
    #[error("{field} overflowed while summing")]
    AmountOverflow { field: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any read or write so the operator gets a corrective
/// message and nothing is touched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., invalid UUID, invalid date).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// The instant is already covered by a committed settlement.
    #[error("{field} must be after the last settlement at {settled_at}")]
    NotAfterLastSettlement { field: String, settled_at: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

impl ValidationError {
    /// Shorthand for a missing field.
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InvalidStatusTransition {
            transaction_id: "tx-1".to_string(),
            from: PaymentStatus::Refunded,
            to: PaymentStatus::Completed,
        };
        assert_eq!(
            err.to_string(),
            "Cannot move transaction tx-1 from refunded to completed"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        assert_eq!(
            ValidationError::required("actualCash").to_string(),
            "actualCash is required"
        );

        let err = ValidationError::MustNotBeNegative {
            field: "actualCash".to_string(),
        };
        assert_eq!(err.to_string(), "actualCash must not be negative");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::required("storeId").into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
