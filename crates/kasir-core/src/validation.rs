//! # Validation Module
//!
//! Input validation for settlement, capture, and report requests.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Web UI                                                       │
//! │  └── Disables submit on empty cash field                               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: HTTP handler (kasir-api)                                     │
//! │  └── Type validation (JSON deserialization)                            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Engine (kasir-engine)                                        │
//! │  └── THIS MODULE: runs before any read or write                        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 4: Storage                                                      │
//! │  └── CHECK constraints, append-only triggers (SQLite)                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use kasir_core::validation::{validate_actual_cash, validate_store_id};
//!
//! validate_store_id("toko-sejahtera").unwrap();
//! assert_eq!(validate_actual_cash(Some(14_500)).unwrap().minor(), 14_500);
//! assert!(validate_actual_cash(None).is_err());
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::Operator;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest accepted store identifier.
pub const MAX_STORE_ID_LEN: usize = 64;

/// Longest accepted operator id or name.
pub const MAX_OPERATOR_FIELD_LEN: usize = 100;

/// Longest accepted settlement note.
pub const MAX_NOTES_LEN: usize = 500;

/// Largest accepted single amount (Rp1 trillion).
///
/// Keeps every per-window sum far inside i64; running totals are still
/// checked for overflow.
pub const MAX_AMOUNT: i64 = 1_000_000_000_000;

/// Default and maximum page size for ledger history.
pub const DEFAULT_HISTORY_LIMIT: u32 = 50;
pub const MAX_HISTORY_LIMIT: u32 = 200;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a store identifier.
///
/// ## Rules
/// - Must not be empty
/// - At most 64 characters
/// - Letters, digits, hyphens and underscores only (it is used in Redis keys)
///
/// ## Example
/// ```rust
/// use kasir_core::validation::validate_store_id;
///
/// assert!(validate_store_id("store-1").is_ok());
/// assert!(validate_store_id("").is_err());
/// assert!(validate_store_id("a:b").is_err());
/// ```
pub fn validate_store_id(store_id: &str) -> ValidationResult<()> {
    if store_id.trim().is_empty() {
        return Err(ValidationError::required("storeId"));
    }

    if store_id.len() > MAX_STORE_ID_LEN {
        return Err(ValidationError::TooLong {
            field: "storeId".to_string(),
            max: MAX_STORE_ID_LEN,
        });
    }

    if !store_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "storeId".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates the operator performing a settlement.
///
/// Both `id` and `name` are required; the ledger is an audit trail.
pub fn validate_operator(operator: &Operator) -> ValidationResult<()> {
    for (field, value) in [("operator.id", &operator.id), ("operator.name", &operator.name)] {
        if value.trim().is_empty() {
            return Err(ValidationError::required(field));
        }
        if value.chars().count() > MAX_OPERATOR_FIELD_LEN {
            return Err(ValidationError::TooLong {
                field: field.to_string(),
                max: MAX_OPERATOR_FIELD_LEN,
            });
        }
    }

    Ok(())
}

/// Validates an optional settlement note.
///
/// ## Returns
/// The trimmed note, or `None` when absent or blank.
pub fn validate_notes(notes: Option<&str>) -> ValidationResult<Option<String>> {
    let Some(notes) = notes.map(str::trim).filter(|n| !n.is_empty()) else {
        return Ok(None);
    };

    if notes.chars().count() > MAX_NOTES_LEN {
        return Err(ValidationError::TooLong {
            field: "notes".to_string(),
            max: MAX_NOTES_LEN,
        });
    }

    Ok(Some(notes.to_string()))
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates the cash counted in the drawer.
///
/// ## Rules
/// - Must be present
/// - Must not be negative
/// - Zero is allowed (empty drawer)
///
/// ## User Workflow
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Settlement: Count Drawer                                               │
/// │                                                                         │
/// │  Operator enters counted cash: 14.500                                   │
/// │       │                                                                 │
/// │       ▼                                                                 │
/// │  validate_actual_cash(Some(14500)) ← THIS FUNCTION                      │
/// │       │                                                                 │
/// │       ├── None?  → Error: "actualCash is required"                      │
/// │       │                                                                 │
/// │       ├── < 0?   → Error: "actualCash must not be negative"             │
/// │       │                                                                 │
/// │       └── OK → commit_settlement proceeds                               │
/// │                                                                         │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub fn validate_actual_cash(actual_cash: Option<i64>) -> ValidationResult<Money> {
    let minor = actual_cash.ok_or_else(|| ValidationError::required("actualCash"))?;
    validate_amount("actualCash", minor)
}

/// Validates a non-negative monetary amount in minor units.
///
/// ## Example
/// ```rust
/// use kasir_core::validation::validate_amount;
///
/// assert!(validate_amount("total", 15_000).is_ok());
/// assert!(validate_amount("total", 0).is_ok());
/// assert!(validate_amount("total", -1).is_err());
/// assert!(validate_amount("total", i64::MAX).is_err());
/// ```
pub fn validate_amount(field: &str, minor: i64) -> ValidationResult<Money> {
    if minor < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }

    if minor > MAX_AMOUNT {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_AMOUNT,
        });
    }

    Ok(Money::from_minor(minor))
}

/// Validates the ledger history page size.
///
/// `None` means the default page size.
pub fn validate_history_limit(limit: Option<u32>) -> ValidationResult<u32> {
    let limit = limit.unwrap_or(DEFAULT_HISTORY_LIMIT);

    if !(1..=MAX_HISTORY_LIMIT).contains(&limit) {
        return Err(ValidationError::OutOfRange {
            field: "limit".to_string(),
            min: 1,
            max: i64::from(MAX_HISTORY_LIMIT),
        });
    }

    Ok(limit)
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string format.
///
/// ## Example
/// ```rust
/// use kasir_core::validation::validate_uuid;
///
/// assert!(validate_uuid("transactionId", "550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("transactionId", "not-a-uuid").is_err());
/// ```
pub fn validate_uuid(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::required(field));
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_store_id() {
        assert!(validate_store_id("store-1").is_ok());
        assert!(validate_store_id("TOKO_02").is_ok());

        assert_eq!(
            validate_store_id("   "),
            Err(ValidationError::required("storeId"))
        );
        assert!(validate_store_id("has space").is_err());
        assert!(validate_store_id("kasir:evil").is_err());
        assert!(validate_store_id(&"a".repeat(65)).is_err());
    }

    #[test]
    fn test_validate_actual_cash() {
        assert_eq!(validate_actual_cash(Some(0)).unwrap(), Money::zero());
        assert_eq!(validate_actual_cash(Some(14_500)).unwrap().minor(), 14_500);

        assert_eq!(
            validate_actual_cash(None),
            Err(ValidationError::required("actualCash"))
        );
        assert_eq!(
            validate_actual_cash(Some(-1)),
            Err(ValidationError::MustNotBeNegative {
                field: "actualCash".to_string()
            })
        );
    }

    #[test]
    fn test_validate_amount_upper_bound() {
        assert_eq!(validate_amount("total", MAX_AMOUNT).unwrap().minor(), MAX_AMOUNT);
        assert_eq!(
            validate_amount("total", MAX_AMOUNT + 1),
            Err(ValidationError::OutOfRange {
                field: "total".to_string(),
                min: 0,
                max: MAX_AMOUNT,
            })
        );
        assert!(validate_actual_cash(Some(i64::MAX)).is_err());
    }

    #[test]
    fn test_validate_operator() {
        assert!(validate_operator(&Operator::new("u1", "Alice")).is_ok());
        assert_eq!(
            validate_operator(&Operator::new("", "Alice")),
            Err(ValidationError::required("operator.id"))
        );
        assert_eq!(
            validate_operator(&Operator::new("u1", "  ")),
            Err(ValidationError::required("operator.name"))
        );
    }

    #[test]
    fn test_validate_notes() {
        assert_eq!(validate_notes(None).unwrap(), None);
        assert_eq!(validate_notes(Some("   ")).unwrap(), None);
        assert_eq!(
            validate_notes(Some(" short by one coin ")).unwrap(),
            Some("short by one coin".to_string())
        );
        assert!(validate_notes(Some(&"x".repeat(501))).is_err());
    }

    #[test]
    fn test_validate_history_limit() {
        assert_eq!(validate_history_limit(None).unwrap(), 50);
        assert_eq!(validate_history_limit(Some(200)).unwrap(), 200);
        assert!(validate_history_limit(Some(0)).is_err());
        assert!(validate_history_limit(Some(201)).is_err());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("id", "550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_uuid("id", "").is_err());
        assert!(validate_uuid("id", "123").is_err());
    }
}
