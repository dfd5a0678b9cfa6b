//! # Error Types
//!
//! Domain-specific error types for shiftbook-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  shiftbook-core errors (this file)                                     │
//! │  ├── CoreError          - Everything a workflow operation can return   │
//! │  ├── ConservationError  - Which stage handoff did not balance          │
//! │  └── ValidationError    - Malformed caller input                       │
//! │                                                                         │
//! │  shiftbook-db errors (separate crate)                                  │
//! │  └── DbError            - Database failures, become CoreError::Storage │
//! │                           (unique violations become Conflict)          │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError::InvalidInput → caller              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Only `Conflict` is worth retrying. `initialize` handles it itself when two
//! callers open a session at the same bar, by re-reading the winner's session. A `ValidationFailed` or
//! `PricingMissing` returned from commit means the session is already
//! `ROLLED_BACK`.

use thiserror::Error;

use crate::quantity::Quantity;
use crate::types::SessionStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Errors returned by workflow operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Missing or malformed caller arguments.
    #[error("Invalid input: {0}")]
    InvalidInput(#[from] ValidationError),

    /// Unknown session, bar, product or distribution reference.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Session is not in the status the operation requires.
    ///
    /// ## When This Occurs
    /// - Saving stage records on a COMPLETED or ROLLED_BACK session
    /// - Committing a session twice
    #[error("Session {session_id} is {status}, expected IN_PROGRESS")]
    InvalidState {
        session_id: String,
        status: SessionStatus,
    },

    /// One of the three conservation checks failed at commit.
    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ConservationError),

    /// A product consumed at a well has no price at this bar.
    #[error("No price configured for product {product_id} at bar {bar_id}")]
    PricingMissing { product_id: String, bar_id: String },

    /// Another transaction changed what this one read or wrote.
    ///
    /// Nothing was applied; the whole operation may be retried.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The ledger store or price catalog failed. Fatal for the operation.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl CoreError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Returns true if the session was rolled back as part of this error.
    pub fn rolls_back_session(&self) -> bool {
        matches!(
            self,
            CoreError::ValidationFailed(_) | CoreError::PricingMissing { .. }
        )
    }
}

// =============================================================================
// Conservation Error
// =============================================================================

/// A stage handoff that did not conserve quantity.
///
/// ## Check Order
/// ```text
/// Stockroom ──(1)──► Distribution ──(2)──► Wells
///                         │
///                        (3) unallocated == 0
/// ```
/// The first failing product stops the check; later products are not reported.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConservationError {
    /// Check 1: stock left the stockroom but no distribution record exists.
    #[error("Product {product_id}: no distribution record found for transferred stock ({transferred})")]
    MissingDistribution {
        product_id: String,
        transferred: Quantity,
    },

    /// Check 1: distribution quantity differs from stockroom transfer.
    #[error("Product {product_id}: stockroom transferred ({transferred}) != distribution quantity ({distributed})")]
    StockroomMismatch {
        product_id: String,
        transferred: Quantity,
        distributed: Quantity,
    },

    /// Check 2: distribution allocation differs from what the wells received.
    #[error("Product {product_id}: distribution allocated ({allocated}) != wells received ({received})")]
    WellsMismatch {
        product_id: String,
        allocated: Quantity,
        received: Quantity,
    },

    /// Check 3: stock remains unallocated (or was over-allocated).
    #[error("Product {product_id}: unallocated stock remaining ({unallocated} units)")]
    Unallocated {
        product_id: String,
        unallocated: Quantity,
    },
}

impl ConservationError {
    /// The product the failure is about.
    pub fn product_id(&self) -> &str {
        match self {
            ConservationError::MissingDistribution { product_id, .. }
            | ConservationError::StockroomMismatch { product_id, .. }
            | ConservationError::WellsMismatch { product_id, .. }
            | ConservationError::Unallocated { product_id, .. } => product_id,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any write happens, so the session is never touched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value must not be negative.
    #[error("{field} must not be negative (got {value})")]
    Negative { field: String, value: Quantity },

    /// Count is above the accepted maximum.
    #[error("{field} must be at most {max} (got {value})")]
    OutOfRange {
        field: String,
        value: Quantity,
        max: Quantity,
    },

    /// A computed amount does not fit the money representation.
    #[error("{field} is too large to represent")]
    Overflow { field: String },

    /// Price must not be negative.
    #[error("{field} must not be negative")]
    MustBeNonNegative { field: String },

    /// Invalid format (e.g., bad decimal, unknown well name).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// The same key appears twice in one submission.
    #[error("{field} '{value}' appears more than once")]
    Duplicate { field: String, value: String },
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
    fn test_unallocated_message_names_product_and_shortfall() {
        let err = ConservationError::Unallocated {
            product_id: "P1".to_string(),
            unallocated: Quantity::from_units(2),
        };
        assert_eq!(
            err.to_string(),
            "Product P1: unallocated stock remaining (2.00 units)"
        );
    }

    #[test]
    fn test_stockroom_mismatch_message() {
        let err: CoreError = ConservationError::StockroomMismatch {
            product_id: "P1".to_string(),
            transferred: Quantity::from_units(12),
            distributed: Quantity::from_units(10),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "Validation failed: Product P1: stockroom transferred (12.00) != distribution quantity (10.00)"
        );
        assert!(err.rolls_back_session());
    }

    #[test]
    fn test_invalid_state_message() {
        let err = CoreError::InvalidState {
            session_id: "s-1".to_string(),
            status: SessionStatus::Completed,
        };
        assert_eq!(err.to_string(), "Session s-1 is COMPLETED, expected IN_PROGRESS");
        assert!(!err.rolls_back_session());
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "bar_id".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::InvalidInput(_)));
        assert_eq!(core_err.to_string(), "Invalid input: bar_id is required");
    }
}
