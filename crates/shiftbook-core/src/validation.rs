//! # Validation Module
//!
//! Input validation for session and stage-record submissions.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Caller input (THIS MODULE)                                   │
//! │  ├── Required ids, text length limits                                  │
//! │  ├── Physical counts within 0..=MAX_STOCK_QUANTITY                     │
//! │  └── One row per product (per well) in a submission                    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Conservation checks at commit (reconcile module)             │
//! │  └── Stockroom → Distribution → Wells must balance                     │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── UNIQUE (session, product[, well])                                 │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A failure here is always `CoreError::InvalidInput` and happens before
//! anything is written.
//!
//! ## Usage
//! ```rust
//! use shiftbook_core::validation::{validate_id, validate_non_negative};
//! use shiftbook_core::quantity::Quantity;
//!
//! validate_id("bar_id", "BAR-01").unwrap();
//! assert!(validate_non_negative("closing_stock", Quantity::from_units(-1)).is_err());
//! ```

use std::collections::HashSet;

use crate::error::ValidationError;
use crate::quantity::Quantity;
use crate::types::{StockroomCount, WellCount};
use crate::{MAX_ID_LEN, MAX_NOTES_LEN, MAX_REMARKS_LEN, MAX_SHIFT_TYPE_LEN, MAX_STOCK_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates an identifier (bar, product, session).
///
/// ## Rules
/// - Must not be empty or whitespace
/// - At most [`MAX_ID_LEN`] characters
///
/// ```rust
/// use shiftbook_core::validation::validate_id;
///
/// assert!(validate_id("product_id", "JW-BLACK-750").is_ok());
/// assert!(validate_id("product_id", "  ").is_err());
/// ```
pub fn validate_id(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > MAX_ID_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_ID_LEN,
        });
    }

    Ok(())
}

/// Validates optional free text against a length limit.
///
/// Absent text always passes. Length is counted in characters, not bytes.
pub fn validate_text(field: &str, value: Option<&str>, max: usize) -> ValidationResult<()> {
    match value {
        Some(text) if text.chars().count() > max => Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        }),
        _ => Ok(()),
    }
}

/// Validates the arguments of session initialization.
pub fn validate_session_start(
    bar_id: &str,
    shift_type: Option<&str>,
    notes: Option<&str>,
) -> ValidationResult<()> {
    validate_id("bar_id", bar_id)?;
    validate_text("shift_type", shift_type, MAX_SHIFT_TYPE_LEN)?;
    validate_text("notes", notes, MAX_NOTES_LEN)?;
    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates that a physical count is not negative.
///
/// Derived figures (transferred out, unallocated) may be negative; counts
/// a person typed in may not.
pub fn validate_non_negative(field: &str, value: Quantity) -> ValidationResult<()> {
    if value.is_negative() {
        return Err(ValidationError::Negative {
            field: field.to_string(),
            value,
        });
    }
    Ok(())
}

/// Validates a typed-in count: not negative, at most [`MAX_STOCK_QUANTITY`].
///
/// The cap keeps every derived sum of a row well inside `i64`.
pub fn validate_count(field: &str, value: Quantity) -> ValidationResult<()> {
    validate_non_negative(field, value)?;

    if value > MAX_STOCK_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            value,
            max: MAX_STOCK_QUANTITY,
        });
    }

    Ok(())
}

// =============================================================================
// Submission Validators
// =============================================================================

/// Validates a full stockroom submission.
///
/// ## Rules
/// - Every product id valid, at most once per submission
/// - opening, received and closing within `0..=MAX_STOCK_QUANTITY`
/// - remarks within [`MAX_REMARKS_LEN`]
///
/// An empty submission is valid: it clears the stage.
pub fn validate_stockroom_counts(counts: &[StockroomCount]) -> ValidationResult<()> {
    let mut seen = HashSet::with_capacity(counts.len());

    for count in counts {
        validate_id("product_id", &count.product_id)?;
        validate_count("opening_stock", count.opening_stock)?;
        validate_count("received_stock", count.received_stock)?;
        validate_count("closing_stock", count.closing_stock)?;
        validate_text("remarks", count.remarks.as_deref(), MAX_REMARKS_LEN)?;

        if !seen.insert(count.product_id.as_str()) {
            return Err(ValidationError::Duplicate {
                field: "product_id".to_string(),
                value: count.product_id.clone(),
            });
        }
    }

    Ok(())
}

/// Validates a full wells submission.
///
/// Same rules as [`validate_stockroom_counts`], keyed by (product, well).
pub fn validate_well_counts(counts: &[WellCount]) -> ValidationResult<()> {
    let mut seen = HashSet::with_capacity(counts.len());

    for count in counts {
        validate_id("product_id", &count.product_id)?;
        validate_count("opening_stock", count.opening_stock)?;
        validate_count("received_from_distribution", count.received_from_distribution)?;
        validate_count("closing_stock", count.closing_stock)?;
        validate_text("remarks", count.remarks.as_deref(), MAX_REMARKS_LEN)?;

        if !seen.insert((count.product_id.as_str(), count.well_name)) {
            return Err(ValidationError::Duplicate {
                field: "product_id/well_name".to_string(),
                value: format!("{}/{}", count.product_id, count.well_name),
            });
        }
    }

    Ok(())
}

// =============================================================================
// Helpers
// =============================================================================

/// Truncates text to at most `max` characters on a char boundary.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::WellName;

    fn stockroom(product: &str, opening: i64, received: i64, closing: i64) -> StockroomCount {
        StockroomCount {
            product_id: product.to_string(),
            opening_stock: Quantity::from_units(opening),
            received_stock: Quantity::from_units(received),
            closing_stock: Quantity::from_units(closing),
            remarks: None,
        }
    }

    fn well(product: &str, well_name: WellName) -> WellCount {
        WellCount {
            product_id: product.to_string(),
            well_name,
            opening_stock: Quantity::zero(),
            received_from_distribution: Quantity::from_units(1),
            closing_stock: Quantity::zero(),
            remarks: None,
        }
    }

    #[test]
    fn test_validate_id() {
        assert!(validate_id("bar_id", "BAR-01").is_ok());
        assert!(matches!(
            validate_id("bar_id", ""),
            Err(ValidationError::Required { .. })
        ));
        assert!(matches!(
            validate_id("bar_id", &"x".repeat(MAX_ID_LEN + 1)),
            Err(ValidationError::TooLong { .. })
        ));
    }

    #[test]
    fn test_validate_session_start_limits() {
        assert!(validate_session_start("B1", Some("EVENING"), None).is_ok());
        assert!(validate_session_start("B1", Some(&"E".repeat(21)), None).is_err());
        assert!(validate_session_start("B1", None, Some(&"n".repeat(501))).is_err());
        assert!(validate_session_start("B1", None, Some(&"n".repeat(500))).is_ok());
    }

    #[test]
    fn test_stockroom_rejects_negative_counts() {
        let counts = vec![stockroom("P1", 10, -1, 3)];
        let err = validate_stockroom_counts(&counts).unwrap_err();
        assert!(matches!(err, ValidationError::Negative { ref field, .. } if field == "received_stock"));
    }

    #[test]
    fn test_counts_above_maximum_rejected() {
        let huge: Quantity = "92233720368547758.07".parse().unwrap();
        let counts = vec![StockroomCount {
            opening_stock: huge,
            received_stock: huge,
            ..stockroom("P1", 0, 0, 0)
        }];
        assert!(matches!(
            validate_stockroom_counts(&counts),
            Err(ValidationError::OutOfRange { ref field, .. }) if field == "opening_stock"
        ));

        let mut wells = vec![well("P1", WellName::Bar1)];
        wells[0].closing_stock = MAX_STOCK_QUANTITY + Quantity::from_hundredths(1);
        assert!(matches!(
            validate_well_counts(&wells),
            Err(ValidationError::OutOfRange { ref field, .. }) if field == "closing_stock"
        ));

        assert!(validate_count("opening_stock", MAX_STOCK_QUANTITY).is_ok());
    }

    #[test]
    fn test_stockroom_allows_closing_above_opening() {
        // Transferred out goes negative; that is a derived figure, not input
        assert!(validate_stockroom_counts(&[stockroom("P1", 1, 0, 5)]).is_ok());
    }

    #[test]
    fn test_stockroom_rejects_duplicate_product() {
        let counts = vec![stockroom("P1", 10, 0, 3), stockroom("P1", 4, 0, 1)];
        assert!(matches!(
            validate_stockroom_counts(&counts),
            Err(ValidationError::Duplicate { .. })
        ));
    }

    #[test]
    fn test_wells_duplicate_is_per_well() {
        let ok = vec![well("P1", WellName::Bar1), well("P1", WellName::Bar2)];
        assert!(validate_well_counts(&ok).is_ok());

        let dup = vec![well("P1", WellName::Bar1), well("P1", WellName::Bar1)];
        assert!(matches!(
            validate_well_counts(&dup),
            Err(ValidationError::Duplicate { .. })
        ));
    }

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }
}
