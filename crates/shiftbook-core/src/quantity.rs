//! # Quantity Module
//!
//! Provides the `Quantity` type for stock counts at every stage.
//!
//! ## Why Scaled Integers?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  EXACT EQUALITY AT EVERY HANDOFF                                        │
//! │                                                                         │
//! │  The commit step compares quantities across stages with ==.             │
//! │  In binary floating point:                                              │
//! │    0.1 + 0.2 == 0.3  →  false  ❌ false validation failure              │
//! │                                                                         │
//! │  OUR SOLUTION: Integer hundredths                                       │
//! │    10 + 20 == 30     →  true   ✅                                       │
//! │                                                                         │
//! │  12.50 bottles is stored as 1250. Two decimals, always.                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use shiftbook_core::quantity::Quantity;
//!
//! let opening: Quantity = "10".parse().unwrap();
//! let received = Quantity::from_units(5);
//! let closing = Quantity::from_hundredths(300);
//!
//! let transferred = opening + received - closing;
//! assert_eq!(transferred.to_string(), "12.00");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;

/// Number of fractional digits every quantity carries.
pub const SCALE: u32 = 2;

const FACTOR: i64 = 100;

// =============================================================================
// Quantity Type
// =============================================================================

/// A stock quantity in hundredths of a unit (bottle, case, ...).
///
/// ## Design Decisions
/// - **i64 (signed)**: derived figures such as `unallocated` may go negative
///   and must be representable so validations can report them
/// - **No float constructor**: the only ways in are integers and decimal
///   strings, both exact
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
#[ts(export)]
pub struct Quantity(i64);

impl Quantity {
    /// Creates a quantity from hundredths of a unit.
    ///
    /// ```rust
    /// use shiftbook_core::quantity::Quantity;
    ///
    /// assert_eq!(Quantity::from_hundredths(1250).to_string(), "12.50");
    /// ```
    #[inline]
    pub const fn from_hundredths(hundredths: i64) -> Self {
        Quantity(hundredths)
    }

    /// Creates a quantity from whole units.
    #[inline]
    pub const fn from_units(units: i64) -> Self {
        Quantity(units * FACTOR)
    }

    /// Returns the raw value in hundredths.
    #[inline]
    pub const fn hundredths(&self) -> i64 {
        self.0
    }

    /// Zero quantity.
    #[inline]
    pub const fn zero() -> Self {
        Quantity(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the quantity, or zero if it is negative.
    ///
    /// Used for well consumption: a closing count above opening + received
    /// means nothing was poured, not that stock was created.
    #[inline]
    pub const fn clamp_non_negative(self) -> Self {
        if self.0 < 0 {
            Quantity(0)
        } else {
            self
        }
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(self) -> Self {
        Quantity(self.0.abs())
    }
}

// =============================================================================
// Parsing
// =============================================================================

/// Parses decimal strings such as `"12"`, `"12.5"`, `"-0.25"`.
///
/// ## Rules
/// - Optional leading `-` or `+`
/// - At most two fractional digits (more would silently lose precision)
/// - Surrounding whitespace is ignored
/// - Empty input is rejected; callers decide whether blank means zero
impl FromStr for Quantity {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ValidationError::InvalidFormat {
            field: "quantity".to_string(),
            reason: reason.to_string(),
        };

        let s = s.trim();
        let (negative, digits) = match s.as_bytes().first() {
            Some(b'-') => (true, &s[1..]),
            Some(b'+') => (false, &s[1..]),
            Some(_) => (false, s),
            None => return Err(invalid("must not be empty")),
        };

        let (whole, fraction) = match digits.split_once('.') {
            Some((w, f)) => (w, f),
            None => (digits, ""),
        };

        if whole.is_empty() && fraction.is_empty() {
            return Err(invalid("must contain digits"));
        }
        if !whole.bytes().all(|b| b.is_ascii_digit()) || !fraction.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid("must be a decimal number"));
        }
        if fraction.len() > SCALE as usize {
            return Err(invalid("must have at most two decimal places"));
        }

        let whole_value: i64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid("is too large"))?
        };
        let mut fraction_value: i64 = if fraction.is_empty() {
            0
        } else {
            fraction.parse().map_err(|_| invalid("must be a decimal number"))?
        };
        if fraction.len() == 1 {
            fraction_value *= 10;
        }

        let magnitude = whole_value
            .checked_mul(FACTOR)
            .and_then(|v| v.checked_add(fraction_value))
            .ok_or_else(|| invalid("is too large"))?;

        Ok(Quantity(if negative { -magnitude } else { magnitude }))
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / FACTOR as u64, abs % FACTOR as u64)
    }
}

impl Add for Quantity {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Quantity(self.0 + other.0)
    }
}

impl AddAssign for Quantity {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Quantity {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Quantity(self.0 - other.0)
    }
}

impl SubAssign for Quantity {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Quantity {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Quantity(-self.0)
    }
}

impl Sum for Quantity {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Quantity::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Quantity> for Quantity {
    fn sum<I: Iterator<Item = &'a Quantity>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
