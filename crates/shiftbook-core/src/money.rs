//! # Money Module
//!
//! Provides the `Money` type for selling/cost prices and sales totals.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    quantity (hundredths) × price (cents) = ten-thousandths             │
//! │    rounded once, half away from zero, back to cents                    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use shiftbook_core::money::Money;
//! use shiftbook_core::quantity::Quantity;
//!
//! let selling = Money::from_cents(900); // 9.00 per bottle
//! let revenue = selling.extend(Quantity::from_units(10));
//! assert_eq!(revenue.cents(), 9000); // 90.00
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::quantity::Quantity;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: profit can be negative when cost exceeds price
/// - **Currency-agnostic**: a bar prices in one currency; display adds no symbol
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    ///
    /// ```rust
    /// use shiftbook_core::money::Money;
    ///
    /// let price = Money::from_cents(1099);
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from major and minor units.
    ///
    /// For negative amounts only the major unit should be negative:
    /// `from_major_minor(-5, 50)` is -5.50.
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies this unit price by a (fractional) quantity.
    ///
    /// ## Rounding
    /// Cents × hundredths yields ten-thousandths. The product is rounded
    /// half away from zero to cents, the same result a scale-2 NUMERIC
    /// column would store.
    ///
    /// ```rust
    /// use shiftbook_core::money::Money;
    /// use shiftbook_core::quantity::Quantity;
    ///
    /// let price = Money::from_cents(333); // 3.33
    /// let qty = Quantity::from_hundredths(150); // 1.50
    /// // 3.33 × 1.50 = 4.995 → 5.00
    /// assert_eq!(price.extend(qty).cents(), 500);
    /// ```
    pub fn extend(&self, quantity: Quantity) -> Money {
        self.checked_extend(quantity)
            .unwrap_or(if self.is_negative() == quantity.is_negative() {
                Money(i64::MAX)
            } else {
                Money(i64::MIN)
            })
    }

    /// Like [`extend`](Self::extend), but `None` when the result does not fit.
    ///
    /// ```rust
    /// use shiftbook_core::money::Money;
    /// use shiftbook_core::quantity::Quantity;
    ///
    /// assert!(Money::from_cents(i64::MAX).checked_extend(Quantity::from_units(2)).is_none());
    /// ```
    pub fn checked_extend(&self, quantity: Quantity) -> Option<Money> {
        // i128 keeps large stock × large price from overflowing before rounding
        let raw = self.0 as i128 * quantity.hundredths() as i128;
        let rounded = if raw >= 0 {
            (raw + 50) / 100
        } else {
            (raw - 50) / 100
        };
        i64::try_from(rounded).ok().map(Money)
    }

    /// Subtraction that returns `None` on overflow.
    pub const fn checked_sub(self, other: Money) -> Option<Money> {
        match self.0.checked_sub(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }
}

/// Parses prices such as `"9"`, `"9.5"`, `"12.99"`.
///
/// Uses the same grammar as [`Quantity`]; negative prices are rejected.
impl FromStr for Money {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parsed: Quantity = s.parse().map_err(|_| ValidationError::InvalidFormat {
            field: "price".to_string(),
            reason: "must be a decimal number with at most two decimal places".to_string(),
        })?;
        if parsed.is_negative() {
            return Err(ValidationError::MustBeNonNegative {
                field: "price".to_string(),
            });
        }
        Ok(Money(parsed.hundredths()))
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
