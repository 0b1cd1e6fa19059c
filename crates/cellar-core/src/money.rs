//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  80,000 JPY × 0.21 in floating point:                                   │
//! │    80000 * 0.21 = 16800.000000000004  ❌                                │
//! │                                                                         │
//! │  Import duty, alcohol tax and business tax are then stacked on top,     │
//! │  so the error leaks into the landed cost and the suggested price.       │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Minor Units                                      │
//! │    8,000,000 (JPY cents) × 210,000 µ-rate / 1,000,000 = 1,680,000       │
//! │    = NT$16,800.00 exactly, every rounding step explicit                 │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use cellar_core::money::Money;
//!
//! let bottle = Money::from_major_minor(1200, 0); // NT$1,200.00
//! let case = bottle * 6;
//! assert_eq!(case.cents(), 720_000);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use ts_rs::TS;

use crate::types::TaxRate;

// =============================================================================
// Rounding
// =============================================================================

/// Divides `numerator` by `denominator` rounding half away from zero.
///
/// Every rate application in this crate goes through here so a refund
/// (negative amount) rounds symmetrically with a sale.
pub(crate) fn div_round(numerator: i128, denominator: i128) -> i128 {
    let half = denominator / 2;
    if numerator >= 0 {
        (numerator + half) / denominator
    } else {
        (numerator - half) / denominator
    }
}

/// Divides rounding towards positive infinity (`denominator` > 0).
pub(crate) fn div_ceil(numerator: i128, denominator: i128) -> i128 {
    let quotient = numerator / denominator;
    if numerator % denominator > 0 {
        quotient + 1
    } else {
        quotient
    }
}

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in the smallest currency unit (cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: Negative values appear in commission deltas
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Currency-agnostic**: The source amount of an import is Money in the
///   source currency's cents; everything after conversion is TWD
///
/// ## Where Money Flows
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Import amount (JPY) ──► convert ──► base cost (TWD)                    │
/// │                                        │                                │
/// │                    duty / alcohol tax / business tax / fees             │
/// │                                        │                                │
/// │                                        ▼                                │
/// │                                  landed cost ──► suggested price        │
/// │                                                                         │
/// │  SaleItem.unit_price × qty ──► investor total ─┐                        │
/// │  SaleItem.actual_price × qty ──► actual total ─┴─► commission           │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use cellar_core::money::Money;
    ///
    /// let price = Money::from_cents(120_000); // NT$1,200.00
    /// assert_eq!(price.cents(), 120_000);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from major and minor units.
    ///
    /// ## Example
    /// ```rust
    /// use cellar_core::money::Money;
    ///
    /// let price = Money::from_major_minor(75, 60);
    /// assert_eq!(price.cents(), 7560);
    ///
    /// let negative = Money::from_major_minor(-5, 50);
    /// assert_eq!(negative.cents(), -550);
    /// ```
    ///
    /// ## Note
    /// For negative amounts, only the major unit should be negative.
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Returns the value in cents (smallest currency unit).
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion (dollars, yen, ...).
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn minor_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Applies a rate in basis points, rounding half away from zero.
    ///
    /// ## Example
    /// ```rust
    /// use cellar_core::money::Money;
    /// use cellar_core::types::TaxRate;
    ///
    /// let dutiable = Money::from_cents(1_680_000); // NT$16,800.00
    /// let fee = dutiable.apply_rate(TaxRate::from_bps(4)); // 0.04%
    /// assert_eq!(fee.cents(), 672);
    /// ```
    ///
    /// ## Implementation
    /// `amount × bps / 10000` computed in i128 so that large shipments
    /// cannot overflow.
    pub fn apply_rate(&self, rate: TaxRate) -> Money {
        let cents = div_round(self.0 as i128 * rate.bps() as i128, 10_000);
        Money::from_cents(cents as i64)
    }

    /// Multiplies money by a quantity.
    ///
    /// ## Example
    /// ```rust
    /// use cellar_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(50_000);
    /// assert_eq!(unit_price.multiply_quantity(2).cents(), 100_000);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Multiplies by a quantity, returning `None` on overflow.
    #[inline]
    pub fn checked_multiply_quantity(&self, qty: i64) -> Option<Self> {
        self.0.checked_mul(qty).map(Money)
    }

    /// Adds two amounts, returning `None` on overflow.
    #[inline]
    pub fn checked_add(&self, other: Money) -> Option<Self> {
        self.0.checked_add(other.0).map(Money)
    }

    /// Rounds up to the next whole major unit (NT$29,755.74 → NT$29,756.00).
    ///
    /// Shelf prices are quoted in whole dollars.
    pub fn round_up_to_major(&self) -> Money {
        Money::from_cents((div_ceil(self.0 as i128, 100) * 100) as i64)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Shows the amount as `major.minor` without a currency symbol.
///
/// Use [`crate::currency::Currency::format`] when the currency is known.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.major().abs(), self.minor_part())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
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

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

/// Multiplication by i64 (for quantity calculations).
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
        assert_eq!(money.major(), 10);
        assert_eq!(money.minor_part(), 99);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(1_680_000).to_string(), "16800.00");
        assert_eq!(Money::from_cents(7560).to_string(), "75.60");
        assert_eq!(Money::from_cents(-550).to_string(), "-5.50");
        assert_eq!(Money::zero().to_string(), "0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((b - a).cents(), -500);
        assert_eq!((-a).cents(), -1000);
        assert_eq!((a * 3).cents(), 3000);
    }

    #[test]
    fn test_sum() {
        let total: Money = [100, 200, 300].into_iter().map(Money::from_cents).sum();
        assert_eq!(total.cents(), 600);
    }

    #[test]
    fn test_apply_rate_rounds_half_away_from_zero() {
        // 1000 × 8.25% = 82.5 → 83
        assert_eq!(Money::from_cents(1000).apply_rate(TaxRate::from_bps(825)).cents(), 83);
        // -1000 × 8.25% = -82.5 → -83
        assert_eq!(Money::from_cents(-1000).apply_rate(TaxRate::from_bps(825)).cents(), -83);
        // 2,023,560 × 5% = 101,178.0
        assert_eq!(
            Money::from_cents(2_023_560).apply_rate(TaxRate::from_bps(500)).cents(),
            101_178
        );
    }

    #[test]
    fn test_apply_rate_large_amount_does_not_overflow() {
        let container = Money::from_cents(i64::MAX / 20_000);
        let duty = container.apply_rate(TaxRate::from_bps(2000));
        assert!(duty.is_positive());
    }

    #[test]
    fn test_round_up_to_major() {
        assert_eq!(Money::from_cents(2_975_574).round_up_to_major().cents(), 2_975_600);
        assert_eq!(Money::from_cents(2_975_600).round_up_to_major().cents(), 2_975_600);
        assert_eq!(Money::from_cents(1).round_up_to_major().cents(), 100);
        assert_eq!(Money::zero().round_up_to_major().cents(), 0);
    }

    #[test]
    fn test_checked_multiply_quantity() {
        assert_eq!(
            Money::from_cents(250).checked_multiply_quantity(4),
            Some(Money::from_cents(1000))
        );
        assert_eq!(Money::from_cents(i64::MAX).checked_multiply_quantity(2), None);
    }

    #[test]
    fn test_zero_and_checks() {
        let zero = Money::zero();
        assert!(zero.is_zero());
        assert!(!zero.is_positive());
        assert!(!zero.is_negative());

        let negative = Money::from_cents(-100);
        assert!(negative.is_negative());
        assert_eq!(negative.abs().cents(), 100);
    }
}
