//! # Money Module
//!
//! Provides the `Money` type for every price, fee and total in the storefront.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  Cart view (float):      40.00 * 0.02 + 40.00 = 40.800000000000004     │
//! │  Checkout view (float):  may round differently → totals disagree        │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    subtotal 4000 + shipping 0 + tax 80 = 4080 cents, exactly            │
//! │    Both views compute the same integer, so they always agree            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use bookcart_core::money::Money;
//!
//! let price = Money::from_major_minor(19, 99); // $19.99
//! let line = price * 2;                        // $39.98
//! assert_eq!(line.cents(), 3998);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub};
use ts_rs::TS;

use crate::types::TaxRate;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents).
///
/// ## Where Money Flows
/// ```text
/// BookRef.price ──► CartItem.line_total ──► OrderTotals.subtotal
///                                                  │
///                      FeeSchedule.shipping_fee ───┼──► OrderTotals.total
///                      FeeSchedule.tax_rate ───────┘
/// ```
///
/// Serialized as a bare integer number of cents.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    ///
    /// ## Example
    /// ```rust
    /// use bookcart_core::money::Money;
    ///
    /// let fee = Money::from_cents(10000); // $100.00
    /// assert_eq!(fee.cents(), 10000);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from major and minor units (dollars and cents).
    ///
    /// For negative amounts only the major unit carries the sign:
    /// `from_major_minor(-5, 50)` is -$5.50.
    ///
    /// ## Example
    /// ```rust
    /// use bookcart_core::money::Money;
    ///
    /// assert_eq!(Money::from_major_minor(35, 0).cents(), 3500);
    /// assert_eq!(Money::from_major_minor(-5, 50).cents(), -550);
    /// ```
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit (dollars) portion.
    #[inline]
    pub const fn dollars(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Zero money.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Calculates tax on this amount.
    ///
    /// Integer math with round-half-up: `(amount * bps + 5000) / 10000`.
    ///
    /// ## Example
    /// ```rust
    /// use bookcart_core::money::Money;
    /// use bookcart_core::types::TaxRate;
    ///
    /// let subtotal = Money::from_cents(4000); // $40.00
    /// let tax = subtotal.calculate_tax(TaxRate::from_bps(200)); // 2%
    /// assert_eq!(tax.cents(), 80); // $0.80
    /// ```
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        // i128 keeps large carts from overflowing before the division
        let tax_cents = (self.0 as i128 * rate.bps() as i128 + 5000) / 10000;
        Money::from_cents(tax_cents.clamp(i64::MIN as i128, i64::MAX as i128) as i64)
    }

    /// Multiplies a unit price by a line quantity, saturating at the `i64`
    /// bounds.
    ///
    /// ## Example
    /// ```rust
    /// use bookcart_core::money::Money;
    ///
    /// let unit = Money::from_cents(2000);
    /// assert_eq!(unit.multiply_quantity(2).cents(), 4000);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0.saturating_mul(qty))
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Debug-oriented display (`$40.80`); the views own localized formatting.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{}${}.{:02}",
            sign,
            self.dollars().abs(),
            self.cents_part()
        )
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
        Money(self.0.saturating_add(other.0))
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_add(other.0);
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0.saturating_sub(other.0))
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        self.multiply_quantity(qty)
    }
}

/// Summing line totals into a subtotal.
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
        assert_eq!(money.dollars(), 10);
        assert_eq!(money.cents_part(), 99);
    }

    #[test]
    fn test_from_major_minor() {
        assert_eq!(Money::from_major_minor(35, 0).cents(), 3500);
        assert_eq!(Money::from_major_minor(110, 20).cents(), 11020);
        assert_eq!(Money::from_major_minor(-5, 50).cents(), -550);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(4080).to_string(), "$40.80");
        assert_eq!(Money::from_cents(10000).to_string(), "$100.00");
        assert_eq!(Money::from_cents(-550).to_string(), "-$5.50");
        assert_eq!(Money::zero().to_string(), "$0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((a * 3).cents(), 3000);

        let mut c = a;
        c += b;
        assert_eq!(c.cents(), 1500);
    }

    #[test]
    fn test_sum_of_lines() {
        let lines = [Money::from_cents(4000), Money::from_cents(1000), Money::zero()];
        let subtotal: Money = lines.into_iter().sum();
        assert_eq!(subtotal.cents(), 5000);

        let empty: Money = std::iter::empty().sum();
        assert!(empty.is_zero());
    }

    #[test]
    fn test_tax_two_percent() {
        let rate = TaxRate::from_bps(200);
        assert_eq!(Money::from_cents(4000).calculate_tax(rate).cents(), 80);
        assert_eq!(Money::from_cents(1000).calculate_tax(rate).cents(), 20);
        assert_eq!(Money::zero().calculate_tax(rate).cents(), 0);
    }

    #[test]
    fn test_tax_rounds_half_up() {
        // $0.25 at 2% = 0.5 cents → 1 cent
        let tax = Money::from_cents(25).calculate_tax(TaxRate::from_bps(200));
        assert_eq!(tax.cents(), 1);

        // $0.24 at 2% = 0.48 cents → 0 cents
        let tax = Money::from_cents(24).calculate_tax(TaxRate::from_bps(200));
        assert_eq!(tax.cents(), 0);
    }

    #[test]
    fn test_multiply_quantity() {
        let unit_price = Money::from_cents(299);
        assert_eq!(unit_price.multiply_quantity(3).cents(), 897);
    }

    #[test]
    fn test_arithmetic_saturates() {
        let unit = Money::from_cents(2000);
        assert_eq!(unit.multiply_quantity(i64::MAX / 1000).cents(), i64::MAX);
        assert_eq!((unit * i64::MAX).cents(), i64::MAX);

        let big = Money::from_cents(i64::MAX);
        assert_eq!((big + unit).cents(), i64::MAX);
        assert_eq!((Money::from_cents(i64::MIN) - unit).cents(), i64::MIN);

        let subtotal: Money = [big, unit, unit].into_iter().sum();
        assert_eq!(subtotal.cents(), i64::MAX);

        let mut acc = big;
        acc += unit;
        assert_eq!(acc.cents(), i64::MAX);
    }

    #[test]
    fn test_serializes_as_cents() {
        let json = serde_json::to_string(&Money::from_cents(1999)).unwrap();
        assert_eq!(json, "1999");
        let back: Money = serde_json::from_str("1999").unwrap();
        assert_eq!(back, Money::from_cents(1999));
    }
}
