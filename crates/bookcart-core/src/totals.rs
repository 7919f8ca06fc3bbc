//! # Order Totals
//!
//! The one place subtotal, shipping, tax and total are derived.
//!
//! ## Formula
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  subtotal = Σ (price or 0) × quantity                                   │
//! │                                                                         │
//! │  shipping = 0             if cart is empty                              │
//! │           = 0             if subtotal >  threshold                      │
//! │           = shipping_fee  otherwise (including subtotal == threshold)   │
//! │                                                                         │
//! │  tax      = subtotal × tax_rate                                         │
//! │  total    = subtotal + shipping + tax                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Both the cart view and the checkout view call [`calculate_totals`] with
//! the same [`FeeSchedule`] instance taken from configuration.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{CartItem, TaxRate};

// =============================================================================
// Fee Schedule
// =============================================================================

/// Shipping and tax parameters applied to every order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct FeeSchedule {
    /// Orders strictly above this subtotal ship free.
    pub shipping_threshold: Money,

    /// Flat shipping fee charged at or below the threshold.
    pub shipping_fee: Money,

    pub tax_rate: TaxRate,
}

impl FeeSchedule {
    pub const fn new(shipping_threshold: Money, shipping_fee: Money, tax_rate: TaxRate) -> Self {
        FeeSchedule {
            shipping_threshold,
            shipping_fee,
            tax_rate,
        }
    }

    /// Shipping charged for a given subtotal on a non-empty cart.
    fn shipping_for(&self, subtotal: Money) -> Money {
        if subtotal > self.shipping_threshold {
            Money::zero()
        } else {
            self.shipping_fee
        }
    }
}

/// Threshold $35.00, fee $100.00, tax 2%.
impl Default for FeeSchedule {
    fn default() -> Self {
        FeeSchedule::new(
            Money::from_major_minor(35, 0),
            Money::from_major_minor(100, 0),
            TaxRate::from_bps(200),
        )
    }
}

// =============================================================================
// Order Totals
// =============================================================================

/// Derived order amounts. Never persisted; recomputed on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderTotals {
    pub subtotal: Money,
    pub shipping: Money,
    pub tax: Money,
    pub total: Money,
}

/// Derives order totals from cart lines and a fee schedule.
///
/// Lines whose book has no price (the `{id}` stub) contribute zero.
///
/// ## Example
/// ```rust
/// use bookcart_core::money::Money;
/// use bookcart_core::totals::{calculate_totals, FeeSchedule};
/// use bookcart_core::types::{BookRef, CartItem};
///
/// let items = vec![CartItem::new(
///     BookRef::new("b1", "Dune", Money::from_cents(2000), 5),
///     2,
/// )];
/// let totals = calculate_totals(&items, &FeeSchedule::default());
///
/// assert_eq!(totals.subtotal.cents(), 4000);
/// assert_eq!(totals.shipping.cents(), 0);
/// assert_eq!(totals.tax.cents(), 80);
/// assert_eq!(totals.total.cents(), 4080);
/// ```
pub fn calculate_totals(items: &[CartItem], fees: &FeeSchedule) -> OrderTotals {
    let subtotal: Money = items.iter().map(CartItem::line_total).sum();

    let shipping = if items.is_empty() {
        Money::zero()
    } else {
        fees.shipping_for(subtotal)
    };

    let tax = subtotal.calculate_tax(fees.tax_rate);

    OrderTotals {
        subtotal,
        shipping,
        tax,
        total: subtotal + shipping + tax,
    }
}

/// How much more the cart needs before shipping becomes free.
///
/// `None` when the cart is empty or already ships free. Uses the same strict
/// comparison as [`calculate_totals`], so a cart sitting exactly on the
/// threshold still needs one more cent.
pub fn amount_until_free_shipping(items: &[CartItem], fees: &FeeSchedule) -> Option<Money> {
    if items.is_empty() {
        return None;
    }

    let subtotal: Money = items.iter().map(CartItem::line_total).sum();
    if subtotal > fees.shipping_threshold {
        None
    } else {
        Some(fees.shipping_threshold - subtotal + Money::from_cents(1))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BookRef;

    fn line(id: &str, price_cents: i64, quantity: i64) -> CartItem {
        CartItem::new(
            BookRef::new(id, format!("Book {}", id), Money::from_cents(price_cents), 10),
            quantity,
        )
    }

    #[test]
    fn test_scenario_above_threshold_ships_free() {
        let totals = calculate_totals(&[line("b1", 2000, 2)], &FeeSchedule::default());

        assert_eq!(totals.subtotal.cents(), 4000);
        assert_eq!(totals.shipping.cents(), 0);
        assert_eq!(totals.tax.cents(), 80);
        assert_eq!(totals.total.cents(), 4080);
    }

    #[test]
    fn test_scenario_empty_cart() {
        let totals = calculate_totals(&[], &FeeSchedule::default());
        assert_eq!(totals, OrderTotals::default());
    }

    #[test]
    fn test_scenario_below_threshold_pays_fee() {
        let totals = calculate_totals(&[line("b2", 1000, 1)], &FeeSchedule::default());

        assert_eq!(totals.subtotal.cents(), 1000);
        assert_eq!(totals.shipping.cents(), 10000);
        assert_eq!(totals.tax.cents(), 20);
        assert_eq!(totals.total.cents(), 11020);
    }

    #[test]
    fn test_empty_cart_never_pays_shipping() {
        // Even a schedule where zero would not clear the threshold
        let fees = FeeSchedule::new(
            Money::from_cents(3500),
            Money::from_cents(99_999),
            TaxRate::from_bps(5000),
        );
        assert!(calculate_totals(&[], &fees).shipping.is_zero());

        let negative_threshold = FeeSchedule::new(
            Money::from_cents(-1),
            Money::from_cents(500),
            TaxRate::zero(),
        );
        assert!(calculate_totals(&[], &negative_threshold).shipping.is_zero());
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let fees = FeeSchedule::default();
        let totals = calculate_totals(&[line("b3", 3500, 1)], &fees);
        assert_eq!(totals.subtotal, fees.shipping_threshold);
        assert_eq!(totals.shipping, fees.shipping_fee);

        let just_over = calculate_totals(&[line("b3", 3501, 1)], &fees);
        assert!(just_over.shipping.is_zero());
    }

    #[test]
    fn test_above_threshold_always_free() {
        let fees = FeeSchedule::default();
        for cents in [3501, 3600, 10_000, 1_000_000] {
            let totals = calculate_totals(&[line("b4", cents, 1)], &fees);
            assert!(totals.shipping.is_zero(), "subtotal {} paid shipping", cents);
        }
    }

    #[test]
    fn test_total_is_exact_sum() {
        let fees = FeeSchedule::default();
        let carts = vec![
            vec![line("a", 1999, 3)],
            vec![line("a", 1, 1), line("b", 99, 7)],
            vec![line("a", 3333, 1), line("b", 1234, 2), line("c", 5, 100)],
        ];
        for items in carts {
            let t = calculate_totals(&items, &fees);
            assert_eq!(t.total, t.subtotal + t.shipping + t.tax);
        }
    }

    #[test]
    fn test_idempotent() {
        let items = vec![line("a", 1250, 2), line("b", 799, 1)];
        let fees = FeeSchedule::default();
        assert_eq!(calculate_totals(&items, &fees), calculate_totals(&items, &fees));
    }

    #[test]
    fn test_stub_line_counts_as_zero() {
        let items = vec![CartItem::new(BookRef::stub("b7"), 3)];
        let totals = calculate_totals(&items, &FeeSchedule::default());

        assert!(totals.subtotal.is_zero());
        // Non-empty cart with a zero subtotal still pays the fee
        assert_eq!(totals.shipping.cents(), 10000);
    }

    #[test]
    fn test_amount_until_free_shipping() {
        let fees = FeeSchedule::default();
        assert_eq!(amount_until_free_shipping(&[], &fees), None);
        assert_eq!(
            amount_until_free_shipping(&[line("a", 1000, 1)], &fees),
            Some(Money::from_cents(2501))
        );
        assert_eq!(
            amount_until_free_shipping(&[line("a", 3500, 1)], &fees),
            Some(Money::from_cents(1))
        );
        assert_eq!(amount_until_free_shipping(&[line("a", 2000, 2)], &fees), None);
    }
}
