//! # bookcart-core: Pure Storefront Domain
//!
//! Types and pure functions shared by the cart view, the wishlist view and
//! the checkout view. No I/O and no async.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Storefront Client Architecture                      │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Views (cart, wishlist, checkout)                   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ snapshots + totals                     │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │   bookcart-sync: CartStore, WishlistStore, Checkout, pending   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ bookcart-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │  totals   │  │ validation│  │   │
//! │  │   │  BookRef  │  │   Money   │  │FeeSchedule│  │  quantity │  │   │
//! │  │   │  CartItem │  │  TaxRate  │  │OrderTotals│  │   stock   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO NETWORK • PURE FUNCTIONS                          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Book snapshots, cart lines, identifiers
//! - [`money`] - Money type with integer arithmetic
//! - [`totals`] - Subtotal / shipping / tax / total derivation
//! - [`validation`] - Quantity, id and stock checks
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use bookcart_core::{calculate_totals, BookRef, CartItem, FeeSchedule, Money};
//!
//! let items = vec![CartItem::new(BookRef::new("b2", "Emma", Money::from_cents(1000), 4), 1)];
//! let totals = calculate_totals(&items, &FeeSchedule::default());
//!
//! assert_eq!(totals.shipping.cents(), 10000); // below the $35 threshold
//! assert_eq!(totals.total.cents(), 11020);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod totals;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use totals::{amount_until_free_shipping, calculate_totals, FeeSchedule, OrderTotals};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum quantity of a single cart line.
///
/// Guards against typing 1000 instead of 10 in the quantity field.
pub const MAX_ITEM_QUANTITY: i64 = 999;
