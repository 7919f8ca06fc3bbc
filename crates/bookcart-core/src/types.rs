//! # Domain Types
//!
//! Core domain types shared by the cart, wishlist and checkout.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    BookRef      │   │    CartItem     │   │  PaymentMethod  │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (BookId)    │◄──│  book           │   │  CashOnDelivery │       │
//! │  │  title?         │   │  quantity >= 1  │   │  Card           │       │
//! │  │  price?         │   └─────────────────┘   │  Wallet         │       │
//! │  │  stock_quantity?│                         └─────────────────┘       │
//! │  └─────────────────┘                                                   │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    TaxRate      │   │   FetchStatus   │   │   AddressId     │       │
//! │  │  bps (u32)      │   │  Idle/Loading/  │   │  (opaque)       │       │
//! │  │  200 = 2%       │   │  Loaded/Failed  │   │                 │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pattern
//! A `BookRef` is a copy of the catalog entry taken when the book entered the
//! cart or wishlist. Every field except `id` is optional because the remote
//! store may acknowledge an add without returning book data, in which case
//! the line carries a bare `{id}` stub.

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// 1 basis point = 0.01%, so 200 bps = 2%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Creates a tax rate from a fraction (`0.02` → 200 bps).
    pub fn from_fraction(fraction: f64) -> Self {
        TaxRate((fraction * 10_000.0).round() as u32)
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

// =============================================================================
// Identifiers
// =============================================================================

/// Identifier of a book in the remote catalog.
///
/// Also the key under which cart lines, wishlist entries and pending
/// operations are tracked.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(transparent)]
pub struct BookId(String);

impl BookId {
    pub fn new(id: impl Into<String>) -> Self {
        BookId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BookId {
    fn from(id: &str) -> Self {
        BookId(id.to_string())
    }
}

impl From<String> for BookId {
    fn from(id: String) -> Self {
        BookId(id)
    }
}

/// Identifier of a saved shipping address (owned by the address book service).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(transparent)]
pub struct AddressId(String);

impl AddressId {
    pub fn new(id: impl Into<String>) -> Self {
        AddressId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AddressId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Book Snapshot
// =============================================================================

/// A frozen copy of a catalog book as seen by the cart or wishlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct BookRef {
    /// Catalog identifier.
    pub id: BookId,

    /// Display title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub author: Option<String>,

    /// Unit price in cents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub price: Option<Money>,

    /// Stock level at snapshot time. `None` means unknown.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub stock_quantity: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub image_url: Option<String>,
}

impl BookRef {
    /// Creates a snapshot with the fields the totals and stock checks rely on.
    pub fn new(
        id: impl Into<BookId>,
        title: impl Into<String>,
        price: Money,
        stock_quantity: i64,
    ) -> Self {
        BookRef {
            id: id.into(),
            title: Some(title.into()),
            author: None,
            price: Some(price),
            stock_quantity: Some(stock_quantity),
            image_url: None,
        }
    }

    /// Creates the degenerate `{id}`-only stub.
    ///
    /// Inserted when the remote acknowledges an add but the caller supplied
    /// no snapshot. It prices at zero in every total.
    pub fn stub(id: impl Into<BookId>) -> Self {
        BookRef {
            id: id.into(),
            title: None,
            author: None,
            price: None,
            stock_quantity: None,
            image_url: None,
        }
    }

    /// True for a snapshot carrying nothing but the id.
    pub fn is_stub(&self) -> bool {
        self.title.is_none() && self.price.is_none() && self.stock_quantity.is_none()
    }

    /// Unit price, with a missing price counted as zero.
    #[inline]
    pub fn price_or_zero(&self) -> Money {
        self.price.unwrap_or_default()
    }

    /// True when the snapshot says the book has run out.
    pub fn is_out_of_stock(&self) -> bool {
        matches!(self.stock_quantity, Some(stock) if stock <= 0)
    }

    /// Checks whether the snapshot can cover `quantity` copies.
    ///
    /// Unknown stock is treated as sufficient; the remote store stays
    /// authoritative.
    pub fn can_supply(&self, quantity: i64) -> bool {
        match self.stock_quantity {
            Some(stock) => stock >= quantity,
            None => true,
        }
    }

    /// Title for messages, falling back to the id for stubs.
    pub fn display_title(&self) -> String {
        self.title
            .clone()
            .unwrap_or_else(|| self.id.to_string())
    }
}

// =============================================================================
// Cart Item
// =============================================================================

/// One cart line: a book snapshot and how many copies.
///
/// ## Invariants
/// - `quantity >= 1`
/// - At most one line per `book.id` (enforced by the cart store)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartItem {
    pub book: BookRef,
    pub quantity: i64,
}

impl CartItem {
    pub fn new(book: BookRef, quantity: i64) -> Self {
        CartItem { book, quantity }
    }

    #[inline]
    pub fn book_id(&self) -> &BookId {
        &self.book.id
    }

    /// Unit price × quantity, pricing a missing price at zero.
    pub fn line_total(&self) -> Money {
        self.book.price_or_zero().multiply_quantity(self.quantity)
    }
}

// =============================================================================
// Payment Method
// =============================================================================

/// Payment method chosen on the checkout view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Pay the courier on delivery.
    CashOnDelivery,
    /// Saved or newly entered card.
    Card,
    /// Marketplace wallet balance.
    Wallet,
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentMethod::CashOnDelivery => write!(f, "cash_on_delivery"),
            PaymentMethod::Card => write!(f, "card"),
            PaymentMethod::Wallet => write!(f, "wallet"),
        }
    }
}

// =============================================================================
// Fetch Status
// =============================================================================

/// Progress of the most recent full fetch of a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum FetchStatus {
    /// Nothing fetched since session start or the last reset.
    #[default]
    Idle,
    Loading,
    Loaded,
    Failed,
}

// =============================================================================
// Unit Tests
// =============================================================================
