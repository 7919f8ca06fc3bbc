//! # In-Memory Remote Store
//!
//! An authoritative [`RemoteStore`] living in process: a book catalog with
//! stock levels, one shopper's cart and wishlist, and the orders placed.
//! Used by the `simulate` binary and by end-to-end tests of the stores.
//!
//! ## Rules Enforced
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  add / update   book must be in the catalog   → "Book is not available" │
//! │                 cart quantity <= stock         → "Insufficient stock"    │
//! │  place_order    cart must not be empty         → "Cart is empty"         │
//! │                 every line within stock        → "Insufficient stock"    │
//! │                 on success: stock decremented, cart emptied             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use bookcart_core::{BookId, BookRef, CartItem};
use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::client::{
    CartPayload, FailureCode, OrderAck, PlaceOrderRequest, RemoteResponse, RemoteStore,
    WishlistPayload,
};

/// An order accepted by the in-memory store.
#[derive(Debug, Clone)]
pub struct PlacedOrder {
    pub order_id: String,
    pub request: PlaceOrderRequest,
    pub lines: Vec<CartItem>,
    pub placed_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Inventory {
    catalog: HashMap<BookId, BookRef>,
    cart: Vec<(BookId, i64)>,
    wishlist: Vec<BookId>,
    orders: Vec<PlacedOrder>,
}

impl Inventory {
    fn book(&self, book_id: &BookId) -> Result<&BookRef, RemoteResponse<()>> {
        self.catalog.get(book_id).ok_or_else(|| {
            RemoteResponse::failure_with_code("Book is not available", FailureCode::ItemUnavailable)
        })
    }

    fn ensure_stock(&self, book_id: &BookId, quantity: i64) -> Result<(), RemoteResponse<()>> {
        let book = self.book(book_id)?;
        if book.can_supply(quantity) {
            Ok(())
        } else {
            Err(RemoteResponse::failure_with_code(
                format!("Insufficient stock for {}", book.display_title()),
                FailureCode::InsufficientStock,
            ))
        }
    }

    fn cart_quantity(&self, book_id: &BookId) -> i64 {
        self.cart
            .iter()
            .find(|(id, _)| id == book_id)
            .map(|(_, qty)| *qty)
            .unwrap_or(0)
    }

    /// Cart lines carrying the current catalog snapshot of each book.
    fn cart_lines(&self) -> Vec<CartItem> {
        self.cart
            .iter()
            .map(|(id, qty)| {
                let book = self
                    .catalog
                    .get(id)
                    .cloned()
                    .unwrap_or_else(|| BookRef::stub(id.clone()));
                CartItem::new(book, *qty)
            })
            .collect()
    }
}

/// Thread-safe in-process remote store.
///
/// ## Usage
/// ```rust,ignore
/// let remote = Arc::new(InMemoryRemote::with_catalog(vec![
///     BookRef::new("b1", "Dune", Money::from_cents(2000), 4),
/// ]));
/// let cart = CartStore::new(remote.clone());
/// ```
#[derive(Debug, Default)]
pub struct InMemoryRemote {
    inventory: Mutex<Inventory>,
    latency: Option<Duration>,
}

impl InMemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_catalog(books: impl IntoIterator<Item = BookRef>) -> Self {
        let remote = Self::new();
        for book in books {
            remote.upsert_book(book);
        }
        remote
    }

    /// Delays every call by `latency`, so concurrent calls interleave.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Runs `f` with exclusive access to the inventory.
    fn with_inventory<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&mut Inventory) -> T,
    {
        let mut inventory = self.inventory.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut inventory)
    }

    async fn round_trip(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    // =========================================================================
    // Catalog Administration
    // =========================================================================

    pub fn upsert_book(&self, book: BookRef) {
        self.with_inventory(|inv| {
            inv.catalog.insert(book.id.clone(), book);
        });
    }

    /// Takes a book off sale; cart lines referring to it stay until the
    /// next order attempt rejects them.
    pub fn withdraw_book(&self, book_id: &BookId) {
        self.with_inventory(|inv| {
            inv.catalog.remove(book_id);
        });
    }

    pub fn set_stock(&self, book_id: &BookId, stock: i64) {
        self.with_inventory(|inv| {
            if let Some(book) = inv.catalog.get_mut(book_id) {
                book.stock_quantity = Some(stock);
            }
        });
    }

    pub fn stock(&self, book_id: &BookId) -> Option<i64> {
        self.with_inventory(|inv| inv.catalog.get(book_id).and_then(|b| b.stock_quantity))
    }

    /// Catalog snapshot of a book, as a book page would hold it.
    pub fn book(&self, book_id: &BookId) -> Option<BookRef> {
        self.with_inventory(|inv| inv.catalog.get(book_id).cloned())
    }

    pub fn orders(&self) -> Vec<PlacedOrder> {
        self.with_inventory(|inv| inv.orders.clone())
    }
}

#[async_trait]
impl RemoteStore for InMemoryRemote {
    async fn fetch_cart(&self) -> RemoteResponse<CartPayload> {
        self.round_trip().await;
        let cart = self.with_inventory(|inv| inv.cart_lines());
        RemoteResponse::ok(CartPayload { cart })
    }

    async fn add_to_cart(&self, book_id: &BookId, quantity: i64) -> RemoteResponse<()> {
        self.round_trip().await;
        let result = self.with_inventory(|inv| {
            let total = inv.cart_quantity(book_id) + quantity;
            inv.ensure_stock(book_id, total)?;
            match inv.cart.iter_mut().find(|(id, _)| id == book_id) {
                Some((_, qty)) => *qty = total,
                None => inv.cart.push((book_id.clone(), quantity)),
            }
            Ok(total)
        });

        match result {
            Ok(total) => {
                debug!(book_id = %book_id, quantity = total, "Remote cart line stored");
                RemoteResponse::ack().with_message("Added to cart")
            }
            Err(failure) => failure,
        }
    }

    async fn update_cart_quantity(&self, book_id: &BookId, quantity: i64) -> RemoteResponse<()> {
        self.round_trip().await;
        let result = self.with_inventory(|inv| {
            inv.ensure_stock(book_id, quantity)?;
            match inv.cart.iter_mut().find(|(id, _)| id == book_id) {
                Some((_, qty)) => {
                    *qty = quantity;
                    Ok(())
                }
                None => Err(RemoteResponse::failure("Item not found in cart")),
            }
        });

        match result {
            Ok(()) => RemoteResponse::ack().with_message("Cart updated"),
            Err(failure) => failure,
        }
    }

    async fn remove_from_cart(&self, book_id: &BookId) -> RemoteResponse<()> {
        self.round_trip().await;
        self.with_inventory(|inv| inv.cart.retain(|(id, _)| id != book_id));
        RemoteResponse::ack().with_message("Removed from cart")
    }

    async fn fetch_wishlist(&self) -> RemoteResponse<WishlistPayload> {
        self.round_trip().await;
        let wishlist = self.with_inventory(|inv| {
            inv.wishlist
                .iter()
                .filter_map(|id| inv.catalog.get(id).cloned())
                .collect()
        });
        RemoteResponse::ok(WishlistPayload { wishlist })
    }

    async fn add_to_wishlist(&self, book_id: &BookId) -> RemoteResponse<()> {
        self.round_trip().await;
        let result = self.with_inventory(|inv| {
            inv.book(book_id)?;
            if !inv.wishlist.contains(book_id) {
                inv.wishlist.push(book_id.clone());
            }
            Ok(())
        });

        match result {
            Ok(()) => RemoteResponse::ack().with_message("Added to wishlist"),
            Err(failure) => failure,
        }
    }

    async fn remove_from_wishlist(&self, book_id: &BookId) -> RemoteResponse<()> {
        self.round_trip().await;
        self.with_inventory(|inv| inv.wishlist.retain(|id| id != book_id));
        RemoteResponse::ack().with_message("Removed from wishlist")
    }

    async fn place_order(&self, request: &PlaceOrderRequest) -> RemoteResponse<OrderAck> {
        self.round_trip().await;
        self.with_inventory(|inv| {
            if inv.cart.is_empty() {
                return RemoteResponse::failure_with_code("Cart is empty", FailureCode::CartEmpty);
            }

            for (book_id, qty) in &inv.cart {
                if let Err(failure) = inv.ensure_stock(book_id, *qty) {
                    return RemoteResponse {
                        success: false,
                        message: failure.message,
                        code: failure.code,
                        data: None,
                    };
                }
            }

            let lines = inv.cart_lines();
            for (book_id, qty) in std::mem::take(&mut inv.cart) {
                if let Some(stock) = inv
                    .catalog
                    .get_mut(&book_id)
                    .and_then(|b| b.stock_quantity.as_mut())
                {
                    *stock -= qty;
                }
            }

            let order_id = Uuid::new_v4().to_string();
            debug!(order_id = %order_id, lines = lines.len(), "Remote order accepted");
            inv.orders.push(PlacedOrder {
                order_id: order_id.clone(),
                request: request.clone(),
                lines,
                placed_at: Utc::now(),
            });

            RemoteResponse::ok(OrderAck {
                order_id: Some(order_id),
            })
            .with_message("Order placed")
        })
    }
}
