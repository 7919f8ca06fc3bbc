//! # bookcart-sync: Cart & Wishlist State Synchronization
//!
//! Keeps the locally held cart and wishlist in step with the authoritative
//! remote store, guards against duplicate in-flight mutations on the same
//! book, and submits orders at checkout.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Storefront Sync Architecture                       │
//! │                                                                         │
//! │   Cart view          Wishlist view          Checkout view              │
//! │       │                    │                      │                     │
//! │       ▼                    ▼                      ▼                     │
//! │  ┌──────────┐       ┌──────────────┐       ┌────────────┐              │
//! │  │CartStore │◄──────│WishlistStore │       │  Checkout  │              │
//! │  │          │ move  │              │       │            │              │
//! │  └────┬─────┘       └──────┬───────┘       └─────┬──────┘              │
//! │       │   PendingGuard     │                     │ resets cart          │
//! │       │   (per book+kind)  │                     │ on success           │
//! │       └────────────────────┼─────────────────────┘                      │
//! │                            ▼                                            │
//! │                 ┌─────────────────────┐                                 │
//! │                 │  dyn RemoteStore    │  HTTP client, or InMemoryRemote │
//! │                 └─────────────────────┘                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Commit Model
//! Local state changes only after the remote store confirms a mutation.
//! A failed call leaves the collection exactly as it was; there is nothing
//! to roll back.
//!
//! ## Example
//! ```rust,ignore
//! let config = StorefrontConfig::load_or_default(None);
//! let cart = Arc::new(CartStore::with_policy(remote.clone(), config.reentrancy()));
//!
//! cart.add(&BookId::from("b1"), 2, Some(snapshot)).await?;
//! let view = cart.view(&config.fee_schedule());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod checkout;
pub mod client;
pub mod config;
pub mod error;
pub mod memory;
pub mod pending;
pub mod wishlist;

#[cfg(test)]
mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use cart::{CartState, CartStore, CartView};
pub use checkout::{Checkout, CheckoutForm, CheckoutOutcome, InvalidationRules};
pub use client::{
    CartPayload, FailureCode, OrderAck, PlaceOrderRequest, RemoteFailure, RemoteResponse,
    RemoteStore, WishlistPayload,
};
pub use config::StorefrontConfig;
pub use error::{CheckoutError, ConfigError, ConfigResult, StoreError, StoreResult};
pub use memory::{InMemoryRemote, PlacedOrder};
pub use pending::{OperationKind, PendingOps, ReentrancyPolicy};
pub use wishlist::{WishlistState, WishlistStore, WishlistView};
