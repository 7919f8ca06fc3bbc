//! # Remote Store Client
//!
//! The seam between the local stores and the authoritative remote store.
//!
//! ## Response Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Every call resolves to the same envelope:                              │
//! │                                                                         │
//! │  { "success": true,  "data": { "cart": [ ... ] } }                      │
//! │  { "success": true,  "message": "Added to cart" }                       │
//! │  { "success": false, "message": "Insufficient stock",                   │
//! │                      "code": "insufficient_stock" }                     │
//! │                                                                         │
//! │  `code` is optional; older servers send only `message`.                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Transport mechanics (HTTP, auth headers, retries) live in the
//! implementation of [`RemoteStore`]; a transport failure is reported as an
//! envelope with `success: false`. Cart and wishlist fetches are separate
//! methods even when one endpoint serves both.

use async_trait::async_trait;
use bookcart_core::{AddressId, BookId, BookRef, CartItem, PaymentMethod};
use serde::{Deserialize, Serialize};

// =============================================================================
// Response Envelope
// =============================================================================

/// Machine-readable failure reason, when the remote store supplies one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCode {
    CartEmpty,
    ItemUnavailable,
    InsufficientStock,
    /// Any code this client does not know about.
    #[serde(other)]
    Unknown,
}

/// The uniform `{success, message?, code?, data?}` result of every call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteResponse<T> {
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<FailureCode>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

/// A `success: false` envelope, reduced to what callers act on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFailure {
    pub message: String,
    pub code: Option<FailureCode>,
}

impl<T> RemoteResponse<T> {
    /// Successful response carrying data.
    pub fn ok(data: T) -> Self {
        RemoteResponse {
            success: true,
            message: None,
            code: None,
            data: Some(data),
        }
    }

    /// Failed response with a human-readable message.
    pub fn failure(message: impl Into<String>) -> Self {
        RemoteResponse {
            success: false,
            message: Some(message.into()),
            code: None,
            data: None,
        }
    }

    /// Failed response with a message and a structured code.
    pub fn failure_with_code(message: impl Into<String>, code: FailureCode) -> Self {
        RemoteResponse {
            code: Some(code),
            ..Self::failure(message)
        }
    }

    /// Attaches a message to a successful response.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Splits the envelope into data or a failure.
    ///
    /// A failure without a message gets a generic one so views always have
    /// something to show.
    pub fn into_result(self) -> Result<Option<T>, RemoteFailure> {
        if self.success {
            Ok(self.data)
        } else {
            Err(RemoteFailure {
                message: self
                    .message
                    .unwrap_or_else(|| "Request to remote store failed".to_string()),
                code: self.code,
            })
        }
    }
}

impl RemoteResponse<()> {
    /// Successful acknowledgement with no payload.
    pub fn ack() -> Self {
        RemoteResponse {
            success: true,
            message: None,
            code: None,
            data: None,
        }
    }
}

// =============================================================================
// Payloads
// =============================================================================

/// Data of a successful `fetch_cart`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CartPayload {
    pub cart: Vec<CartItem>,
}

/// Data of a successful `fetch_wishlist`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WishlistPayload {
    pub wishlist: Vec<BookRef>,
}

/// Body of an order placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    pub address_id: AddressId,
    pub payment_method: PaymentMethod,
}

/// Data of a successful order placement.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderAck {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
}

// =============================================================================
// Remote Store Trait
// =============================================================================

/// Operations the stores and checkout need from the remote store.
///
/// Implementations must be cheap to share (`Arc`) and safe to call
/// concurrently; the stores issue calls for different books in parallel.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn fetch_cart(&self) -> RemoteResponse<CartPayload>;

    async fn add_to_cart(&self, book_id: &BookId, quantity: i64) -> RemoteResponse<()>;

    /// Sets the absolute quantity of a line.
    async fn update_cart_quantity(&self, book_id: &BookId, quantity: i64) -> RemoteResponse<()>;

    async fn remove_from_cart(&self, book_id: &BookId) -> RemoteResponse<()>;

    async fn fetch_wishlist(&self) -> RemoteResponse<WishlistPayload>;

    async fn add_to_wishlist(&self, book_id: &BookId) -> RemoteResponse<()>;

    async fn remove_from_wishlist(&self, book_id: &BookId) -> RemoteResponse<()>;

    async fn place_order(&self, request: &PlaceOrderRequest) -> RemoteResponse<OrderAck>;
}
