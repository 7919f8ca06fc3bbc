//! # Sync Error Types
//!
//! Error types for store operations, checkout and configuration.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sync Error Categories                             │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │   StoreError    │  │  CheckoutError  │  │     ConfigError         │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  Remote         │  │  MissingPayment │  │  Io                     │ │
//! │  │  OperationIn... │  │  MissingAddress │  │  Parse / Serialize      │ │
//! │  │  NotInWishlist  │  │  EmptyCart      │  │  Invalid                │ │
//! │  │  Validation     │  │  OutOfStock     │  │                         │ │
//! │  │  Protocol       │  │  AlreadySubmit. │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every failure stops at the store or checkout boundary as one of these
//! values; the views show `to_string()` and unlock the control.

use bookcart_core::{BookId, ValidationError};
use thiserror::Error;

use crate::client::{FailureCode, RemoteFailure};
use crate::pending::OperationKind;

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// Store Error
// =============================================================================

/// Failure of a cart or wishlist operation.
///
/// Whatever the variant, the operation's pending mark has been cleared and
/// the local item list is exactly as it was before the call.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The remote store answered `success: false` or could not be reached.
    #[error("{message}")]
    Remote {
        message: String,
        code: Option<FailureCode>,
    },

    /// Another call of the same kind is already in flight for this book.
    #[error("Another {kind} is already in progress for book {book_id}")]
    OperationInFlight { book_id: BookId, kind: OperationKind },

    /// The book to move is not in the wishlist.
    #[error("Book {book_id} is not in the wishlist")]
    NotInWishlist { book_id: BookId },

    /// Input rejected before any remote call.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The remote reported success but the payload was unusable.
    #[error("Unexpected response from remote store: {0}")]
    Protocol(String),
}

impl From<RemoteFailure> for StoreError {
    fn from(failure: RemoteFailure) -> Self {
        StoreError::Remote {
            message: failure.message,
            code: failure.code,
        }
    }
}

impl StoreError {
    /// True if the remote store itself rejected or failed the call.
    pub fn is_remote(&self) -> bool {
        matches!(self, StoreError::Remote { .. } | StoreError::Protocol(_))
    }

    /// True if the call was refused locally because of an in-flight twin.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::OperationInFlight { .. })
    }
}

// =============================================================================
// Checkout Error
// =============================================================================

/// Reasons an order cannot be submitted.
///
/// None of these issue a remote call.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CheckoutError {
    #[error("Please select a payment method")]
    MissingPaymentMethod,

    #[error("Please select a shipping address")]
    MissingAddress,

    #[error("Your cart is empty")]
    EmptyCart,

    /// One or more lines are out of stock according to their snapshots.
    #[error("Out of stock: {}", .titles.join(", "))]
    OutOfStock { titles: Vec<String> },

    /// An order placement call from this checkout is still in flight.
    #[error("Order is already being placed")]
    AlreadySubmitting,
}

// =============================================================================
// Config Error
// =============================================================================

/// Failure to load, validate or save [`StorefrontConfig`](crate::config::StorefrontConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to save config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid storefront configuration: {0}")]
    Invalid(String),
}

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_failure_keeps_message() {
        let err: StoreError = RemoteFailure {
            message: "Insufficient stock".into(),
            code: Some(FailureCode::InsufficientStock),
        }
        .into();
        assert_eq!(err.to_string(), "Insufficient stock");
        assert!(err.is_remote());
        assert!(!err.is_conflict());
    }

    #[test]
    fn test_in_flight_display() {
        let err = StoreError::OperationInFlight {
            book_id: BookId::from("b1"),
            kind: OperationKind::Update,
        };
        assert_eq!(err.to_string(), "Another update is already in progress for book b1");
        assert!(err.is_conflict());
    }

    #[test]
    fn test_out_of_stock_lists_titles() {
        let err = CheckoutError::OutOfStock {
            titles: vec!["Dune".into(), "Emma".into()],
        };
        assert_eq!(err.to_string(), "Out of stock: Dune, Emma");
    }

    #[test]
    fn test_validation_converts_to_store_error() {
        let err: StoreError = ValidationError::MustBePositive {
            field: "quantity".into(),
        }
        .into();
        assert!(matches!(err, StoreError::Validation(_)));
        assert!(!err.is_remote());
    }
}
