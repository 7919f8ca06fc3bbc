//! # Error Types
//!
//! Domain-specific error types for bookcart-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  bookcart-core errors (this file)                                      │
//! │  ├── CoreError        - Stock / quantity rule violations               │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  bookcart-sync errors (separate crate)                                 │
//! │  ├── StoreError       - Cart / wishlist operation failures             │
//! │  └── CheckoutError    - Order placement preconditions                  │
//! │                                                                         │
//! │  Flow: ValidationError → StoreError → view message                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations detected before any remote call is made.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The book's stock snapshot cannot cover the requested quantity.
    ///
    /// ## User Workflow
    /// ```text
    /// Quantity stepper: 5
    ///      │
    ///      ▼
    /// check_stock(book, 5): stock snapshot = 3
    ///      │
    ///      ▼
    /// InsufficientStock { title: "Dune", available: 3, requested: 5 }
    ///      │
    ///      ▼
    /// View shows: "Only 3 copies of Dune in stock", no remote call issued
    /// ```
    #[error("Insufficient stock for {title}: available {available}, requested {requested}")]
    InsufficientStock {
        title: String,
        available: i64,
        requested: i64,
    },

    /// Line quantity exceeds the per-line maximum.
    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g. whitespace inside an id).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
