//! # Validation Module
//!
//! Input checks the views and stores run before talking to the remote store.
//!
//! ## Validation Layers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Layer 1: View                                                          │
//! │  ├── check_stock() against the book snapshot (caller's responsibility) │
//! │  └── Disable controls while an operation is pending                    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Store                                                         │
//! │  └── validate_quantity(), validate_book_id()                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Remote store (authoritative)                                 │
//! │  └── Availability, real stock, cart emptiness                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The stores never check stock themselves; a stale snapshot must not block a
//! request the remote store would accept.

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::types::{BookId, BookRef};
use crate::MAX_ITEM_QUANTITY;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validates a line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed `MAX_ITEM_QUANTITY` (999)
///
/// ## Example
/// ```rust
/// use bookcart_core::validation::validate_quantity;
///
/// assert!(validate_quantity(1).is_ok());
/// assert!(validate_quantity(0).is_err());
/// ```
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a book id: non-empty and free of whitespace.
pub fn validate_book_id(id: &BookId) -> ValidationResult<()> {
    let raw = id.as_str();

    if raw.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "book id".to_string(),
        });
    }

    if raw.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidFormat {
            field: "book id".to_string(),
            reason: "must not contain whitespace".to_string(),
        });
    }

    Ok(())
}

/// Compares a requested quantity with the book's stock snapshot.
///
/// Called by views before `add` or `update_quantity`. Unknown stock passes.
///
/// ## Example
/// ```rust
/// use bookcart_core::money::Money;
/// use bookcart_core::types::BookRef;
/// use bookcart_core::validation::check_stock;
///
/// let book = BookRef::new("b1", "Dune", Money::from_cents(2000), 3);
/// assert!(check_stock(&book, 3).is_ok());
/// assert!(check_stock(&book, 4).is_err());
/// ```
pub fn check_stock(book: &BookRef, requested: i64) -> CoreResult<()> {
    if requested <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        }
        .into());
    }

    if requested > MAX_ITEM_QUANTITY {
        return Err(CoreError::QuantityTooLarge {
            requested,
            max: MAX_ITEM_QUANTITY,
        });
    }

    if !book.can_supply(requested) {
        return Err(CoreError::InsufficientStock {
            title: book.display_title(),
            available: book.stock_quantity.unwrap_or(0),
            requested,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_book_id() {
        assert!(validate_book_id(&BookId::from("b1")).is_ok());
        assert!(validate_book_id(&BookId::from("")).is_err());
        assert!(validate_book_id(&BookId::from("   ")).is_err());
        assert!(validate_book_id(&BookId::from("b 1")).is_err());
    }

    #[test]
    fn test_check_stock() {
        let book = BookRef::new("b1", "Dune", Money::from_cents(2000), 3);
        assert!(check_stock(&book, 1).is_ok());
        assert!(check_stock(&book, 3).is_ok());

        let err = check_stock(&book, 5).unwrap_err();
        assert!(matches!(
            err,
            CoreError::InsufficientStock {
                available: 3,
                requested: 5,
                ..
            }
        ));

        assert!(matches!(
            check_stock(&book, 0).unwrap_err(),
            CoreError::Validation(_)
        ));
        assert!(matches!(
            check_stock(&BookRef::stub("b7"), 1000).unwrap_err(),
            CoreError::QuantityTooLarge { max: 999, .. }
        ));
    }

    #[test]
    fn test_check_stock_unknown_passes() {
        assert!(check_stock(&BookRef::stub("b7"), 42).is_ok());
    }

    #[test]
    fn test_check_stock_sold_out() {
        let book = BookRef::new("b9", "Emma", Money::from_cents(900), 0);
        assert!(check_stock(&book, 1).is_err());
    }
}
