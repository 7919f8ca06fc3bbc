//! # Checkout
//!
//! Assembles an order from the cart and the checkout form, submits it once,
//! and decides what happens to the cart afterwards.
//!
//! ## Order Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  place_order(form)                                                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  preflight ── payment? ── address? ── subtotal > 0? ── in stock? ──┐    │
//! │       │ any check fails: CheckoutError, no remote call             │    │
//! │       ▼                                                            │    │
//! │  remote.place_order({addressId, paymentMethod}) ◄──────────────────┘    │
//! │       │                                                                 │
//! │       ├── success ─────────────────► reset cart ──► Placed             │
//! │       ├── failure, cart invalidated ► reset cart ──► CartInvalidated    │
//! │       └── other failure ──────────► keep cart ───► Rejected            │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The wishlist is never touched by checkout.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bookcart_core::{calculate_totals, AddressId, FeeSchedule, OrderTotals, PaymentMethod};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cart::CartStore;
use crate::client::{FailureCode, OrderAck, PlaceOrderRequest, RemoteFailure, RemoteStore};
use crate::error::CheckoutError;

// =============================================================================
// Form & Outcome
// =============================================================================

/// Selections made on the checkout view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutForm {
    pub address_id: Option<AddressId>,
    pub payment_method: Option<PaymentMethod>,
}

impl CheckoutForm {
    pub fn new(address_id: AddressId, payment_method: PaymentMethod) -> Self {
        CheckoutForm {
            address_id: Some(address_id),
            payment_method: Some(payment_method),
        }
    }
}

/// Result of a submitted order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CheckoutOutcome {
    /// Order accepted; the cart has been cleared.
    Placed { ack: OrderAck },

    /// Order refused because the cart no longer matches the remote store;
    /// the cart has been cleared so it is refetched.
    CartInvalidated { message: String },

    /// Order refused for any other reason; the cart is unchanged.
    Rejected { message: String },
}

impl CheckoutOutcome {
    /// True if the view should navigate back to the cart.
    pub fn returns_to_cart(&self) -> bool {
        !matches!(self, CheckoutOutcome::Rejected { .. })
    }

    /// Message to show the user, if the order did not go through.
    pub fn message(&self) -> Option<&str> {
        match self {
            CheckoutOutcome::Placed { .. } => None,
            CheckoutOutcome::CartInvalidated { message } | CheckoutOutcome::Rejected { message } => {
                Some(message)
            }
        }
    }
}

// =============================================================================
// Invalidation Rules
// =============================================================================

/// Decides whether a failed order means the cart is stale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidationRules {
    /// Case-sensitive substrings checked when the failure has no known code.
    pub messages: Vec<String>,
}

impl Default for InvalidationRules {
    fn default() -> Self {
        InvalidationRules {
            messages: default_invalidating_messages(),
        }
    }
}

pub(crate) fn default_invalidating_messages() -> Vec<String> {
    vec![
        "not available".to_string(),
        "Cart is empty".to_string(),
        "Insufficient stock".to_string(),
    ]
}

impl InvalidationRules {
    pub fn new(messages: Vec<String>) -> Self {
        InvalidationRules { messages }
    }

    pub fn invalidates_cart(&self, failure: &RemoteFailure) -> bool {
        match failure.code {
            Some(FailureCode::CartEmpty)
            | Some(FailureCode::ItemUnavailable)
            | Some(FailureCode::InsufficientStock) => true,
            Some(FailureCode::Unknown) | None => self
                .messages
                .iter()
                .any(|pattern| failure.message.contains(pattern.as_str())),
        }
    }
}

// =============================================================================
// Checkout
// =============================================================================

/// Order assembly over a shared cart store.
pub struct Checkout<R: ?Sized> {
    remote: Arc<R>,
    cart: Arc<CartStore<R>>,
    fees: FeeSchedule,
    rules: InvalidationRules,
    submitting: AtomicBool,
}

/// Clears the submitting flag when the submission ends, however it ends.
struct SubmitGuard<'a>(&'a AtomicBool);

impl Drop for SubmitGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<R: RemoteStore + ?Sized> Checkout<R> {
    pub fn new(remote: Arc<R>, cart: Arc<CartStore<R>>, fees: FeeSchedule) -> Self {
        Self::with_rules(remote, cart, fees, InvalidationRules::default())
    }

    pub fn with_rules(
        remote: Arc<R>,
        cart: Arc<CartStore<R>>,
        fees: FeeSchedule,
        rules: InvalidationRules,
    ) -> Self {
        Checkout {
            remote,
            cart,
            fees,
            rules,
            submitting: AtomicBool::new(false),
        }
    }

    /// Order summary; identical to the cart view's totals.
    pub fn totals(&self) -> OrderTotals {
        self.cart.totals(&self.fees)
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting.load(Ordering::Acquire)
    }

    /// Runs every local check and builds the request body.
    ///
    /// ## Check Order
    /// 1. Payment method selected
    /// 2. Shipping address selected
    /// 3. Subtotal above zero
    /// 4. No line whose snapshot shows zero or negative stock
    pub fn preflight(&self, form: &CheckoutForm) -> Result<PlaceOrderRequest, CheckoutError> {
        let payment_method = form
            .payment_method
            .ok_or(CheckoutError::MissingPaymentMethod)?;
        let address_id = form
            .address_id
            .clone()
            .ok_or(CheckoutError::MissingAddress)?;

        let items = self.cart.items();
        if !calculate_totals(&items, &self.fees).subtotal.is_positive() {
            return Err(CheckoutError::EmptyCart);
        }

        let titles: Vec<String> = items
            .iter()
            .filter(|item| item.book.is_out_of_stock())
            .map(|item| item.book.display_title())
            .collect();
        if !titles.is_empty() {
            return Err(CheckoutError::OutOfStock { titles });
        }

        Ok(PlaceOrderRequest {
            address_id,
            payment_method,
        })
    }

    /// Submits the order once.
    ///
    /// A second call while the first is in flight fails with
    /// `AlreadySubmitting` and does not reach the remote store.
    pub async fn place_order(&self, form: &CheckoutForm) -> Result<CheckoutOutcome, CheckoutError> {
        if self
            .submitting
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("Order submission already in progress");
            return Err(CheckoutError::AlreadySubmitting);
        }
        let _submitting = SubmitGuard(&self.submitting);

        let request = self.preflight(form).map_err(|err| {
            debug!(error = %err, "Checkout preflight failed");
            err
        })?;

        debug!(
            address_id = %request.address_id,
            payment_method = %request.payment_method,
            "Placing order"
        );

        let outcome = match self.remote.place_order(&request).await.into_result() {
            Ok(ack) => {
                let ack = ack.unwrap_or_default();
                info!(order_id = ?ack.order_id, "Order placed");
                self.cart.reset();
                CheckoutOutcome::Placed { ack }
            }
            Err(failure) if self.rules.invalidates_cart(&failure) => {
                warn!(error = %failure.message, code = ?failure.code, "Order refused, cart invalidated");
                self.cart.reset();
                CheckoutOutcome::CartInvalidated {
                    message: failure.message,
                }
            }
            Err(failure) => {
                warn!(error = %failure.message, "Order refused");
                CheckoutOutcome::Rejected {
                    message: failure.message,
                }
            }
        };

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{CartPayload, MockRemoteStore, RemoteResponse};
    use crate::testing::GatedRemote;
    use crate::wishlist::WishlistStore;
    use bookcart_core::{BookId, BookRef, CartItem, Money};
    use tokio::sync::oneshot;

    fn form() -> CheckoutForm {
        CheckoutForm::new(AddressId::new("addr-1"), PaymentMethod::CashOnDelivery)
    }

    fn line(id: &str, price_cents: i64, stock: i64, quantity: i64) -> CartItem {
        CartItem::new(
            BookRef::new(id, format!("Book {}", id), Money::from_cents(price_cents), stock),
            quantity,
        )
    }

    async fn checkout_with(remote: Arc<GatedRemote>, lines: Vec<CartItem>) -> Checkout<GatedRemote> {
        remote.set_cart(lines);
        let cart = Arc::new(CartStore::new(remote.clone()));
        cart.fetch().await.unwrap();
        Checkout::new(remote, cart, FeeSchedule::default())
    }

    /// A mock whose cart holds `lines` and which must never place an order.
    async fn mock_checkout(lines: Vec<CartItem>) -> Checkout<MockRemoteStore> {
        let mut mock = MockRemoteStore::new();
        mock.expect_fetch_cart()
            .returning(move || RemoteResponse::ok(CartPayload { cart: lines.clone() }));
        mock.expect_place_order().times(0);
        let remote = Arc::new(mock);
        let cart = Arc::new(CartStore::new(remote.clone()));
        cart.fetch().await.unwrap();
        Checkout::new(remote, cart, FeeSchedule::default())
    }

    #[tokio::test]
    async fn test_preflight_check_order() {
        let checkout = mock_checkout(vec![]).await;

        let no_payment = CheckoutForm {
            address_id: None,
            payment_method: None,
        };
        assert_eq!(
            checkout.place_order(&no_payment).await.unwrap_err(),
            CheckoutError::MissingPaymentMethod
        );

        let no_address = CheckoutForm {
            address_id: None,
            payment_method: Some(PaymentMethod::Card),
        };
        assert_eq!(
            checkout.place_order(&no_address).await.unwrap_err(),
            CheckoutError::MissingAddress
        );

        assert_eq!(
            checkout.place_order(&form()).await.unwrap_err(),
            CheckoutError::EmptyCart
        );
        assert!(!checkout.is_submitting());
    }

    #[tokio::test]
    async fn test_preflight_zero_subtotal_is_empty() {
        let mut stub_line = line("b1", 0, 5, 1);
        stub_line.book = BookRef::stub("b1");
        let checkout = mock_checkout(vec![stub_line]).await;

        assert_eq!(checkout.preflight(&form()).unwrap_err(), CheckoutError::EmptyCart);
    }

    #[tokio::test]
    async fn test_preflight_lists_out_of_stock_titles() {
        let checkout = mock_checkout(vec![
            line("b1", 2000, 0, 1),
            line("b2", 1000, 3, 1),
            line("b3", 500, 0, 2),
        ])
        .await;

        let err = checkout.place_order(&form()).await.unwrap_err();
        assert_eq!(
            err,
            CheckoutError::OutOfStock {
                titles: vec!["Book b1".into(), "Book b3".into()]
            }
        );
    }

    #[tokio::test]
    async fn test_preflight_treats_negative_stock_as_out_of_stock() {
        let checkout = mock_checkout(vec![line("b1", 2000, -1, 1), line("b2", 1000, 3, 1)]).await;

        assert_eq!(
            checkout.place_order(&form()).await.unwrap_err(),
            CheckoutError::OutOfStock {
                titles: vec!["Book b1".into()]
            }
        );
    }

    #[tokio::test]
    async fn test_placed_order_keeps_wishlist() {
        let remote = Arc::new(GatedRemote::default());
        remote.set_wishlist(vec![BookRef::new("b9", "Emma", Money::from_cents(1000), 2)]);
        let wishlist = WishlistStore::new(remote.clone());
        wishlist.fetch().await.unwrap();
        let checkout = checkout_with(remote.clone(), vec![line("b1", 2000, 5, 1)]).await;

        let outcome = checkout.place_order(&form()).await.unwrap();

        assert!(matches!(outcome, CheckoutOutcome::Placed { .. }));
        assert!(checkout.cart.is_empty());
        assert!(wishlist.contains(&BookId::from("b9")));
        assert_eq!(wishlist.items().len(), 1);

        wishlist.fetch().await.unwrap();
        assert!(wishlist.contains(&BookId::from("b9")));
    }

    #[tokio::test]
    async fn test_placed_order_resets_cart() {
        let remote = Arc::new(GatedRemote::default());
        let checkout = checkout_with(remote.clone(), vec![line("b1", 2000, 5, 2)]).await;
        assert_eq!(checkout.totals().total.cents(), 4080);

        let outcome = checkout.place_order(&form()).await.unwrap();

        assert_eq!(
            outcome,
            CheckoutOutcome::Placed {
                ack: OrderAck {
                    order_id: Some("order-1".into())
                }
            }
        );
        assert!(outcome.returns_to_cart());
        assert!(checkout.cart.is_empty());
        assert_eq!(remote.calls("order"), 1);

        let sent = &remote.orders()[0];
        assert_eq!(sent.address_id, AddressId::new("addr-1"));
        assert_eq!(sent.payment_method, PaymentMethod::CashOnDelivery);
    }

    #[tokio::test]
    async fn test_invalidating_failure_resets_cart() {
        let remote = Arc::new(GatedRemote::default());
        let checkout = checkout_with(remote.clone(), vec![line("b1", 2000, 5, 2)]).await;

        remote.fail_next("order", "Book 'Dune' is not available");
        let outcome = checkout.place_order(&form()).await.unwrap();

        assert!(matches!(outcome, CheckoutOutcome::CartInvalidated { .. }));
        assert!(outcome.returns_to_cart());
        assert!(checkout.cart.is_empty());
    }

    #[tokio::test]
    async fn test_other_failure_keeps_cart() {
        let remote = Arc::new(GatedRemote::default());
        let checkout = checkout_with(remote.clone(), vec![line("b1", 2000, 5, 2)]).await;

        remote.fail_next("order", "Payment gateway timeout");
        let outcome = checkout.place_order(&form()).await.unwrap();

        assert_eq!(outcome.message(), Some("Payment gateway timeout"));
        assert!(!outcome.returns_to_cart());
        assert_eq!(checkout.cart.item(&BookId::from("b1")).unwrap().quantity, 2);
    }

    #[tokio::test]
    async fn test_failure_code_takes_precedence() {
        let mut mock = MockRemoteStore::new();
        mock.expect_fetch_cart().returning(|| {
            RemoteResponse::ok(CartPayload {
                cart: vec![line("b1", 2000, 5, 1)],
            })
        });
        mock.expect_place_order()
            .times(1)
            .returning(|_| RemoteResponse::failure_with_code("Sorry!", FailureCode::InsufficientStock));
        let remote = Arc::new(mock);
        let cart = Arc::new(CartStore::new(remote.clone()));
        cart.fetch().await.unwrap();
        let checkout = Checkout::new(remote, cart, FeeSchedule::default());

        let outcome = checkout.place_order(&form()).await.unwrap();
        assert_eq!(
            outcome,
            CheckoutOutcome::CartInvalidated {
                message: "Sorry!".into()
            }
        );
    }

    #[tokio::test]
    async fn test_second_submission_rejected() {
        let remote = Arc::new(GatedRemote::default());
        let checkout = checkout_with(remote.clone(), vec![line("b1", 2000, 5, 2)]).await;
        let (tx, rx) = oneshot::channel();
        remote.gate_order(rx);

        let second = async {
            remote.wait_for_calls("order", 1).await;
            assert!(checkout.is_submitting());
            assert_eq!(
                checkout.place_order(&form()).await.unwrap_err(),
                CheckoutError::AlreadySubmitting
            );
            tx.send(RemoteResponse::ok(OrderAck::default())).unwrap();
        };

        let submitted = form();
        let (first, ()) = tokio::join!(checkout.place_order(&submitted), second);
        assert!(matches!(first.unwrap(), CheckoutOutcome::Placed { .. }));
        assert_eq!(remote.calls("order"), 1);
        assert!(!checkout.is_submitting());
    }

    #[test]
    fn test_invalidation_rules() {
        let rules = InvalidationRules::default();
        let failure = |message: &str, code| RemoteFailure {
            message: message.to_string(),
            code,
        };

        assert!(rules.invalidates_cart(&failure("Cart is empty", None)));
        assert!(rules.invalidates_cart(&failure("Insufficient stock for Dune", None)));
        assert!(rules.invalidates_cart(&failure("x", Some(FailureCode::ItemUnavailable))));
        assert!(!rules.invalidates_cart(&failure("cart is empty", None)));
        assert!(!rules.invalidates_cart(&failure("Card declined", Some(FailureCode::Unknown))));

        let custom = InvalidationRules::new(vec!["sold out".into()]);
        assert!(custom.invalidates_cart(&failure("Dune is sold out", None)));
        assert!(!custom.invalidates_cart(&failure("Cart is empty", None)));
    }

    #[test]
    fn test_form_deserializes_from_view() {
        let form: CheckoutForm =
            serde_json::from_str(r#"{"addressId":"a1","paymentMethod":"wallet"}"#).unwrap();
        assert_eq!(form.payment_method, Some(PaymentMethod::Wallet));
    }
}
