//! Scriptable remote store for store tests.
//!
//! Every call is counted. A call can be held open with [`GatedRemote::gate`]
//! until the test sends its response, or failed once with
//! [`GatedRemote::fail_next`]. Ungated calls acknowledge immediately.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use bookcart_core::{BookId, BookRef, CartItem};
use tokio::sync::oneshot;

use crate::client::{
    CartPayload, OrderAck, PlaceOrderRequest, RemoteResponse, RemoteStore, WishlistPayload,
};

#[derive(Default)]
struct Script {
    cart: Vec<CartItem>,
    wishlist: Vec<BookRef>,
    calls: HashMap<&'static str, usize>,
    gates: HashMap<&'static str, VecDeque<oneshot::Receiver<RemoteResponse<()>>>>,
    order_gates: VecDeque<oneshot::Receiver<RemoteResponse<OrderAck>>>,
    failures: HashMap<&'static str, String>,
    orders: Vec<PlaceOrderRequest>,
}

#[derive(Default)]
pub struct GatedRemote {
    script: Mutex<Script>,
}

impl GatedRemote {
    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_cart(&self, cart: Vec<CartItem>) {
        self.script().cart = cart;
    }

    pub fn set_wishlist(&self, wishlist: Vec<BookRef>) {
        self.script().wishlist = wishlist;
    }

    /// Holds the next ungated call of `kind` until `rx` receives a response.
    pub fn gate(&self, kind: &'static str, rx: oneshot::Receiver<RemoteResponse<()>>) {
        self.script().gates.entry(kind).or_default().push_back(rx);
    }

    pub fn gate_order(&self, rx: oneshot::Receiver<RemoteResponse<OrderAck>>) {
        self.script().order_gates.push_back(rx);
    }

    /// Fails the next call of `kind` with `message`.
    pub fn fail_next(&self, kind: &'static str, message: &str) {
        self.script().failures.insert(kind, message.to_string());
    }

    pub fn calls(&self, kind: &str) -> usize {
        self.script().calls.get(kind).copied().unwrap_or(0)
    }

    pub fn orders(&self) -> Vec<PlaceOrderRequest> {
        self.script().orders.clone()
    }

    /// Yields until `n` calls of `kind` have been issued.
    pub async fn wait_for_calls(&self, kind: &str, n: usize) {
        while self.calls(kind) < n {
            tokio::task::yield_now().await;
        }
    }

    /// Records the call and hands back either a scripted failure or the gate
    /// to wait on.
    fn enter(
        &self,
        kind: &'static str,
    ) -> Result<Option<oneshot::Receiver<RemoteResponse<()>>>, String> {
        let mut script = self.script();
        *script.calls.entry(kind).or_insert(0) += 1;
        if let Some(message) = script.failures.remove(kind) {
            return Err(message);
        }
        Ok(script.gates.get_mut(kind).and_then(VecDeque::pop_front))
    }

    async fn mutation(&self, kind: &'static str) -> RemoteResponse<()> {
        match self.enter(kind) {
            Err(message) => RemoteResponse::failure(message),
            Ok(Some(rx)) => rx
                .await
                .unwrap_or_else(|_| RemoteResponse::failure("Gate dropped")),
            Ok(None) => RemoteResponse::ack(),
        }
    }
}

#[async_trait]
impl RemoteStore for GatedRemote {
    async fn fetch_cart(&self) -> RemoteResponse<CartPayload> {
        if let Err(message) = self.enter("fetch") {
            return RemoteResponse::failure(message);
        }
        RemoteResponse::ok(CartPayload {
            cart: self.script().cart.clone(),
        })
    }

    async fn add_to_cart(&self, _book_id: &BookId, _quantity: i64) -> RemoteResponse<()> {
        self.mutation("add").await
    }

    async fn update_cart_quantity(&self, _book_id: &BookId, _quantity: i64) -> RemoteResponse<()> {
        self.mutation("update").await
    }

    async fn remove_from_cart(&self, _book_id: &BookId) -> RemoteResponse<()> {
        self.mutation("remove").await
    }

    async fn fetch_wishlist(&self) -> RemoteResponse<WishlistPayload> {
        if let Err(message) = self.enter("wishlist_fetch") {
            return RemoteResponse::failure(message);
        }
        RemoteResponse::ok(WishlistPayload {
            wishlist: self.script().wishlist.clone(),
        })
    }

    async fn add_to_wishlist(&self, _book_id: &BookId) -> RemoteResponse<()> {
        self.mutation("wishlist_add").await
    }

    async fn remove_from_wishlist(&self, _book_id: &BookId) -> RemoteResponse<()> {
        self.mutation("wishlist_remove").await
    }

    async fn place_order(&self, request: &PlaceOrderRequest) -> RemoteResponse<OrderAck> {
        let gate = {
            let mut script = self.script();
            *script.calls.entry("order").or_insert(0) += 1;
            script.orders.push(request.clone());
            if let Some(message) = script.failures.remove("order") {
                return RemoteResponse::failure(message);
            }
            script.order_gates.pop_front()
        };

        match gate {
            Some(rx) => rx
                .await
                .unwrap_or_else(|_| RemoteResponse::failure("Gate dropped")),
            None => RemoteResponse::ok(OrderAck {
                order_id: Some("order-1".into()),
            }),
        }
    }
}
