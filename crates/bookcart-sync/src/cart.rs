//! # Cart Store
//!
//! Owns the local cart and keeps it in step with the remote store.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Store Operations                                │
//! │                                                                         │
//! │  View Action         Store Operation          Committed On Success      │
//! │  ───────────         ───────────────          ────────────────────      │
//! │                                                                         │
//! │  Open cart ────────► fetch() ───────────────► items = remote snapshot  │
//! │                                                                         │
//! │  Add to cart ──────► add(id, qty, book?) ───► items[id].qty += qty     │
//! │                                               (or insert new line)      │
//! │                                                                         │
//! │  Change quantity ──► update_quantity() ─────► items[id].qty = qty      │
//! │                                                                         │
//! │  Click remove ─────► remove(id) ────────────► items.remove(id)         │
//! │                                                                         │
//! │  Logout ───────────► reset() ───────────────► everything cleared       │
//! │                                                                         │
//! │  Pessimistic commit: nothing changes until the remote store confirms,  │
//! │  so a failure leaves the cart exactly as it was.                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Sharing
//! The state lives in a `tokio::sync::watch` channel. Views either read a
//! cloned [`CartState`] snapshot or `subscribe()` and re-render on change.
//! No lock is held across a remote call.

use std::sync::Arc;

use bookcart_core::validation::{validate_book_id, validate_quantity};
use bookcart_core::{
    amount_until_free_shipping, calculate_totals, BookId, BookRef, CartItem, FeeSchedule,
    FetchStatus, Money, OrderTotals, MAX_ITEM_QUANTITY,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::client::RemoteStore;
use crate::error::{StoreError, StoreResult};
use crate::pending::{OperationKind, PendingGuard, PendingOps, ReentrancyPolicy, TracksPending};

// =============================================================================
// Cart State
// =============================================================================

/// Everything the cart views render from.
///
/// ## Invariants
/// - Items are unique by book id
/// - Every quantity is at least 1
#[derive(Debug, Clone, Default)]
pub struct CartState {
    pub items: Vec<CartItem>,
    pub fetch_status: FetchStatus,
    pub fetch_error: Option<String>,
    pub pending: PendingOps<BookId>,
    pub last_synced_at: Option<DateTime<Utc>>,
}

/// What an `add` did to the item list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AddOutcome {
    Incremented { quantity: i64 },
    Inserted { stub: bool },
}

impl CartState {
    pub fn item(&self, book_id: &BookId) -> Option<&CartItem> {
        self.items.iter().find(|i| i.book_id() == book_id)
    }

    pub fn is_adding(&self, book_id: &BookId) -> bool {
        self.pending.is_pending(book_id, OperationKind::Add)
    }

    pub fn is_updating(&self, book_id: &BookId) -> bool {
        self.pending.is_pending(book_id, OperationKind::Update)
    }

    pub fn is_removing(&self, book_id: &BookId) -> bool {
        self.pending.is_pending(book_id, OperationKind::Remove)
    }

    /// Total number of copies across all lines.
    pub fn total_quantity(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    fn apply_add(&mut self, book_id: &BookId, quantity: i64, snapshot: Option<BookRef>) -> AddOutcome {
        if let Some(item) = self.items.iter_mut().find(|i| i.book_id() == book_id) {
            item.quantity = item.quantity.saturating_add(quantity);
            return AddOutcome::Incremented {
                quantity: item.quantity,
            };
        }

        let (book, stub) = match snapshot {
            Some(book) => (book, false),
            None => (BookRef::stub(book_id.clone()), true),
        };
        self.items.push(CartItem::new(book, quantity));
        AddOutcome::Inserted { stub }
    }

    /// Overwrites a line's quantity. Returns false if the line is gone.
    fn apply_quantity(&mut self, book_id: &BookId, quantity: i64) -> bool {
        match self.items.iter_mut().find(|i| i.book_id() == book_id) {
            Some(item) => {
                item.quantity = quantity;
                true
            }
            None => false,
        }
    }

    fn apply_remove(&mut self, book_id: &BookId) -> bool {
        let before = self.items.len();
        self.items.retain(|i| i.book_id() != book_id);
        self.items.len() != before
    }

    fn reset(&mut self) {
        self.items.clear();
        self.pending.clear();
        self.fetch_status = FetchStatus::Idle;
        self.fetch_error = None;
        self.last_synced_at = None;
    }
}

impl TracksPending for CartState {
    fn pending_mut(&mut self) -> &mut PendingOps<BookId> {
        &mut self.pending
    }
}

/// Merges duplicate lines, drops non-positive quantities and caps oversized
/// ones at `MAX_ITEM_QUANTITY` so the local invariants hold.
fn normalize_lines(lines: Vec<CartItem>) -> Vec<CartItem> {
    let mut items: Vec<CartItem> = Vec::with_capacity(lines.len());

    for mut line in lines {
        if line.quantity < 1 {
            warn!(book_id = %line.book_id(), quantity = line.quantity, "Dropping cart line with non-positive quantity");
            continue;
        }
        if line.quantity > MAX_ITEM_QUANTITY {
            warn!(book_id = %line.book_id(), quantity = line.quantity, max = MAX_ITEM_QUANTITY, "Capping oversized cart line quantity");
            line.quantity = MAX_ITEM_QUANTITY;
        }
        match items.iter_mut().find(|i| i.book_id() == line.book_id()) {
            Some(existing) => {
                warn!(book_id = %line.book_id(), "Merging duplicate cart line from remote snapshot");
                existing.quantity = existing
                    .quantity
                    .saturating_add(line.quantity)
                    .min(MAX_ITEM_QUANTITY);
            }
            None => items.push(line),
        }
    }

    items
}

// =============================================================================
// Cart View
// =============================================================================

/// Serializable cart snapshot handed to the cart view.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub items: Vec<CartItem>,
    pub totals: OrderTotals,
    pub amount_until_free_shipping: Option<Money>,
    pub fetch_status: FetchStatus,
    pub fetch_error: Option<String>,
    pub pending_add: Vec<BookId>,
    pub pending_update: Vec<BookId>,
    pub pending_remove: Vec<BookId>,
    pub last_synced_at: Option<DateTime<Utc>>,
}

impl CartView {
    pub fn new(state: &CartState, fees: &FeeSchedule) -> Self {
        CartView {
            items: state.items.clone(),
            totals: calculate_totals(&state.items, fees),
            amount_until_free_shipping: amount_until_free_shipping(&state.items, fees),
            fetch_status: state.fetch_status,
            fetch_error: state.fetch_error.clone(),
            pending_add: state.pending.keys(OperationKind::Add),
            pending_update: state.pending.keys(OperationKind::Update),
            pending_remove: state.pending.keys(OperationKind::Remove),
            last_synced_at: state.last_synced_at,
        }
    }
}

// =============================================================================
// Cart Store
// =============================================================================

/// The only owner of the cart item list.
///
/// Generic over the remote store so tests can inject fakes; `R` may be
/// `dyn RemoteStore`.
pub struct CartStore<R: ?Sized> {
    remote: Arc<R>,
    state: watch::Sender<CartState>,
    policy: ReentrancyPolicy,
}

impl<R: RemoteStore + ?Sized> CartStore<R> {
    /// Creates an empty store that rejects re-entrant calls.
    pub fn new(remote: Arc<R>) -> Self {
        Self::with_policy(remote, ReentrancyPolicy::default())
    }

    pub fn with_policy(remote: Arc<R>, policy: ReentrancyPolicy) -> Self {
        let (state, _) = watch::channel(CartState::default());
        CartStore {
            remote,
            state,
            policy,
        }
    }

    pub fn policy(&self) -> ReentrancyPolicy {
        self.policy
    }

    // =========================================================================
    // Readers
    // =========================================================================

    /// Receiver notified after every state change.
    pub fn subscribe(&self) -> watch::Receiver<CartState> {
        self.state.subscribe()
    }

    /// Runs `f` against the current state without cloning it.
    ///
    /// ## Usage
    /// ```rust,ignore
    /// let lines = cart.with_state(|s| s.items.len());
    /// ```
    pub fn with_state<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&CartState) -> T,
    {
        f(&self.state.borrow())
    }

    pub fn snapshot(&self) -> CartState {
        self.state.borrow().clone()
    }

    pub fn items(&self) -> Vec<CartItem> {
        self.with_state(|s| s.items.clone())
    }

    pub fn item(&self, book_id: &BookId) -> Option<CartItem> {
        self.with_state(|s| s.item(book_id).cloned())
    }

    pub fn contains(&self, book_id: &BookId) -> bool {
        self.with_state(|s| s.item(book_id).is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.with_state(|s| s.items.is_empty())
    }

    /// Number of distinct lines.
    pub fn item_count(&self) -> usize {
        self.with_state(|s| s.items.len())
    }

    pub fn total_quantity(&self) -> i64 {
        self.with_state(CartState::total_quantity)
    }

    pub fn is_adding(&self, book_id: &BookId) -> bool {
        self.with_state(|s| s.is_adding(book_id))
    }

    pub fn is_updating(&self, book_id: &BookId) -> bool {
        self.with_state(|s| s.is_updating(book_id))
    }

    pub fn is_removing(&self, book_id: &BookId) -> bool {
        self.with_state(|s| s.is_removing(book_id))
    }

    /// Totals over the current lines; the checkout uses the same function.
    pub fn totals(&self, fees: &FeeSchedule) -> OrderTotals {
        self.with_state(|s| calculate_totals(&s.items, fees))
    }

    pub fn view(&self, fees: &FeeSchedule) -> CartView {
        self.with_state(|s| CartView::new(s, fees))
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Replaces the whole item list with the remote snapshot.
    ///
    /// Concurrent fetches are not deduplicated; the last one to resolve wins.
    pub async fn fetch(&self) -> StoreResult<()> {
        debug!("Fetching cart");
        let epoch = self.state_epoch();
        self.state.send_modify(|s| s.fetch_status = FetchStatus::Loading);

        let result = self
            .remote
            .fetch_cart()
            .await
            .into_result()
            .map_err(StoreError::from)
            .and_then(|data| data.ok_or_else(|| StoreError::Protocol("missing cart data".into())));

        if self.state_epoch() != epoch {
            debug!("Discarding cart fetch issued before reset");
            return result.map(|_| ());
        }

        match result {
            Ok(payload) => {
                let items = normalize_lines(payload.cart);
                info!(lines = items.len(), "Cart fetched");
                self.state.send_modify(|s| {
                    s.items = items;
                    s.fetch_status = FetchStatus::Loaded;
                    s.fetch_error = None;
                    s.last_synced_at = Some(Utc::now());
                });
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "Cart fetch failed");
                self.state.send_modify(|s| {
                    s.fetch_status = FetchStatus::Failed;
                    s.fetch_error = Some(err.to_string());
                });
                Err(err)
            }
        }
    }

    /// Adds `quantity` copies of a book.
    ///
    /// On success an existing line is incremented; otherwise a new line is
    /// inserted from `snapshot`, or from a bare `{id}` stub when no snapshot
    /// was supplied. Stock is not checked here; see
    /// [`check_stock`](bookcart_core::validation::check_stock).
    pub async fn add(
        &self,
        book_id: &BookId,
        quantity: i64,
        snapshot: Option<BookRef>,
    ) -> StoreResult<()> {
        validate_book_id(book_id)?;
        validate_quantity(quantity)?;
        debug!(book_id = %book_id, quantity, "Adding to cart");

        let snapshot = snapshot.filter(|book| {
            let matches = &book.id == book_id;
            if !matches {
                warn!(book_id = %book_id, snapshot_id = %book.id, "Ignoring snapshot for a different book");
            }
            matches
        });

        let guard = PendingGuard::begin(&self.state, book_id, OperationKind::Add, self.policy)?;
        let response = self.remote.add_to_cart(book_id, quantity).await;

        match response.into_result() {
            Ok(_) => {
                let mut outcome = None;
                guard.resolve(|s| outcome = Some(s.apply_add(book_id, quantity, snapshot)));
                match outcome {
                    Some(AddOutcome::Incremented { quantity: total }) => {
                        info!(book_id = %book_id, quantity = total, "Cart line incremented");
                    }
                    Some(AddOutcome::Inserted { stub: true }) => {
                        warn!(book_id = %book_id, "Inserted cart line without book data; it prices at zero");
                    }
                    Some(AddOutcome::Inserted { stub: false }) => {
                        info!(book_id = %book_id, quantity, "Cart line added");
                    }
                    None => {}
                }
                Ok(())
            }
            Err(failure) => {
                guard.resolve(|_| {});
                warn!(book_id = %book_id, error = %failure.message, "Add to cart failed");
                Err(failure.into())
            }
        }
    }

    /// Sets a line's quantity to `quantity` (absolute, not a delta).
    pub async fn update_quantity(&self, book_id: &BookId, quantity: i64) -> StoreResult<()> {
        validate_book_id(book_id)?;
        validate_quantity(quantity)?;
        debug!(book_id = %book_id, quantity, "Updating cart quantity");

        let guard = PendingGuard::begin(&self.state, book_id, OperationKind::Update, self.policy)?;
        let response = self.remote.update_cart_quantity(book_id, quantity).await;

        match response.into_result() {
            Ok(_) => {
                let mut found = false;
                guard.resolve(|s| found = s.apply_quantity(book_id, quantity));
                if found {
                    info!(book_id = %book_id, quantity, "Cart quantity updated");
                } else {
                    debug!(book_id = %book_id, "Quantity confirmed for a line no longer in the cart");
                }
                Ok(())
            }
            Err(failure) => {
                guard.resolve(|_| {});
                warn!(book_id = %book_id, error = %failure.message, "Cart quantity update failed");
                Err(failure.into())
            }
        }
    }

    /// Removes a line. Removing a book that is not in the cart is a no-op on
    /// the list once the remote store confirms.
    pub async fn remove(&self, book_id: &BookId) -> StoreResult<()> {
        validate_book_id(book_id)?;
        debug!(book_id = %book_id, "Removing from cart");

        let guard = PendingGuard::begin(&self.state, book_id, OperationKind::Remove, self.policy)?;
        let response = self.remote.remove_from_cart(book_id).await;

        match response.into_result() {
            Ok(_) => {
                let mut removed = false;
                guard.resolve(|s| removed = s.apply_remove(book_id));
                info!(book_id = %book_id, removed, "Cart line removed");
                Ok(())
            }
            Err(failure) => {
                guard.resolve(|_| {});
                warn!(book_id = %book_id, error = %failure.message, "Remove from cart failed");
                Err(failure.into())
            }
        }
    }

    /// Clears items, pending marks and errors (logout, or after an order).
    ///
    /// Calls still in flight are not cancelled; their results are discarded
    /// when they resolve.
    pub fn reset(&self) {
        info!("Resetting cart");
        self.state.send_modify(CartState::reset);
    }

    fn state_epoch(&self) -> u64 {
        self.state.borrow().pending.epoch()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
