//! # Wishlist Store
//!
//! Owns the local wishlist. Same commit pattern as the cart store, without
//! quantities: a book is either on the list or not.
//!
//! ## User Workflow
//! ```text
//! Book page ──► add(id, snapshot) ──► heart filled
//! Wishlist  ──► remove(id) ─────────► entry gone
//! Wishlist  ──► move_to_cart(id) ───► cart.add(id, 1) ──► remove(id)
//!                                         │ failure
//!                                         └──► wishlist untouched
//! ```

use std::sync::Arc;

use bookcart_core::validation::validate_book_id;
use bookcart_core::{BookId, BookRef, FetchStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::cart::CartStore;
use crate::client::RemoteStore;
use crate::error::{StoreError, StoreResult};
use crate::pending::{OperationKind, PendingGuard, PendingOps, ReentrancyPolicy, TracksPending};

// =============================================================================
// Wishlist State
// =============================================================================

/// Wishlist entries are unique by book id.
#[derive(Debug, Clone, Default)]
pub struct WishlistState {
    pub items: Vec<BookRef>,
    pub fetch_status: FetchStatus,
    pub fetch_error: Option<String>,
    pub pending: PendingOps<BookId>,
    pub last_synced_at: Option<DateTime<Utc>>,
}

impl WishlistState {
    pub fn item(&self, book_id: &BookId) -> Option<&BookRef> {
        self.items.iter().find(|b| &b.id == book_id)
    }

    pub fn contains(&self, book_id: &BookId) -> bool {
        self.item(book_id).is_some()
    }

    pub fn is_adding(&self, book_id: &BookId) -> bool {
        self.pending.is_pending(book_id, OperationKind::Add)
    }

    pub fn is_removing(&self, book_id: &BookId) -> bool {
        self.pending.is_pending(book_id, OperationKind::Remove)
    }

    /// Inserts unless present. Returns true if a stub was inserted.
    fn apply_add(&mut self, book_id: &BookId, snapshot: Option<BookRef>) -> Option<bool> {
        if self.contains(book_id) {
            return None;
        }
        let stub = snapshot.is_none();
        self.items
            .push(snapshot.unwrap_or_else(|| BookRef::stub(book_id.clone())));
        Some(stub)
    }

    fn apply_remove(&mut self, book_id: &BookId) -> bool {
        let before = self.items.len();
        self.items.retain(|b| &b.id != book_id);
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

impl TracksPending for WishlistState {
    fn pending_mut(&mut self) -> &mut PendingOps<BookId> {
        &mut self.pending
    }
}

fn dedup_entries(books: Vec<BookRef>) -> Vec<BookRef> {
    let mut items: Vec<BookRef> = Vec::with_capacity(books.len());
    for book in books {
        if items.iter().any(|b| b.id == book.id) {
            warn!(book_id = %book.id, "Dropping duplicate wishlist entry from remote snapshot");
            continue;
        }
        items.push(book);
    }
    items
}

// =============================================================================
// Wishlist View
// =============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistView {
    pub items: Vec<BookRef>,
    pub fetch_status: FetchStatus,
    pub fetch_error: Option<String>,
    pub pending_add: Vec<BookId>,
    pub pending_remove: Vec<BookId>,
    pub last_synced_at: Option<DateTime<Utc>>,
}

impl From<&WishlistState> for WishlistView {
    fn from(state: &WishlistState) -> Self {
        WishlistView {
            items: state.items.clone(),
            fetch_status: state.fetch_status,
            fetch_error: state.fetch_error.clone(),
            pending_add: state.pending.keys(OperationKind::Add),
            pending_remove: state.pending.keys(OperationKind::Remove),
            last_synced_at: state.last_synced_at,
        }
    }
}

// =============================================================================
// Wishlist Store
// =============================================================================

pub struct WishlistStore<R: ?Sized> {
    remote: Arc<R>,
    state: watch::Sender<WishlistState>,
    policy: ReentrancyPolicy,
}

impl<R: RemoteStore + ?Sized> WishlistStore<R> {
    pub fn new(remote: Arc<R>) -> Self {
        Self::with_policy(remote, ReentrancyPolicy::default())
    }

    pub fn with_policy(remote: Arc<R>, policy: ReentrancyPolicy) -> Self {
        let (state, _) = watch::channel(WishlistState::default());
        WishlistStore {
            remote,
            state,
            policy,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<WishlistState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> WishlistState {
        self.state.borrow().clone()
    }

    pub fn items(&self) -> Vec<BookRef> {
        self.state.borrow().items.clone()
    }

    pub fn contains(&self, book_id: &BookId) -> bool {
        self.state.borrow().contains(book_id)
    }

    pub fn is_adding(&self, book_id: &BookId) -> bool {
        self.state.borrow().is_adding(book_id)
    }

    pub fn is_removing(&self, book_id: &BookId) -> bool {
        self.state.borrow().is_removing(book_id)
    }

    pub fn view(&self) -> WishlistView {
        WishlistView::from(&*self.state.borrow())
    }

    /// Replaces the wishlist with the remote snapshot.
    pub async fn fetch(&self) -> StoreResult<()> {
        debug!("Fetching wishlist");
        let epoch = self.state.borrow().pending.epoch();
        self.state.send_modify(|s| s.fetch_status = FetchStatus::Loading);

        let result = self
            .remote
            .fetch_wishlist()
            .await
            .into_result()
            .map_err(StoreError::from)
            .and_then(|data| {
                data.ok_or_else(|| StoreError::Protocol("missing wishlist data".into()))
            });

        if self.state.borrow().pending.epoch() != epoch {
            debug!("Discarding wishlist fetch issued before reset");
            return result.map(|_| ());
        }

        match result {
            Ok(payload) => {
                let items = dedup_entries(payload.wishlist);
                info!(entries = items.len(), "Wishlist fetched");
                self.state.send_modify(|s| {
                    s.items = items;
                    s.fetch_status = FetchStatus::Loaded;
                    s.fetch_error = None;
                    s.last_synced_at = Some(Utc::now());
                });
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "Wishlist fetch failed");
                self.state.send_modify(|s| {
                    s.fetch_status = FetchStatus::Failed;
                    s.fetch_error = Some(err.to_string());
                });
                Err(err)
            }
        }
    }

    /// Adds a book. Adding one that is already listed succeeds without a
    /// second entry.
    pub async fn add(&self, book_id: &BookId, snapshot: Option<BookRef>) -> StoreResult<()> {
        validate_book_id(book_id)?;
        debug!(book_id = %book_id, "Adding to wishlist");

        let snapshot = snapshot.filter(|book| &book.id == book_id);
        let guard = PendingGuard::begin(&self.state, book_id, OperationKind::Add, self.policy)?;

        match self.remote.add_to_wishlist(book_id).await.into_result() {
            Ok(_) => {
                let mut inserted = None;
                guard.resolve(|s| inserted = s.apply_add(book_id, snapshot));
                match inserted {
                    Some(true) => {
                        warn!(book_id = %book_id, "Inserted wishlist entry without book data")
                    }
                    Some(false) => info!(book_id = %book_id, "Added to wishlist"),
                    None => debug!(book_id = %book_id, "Book already in wishlist"),
                }
                Ok(())
            }
            Err(failure) => {
                guard.resolve(|_| {});
                warn!(book_id = %book_id, error = %failure.message, "Add to wishlist failed");
                Err(failure.into())
            }
        }
    }

    pub async fn remove(&self, book_id: &BookId) -> StoreResult<()> {
        validate_book_id(book_id)?;
        debug!(book_id = %book_id, "Removing from wishlist");
        let guard = PendingGuard::begin(&self.state, book_id, OperationKind::Remove, self.policy)?;

        match self.remote.remove_from_wishlist(book_id).await.into_result() {
            Ok(_) => {
                let mut removed = false;
                guard.resolve(|s| removed = s.apply_remove(book_id));
                info!(book_id = %book_id, removed, "Removed from wishlist");
                Ok(())
            }
            Err(failure) => {
                guard.resolve(|_| {});
                warn!(book_id = %book_id, error = %failure.message, "Remove from wishlist failed");
                Err(failure.into())
            }
        }
    }

    /// Moves one copy of a wishlisted book into the cart.
    ///
    /// The wishlist entry is removed only after the cart add succeeds. If the
    /// removal then fails the book is in both lists and the error is returned.
    pub async fn move_to_cart<C>(&self, book_id: &BookId, cart: &CartStore<C>) -> StoreResult<()>
    where
        C: RemoteStore + ?Sized,
    {
        let snapshot = self
            .state
            .borrow()
            .item(book_id)
            .cloned()
            .ok_or_else(|| StoreError::NotInWishlist {
                book_id: book_id.clone(),
            })?;

        debug!(book_id = %book_id, "Moving wishlist entry to cart");
        cart.add(book_id, 1, Some(snapshot)).await?;
        self.remove(book_id).await
    }

    pub fn reset(&self) {
        info!("Resetting wishlist");
        self.state.send_modify(WishlistState::reset);
    }
}
