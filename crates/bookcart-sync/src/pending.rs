//! # Pending Operations
//!
//! Bookkeeping of in-flight mutations per `(book, operation kind)`.
//!
//! ## Lifecycle of a Mark
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   Idle ──── PendingGuard::begin() ────► InFlight(1)                     │
//! │    ▲        (before the remote call)        │                           │
//! │    │                                        │ remote call resolves      │
//! │    │                                        ▼                           │
//! │    └──────── guard resolve / drop ◄──── success OR failure              │
//! │                                                                         │
//! │   ReentrancyPolicy::Reject: begin() on InFlight → OperationInFlight    │
//! │   ReentrancyPolicy::Allow:  begin() on InFlight(n) → InFlight(n + 1)   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The guard clears its mark exactly once: explicitly through
//! [`PendingGuard::resolve`], or on drop if the operation future is dropped
//! before the remote call returns.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::str::FromStr;

use bookcart_core::BookId;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::{ConfigError, StoreError};

// =============================================================================
// Operation Kind
// =============================================================================

/// The kind of mutation a mark belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Add,
    Update,
    Remove,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Add => write!(f, "add"),
            OperationKind::Update => write!(f, "update"),
            OperationKind::Remove => write!(f, "remove"),
        }
    }
}

// =============================================================================
// Reentrancy Policy
// =============================================================================

/// What a store does when a second call arrives for a `(book, kind)` that is
/// already in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReentrancyPolicy {
    /// Refuse the second call without contacting the remote store.
    #[default]
    Reject,

    /// Let both calls run; whichever resolves last determines the state.
    Allow,
}

impl fmt::Display for ReentrancyPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReentrancyPolicy::Reject => write!(f, "reject"),
            ReentrancyPolicy::Allow => write!(f, "allow"),
        }
    }
}

impl FromStr for ReentrancyPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "reject" | "exclusive" => Ok(ReentrancyPolicy::Reject),
            "allow" | "concurrent" => Ok(ReentrancyPolicy::Allow),
            other => Err(ConfigError::Invalid(format!(
                "Unknown reentrancy policy: '{}'. Valid options: reject, allow",
                other
            ))),
        }
    }
}

// =============================================================================
// Pending Operations Map
// =============================================================================

/// State of one `(key, kind)` slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationState {
    Idle,
    /// Number of calls currently in flight (only above 1 under `Allow`).
    InFlight(u32),
}

/// Map from `(key, kind)` to the number of calls in flight.
///
/// `clear()` starts a new epoch; marks taken in an older epoch are ignored
/// when their calls resolve.
#[derive(Debug, Clone)]
pub struct PendingOps<K> {
    in_flight: HashMap<(K, OperationKind), u32>,
    epoch: u64,
}

impl<K> Default for PendingOps<K> {
    fn default() -> Self {
        PendingOps {
            in_flight: HashMap::new(),
            epoch: 0,
        }
    }
}

impl<K: Clone + Eq + Hash + Ord> PendingOps<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, key: &K, kind: OperationKind) -> OperationState {
        match self.in_flight.get(&(key.clone(), kind)) {
            Some(&count) if count > 0 => OperationState::InFlight(count),
            _ => OperationState::Idle,
        }
    }

    /// Number of calls of `kind` in flight for `key`.
    pub fn in_flight(&self, key: &K, kind: OperationKind) -> u32 {
        match self.state(key, kind) {
            OperationState::InFlight(count) => count,
            OperationState::Idle => 0,
        }
    }

    pub fn is_pending(&self, key: &K, kind: OperationKind) -> bool {
        matches!(self.state(key, kind), OperationState::InFlight(_))
    }

    /// Keys with a call of `kind` in flight, sorted.
    pub fn keys(&self, kind: OperationKind) -> Vec<K> {
        let mut keys: Vec<K> = self
            .in_flight
            .keys()
            .filter(|(_, k)| *k == kind)
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }

    /// Marks a call as started. Returns `false` if the policy refuses it.
    pub fn try_begin(&mut self, key: K, kind: OperationKind, policy: ReentrancyPolicy) -> bool {
        let count = self.in_flight.entry((key, kind)).or_insert(0);
        if *count > 0 && policy == ReentrancyPolicy::Reject {
            return false;
        }
        *count += 1;
        true
    }

    /// Marks one call as resolved.
    pub fn finish(&mut self, key: &K, kind: OperationKind) {
        let slot = (key.clone(), kind);
        match self.in_flight.get_mut(&slot) {
            Some(count) if *count > 1 => *count -= 1,
            Some(_) => {
                self.in_flight.remove(&slot);
            }
            None => {}
        }
    }

    pub fn is_empty(&self) -> bool {
        self.in_flight.is_empty()
    }

    #[inline]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Drops every mark and starts a new epoch.
    pub fn clear(&mut self) {
        self.in_flight.clear();
        self.epoch += 1;
    }
}

// =============================================================================
// Pending Guard
// =============================================================================

/// Store state that carries a pending-operations map.
pub trait TracksPending {
    fn pending_mut(&mut self) -> &mut PendingOps<BookId>;
}

/// Holds a pending mark for the duration of one remote call.
///
/// Created before the call is issued; cleared exactly once afterwards.
pub struct PendingGuard<'a, S: TracksPending> {
    state: &'a watch::Sender<S>,
    book_id: BookId,
    kind: OperationKind,
    epoch: u64,
    // Cleared by `resolve` so drop does not release the mark twice
    armed: bool,
}

impl<'a, S: TracksPending> PendingGuard<'a, S> {
    /// Inserts the mark, or refuses with `OperationInFlight` under `Reject`.
    pub fn begin(
        state: &'a watch::Sender<S>,
        book_id: &BookId,
        kind: OperationKind,
        policy: ReentrancyPolicy,
    ) -> Result<Self, StoreError> {
        let mut epoch = 0;
        let admitted = state.send_if_modified(|s| {
            let ops = s.pending_mut();
            epoch = ops.epoch();
            ops.try_begin(book_id.clone(), kind, policy)
        });

        if !admitted {
            warn!(book_id = %book_id, %kind, "Rejected re-entrant operation");
            return Err(StoreError::OperationInFlight {
                book_id: book_id.clone(),
                kind,
            });
        }

        Ok(PendingGuard {
            state,
            book_id: book_id.clone(),
            kind,
            epoch,
            armed: true,
        })
    }

    /// Applies the outcome of the call and clears the mark in one update, so
    /// observers never see the committed state with the mark still set.
    ///
    /// Returns `false` without applying anything if the state was reset while
    /// the call was in flight.
    pub fn resolve<F>(mut self, apply: F) -> bool
    where
        F: FnOnce(&mut S),
    {
        self.armed = false;
        let (book_id, kind, epoch) = (&self.book_id, self.kind, self.epoch);

        let mut applied = false;
        self.state.send_modify(|s| {
            let ops = s.pending_mut();
            if ops.epoch() != epoch {
                return;
            }
            ops.finish(book_id, kind);
            apply(s);
            applied = true;
        });

        if !applied {
            debug!(book_id = %book_id, %kind, "Discarded result of call issued before reset");
        }
        applied
    }
}

impl<S: TracksPending> Drop for PendingGuard<'_, S> {
    fn drop(&mut self) {
        if self.armed {
            let (book_id, kind, epoch) = (&self.book_id, self.kind, self.epoch);
            self.state.send_modify(|s| {
                let ops = s.pending_mut();
                if ops.epoch() == epoch {
                    ops.finish(book_id, kind);
                }
            });
        }
    }
}
