//! Cart state and the checkout commit batch.
//!
//! [`CartReconciler`] owns the local view of a user's cart: the persisted
//! rows, a per-row quantity edit buffer, the selection flagged for
//! checkout, and the resolved book records. Checkout turns each selected
//! row into an order and deletes the source cart row, item by item, and
//! reports exactly which items committed and which failed. There is no
//! cross-item transaction; one item's failure never blocks the rest.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::time::timeout;

use paper_lantern_core::{BookId, CartItemId, OrderId, UserId};

use crate::backend::{Backend, BackendError};
use crate::models::{Book, CartItem};

/// Bound on a single create-order + delete-cart-row pair. A hung request
/// becomes a per-item failure instead of leaving the item pending forever.
pub const COMMIT_TIMEOUT: Duration = Duration::from_secs(10);

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum CartError {
    /// No signed-in user. A normal user-facing state, not a fault.
    #[error("not signed in")]
    NotAuthenticated,

    /// Checkout was requested with nothing selected.
    #[error("no items selected for checkout")]
    EmptySelection,

    #[error(transparent)]
    Backend(#[from] BackendError),
}

// =============================================================================
// Selection and checkout reporting
// =============================================================================

/// Snapshot taken when a row is toggled into the selection.
///
/// The quantity here is the value at toggle time; if the edit buffer
/// changes afterwards, checkout uses the buffer, never this snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Selected {
    pub book_id: BookId,
    pub quantity: u32,
    pub selected_at: DateTime<Utc>,
}

/// One selected item that failed to commit, with the reason we saw.
///
/// The reason is a display string on purpose: a rejected write and an
/// unreachable store surface identically here, and callers must not try
/// to tell them apart.
#[derive(Debug, Clone)]
pub struct FailedCommit {
    pub cart_item_id: CartItemId,
    pub reason: String,
}

/// Outcome of a checkout batch.
#[derive(Debug, Default)]
pub struct CheckoutReport {
    pub committed: Vec<(CartItemId, OrderId)>,
    pub failed: Vec<FailedCommit>,
}

impl CheckoutReport {
    #[must_use]
    pub fn committed_count(&self) -> usize {
        self.committed.len()
    }

    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    /// True when every selected item committed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// One-line summary naming both counts. Callers surfacing a partial
    /// failure must include the failed count, never drop it.
    #[must_use]
    pub fn summary(&self) -> String {
        if self.is_complete() {
            format!("{} item(s) ordered", self.committed_count())
        } else {
            format!(
                "{} item(s) ordered, {} failed",
                self.committed_count(),
                self.failed_count()
            )
        }
    }
}

enum CommitOutcome {
    Committed(CartItemId, OrderId),
    Failed(CartItemId, String),
}

// =============================================================================
// Session-persisted state
// =============================================================================

/// The parts of the reconciler that outlive a single request: the quantity
/// edit buffer and the selection. Stored in the session and fed back
/// through [`CartReconciler::restore`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CartUiState {
    pub quantities: HashMap<CartItemId, u32>,
    pub selection: HashMap<CartItemId, Selected>,
}

// =============================================================================
// Reconciler
// =============================================================================

/// The local view of one user's cart.
pub struct CartReconciler<B: Backend> {
    backend: B,
    user: UserId,
    rows: Vec<CartItem>,
    quantities: HashMap<CartItemId, u32>,
    selection: HashMap<CartItemId, Selected>,
    books: HashMap<BookId, Book>,
}

impl<B: Backend> CartReconciler<B> {
    /// Fetch the user's cart rows and resolve their books.
    ///
    /// Quantities reset to 1 per row. A missing user is
    /// [`CartError::NotAuthenticated`], which callers render as a sign-in
    /// prompt rather than propagating.
    pub async fn load(backend: B, user: Option<UserId>) -> Result<Self, CartError> {
        let user = user.ok_or(CartError::NotAuthenticated)?;
        let rows = backend.list_cart_items(&user).await?;
        let quantities = rows.iter().map(|row| (row.id.clone(), 1)).collect();
        let books = resolve_books(&backend, &rows).await;

        Ok(Self {
            backend,
            user,
            rows,
            quantities,
            selection: HashMap::new(),
            books,
        })
    }

    /// Re-apply session state from a previous request.
    ///
    /// Entries for rows that no longer exist are dropped, and selection
    /// entries whose book no longer resolves are dropped too, so nothing
    /// stale survives a reload.
    pub fn restore(&mut self, state: CartUiState) {
        for row in &self.rows {
            if let Some(&quantity) = state.quantities.get(&row.id)
                && quantity >= 1
            {
                self.quantities.insert(row.id.clone(), quantity);
            }
        }
        self.selection = state
            .selection
            .into_iter()
            .filter(|(id, selected)| {
                self.quantities.contains_key(id) && self.books.contains_key(&selected.book_id)
            })
            .collect();
    }

    /// Snapshot the session-persisted parts.
    #[must_use]
    pub fn ui_state(&self) -> CartUiState {
        CartUiState {
            quantities: self.quantities.clone(),
            selection: self.selection.clone(),
        }
    }

    #[must_use]
    pub fn rows(&self) -> &[CartItem] {
        &self.rows
    }

    /// The resolved book for a row, if its lookup succeeded at load time.
    #[must_use]
    pub fn book(&self, id: &BookId) -> Option<&Book> {
        self.books.get(id)
    }

    #[must_use]
    pub fn quantity(&self, id: &CartItemId) -> Option<u32> {
        self.quantities.get(id).copied()
    }

    #[must_use]
    pub fn is_selected(&self, id: &CartItemId) -> bool {
        self.selection.contains_key(id)
    }

    /// A row is eligible for display and checkout only when its book
    /// resolved. Dangling rows are hidden, never a batch failure.
    #[must_use]
    pub fn is_eligible(&self, row: &CartItem) -> bool {
        self.books.contains_key(&row.book_id)
    }

    /// Update a row's quantity buffer.
    ///
    /// Values below 1 and unknown rows leave the buffer untouched, so the
    /// stored quantity can never become zero, blank, or negative. Nothing
    /// is persisted.
    pub fn set_quantity(&mut self, id: &CartItemId, value: i64) {
        if value < 1 {
            return;
        }
        let Ok(value) = u32::try_from(value) else {
            return;
        };
        if self.quantities.contains_key(id) {
            self.quantities.insert(id.clone(), value);
        }
    }

    /// Add or remove a row from the checkout selection.
    ///
    /// Selecting snapshots the book reference and the current quantity.
    /// Rows without a resolved book cannot be selected.
    pub fn toggle_select(&mut self, id: &CartItemId, checked: bool) {
        if !checked {
            self.selection.remove(id);
            return;
        }
        let Some(row) = self.rows.iter().find(|row| row.id == *id) else {
            return;
        };
        if !self.books.contains_key(&row.book_id) {
            return;
        }
        let quantity = self.quantities.get(id).copied().unwrap_or(1);
        self.selection.insert(
            id.clone(),
            Selected {
                book_id: row.book_id.clone(),
                quantity,
                selected_at: Utc::now(),
            },
        );
    }

    /// Delete a cart row, then drop it from rows, quantities, and
    /// selection together so no later operation can reference it.
    pub async fn delete_item(&mut self, id: &CartItemId) -> Result<(), CartError> {
        match self.backend.delete_cart_item(id).await {
            Ok(()) => {}
            // The row was already gone; dropping it locally is the point.
            Err(err) if err.is_not_found() => {}
            Err(err) => return Err(err.into()),
        }
        self.forget(std::slice::from_ref(id));
        Ok(())
    }

    /// Commit every selected item: create its order, then delete its cart
    /// row. Items succeed or fail independently; committed items leave the
    /// local state, failed ones stay put for another attempt.
    pub async fn checkout(&mut self) -> Result<CheckoutReport, CartError> {
        if self.selection.is_empty() {
            return Err(CartError::EmptySelection);
        }

        let created_at = Utc::now();
        let commits: Vec<_> = self
            .selection
            .iter()
            .map(|(id, selected)| {
                // Freshest quantity wins over the selection snapshot.
                let quantity = self
                    .quantities
                    .get(id)
                    .copied()
                    .unwrap_or(selected.quantity);
                commit_one(
                    self.backend.clone(),
                    self.user.clone(),
                    id.clone(),
                    selected.book_id.clone(),
                    quantity,
                    created_at,
                )
            })
            .collect();

        let mut report = CheckoutReport::default();
        for outcome in join_all(commits).await {
            match outcome {
                CommitOutcome::Committed(cart_item_id, order_id) => {
                    report.committed.push((cart_item_id, order_id));
                }
                CommitOutcome::Failed(cart_item_id, reason) => {
                    tracing::warn!(cart_item = %cart_item_id, %reason, "checkout commit failed");
                    report.failed.push(FailedCommit {
                        cart_item_id,
                        reason,
                    });
                }
            }
        }

        let committed_ids: Vec<_> = report.committed.iter().map(|(id, _)| id.clone()).collect();
        self.forget(&committed_ids);
        Ok(report)
    }

    /// Rebuild rows, quantities, and selection without the given ids.
    fn forget(&mut self, ids: &[CartItemId]) {
        self.rows.retain(|row| !ids.contains(&row.id));
        self.quantities.retain(|id, _| !ids.contains(id));
        self.selection.retain(|id, _| !ids.contains(id));
    }
}

/// Create the order for one selected item and, only once that succeeds,
/// delete its cart row. Any error on either step, and the timeout, fold
/// into the same per-item failure.
async fn commit_one<B: Backend>(
    backend: B,
    user: UserId,
    cart_item_id: CartItemId,
    book_id: BookId,
    quantity: u32,
    created_at: DateTime<Utc>,
) -> CommitOutcome {
    let pair = async {
        let order_id = backend
            .create_order(&user, &book_id, quantity, created_at)
            .await?;
        backend.delete_cart_item(&cart_item_id).await?;
        Ok::<_, BackendError>(order_id)
    };
    match timeout(COMMIT_TIMEOUT, pair).await {
        Ok(Ok(order_id)) => CommitOutcome::Committed(cart_item_id, order_id),
        Ok(Err(err)) => CommitOutcome::Failed(cart_item_id, err.to_string()),
        Err(_) => CommitOutcome::Failed(cart_item_id, "commit timed out".to_string()),
    }
}

/// Fetch the book for every distinct reference in the rows. Lookups that
/// fail for any reason leave their books absent; the affected rows are
/// hidden rather than failing the load.
async fn resolve_books<B: Backend>(backend: &B, rows: &[CartItem]) -> HashMap<BookId, Book> {
    let mut ids: Vec<&BookId> = rows.iter().map(|row| &row.book_id).collect();
    ids.sort();
    ids.dedup();

    let fetches = ids.into_iter().map(|id| backend.get_book(id));
    join_all(fetches)
        .await
        .into_iter()
        .filter_map(Result::ok)
        .map(|book| (book.id.clone(), book))
        .collect()
}
