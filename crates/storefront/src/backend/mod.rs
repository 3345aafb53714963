//! Data access for the external document store.
//!
//! # Architecture
//!
//! The document store is an opaque managed service; everything the
//! application needs from it goes through the [`Backend`] trait. The trait
//! is injected where it is consumed (reconciler, routes, CLI) instead of
//! living in an ambient global, so tests can swap in [`MemoryBackend`]
//! without touching the network.
//!
//! Implementations:
//!
//! - [`FirestoreBackend`] - the production client against the Firestore
//!   REST document API
//! - [`MemoryBackend`] - in-process maps for tests and CLI dry runs

mod firestore;
pub mod memory;

pub use firestore::{FirestoreBackend, FirestoreConfig};
pub use memory::MemoryBackend;

use std::future::Future;

use chrono::{DateTime, Utc};
use thiserror::Error;

use paper_lantern_core::{BookId, CartItemId, GenreId, OrderId, UserId};

use crate::models::{Book, BookPatch, CartItem, Genre, NewBook, Order};

/// Errors that can occur when talking to the document store.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP request failed (connection, TLS, timeout).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Referenced document does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The store rejected the operation (permissions, validation).
    #[error("rejected: {0}")]
    Rejected(String),

    /// A document exists but is missing or corrupting expected fields.
    #[error("corrupt document: {0}")]
    Corrupt(String),
}

impl BackendError {
    /// Whether this error means the referenced document is absent, as
    /// opposed to the store being unreachable or misbehaving.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// The data-access contract the bookstore consumes.
///
/// Methods return `Send` futures so they compose inside handler tasks.
/// Callers must treat every error as a per-row/per-item condition where the
/// operation allows it: a transport failure and a rejected write surface
/// through the same path and are deliberately indistinguishable.
pub trait Backend: Clone + Send + Sync + 'static {
    /// List the cart rows owned by a user.
    fn list_cart_items(
        &self,
        user: &UserId,
    ) -> impl Future<Output = Result<Vec<CartItem>, BackendError>> + Send;

    /// Fetch a single book. `NotFound` when the document is absent.
    fn get_book(&self, id: &BookId) -> impl Future<Output = Result<Book, BackendError>> + Send;

    /// Create an order row.
    fn create_order(
        &self,
        user: &UserId,
        book: &BookId,
        quantity: u32,
        created_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<OrderId, BackendError>> + Send;

    /// Delete a cart row.
    fn delete_cart_item(
        &self,
        id: &CartItemId,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// Add a cart row for a user.
    fn add_cart_item(
        &self,
        user: &UserId,
        book: &BookId,
        quantity: u32,
    ) -> impl Future<Output = Result<CartItemId, BackendError>> + Send;

    /// List a user's orders.
    fn list_orders(
        &self,
        user: &UserId,
    ) -> impl Future<Output = Result<Vec<Order>, BackendError>> + Send;

    /// List the whole catalog.
    fn list_books(&self) -> impl Future<Output = Result<Vec<Book>, BackendError>> + Send;

    /// List books matching a genre name exactly.
    fn list_books_by_genre(
        &self,
        genre: &str,
    ) -> impl Future<Output = Result<Vec<Book>, BackendError>> + Send;

    /// List every genre.
    fn list_genres(&self) -> impl Future<Output = Result<Vec<Genre>, BackendError>> + Send;

    /// Find a genre by its display name.
    fn find_genre(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Option<Genre>, BackendError>> + Send;

    /// Create a genre.
    fn create_genre(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<GenreId, BackendError>> + Send;

    /// Create a book.
    fn create_book(
        &self,
        book: NewBook,
    ) -> impl Future<Output = Result<BookId, BackendError>> + Send;

    /// Update every editable field of a book.
    fn update_book(
        &self,
        id: &BookId,
        patch: BookPatch,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// Delete a book. Historic orders and cart rows keep their dangling
    /// references; readers skip them row-by-row.
    fn delete_book(&self, id: &BookId) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// Cheap connectivity probe for readiness checks.
    fn ping(&self) -> impl Future<Output = Result<(), BackendError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_display() {
        let err = BackendError::NotFound("books/abc".to_string());
        assert_eq!(err.to_string(), "not found: books/abc");

        let err = BackendError::Rejected("permission denied".to_string());
        assert_eq!(err.to_string(), "rejected: permission denied");
    }

    #[test]
    fn test_is_not_found() {
        assert!(BackendError::NotFound("x".into()).is_not_found());
        assert!(!BackendError::Corrupt("x".into()).is_not_found());
    }
}
