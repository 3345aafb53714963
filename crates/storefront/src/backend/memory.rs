//! In-process backend for tests and CLI dry runs.
//!
//! Holds the four collections in plain maps behind an `RwLock`. Fault
//! injection switches let tests fail or delay individual writes, which is
//! how the checkout partial-failure and timeout paths get exercised
//! without a network.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};

use paper_lantern_core::{BookId, CartItemId, GenreId, OrderId, UserId};

use super::{Backend, BackendError};
use crate::models::{Book, BookPatch, CartItem, Genre, NewBook, Order};

#[derive(Default)]
struct MemoryState {
    books: BTreeMap<BookId, Book>,
    genres: BTreeMap<GenreId, Genre>,
    carts: BTreeMap<CartItemId, CartItem>,
    orders: BTreeMap<OrderId, Order>,
    next_id: u64,

    // Fault injection
    offline: bool,
    fail_order_creates: HashSet<BookId>,
    delay_order_creates: HashMap<BookId, Duration>,
    fail_cart_deletes: HashSet<CartItemId>,
}

impl MemoryState {
    fn alloc_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }
}

/// An in-memory [`Backend`].
#[derive(Clone, Default)]
pub struct MemoryBackend {
    state: Arc<RwLock<MemoryState>>,
}

/// The lock is only poisoned if another thread panicked mid-write; treat
/// that as a store failure rather than propagating the panic.
macro_rules! read_state {
    ($self:ident) => {
        $self
            .state
            .read()
            .map_err(|_| BackendError::Rejected("memory store poisoned".to_string()))?
    };
}

macro_rules! write_state {
    ($self:ident) => {
        $self
            .state
            .write()
            .map_err(|_| BackendError::Rejected("memory store poisoned".to_string()))?
    };
}

impl MemoryBackend {
    /// Create an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a book directly, returning its ID.
    ///
    /// # Panics
    ///
    /// Panics if the state lock is poisoned.
    #[must_use]
    pub fn seed_book(&self, book: NewBook) -> BookId {
        let mut state = self.state.write().expect("state lock");
        let id = BookId::new(state.alloc_id("book"));
        state.books.insert(
            id.clone(),
            Book {
                id: id.clone(),
                name: book.name,
                author: book.author,
                price: book.price,
                genre: book.genre,
                cover_image: book.cover_image,
            },
        );
        id
    }

    /// Make every operation fail, simulating the transport being down.
    ///
    /// # Panics
    ///
    /// Panics if the state lock is poisoned.
    pub fn set_offline(&self, offline: bool) {
        self.state.write().expect("state lock").offline = offline;
    }

    /// Fail order creation for a specific book.
    ///
    /// # Panics
    ///
    /// Panics if the state lock is poisoned.
    pub fn fail_order_creates_for(&self, book: &BookId) {
        self.state
            .write()
            .expect("state lock")
            .fail_order_creates
            .insert(book.clone());
    }

    /// Delay order creation for a specific book (for timeout tests under a
    /// paused tokio clock).
    ///
    /// # Panics
    ///
    /// Panics if the state lock is poisoned.
    pub fn delay_order_creates_for(&self, book: &BookId, delay: Duration) {
        self.state
            .write()
            .expect("state lock")
            .delay_order_creates
            .insert(book.clone(), delay);
    }

    /// Fail deletion of a specific cart row.
    ///
    /// # Panics
    ///
    /// Panics if the state lock is poisoned.
    pub fn fail_cart_deletes_for(&self, id: &CartItemId) {
        self.state
            .write()
            .expect("state lock")
            .fail_cart_deletes
            .insert(id.clone());
    }

    fn check_online(state: &MemoryState) -> Result<(), BackendError> {
        if state.offline {
            return Err(BackendError::Rejected("backend offline".to_string()));
        }
        Ok(())
    }
}

impl Backend for MemoryBackend {
    async fn list_cart_items(&self, user: &UserId) -> Result<Vec<CartItem>, BackendError> {
        let state = read_state!(self);
        Self::check_online(&state)?;
        Ok(state
            .carts
            .values()
            .filter(|item| item.user_id == *user)
            .cloned()
            .collect())
    }

    async fn get_book(&self, id: &BookId) -> Result<Book, BackendError> {
        let state = read_state!(self);
        Self::check_online(&state)?;
        state
            .books
            .get(id)
            .cloned()
            .ok_or_else(|| BackendError::NotFound(format!("books/{id}")))
    }

    async fn create_order(
        &self,
        user: &UserId,
        book: &BookId,
        quantity: u32,
        created_at: DateTime<Utc>,
    ) -> Result<OrderId, BackendError> {
        let delay = {
            let state = read_state!(self);
            Self::check_online(&state)?;
            state.delay_order_creates.get(book).copied()
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = write_state!(self);
        if state.fail_order_creates.contains(book) {
            return Err(BackendError::Rejected(format!(
                "order create failed for {book}"
            )));
        }

        let id = OrderId::new(state.alloc_id("order"));
        state.orders.insert(
            id.clone(),
            Order {
                id: id.clone(),
                user_id: user.clone(),
                book_id: book.clone(),
                quantity,
                created_at,
            },
        );
        Ok(id)
    }

    async fn delete_cart_item(&self, id: &CartItemId) -> Result<(), BackendError> {
        let mut state = write_state!(self);
        Self::check_online(&state)?;
        if state.fail_cart_deletes.contains(id) {
            return Err(BackendError::Rejected(format!("cart delete failed for {id}")));
        }
        state
            .carts
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| BackendError::NotFound(format!("carts/{id}")))
    }

    async fn add_cart_item(
        &self,
        user: &UserId,
        book: &BookId,
        quantity: u32,
    ) -> Result<CartItemId, BackendError> {
        let mut state = write_state!(self);
        Self::check_online(&state)?;
        let id = CartItemId::new(state.alloc_id("cart"));
        state.carts.insert(
            id.clone(),
            CartItem {
                id: id.clone(),
                user_id: user.clone(),
                book_id: book.clone(),
                quantity,
            },
        );
        Ok(id)
    }

    async fn list_orders(&self, user: &UserId) -> Result<Vec<Order>, BackendError> {
        let state = read_state!(self);
        Self::check_online(&state)?;
        Ok(state
            .orders
            .values()
            .filter(|order| order.user_id == *user)
            .cloned()
            .collect())
    }

    async fn list_books(&self) -> Result<Vec<Book>, BackendError> {
        let state = read_state!(self);
        Self::check_online(&state)?;
        Ok(state.books.values().cloned().collect())
    }

    async fn list_books_by_genre(&self, genre: &str) -> Result<Vec<Book>, BackendError> {
        let state = read_state!(self);
        Self::check_online(&state)?;
        Ok(state
            .books
            .values()
            .filter(|book| book.genre == genre)
            .cloned()
            .collect())
    }

    async fn list_genres(&self) -> Result<Vec<Genre>, BackendError> {
        let state = read_state!(self);
        Self::check_online(&state)?;
        Ok(state.genres.values().cloned().collect())
    }

    async fn find_genre(&self, name: &str) -> Result<Option<Genre>, BackendError> {
        let state = read_state!(self);
        Self::check_online(&state)?;
        Ok(state
            .genres
            .values()
            .find(|genre| genre.name == name)
            .cloned())
    }

    async fn create_genre(&self, name: &str) -> Result<GenreId, BackendError> {
        let mut state = write_state!(self);
        Self::check_online(&state)?;
        let id = GenreId::new(state.alloc_id("genre"));
        state.genres.insert(
            id.clone(),
            Genre {
                id: id.clone(),
                name: name.to_string(),
            },
        );
        Ok(id)
    }

    async fn create_book(&self, book: NewBook) -> Result<BookId, BackendError> {
        let mut state = write_state!(self);
        Self::check_online(&state)?;
        let id = BookId::new(state.alloc_id("book"));
        state.books.insert(
            id.clone(),
            Book {
                id: id.clone(),
                name: book.name,
                author: book.author,
                price: book.price,
                genre: book.genre,
                cover_image: book.cover_image,
            },
        );
        Ok(id)
    }

    async fn update_book(&self, id: &BookId, patch: BookPatch) -> Result<(), BackendError> {
        let mut state = write_state!(self);
        Self::check_online(&state)?;
        let book = state
            .books
            .get_mut(id)
            .ok_or_else(|| BackendError::NotFound(format!("books/{id}")))?;
        book.name = patch.name;
        book.author = patch.author;
        book.price = patch.price;
        book.genre = patch.genre;
        Ok(())
    }

    async fn delete_book(&self, id: &BookId) -> Result<(), BackendError> {
        let mut state = write_state!(self);
        Self::check_online(&state)?;
        state
            .books
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| BackendError::NotFound(format!("books/{id}")))
    }

    async fn ping(&self) -> Result<(), BackendError> {
        let state = read_state!(self);
        Self::check_online(&state)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paper_lantern_core::Price;

    fn new_book(name: &str, genre: &str) -> NewBook {
        NewBook {
            name: name.to_string(),
            author: "Author".to_string(),
            price: Price::from_cents(1000),
            genre: genre.to_string(),
            cover_image: None,
        }
    }

    #[tokio::test]
    async fn test_book_crud() {
        let backend = MemoryBackend::new();
        let id = backend.create_book(new_book("Dune", "Sci-Fi")).await.expect("create");

        let book = backend.get_book(&id).await.expect("get");
        assert_eq!(book.name, "Dune");

        backend
            .update_book(
                &id,
                BookPatch {
                    name: "Dune Messiah".to_string(),
                    author: "Frank Herbert".to_string(),
                    price: Price::from_cents(1200),
                    genre: "Sci-Fi".to_string(),
                },
            )
            .await
            .expect("update");
        let book = backend.get_book(&id).await.expect("get");
        assert_eq!(book.name, "Dune Messiah");
        assert_eq!(book.price, Price::from_cents(1200));

        backend.delete_book(&id).await.expect("delete");
        assert!(backend.get_book(&id).await.expect_err("gone").is_not_found());
    }

    #[tokio::test]
    async fn test_cart_rows_are_per_user() {
        let backend = MemoryBackend::new();
        let book = backend.seed_book(new_book("Emma", "Classic"));
        let alice = UserId::new("alice");
        let bob = UserId::new("bob");

        let row = backend.add_cart_item(&alice, &book, 1).await.expect("add");
        assert_eq!(backend.list_cart_items(&alice).await.expect("list").len(), 1);
        assert!(backend.list_cart_items(&bob).await.expect("list").is_empty());

        backend.delete_cart_item(&row).await.expect("delete");
        assert!(backend.list_cart_items(&alice).await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn test_offline_fails_everything() {
        let backend = MemoryBackend::new();
        backend.set_offline(true);
        let err = backend
            .list_books()
            .await
            .expect_err("offline should fail");
        assert!(matches!(err, BackendError::Rejected(_)));
    }

    #[tokio::test]
    async fn test_lazy_genre_lookup() {
        let backend = MemoryBackend::new();
        assert!(backend.find_genre("Horror").await.expect("find").is_none());
        backend.create_genre("Horror").await.expect("create");
        let found = backend.find_genre("Horror").await.expect("find");
        assert_eq!(found.expect("genre").name, "Horror");
    }
}
