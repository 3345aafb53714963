//! Domain models for the bookstore.
//!
//! These are the application's view of the documents the external store
//! holds. The store's collections (`books`, `bookGenre`, `carts`, `orders`)
//! are converted into these types at the backend boundary; nothing outside
//! `backend` sees wire formats.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use paper_lantern_core::{BookId, CartItemId, Email, GenreId, OrderId, Price, UserId};

/// A book in the catalog.
///
/// Created by the admin flow, mutated by admin update, deleted by admin
/// delete. Treated as immutable once referenced by an order - deleting a
/// book leaves historic orders and cart rows dangling, which readers must
/// tolerate row-by-row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    pub name: String,
    pub author: String,
    pub price: Price,
    pub genre: String,
    /// Publicly addressable cover image URL from the image host.
    pub cover_image: Option<String>,
}

/// Input for creating a book.
#[derive(Debug, Clone)]
pub struct NewBook {
    pub name: String,
    pub author: String,
    pub price: Price,
    pub genre: String,
    pub cover_image: Option<String>,
}

/// Full-field update for a book (the admin edit form submits every field).
#[derive(Debug, Clone)]
pub struct BookPatch {
    pub name: String,
    pub author: String,
    pub price: Price,
    pub genre: String,
}

/// A genre, created lazily the first time a book is added with a previously
/// unseen genre name. Never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Genre {
    pub id: GenreId,
    pub name: String,
}

/// A persisted cart row linking a user to a book.
///
/// Never updated in place: quantity edits live in the reconciler's edit
/// buffers and are re-derived at checkout time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItem {
    pub id: CartItemId,
    pub user_id: UserId,
    pub book_id: BookId,
    pub quantity: u32,
}

/// A placed order. Never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub book_id: BookId,
    pub quantity: u32,
    /// Sortable instant, serialized as RFC 3339.
    pub created_at: DateTime<Utc>,
}

/// Session-stored user identity.
///
/// The identity provider owns user records; this is the minimal slice the
/// application keeps per session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: UserId,
    pub email: Email,
}

/// Session keys for per-session state.
pub mod session_keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the cart quantity buffers and checkout selection.
    pub const CART_UI: &str = "cart_ui";
}
