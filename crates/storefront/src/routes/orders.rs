//! Order history.

use std::collections::HashMap;

use axum::{Json, extract::State};
use futures::future::join_all;
use serde::Serialize;

use paper_lantern_core::{BookId, OrderId, Price};

use crate::backend::Backend;
use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::{Book, Order};
use crate::state::AppState;

/// One order with its book denormalized in. The book is `None` when it
/// was deleted after the order was placed; the row still renders.
#[derive(Debug, Serialize)]
pub struct OrderView {
    pub order_id: OrderId,
    pub book: Option<Book>,
    pub quantity: u32,
    pub line_total: Option<Price>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// GET /orders
///
/// Newest first. Book lookups that fail skip only their own row's book
/// data, never the listing.
pub async fn index<B: Backend>(
    State(state): State<AppState<B>>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<OrderView>>> {
    let mut orders: Vec<Order> = state.backend().list_orders(&user.id).await?;
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let books = resolve_books(state.backend(), &orders).await;

    let views = orders
        .into_iter()
        .map(|order| {
            let book = books.get(&order.book_id).cloned();
            let line_total = book.as_ref().map(|b| b.price.line_total(order.quantity));
            OrderView {
                order_id: order.id,
                book,
                quantity: order.quantity,
                line_total,
                created_at: order.created_at,
            }
        })
        .collect();

    Ok(Json(views))
}

async fn resolve_books<B: Backend>(backend: &B, orders: &[Order]) -> HashMap<BookId, Book> {
    let mut ids: Vec<&BookId> = orders.iter().map(|order| &order.book_id).collect();
    ids.sort();
    ids.dedup();

    join_all(ids.into_iter().map(|id| backend.get_book(id)))
        .await
        .into_iter()
        .filter_map(std::result::Result::ok)
        .map(|book| (book.id.clone(), book))
        .collect()
}
