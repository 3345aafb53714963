//! Catalog browsing and the direct "buy now" order.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use serde::Deserialize;

use paper_lantern_core::{BookId, OrderId};

use crate::backend::Backend;
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::{Book, Genre};
use crate::state::AppState;

/// GET /books
pub async fn index<B: Backend>(State(state): State<AppState<B>>) -> Result<Json<Vec<Book>>> {
    let books = state.backend().list_books().await?;
    Ok(Json(books))
}

/// GET /books/{id}
pub async fn show<B: Backend>(
    State(state): State<AppState<B>>,
    Path(id): Path<BookId>,
) -> Result<Json<Book>> {
    let book = state.backend().get_book(&id).await.map_err(|err| {
        if err.is_not_found() {
            AppError::NotFound(format!("book {id}"))
        } else {
            err.into()
        }
    })?;
    Ok(Json(book))
}

/// GET /books/genre/{genre}
pub async fn by_genre<B: Backend>(
    State(state): State<AppState<B>>,
    Path(genre): Path<String>,
) -> Result<Json<Vec<Book>>> {
    let books = state.backend().list_books_by_genre(&genre).await?;
    Ok(Json(books))
}

/// GET /genres
pub async fn genres<B: Backend>(State(state): State<AppState<B>>) -> Result<Json<Vec<Genre>>> {
    let genres = state.backend().list_genres().await?;
    Ok(Json(genres))
}

#[derive(Debug, Deserialize)]
pub struct BuyRequest {
    pub quantity: i64,
}

#[derive(Debug, serde::Serialize)]
pub struct BuyResponse {
    pub order_id: OrderId,
}

/// POST /books/{id}/buy
///
/// Places an order for a single book without going through the cart. The
/// book must still exist at order time.
pub async fn buy<B: Backend>(
    State(state): State<AppState<B>>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<BookId>,
    Json(request): Json<BuyRequest>,
) -> Result<(StatusCode, Json<BuyResponse>)> {
    let quantity = u32::try_from(request.quantity)
        .ok()
        .filter(|&q| q >= 1)
        .ok_or_else(|| AppError::BadRequest("quantity must be a positive integer".to_string()))?;

    let book = state.backend().get_book(&id).await.map_err(|err| {
        if err.is_not_found() {
            AppError::NotFound(format!("book {id}"))
        } else {
            AppError::from(err)
        }
    })?;

    let order_id = state
        .backend()
        .create_order(&user.id, &book.id, quantity, Utc::now())
        .await?;

    Ok((StatusCode::CREATED, Json(BuyResponse { order_id })))
}
