//! Admin catalog management.
//!
//! Book create/update/delete against the document store. Creating a book
//! with a previously unseen genre name creates the genre record first, so
//! the genre listing always covers every book.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;

use paper_lantern_core::{BookId, Price};

use crate::backend::Backend;
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::{Book, BookPatch, NewBook};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct BookForm {
    pub name: String,
    pub author: String,
    pub price: Price,
    pub genre: String,
    pub cover_image: Option<String>,
}

fn validate_form(form: &BookForm) -> Result<()> {
    if form.name.trim().is_empty() {
        return Err(AppError::BadRequest("name must not be empty".to_string()));
    }
    if form.author.trim().is_empty() {
        return Err(AppError::BadRequest("author must not be empty".to_string()));
    }
    if form.genre.trim().is_empty() {
        return Err(AppError::BadRequest("genre must not be empty".to_string()));
    }
    Ok(())
}

async fn ensure_genre<B: Backend>(state: &AppState<B>, name: &str) -> Result<()> {
    if state.backend().find_genre(name).await?.is_none() {
        state.backend().create_genre(name).await?;
        tracing::info!(genre = name, "created genre");
    }
    Ok(())
}

/// POST /admin/books
pub async fn create_book<B: Backend>(
    State(state): State<AppState<B>>,
    RequireAuth(_user): RequireAuth,
    Json(form): Json<BookForm>,
) -> Result<(StatusCode, Json<Book>)> {
    validate_form(&form)?;
    ensure_genre(&state, &form.genre).await?;

    let id = state
        .backend()
        .create_book(NewBook {
            name: form.name,
            author: form.author,
            price: form.price,
            genre: form.genre,
            cover_image: form.cover_image,
        })
        .await?;

    let book = state.backend().get_book(&id).await?;
    Ok((StatusCode::CREATED, Json(book)))
}

/// PUT /admin/books/{id}
pub async fn update_book<B: Backend>(
    State(state): State<AppState<B>>,
    RequireAuth(_user): RequireAuth,
    Path(id): Path<BookId>,
    Json(form): Json<BookForm>,
) -> Result<Json<Book>> {
    validate_form(&form)?;
    ensure_genre(&state, &form.genre).await?;

    state
        .backend()
        .update_book(
            &id,
            BookPatch {
                name: form.name,
                author: form.author,
                price: form.price,
                genre: form.genre,
            },
        )
        .await
        .map_err(|err| {
            if err.is_not_found() {
                AppError::NotFound(format!("book {id}"))
            } else {
                AppError::from(err)
            }
        })?;

    let book = state.backend().get_book(&id).await?;
    Ok(Json(book))
}

/// DELETE /admin/books/{id}
///
/// Existing cart rows and orders keep their dangling reference; readers
/// skip them row-by-row.
pub async fn delete_book<B: Backend>(
    State(state): State<AppState<B>>,
    RequireAuth(_user): RequireAuth,
    Path(id): Path<BookId>,
) -> Result<StatusCode> {
    state.backend().delete_book(&id).await.map_err(|err| {
        if err.is_not_found() {
            AppError::NotFound(format!("book {id}"))
        } else {
            AppError::from(err)
        }
    })?;
    Ok(StatusCode::NO_CONTENT)
}
