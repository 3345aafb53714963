//! Cart view and checkout handlers.
//!
//! Each request rebuilds a [`CartReconciler`] from the persisted cart rows
//! and re-applies the session's quantity buffers and selection, so the
//! reconciler always reflects both the store and the user's pending edits.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use paper_lantern_core::{BookId, CartItemId, Price};

use crate::backend::Backend;
use crate::cart::{CartReconciler, CartUiState, CheckoutReport};
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::{Book, CurrentUser, session_keys};
use crate::state::AppState;

// =============================================================================
// View types
// =============================================================================

/// One cart row with its resolved book and pending edits.
#[derive(Debug, Serialize)]
pub struct CartRowView {
    pub cart_item_id: CartItemId,
    pub book: Book,
    pub quantity: u32,
    pub selected: bool,
    pub line_total: Price,
}

/// The whole cart as the client renders it. Rows whose book no longer
/// exists are omitted.
#[derive(Debug, Serialize)]
pub struct CartView {
    pub items: Vec<CartRowView>,
    pub selected_total: Price,
}

fn build_view<B: Backend>(cart: &CartReconciler<B>) -> CartView {
    let mut items = Vec::new();
    let mut selected_total = Price::ZERO;

    for row in cart.rows() {
        let Some(book) = cart.book(&row.book_id) else {
            continue;
        };
        let quantity = cart.quantity(&row.id).unwrap_or(1);
        let selected = cart.is_selected(&row.id);
        let line_total = book.price.line_total(quantity);
        if selected {
            selected_total = selected_total + line_total;
        }
        items.push(CartRowView {
            cart_item_id: row.id.clone(),
            book: book.clone(),
            quantity,
            selected,
            line_total,
        });
    }

    CartView {
        items,
        selected_total,
    }
}

// =============================================================================
// Session plumbing
// =============================================================================

async fn load_cart<B: Backend>(
    state: &AppState<B>,
    session: &Session,
    user: &CurrentUser,
) -> Result<CartReconciler<B>> {
    let mut cart =
        CartReconciler::load(state.backend().clone(), Some(user.id.clone())).await?;
    if let Some(ui) = session.get::<CartUiState>(session_keys::CART_UI).await? {
        cart.restore(ui);
    }
    Ok(cart)
}

async fn save_cart<B: Backend>(session: &Session, cart: &CartReconciler<B>) -> Result<()> {
    session
        .insert(session_keys::CART_UI, &cart.ui_state())
        .await?;
    Ok(())
}

// =============================================================================
// Handlers
// =============================================================================

/// GET /cart
pub async fn show<B: Backend>(
    State(state): State<AppState<B>>,
    session: Session,
    RequireAuth(user): RequireAuth,
) -> Result<Json<CartView>> {
    let cart = load_cart(&state, &session, &user).await?;
    save_cart(&session, &cart).await?;
    Ok(Json(build_view(&cart)))
}

#[derive(Debug, Deserialize)]
pub struct AddRequest {
    pub book_id: BookId,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
}

const fn default_quantity() -> i64 {
    1
}

/// POST /cart/add
pub async fn add<B: Backend>(
    State(state): State<AppState<B>>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Json(request): Json<AddRequest>,
) -> Result<(StatusCode, Json<CartView>)> {
    let quantity = u32::try_from(request.quantity)
        .ok()
        .filter(|&q| q >= 1)
        .ok_or_else(|| AppError::BadRequest("quantity must be a positive integer".to_string()))?;

    // The book must exist when the row is created.
    let book = state
        .backend()
        .get_book(&request.book_id)
        .await
        .map_err(|err| {
            if err.is_not_found() {
                AppError::NotFound(format!("book {}", request.book_id))
            } else {
                AppError::from(err)
            }
        })?;
    state
        .backend()
        .add_cart_item(&user.id, &book.id, quantity)
        .await?;

    let cart = load_cart(&state, &session, &user).await?;
    save_cart(&session, &cart).await?;
    Ok((StatusCode::CREATED, Json(build_view(&cart))))
}

#[derive(Debug, Deserialize)]
pub struct QuantityRequest {
    pub cart_item_id: CartItemId,
    pub quantity: i64,
}

/// POST /cart/quantity
///
/// Values below 1 leave the buffer unchanged rather than erroring; the
/// response shows the quantity actually in effect.
pub async fn quantity<B: Backend>(
    State(state): State<AppState<B>>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Json(request): Json<QuantityRequest>,
) -> Result<Json<CartView>> {
    let mut cart = load_cart(&state, &session, &user).await?;
    cart.set_quantity(&request.cart_item_id, request.quantity);
    save_cart(&session, &cart).await?;
    Ok(Json(build_view(&cart)))
}

#[derive(Debug, Deserialize)]
pub struct SelectRequest {
    pub cart_item_id: CartItemId,
    pub selected: bool,
}

/// POST /cart/select
pub async fn select<B: Backend>(
    State(state): State<AppState<B>>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Json(request): Json<SelectRequest>,
) -> Result<Json<CartView>> {
    let mut cart = load_cart(&state, &session, &user).await?;
    cart.toggle_select(&request.cart_item_id, request.selected);
    save_cart(&session, &cart).await?;
    Ok(Json(build_view(&cart)))
}

#[derive(Debug, Deserialize)]
pub struct RemoveRequest {
    pub cart_item_id: CartItemId,
}

/// POST /cart/remove
pub async fn remove<B: Backend>(
    State(state): State<AppState<B>>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Json(request): Json<RemoveRequest>,
) -> Result<Json<CartView>> {
    let mut cart = load_cart(&state, &session, &user).await?;
    cart.delete_item(&request.cart_item_id).await?;
    save_cart(&session, &cart).await?;
    Ok(Json(build_view(&cart)))
}

/// Checkout outcome as reported to the client. A partial failure is a
/// normal response, not an error status; the message always names the
/// failed count.
#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub committed_count: usize,
    pub failed_count: usize,
    pub complete: bool,
    pub message: String,
    pub cart: CartView,
}

/// POST /cart/checkout
pub async fn checkout<B: Backend>(
    State(state): State<AppState<B>>,
    session: Session,
    RequireAuth(user): RequireAuth,
) -> Result<Json<CheckoutResponse>> {
    let mut cart = load_cart(&state, &session, &user).await?;
    let report: CheckoutReport = cart.checkout().await?;
    save_cart(&session, &cart).await?;

    Ok(Json(CheckoutResponse {
        committed_count: report.committed_count(),
        failed_count: report.failed_count(),
        complete: report.is_complete(),
        message: report.summary(),
        cart: build_view(&cart),
    }))
}
