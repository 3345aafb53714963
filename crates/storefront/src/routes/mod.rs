//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Health check
//! GET  /health/ready           - Readiness check (pings the document store)
//!
//! # Catalog
//! GET  /books                  - Book listing
//! GET  /books/{id}             - Book detail
//! GET  /books/genre/{genre}    - Books filtered by genre name
//! GET  /genres                 - Genre listing
//! POST /books/{id}/buy         - Direct order, bypassing the cart (requires auth)
//!
//! # Cart (requires auth)
//! GET  /cart                   - Cart view with resolved books
//! POST /cart/add               - Add a book to the cart
//! POST /cart/quantity          - Update a row's quantity buffer
//! POST /cart/select            - Toggle a row's checkout selection
//! POST /cart/remove            - Delete a cart row
//! POST /cart/checkout          - Commit the selection to orders
//!
//! # Orders (requires auth)
//! GET  /orders                 - Order history with resolved books
//!
//! # Admin
//! POST   /admin/books          - Create a book (creates its genre lazily)
//! PUT    /admin/books/{id}     - Update a book
//! DELETE /admin/books/{id}     - Delete a book
//!
//! # Auth
//! POST /auth/register          - Register an email/password account
//! POST /auth/login             - Sign in
//! POST /auth/logout            - Sign out
//!
//! # Image uploads
//! GET  /images/auth            - Short-lived upload-signing credentials
//! ```

pub mod admin;
pub mod auth;
pub mod books;
pub mod cart;
pub mod images;
pub mod orders;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{delete, get, post, put},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::backend::Backend;
use crate::middleware::create_session_layer;
use crate::state::AppState;

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Verifies document store connectivity before returning OK.
/// Returns 503 Service Unavailable if the store is not reachable.
async fn readiness<B: Backend>(State(state): State<AppState<B>>) -> StatusCode {
    match state.backend().ping().await {
        Ok(()) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// Assemble the full application: routes, session layer, request tracing.
///
/// The binary wraps this with the Sentry layers; tests drive it directly.
pub fn app<B: Backend>(state: AppState<B>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness::<B>))
        .merge(routes())
        .layer(create_session_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Create the catalog routes router.
pub fn book_routes<B: Backend>() -> Router<AppState<B>> {
    Router::new()
        .route("/", get(books::index))
        .route("/{id}", get(books::show))
        .route("/{id}/buy", post(books::buy))
        .route("/genre/{genre}", get(books::by_genre))
}

/// Create the cart routes router.
pub fn cart_routes<B: Backend>() -> Router<AppState<B>> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/quantity", post(cart::quantity))
        .route("/select", post(cart::select))
        .route("/remove", post(cart::remove))
        .route("/checkout", post(cart::checkout))
}

/// Create the admin routes router.
pub fn admin_routes<B: Backend>() -> Router<AppState<B>> {
    Router::new()
        .route("/books", post(admin::create_book))
        .route("/books/{id}", put(admin::update_book))
        .route("/books/{id}", delete(admin::delete_book))
}

/// Create the auth routes router.
pub fn auth_routes<B: Backend>() -> Router<AppState<B>> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
}

/// Create the image upload signing router.
///
/// The signing endpoint is called cross-origin by the upload widget, so
/// it carries a permissive CORS layer.
pub fn image_routes<B: Backend>() -> Router<AppState<B>> {
    Router::new()
        .route("/auth", get(images::auth))
        .layer(CorsLayer::permissive())
}

/// Create all routes for the storefront.
pub fn routes<B: Backend>() -> Router<AppState<B>> {
    Router::new()
        .nest("/books", book_routes())
        .route("/genres", get(books::genres))
        .nest("/cart", cart_routes())
        .route("/orders", get(orders::index))
        .nest("/admin", admin_routes())
        .nest("/auth", auth_routes())
        .nest("/images", image_routes())
}
