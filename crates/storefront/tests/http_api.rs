//! End-to-end tests of the HTTP surface against the in-memory backend.
//!
//! Authenticated flows run against a mock identity provider bound to an
//! ephemeral local port; everything else goes through the router directly.

use axum::{
    Json, Router,
    body::Body,
    http::{Request, StatusCode, header},
    routing::post,
};
use http_body_util::BodyExt;
use secrecy::SecretString;
use tower::ServiceExt;

use paper_lantern_core::Price;
use paper_lantern_storefront::backend::MemoryBackend;
use paper_lantern_storefront::config::{
    FirestoreEnvConfig, IdentityConfig, StorefrontConfig,
};
use paper_lantern_storefront::models::NewBook;
use paper_lantern_storefront::routes;
use paper_lantern_storefront::services::identity::IdentityClient;
use paper_lantern_storefront::state::AppState;

// =============================================================================
// Test harness
// =============================================================================

fn test_config(identity_base_url: String, with_upload_key: bool) -> StorefrontConfig {
    StorefrontConfig {
        host: "127.0.0.1".parse().expect("addr"),
        port: 0,
        firestore: FirestoreEnvConfig {
            project_id: "bookstore-test".to_string(),
            database: "(default)".to_string(),
            base_url: "http://127.0.0.1:1".to_string(),
        },
        identity: IdentityConfig {
            api_key: SecretString::from("aB3$xY9!mK2@nL5#"),
            base_url: identity_base_url,
        },
        imagekit_private_key: with_upload_key
            .then(|| SecretString::from("upload_signing_test_key")),
        sentry_dsn: None,
    }
}

fn test_app(backend: MemoryBackend, identity_base_url: String, with_upload_key: bool) -> Router {
    let config = test_config(identity_base_url.clone(), with_upload_key);
    let identity = IdentityClient::new(config.identity.clone());
    routes::app(AppState::new(config, backend, identity))
}

/// Serve a stub of the identity provider on an ephemeral port. Accepts any
/// credentials and reports a fixed user.
async fn spawn_mock_identity() -> String {
    async fn accounts() -> Json<serde_json::Value> {
        Json(serde_json::json!({
            "localId": "user-test-1",
            "email": "reader@example.com",
            "idToken": "unused",
        }))
    }

    let router = Router::new()
        .route("/v1/accounts:signInWithPassword", post(accounts))
        .route("/v1/accounts:signUp", post(accounts));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock identity");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("mock identity");
    });
    format!("http://{addr}")
}

fn seed_book(backend: &MemoryBackend, name: &str) -> paper_lantern_core::BookId {
    backend.seed_book(NewBook {
        name: name.to_string(),
        author: "Author".to_string(),
        price: Price::from_cents(1299),
        genre: "Fiction".to_string(),
        cover_image: None,
    })
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("json body")
}

fn get(path: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(path);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).expect("request")
}

fn post_json(path: &str, cookie: Option<&str>, body: &serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("request")
}

fn session_cookie(response: &axum::response::Response) -> String {
    let raw = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("set-cookie header")
        .to_str()
        .expect("cookie string");
    // Keep only the name=value pair.
    raw.split(';').next().expect("cookie pair").to_string()
}

/// Sign in through the mock identity provider and return the session cookie.
async fn sign_in(app: &Router) -> String {
    let response = app
        .clone()
        .oneshot(post_json(
            "/auth/login",
            None,
            &serde_json::json!({ "email": "reader@example.com", "password": "pw" }),
        ))
        .await
        .expect("login");
    assert_eq!(response.status(), StatusCode::OK);
    session_cookie(&response)
}

// =============================================================================
// Unauthenticated surface
// =============================================================================

#[tokio::test]
async fn test_health_ok() {
    let app = test_app(MemoryBackend::new(), "http://127.0.0.1:1".to_string(), false);
    let response = app.oneshot(get("/health", None)).await.expect("health");
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_readiness_reflects_backend() {
    let backend = MemoryBackend::new();
    let app = test_app(backend.clone(), "http://127.0.0.1:1".to_string(), false);

    let response = app
        .clone()
        .oneshot(get("/health/ready", None))
        .await
        .expect("ready");
    assert_eq!(response.status(), StatusCode::OK);

    backend.set_offline(true);
    let response = app.oneshot(get("/health/ready", None)).await.expect("ready");
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_book_listing_and_detail() {
    let backend = MemoryBackend::new();
    let id = seed_book(&backend, "The Remains of the Day");
    let app = test_app(backend, "http://127.0.0.1:1".to_string(), false);

    let response = app.clone().oneshot(get("/books", None)).await.expect("list");
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body.as_array().expect("array").len(), 1);

    let response = app
        .clone()
        .oneshot(get(&format!("/books/{id}"), None))
        .await
        .expect("detail");
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["name"], "The Remains of the Day");

    let response = app
        .oneshot(get("/books/missing", None))
        .await
        .expect("missing");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_genre_filter() {
    let backend = MemoryBackend::new();
    seed_book(&backend, "Dune");
    let app = test_app(backend, "http://127.0.0.1:1".to_string(), false);

    let response = app
        .clone()
        .oneshot(get("/books/genre/Fiction", None))
        .await
        .expect("by genre");
    let body = json_body(response).await;
    assert_eq!(body.as_array().expect("array").len(), 1);

    let response = app
        .oneshot(get("/books/genre/Poetry", None))
        .await
        .expect("by genre");
    let body = json_body(response).await;
    assert!(body.as_array().expect("array").is_empty());
}

#[tokio::test]
async fn test_cart_requires_auth() {
    let app = test_app(MemoryBackend::new(), "http://127.0.0.1:1".to_string(), false);
    let response = app.oneshot(get("/cart", None)).await.expect("cart");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_upload_auth_without_key_is_500() {
    let app = test_app(MemoryBackend::new(), "http://127.0.0.1:1".to_string(), false);
    let response = app.oneshot(get("/images/auth", None)).await.expect("auth");
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_upload_auth_with_key_returns_credentials() {
    let app = test_app(MemoryBackend::new(), "http://127.0.0.1:1".to_string(), true);
    let response = app.oneshot(get("/images/auth", None)).await.expect("auth");
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert!(body["token"].is_string());
    assert!(body["signature"].is_string());
    assert!(body["expire"].is_i64());
}

// =============================================================================
// Authenticated flows
// =============================================================================

#[tokio::test]
async fn test_login_add_select_checkout_round_trip() {
    let backend = MemoryBackend::new();
    let book = seed_book(&backend, "Piranesi");
    let identity_url = spawn_mock_identity().await;
    let app = test_app(backend, identity_url, false);

    let cookie = sign_in(&app).await;

    // Add the book to the cart.
    let response = app
        .clone()
        .oneshot(post_json(
            "/cart/add",
            Some(&cookie),
            &serde_json::json!({ "book_id": book.as_str() }),
        ))
        .await
        .expect("add");
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await;
    let cart_item_id = body["items"][0]["cart_item_id"]
        .as_str()
        .expect("cart item id")
        .to_string();

    // Bump the quantity, then select the row.
    let response = app
        .clone()
        .oneshot(post_json(
            "/cart/quantity",
            Some(&cookie),
            &serde_json::json!({ "cart_item_id": cart_item_id, "quantity": 2 }),
        ))
        .await
        .expect("quantity");
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(post_json(
            "/cart/select",
            Some(&cookie),
            &serde_json::json!({ "cart_item_id": cart_item_id, "selected": true }),
        ))
        .await
        .expect("select");
    let body = json_body(response).await;
    assert_eq!(body["items"][0]["selected"], true);
    assert_eq!(body["items"][0]["quantity"], 2);

    // Commit.
    let response = app
        .clone()
        .oneshot(post_json(
            "/cart/checkout",
            Some(&cookie),
            &serde_json::json!({}),
        ))
        .await
        .expect("checkout");
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["committed_count"], 1);
    assert_eq!(body["failed_count"], 0);
    assert_eq!(body["complete"], true);
    assert!(body["cart"]["items"].as_array().expect("items").is_empty());

    // The order shows up exactly once with the committed quantity.
    let response = app
        .clone()
        .oneshot(get("/orders", Some(&cookie)))
        .await
        .expect("orders");
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let orders = body.as_array().expect("orders array");
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["quantity"], 2);
    assert_eq!(orders[0]["book"]["name"], "Piranesi");
}

#[tokio::test]
async fn test_checkout_reports_partial_failure() {
    let backend = MemoryBackend::new();
    let book_a = seed_book(&backend, "Book A");
    let book_b = seed_book(&backend, "Book B");
    backend.fail_order_creates_for(&book_b);

    let identity_url = spawn_mock_identity().await;
    let app = test_app(backend, identity_url, false);
    let cookie = sign_in(&app).await;

    for book in [&book_a, &book_b] {
        let response = app
            .clone()
            .oneshot(post_json(
                "/cart/add",
                Some(&cookie),
                &serde_json::json!({ "book_id": book.as_str() }),
            ))
            .await
            .expect("add");
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = app
        .clone()
        .oneshot(get("/cart", Some(&cookie)))
        .await
        .expect("cart");
    let body = json_body(response).await;
    for item in body["items"].as_array().expect("items") {
        let cart_item_id = item["cart_item_id"].as_str().expect("id");
        let response = app
            .clone()
            .oneshot(post_json(
                "/cart/select",
                Some(&cookie),
                &serde_json::json!({ "cart_item_id": cart_item_id, "selected": true }),
            ))
            .await
            .expect("select");
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .clone()
        .oneshot(post_json(
            "/cart/checkout",
            Some(&cookie),
            &serde_json::json!({}),
        ))
        .await
        .expect("checkout");
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["committed_count"], 1);
    assert_eq!(body["failed_count"], 1);
    assert_eq!(body["complete"], false);
    let message = body["message"].as_str().expect("message");
    assert!(message.contains("1 failed"), "message was: {message}");
    // The failed row is still in the cart.
    assert_eq!(body["cart"]["items"].as_array().expect("items").len(), 1);
}

#[tokio::test]
async fn test_checkout_with_empty_selection_is_bad_request() {
    let identity_url = spawn_mock_identity().await;
    let app = test_app(MemoryBackend::new(), identity_url, false);
    let cookie = sign_in(&app).await;

    let response = app
        .oneshot(post_json(
            "/cart/checkout",
            Some(&cookie),
            &serde_json::json!({}),
        ))
        .await
        .expect("checkout");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_buy_now_validates_quantity() {
    let backend = MemoryBackend::new();
    let book = seed_book(&backend, "Dune");
    let identity_url = spawn_mock_identity().await;
    let app = test_app(backend, identity_url, false);
    let cookie = sign_in(&app).await;

    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/books/{book}/buy"),
            Some(&cookie),
            &serde_json::json!({ "quantity": 0 }),
        ))
        .await
        .expect("buy");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(post_json(
            &format!("/books/{book}/buy"),
            Some(&cookie),
            &serde_json::json!({ "quantity": 3 }),
        ))
        .await
        .expect("buy");
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_admin_create_book_creates_genre_lazily() {
    let backend = MemoryBackend::new();
    let identity_url = spawn_mock_identity().await;
    let app = test_app(backend, identity_url, false);
    let cookie = sign_in(&app).await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/admin/books",
            Some(&cookie),
            &serde_json::json!({
                "name": "Ficciones",
                "author": "Jorge Luis Borges",
                "price": "15.00",
                "genre": "Short Stories",
            }),
        ))
        .await
        .expect("create");
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .clone()
        .oneshot(get("/genres", None))
        .await
        .expect("genres");
    let body = json_body(response).await;
    let genres = body.as_array().expect("genres");
    assert_eq!(genres.len(), 1);
    assert_eq!(genres[0]["name"], "Short Stories");

    // A second book in the same genre does not create a duplicate.
    let response = app
        .clone()
        .oneshot(post_json(
            "/admin/books",
            Some(&cookie),
            &serde_json::json!({
                "name": "The Aleph",
                "author": "Jorge Luis Borges",
                "price": "12.50",
                "genre": "Short Stories",
            }),
        ))
        .await
        .expect("create");
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app.oneshot(get("/genres", None)).await.expect("genres");
    let body = json_body(response).await;
    assert_eq!(body.as_array().expect("genres").len(), 1);
}

#[tokio::test]
async fn test_logout_clears_session() {
    let identity_url = spawn_mock_identity().await;
    let app = test_app(MemoryBackend::new(), identity_url, false);
    let cookie = sign_in(&app).await;

    let response = app
        .clone()
        .oneshot(post_json("/auth/logout", Some(&cookie), &serde_json::json!({})))
        .await
        .expect("logout");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .oneshot(get("/cart", Some(&cookie)))
        .await
        .expect("cart");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
