//! Session middleware configuration.
//!
//! Sets up in-memory sessions using tower-sessions. User identity and the
//! cart's quantity/selection buffers live here between requests.

use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "pl_session";

/// Session expiry in seconds (24 hours of inactivity).
const SESSION_EXPIRY_SECONDS: i64 = 60 * 60 * 24;

/// Create the session management layer.
#[must_use]
pub fn create_session_layer() -> SessionManagerLayer<MemoryStore> {
    let store = MemoryStore::default();

    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
}
