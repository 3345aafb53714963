//! REST client for the hosted identity provider.
//!
//! Email/password sign-up and sign-in against the Identity Toolkit API.
//! The provider owns all user records; this client only exchanges
//! credentials for a user ID and surfaces the provider's error codes as
//! typed variants.

use std::sync::Arc;

use secrecy::ExposeSecret;
use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;

use paper_lantern_core::{Email, EmailError, UserId};

use crate::config::IdentityConfig;

#[derive(Debug, Error)]
pub enum AuthError {
    /// The provider rejected the email/password pair. Sign-in with an
    /// unknown email reports this same variant, so callers cannot probe
    /// for registered addresses.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("email already registered")]
    EmailAlreadyExists,

    /// Provider-rejected password with the provider's own message.
    #[error("weak password: {0}")]
    WeakPassword(String),

    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("identity request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Any provider error code we do not specifically handle.
    #[error("identity provider error: {0}")]
    Provider(String),
}

/// A verified identity returned by sign-up or sign-in.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: UserId,
    pub email: Email,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    local_id: String,
    email: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

struct IdentityInner {
    client: reqwest::Client,
    config: IdentityConfig,
}

/// Client for the identity provider's REST API.
#[derive(Clone)]
pub struct IdentityClient {
    inner: Arc<IdentityInner>,
}

impl IdentityClient {
    #[must_use]
    pub fn new(config: IdentityConfig) -> Self {
        Self {
            inner: Arc::new(IdentityInner {
                client: reqwest::Client::new(),
                config,
            }),
        }
    }

    /// Register a new email/password account.
    #[instrument(skip(self, password), fields(email = email))]
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<AuthenticatedUser, AuthError> {
        // Validate locally before a network round trip.
        let _ = Email::parse(email)?;
        self.call("accounts:signUp", email, password).await
    }

    /// Exchange an email/password pair for the user's identity.
    #[instrument(skip(self, password), fields(email = email))]
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthenticatedUser, AuthError> {
        let _ = Email::parse(email)?;
        self.call("accounts:signInWithPassword", email, password)
            .await
    }

    async fn call(
        &self,
        method: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthenticatedUser, AuthError> {
        let url = format!("{}/v1/{method}", self.inner.config.base_url);
        let response = self
            .inner
            .client
            .post(url)
            .query(&[("key", self.inner.config.api_key.expose_secret())])
            .json(&serde_json::json!({
                "email": email,
                "password": password,
                "returnSecureToken": true,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let body: ErrorBody = response.json().await?;
            return Err(map_provider_error(&body.error.message));
        }

        let body: SignInResponse = response.json().await?;
        let email = Email::parse(&body.email)?;
        Ok(AuthenticatedUser {
            id: UserId::new(body.local_id),
            email,
        })
    }
}

/// Translate the provider's error codes. Codes carry an optional detail
/// after a colon, e.g. `WEAK_PASSWORD : Password should be at least 6
/// characters`.
fn map_provider_error(message: &str) -> AuthError {
    let (code, detail) = match message.split_once(':') {
        Some((code, detail)) => (code.trim(), detail.trim()),
        None => (message.trim(), ""),
    };

    match code {
        "EMAIL_EXISTS" => AuthError::EmailAlreadyExists,
        "INVALID_LOGIN_CREDENTIALS" | "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "USER_DISABLED" => {
            AuthError::InvalidCredentials
        }
        "WEAK_PASSWORD" => {
            let detail = if detail.is_empty() {
                "password too weak".to_string()
            } else {
                detail.to_string()
            };
            AuthError::WeakPassword(detail)
        }
        other => AuthError::Provider(other.to_string()),
    }
}
