//! Registration, sign-in, and sign-out against the identity provider.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use crate::backend::Backend;
use crate::error::{self, Result};
use crate::middleware::{clear_current_user, set_current_user};
use crate::models::CurrentUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user: CurrentUser,
}

/// POST /auth/register
pub async fn register<B: Backend>(
    State(state): State<AppState<B>>,
    session: Session,
    Json(request): Json<CredentialsRequest>,
) -> Result<(StatusCode, Json<SessionResponse>)> {
    let authed = state
        .identity()
        .sign_up(&request.email, &request.password)
        .await?;

    let user = CurrentUser {
        id: authed.id,
        email: authed.email,
    };
    set_current_user(&session, &user).await?;
    error::set_sentry_user(&user.id, Some(user.email.as_str()));
    tracing::info!(user = %user.id, "registered");

    Ok((StatusCode::CREATED, Json(SessionResponse { user })))
}

/// POST /auth/login
pub async fn login<B: Backend>(
    State(state): State<AppState<B>>,
    session: Session,
    Json(request): Json<CredentialsRequest>,
) -> Result<Json<SessionResponse>> {
    let authed = state
        .identity()
        .sign_in(&request.email, &request.password)
        .await?;

    // A fresh identity invalidates any previous session data.
    session.clear().await;

    let user = CurrentUser {
        id: authed.id,
        email: authed.email,
    };
    set_current_user(&session, &user).await?;
    error::set_sentry_user(&user.id, Some(user.email.as_str()));
    tracing::info!(user = %user.id, "signed in");

    Ok(Json(SessionResponse { user }))
}

/// POST /auth/logout
pub async fn logout(session: Session) -> Result<StatusCode> {
    clear_current_user(&session).await?;
    error::clear_sentry_user();
    Ok(StatusCode::NO_CONTENT)
}
