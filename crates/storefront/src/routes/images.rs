//! Upload-signing credentials for the image CDN.

use axum::{Json, extract::State};

use crate::backend::Backend;
use crate::error::{AppError, Result};
use crate::services::upload_auth::UploadAuthParams;
use crate::state::AppState;

/// GET /images/auth
///
/// Returns 500 when no private key is configured; the upload widget
/// treats that as "uploads disabled".
pub async fn auth<B: Backend>(
    State(state): State<AppState<B>>,
) -> Result<Json<UploadAuthParams>> {
    let signer = state
        .upload_signer()
        .ok_or_else(|| AppError::Internal("upload signing key not configured".to_string()))?;
    Ok(Json(signer.generate()))
}
