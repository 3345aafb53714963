//! Application state shared across handlers.

use std::sync::Arc;

use crate::backend::Backend;
use crate::config::StorefrontConfig;
use crate::services::identity::IdentityClient;
use crate::services::upload_auth::UploadSigner;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the document store client and configuration.
/// Generic over the backend so tests can run against the in-memory store.
pub struct AppState<B: Backend> {
    inner: Arc<AppStateInner<B>>,
}

impl<B: Backend> Clone for AppState<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct AppStateInner<B: Backend> {
    config: StorefrontConfig,
    backend: B,
    identity: IdentityClient,
    upload_signer: Option<UploadSigner>,
}

impl<B: Backend> AppState<B> {
    /// Create a new application state.
    #[must_use]
    pub fn new(config: StorefrontConfig, backend: B, identity: IdentityClient) -> Self {
        let upload_signer = config
            .imagekit_private_key
            .clone()
            .map(UploadSigner::new);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                backend,
                identity,
                upload_signer,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the document store backend.
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.inner.backend
    }

    /// Get a reference to the identity provider client.
    #[must_use]
    pub fn identity(&self) -> &IdentityClient {
        &self.inner.identity
    }

    /// Get the upload signer, if a private key was configured.
    #[must_use]
    pub fn upload_signer(&self) -> Option<&UploadSigner> {
        self.inner.upload_signer.as_ref()
    }
}
