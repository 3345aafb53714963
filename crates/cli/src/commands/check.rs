//! Verify document store connectivity.

use tracing::info;

use paper_lantern_storefront::backend::Backend;

/// Ping the document store and report collection sizes.
///
/// # Errors
///
/// Returns an error if the store is unreachable or a listing fails.
pub async fn store() -> Result<(), Box<dyn std::error::Error>> {
    let backend = super::backend_from_env()?;

    backend.ping().await?;
    info!("Document store reachable");

    let books = backend.list_books().await?;
    let genres = backend.list_genres().await?;
    info!(books = books.len(), genres = genres.len(), "Catalog counts");

    Ok(())
}
