//! CLI command implementations.

pub mod check;
pub mod seed;

use paper_lantern_storefront::backend::{FirestoreBackend, FirestoreConfig};
use paper_lantern_storefront::config::FirestoreEnvConfig;

/// Build a Firestore client from the same environment the server uses.
pub fn backend_from_env() -> Result<FirestoreBackend, Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let config = FirestoreEnvConfig::from_env()?;
    Ok(FirestoreBackend::new(&FirestoreConfig {
        project_id: config.project_id,
        database: config.database,
        base_url: config.base_url,
    }))
}
