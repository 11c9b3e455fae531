pub mod books;

use std::sync::Arc;

use bookshelf_authz::TokenVerifier;
use bookshelf_kernel::{settings::Settings, ModuleRegistry};
use sqlx::SqlitePool;

/// Register all project-specific modules with the registry
pub fn register_all(
    registry: &mut ModuleRegistry,
    pool: &SqlitePool,
    verifier: Arc<dyn TokenVerifier>,
    settings: &Settings,
) {
    registry.register_custom(books::create_module(pool.clone(), verifier, settings));
}
