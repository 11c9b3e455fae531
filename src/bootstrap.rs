//! Process lifecycle: open the store, register modules, migrate, serve, stop.

use std::sync::Arc;

use anyhow::Context;
use bookshelf_authz::{AuthModule, JwksVerifier, TokenVerifier};
use bookshelf_db::DatabaseModule;
use bookshelf_kernel::{settings::Settings, InitCtx, ModuleRegistry};
use sqlx::SqlitePool;

use crate::modules;

/// Core modules (`db`, `authz`) plus every project module
pub fn build_registry(
    settings: &Settings,
    pool: &SqlitePool,
    verifier: Arc<dyn TokenVerifier>,
) -> ModuleRegistry {
    let mut registry = ModuleRegistry::new();
    registry.register_core(Arc::new(DatabaseModule::new(pool.clone())));
    registry.register_core(Arc::new(AuthModule::new(verifier.clone())));
    modules::register_all(&mut registry, pool, verifier, settings);
    registry
}

/// Run the service until ctrl-c, then stop every module.
pub async fn serve(settings: Settings) -> anyhow::Result<()> {
    settings.validate()?;

    tracing::info!(
        env = ?settings.environment,
        db = %settings.database.path,
        issuer = %settings.auth.issuer(),
        "bookshelf bootstrap starting"
    );

    let pool = bookshelf_db::connect(&settings.database).await?;
    let verifier: Arc<dyn TokenVerifier> = Arc::new(
        JwksVerifier::from_settings(&settings.auth)
            .context("failed to configure token verification")?,
    );
    let registry = build_registry(&settings, &pool, verifier);

    let ctx = InitCtx {
        settings: &settings,
        db: &pool,
    };
    registry.init_all(&ctx).await?;

    let applied = bookshelf_db::apply_migrations(&pool, &registry.collect_migrations()).await?;
    tracing::info!(applied, "migrations complete");

    registry.start_all(&ctx).await?;
    tracing::info!(
        core = registry.core_module_count(),
        custom = registry.custom_module_count(),
        "bookshelf bootstrap complete"
    );

    let served = bookshelf_http::start_server(&registry, &settings, shutdown_signal()).await;
    let stopped = registry.stop_all().await;

    served?;
    stopped
}

/// Apply pending migrations without serving traffic. Returns how many ran.
pub async fn migrate(settings: &Settings) -> anyhow::Result<usize> {
    let pool = bookshelf_db::connect(&settings.database).await?;
    let applied = bookshelf_db::apply_migrations(&pool, &modules::books::module_migrations()).await?;
    tracing::info!(applied, path = %settings.database.path, "migrations complete");
    pool.close().await;
    Ok(applied)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        return;
    }
    tracing::info!("shutdown signal received");
}
