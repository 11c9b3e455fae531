//! SQLite pool factory, migration runner, and the `db` core module.

use std::str::FromStr;

use anyhow::Context;
use async_trait::async_trait;
use axum::{extract::State, http::StatusCode, routing::get, Router};
use bookshelf_kernel::{settings::DatabaseSettings, InitCtx, Migration, Module};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

const MIGRATIONS_TABLE: &str = "CREATE TABLE IF NOT EXISTS schema_migrations (
    module     TEXT NOT NULL,
    id         TEXT NOT NULL,
    applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    PRIMARY KEY (module, id)
)";

/// Open a pool for the configured database file, creating it when missing.
pub async fn connect(settings: &DatabaseSettings) -> anyhow::Result<SqlitePool> {
    let url = settings.url();
    let options = SqliteConnectOptions::from_str(&url)
        .with_context(|| format!("invalid database url '{}'", url))?
        .create_if_missing(true)
        .foreign_keys(true);

    // Every connection to `sqlite::memory:` sees its own database, so the
    // pool must hold exactly one connection and never recycle it.
    let in_memory = settings.path == ":memory:";
    let max_connections = if in_memory {
        1
    } else {
        settings.max_connections.max(1)
    };
    let mut pool_options = SqlitePoolOptions::new().max_connections(max_connections);
    if in_memory {
        pool_options = pool_options.idle_timeout(None).max_lifetime(None);
    }

    let pool = pool_options
        .connect_with(options)
        .await
        .with_context(|| format!("failed to open database at '{}'", settings.path))?;

    tracing::info!(
        target: "bookshelf-db",
        path = %settings.path,
        max_connections,
        "database pool ready"
    );
    Ok(pool)
}

/// Apply every migration not yet recorded in `schema_migrations`.
///
/// Each migration runs in its own transaction together with its bookkeeping
/// row. Returns how many migrations were applied.
pub async fn apply_migrations(
    pool: &SqlitePool,
    migrations: &[(String, Migration)],
) -> anyhow::Result<usize> {
    sqlx::query(MIGRATIONS_TABLE)
        .execute(pool)
        .await
        .context("failed to create schema_migrations table")?;

    let mut applied = 0;
    for (module, migration) in migrations {
        let seen: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM schema_migrations WHERE module = ? AND id = ?")
                .bind(module)
                .bind(migration.id)
                .fetch_optional(pool)
                .await
                .with_context(|| format!("failed to read migration state for '{module}'"))?;
        if seen.is_some() {
            tracing::debug!(target: "bookshelf-db", %module, id = migration.id, "migration already applied");
            continue;
        }

        let mut tx = pool.begin().await.context("failed to open migration transaction")?;
        sqlx::raw_sql(migration.up)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("migration {module}/{} failed", migration.id))?;
        sqlx::query("INSERT INTO schema_migrations (module, id) VALUES (?, ?)")
            .bind(module)
            .bind(migration.id)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("failed to record migration {module}/{}", migration.id))?;
        tx.commit().await.context("failed to commit migration")?;

        tracing::info!(target: "bookshelf-db", %module, id = migration.id, "migration applied");
        applied += 1;
    }

    Ok(applied)
}

/// Core module owning the pool's lifecycle and its health endpoint.
pub struct DatabaseModule {
    pool: SqlitePool,
}

impl DatabaseModule {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Module for DatabaseModule {
    fn name(&self) -> &'static str {
        "db"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        ping(&self.pool).await.context("database is not reachable")?;
        tracing::info!(module = self.name(), path = %ctx.settings.database.path, "db module initialized");
        Ok(())
    }

    fn routes(&self) -> Router {
        Router::new()
            .route("/health", get(health_check))
            .with_state(self.pool.clone())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        self.pool.close().await;
        tracing::info!(module = self.name(), "database pool closed");
        Ok(())
    }
}

async fn ping(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await.map(|_| ())
}

async fn health_check(State(pool): State<SqlitePool>) -> (StatusCode, &'static str) {
    match ping(&pool).await {
        Ok(()) => (StatusCode::OK, "database is healthy"),
        Err(err) => {
            tracing::warn!(target: "bookshelf-db", error = %err, "database health check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "database is unavailable")
        }
    }
}
