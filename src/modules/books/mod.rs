pub mod error;
pub mod models;
pub mod repository;
pub mod routes;
pub mod schema;
pub mod service;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use bookshelf_authz::TokenVerifier;
use bookshelf_kernel::{settings::Settings, InitCtx, Migration, Module};
use sqlx::SqlitePool;

use crate::utils;
use repository::BookRepository;
use routes::{GraphqlState, GRAPHQL_PATH};
use service::BookService;

pub const MODULE_NAME: &str = "books";

/// Book catalog served over GraphQL at `/api/books/graphql`
pub struct BooksModule {
    state: GraphqlState,
    playground: bool,
}

impl BooksModule {
    pub fn new(state: GraphqlState, playground: bool) -> Self {
        Self { state, playground }
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        MODULE_NAME
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            playground = self.playground,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.state.clone(), self.playground)
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(openapi_fragment(self.playground))
    }

    fn migrations(&self) -> Vec<Migration> {
        migrations()
    }

    async fn start(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        let books = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM book")
            .fetch_one(ctx.db)
            .await?;
        tracing::info!(module = self.name(), books, "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

/// Schema for the `book` table. AUTOINCREMENT keeps deleted ids retired.
pub fn migrations() -> Vec<Migration> {
    vec![Migration {
        id: "001_create_book",
        up: r#"
            CREATE TABLE IF NOT EXISTS book (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                name        TEXT NOT NULL,
                description TEXT NOT NULL
            );
            "#,
    }]
}

/// Migrations tagged with the owning module, in the shape the migrator takes
pub fn module_migrations() -> Vec<(String, Migration)> {
    migrations()
        .into_iter()
        .map(|migration| (MODULE_NAME.to_string(), migration))
        .collect()
}

/// Create the books module over an existing pool and token verifier
pub fn create_module(
    pool: SqlitePool,
    verifier: Arc<dyn TokenVerifier>,
    settings: &Settings,
) -> Arc<dyn Module> {
    let environment = &settings.environment;
    let service = BookService::new(BookRepository::new(pool));
    let schema = schema::build_schema(
        service,
        settings.graphql.introspection_enabled(environment),
    );
    let state = GraphqlState {
        schema,
        verifier,
        endpoint: utils::module_path(MODULE_NAME, GRAPHQL_PATH),
    };

    Arc::new(BooksModule::new(
        state,
        settings.graphql.playground_enabled(environment),
    ))
}

fn openapi_fragment(playground: bool) -> serde_json::Value {
    let error_response = serde_json::json!({
        "description": "Internal server error",
        "content": {
            "application/json": {
                "schema": { "$ref": "#/components/schemas/ErrorResponse" }
            }
        }
    });

    let mut graphql = serde_json::json!({
        "post": {
            "summary": "Execute a GraphQL operation against the book catalog",
            "description": "Requires `Authorization: Bearer <token>`. Operation failures are returned in the `errors` array with `extensions.code`.",
            "tags": ["Books"],
            "security": [{ "bearerAuth": [] }],
            "requestBody": {
                "required": true,
                "content": {
                    "application/json": {
                        "schema": { "$ref": "#/components/schemas/GraphqlRequest" }
                    }
                }
            },
            "responses": {
                "200": {
                    "description": "GraphQL response",
                    "content": {
                        "application/json": {
                            "schema": { "$ref": "#/components/schemas/GraphqlResponse" }
                        }
                    }
                },
                "500": error_response
            }
        }
    });
    if playground {
        graphql["get"] = serde_json::json!({
            "summary": "GraphiQL playground",
            "tags": ["Books"],
            "responses": {
                "200": {
                    "description": "Playground page",
                    "content": { "text/html": { "schema": { "type": "string" } } }
                }
            }
        });
    }

    serde_json::json!({
        "paths": {
            "/graphql": graphql,
            "/health": {
                "get": {
                    "summary": "Books health check",
                    "tags": ["Books"],
                    "responses": {
                        "200": {
                            "description": "OK",
                            "content": { "text/plain": { "schema": { "type": "string" } } }
                        }
                    }
                }
            }
        },
        "components": {
            "securitySchemes": {
                "bearerAuth": { "type": "http", "scheme": "bearer", "bearerFormat": "JWT" }
            },
            "schemas": {
                "Book": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "integer", "description": "Store-assigned identifier" },
                        "name": { "type": "string", "minLength": models::NAME_MIN_CHARS, "maxLength": models::NAME_MAX_CHARS },
                        "description": { "type": "string", "minLength": models::DESCRIPTION_MIN_CHARS, "maxLength": models::DESCRIPTION_MAX_CHARS }
                    },
                    "required": ["id", "name", "description"]
                },
                "GraphqlRequest": {
                    "type": "object",
                    "properties": {
                        "query": { "type": "string" },
                        "operationName": { "type": "string" },
                        "variables": { "type": "object" }
                    },
                    "required": ["query"]
                },
                "GraphqlResponse": {
                    "type": "object",
                    "properties": {
                        "data": { "type": "object", "nullable": true },
                        "errors": { "type": "array", "items": { "type": "object" } }
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_tagged_with_module_name() {
        let tagged = module_migrations();
        assert_eq!(tagged.len(), 1);
        assert_eq!(tagged[0].0, "books");
        assert_eq!(tagged[0].1.id, "001_create_book");
    }

    #[test]
    fn playground_path_documented_only_when_enabled() {
        let with = openapi_fragment(true);
        let without = openapi_fragment(false);

        assert!(with["paths"]["/graphql"]["get"].is_object());
        assert!(without["paths"]["/graphql"].get("get").is_none());
        assert!(without["paths"]["/graphql"]["post"].is_object());
    }
}
