use async_graphql::{Context, EmptySubscription, ErrorExtensions, Object, Schema};
use bookshelf_authz::{AuthError, Claims};
use bookshelf_http::error::AppError;

use super::error::BookError;
use super::models::{Book, CreateBookInput, UpdateBookInput};
use super::service::BookService;

pub type BookSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

const MISSING_AUTHORIZATION_HEADER: &str = "Missing authorization header";
const INVALID_TOKEN: &str = "Invalid authentication token";

/// Outcome of authenticating the HTTP request, attached to each GraphQL request.
pub struct RequestAuth(pub Result<Claims, AuthError>);

pub fn build_schema(service: BookService, introspection: bool) -> BookSchema {
    let builder = Schema::build(QueryRoot, MutationRoot, EmptySubscription).data(service);
    if introspection {
        builder.finish()
    } else {
        builder.disable_introspection().finish()
    }
}

/// Gate shared by every field: no verified claims, no store access.
fn authorized<'a>(ctx: &Context<'a>) -> async_graphql::Result<&'a BookService> {
    match ctx.data_opt::<RequestAuth>() {
        Some(RequestAuth(Ok(claims))) => {
            tracing::debug!(sub = %claims.sub, "authorized graphql request");
        }
        Some(RequestAuth(Err(AuthError::MissingHeader))) | None => {
            return Err(graphql_error(AppError::unauthorized(
                MISSING_AUTHORIZATION_HEADER,
            )));
        }
        Some(RequestAuth(Err(_))) => {
            return Err(graphql_error(AppError::unauthorized(INVALID_TOKEN)));
        }
    }
    ctx.data::<BookService>()
}

fn graphql_code(err: &AppError) -> &'static str {
    match err {
        AppError::Validation { .. } => "BAD_USER_INPUT",
        AppError::NotFound { .. } => "NOT_FOUND",
        AppError::Unauthorized { .. } => "UNAUTHORIZED",
        AppError::Internal(_) => "INTERNAL_SERVER_ERROR",
    }
}

/// Render an [`AppError`] as a GraphQL error with `extensions.code`
pub fn graphql_error(err: AppError) -> async_graphql::Error {
    let code = graphql_code(&err);
    let body = err.to_body();
    let details = if body.details.is_empty() {
        None
    } else {
        async_graphql::Value::from_json(serde_json::Value::Array(body.details)).ok()
    };
    let trace_id = body.trace_id;

    async_graphql::Error::new(body.message).extend_with(move |_, extensions| {
        extensions.set("code", code);
        extensions.set("traceId", trace_id);
        if let Some(details) = details {
            extensions.set("details", details);
        }
    })
}

fn book_error(err: BookError) -> async_graphql::Error {
    graphql_error(AppError::from(err))
}

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// Every book, ascending by id
    async fn books(&self, ctx: &Context<'_>) -> async_graphql::Result<Vec<Book>> {
        let service = authorized(ctx)?;
        service.find_all().await.map_err(book_error)
    }

    async fn book(&self, ctx: &Context<'_>, id: i32) -> async_graphql::Result<Option<Book>> {
        let service = authorized(ctx)?;
        service.find_one(id).await.map(Some).map_err(book_error)
    }
}

pub struct MutationRoot;

#[Object]
impl MutationRoot {
    async fn create_book(
        &self,
        ctx: &Context<'_>,
        create_book_input: CreateBookInput,
    ) -> async_graphql::Result<Book> {
        let service = authorized(ctx)?;
        service.create(create_book_input).await.map_err(book_error)
    }

    async fn update_book(
        &self,
        ctx: &Context<'_>,
        update_book_input: UpdateBookInput,
    ) -> async_graphql::Result<Book> {
        let service = authorized(ctx)?;
        service.update(update_book_input).await.map_err(book_error)
    }

    /// Delete a book and return it as it was before deletion
    async fn remove_book(&self, ctx: &Context<'_>, id: i32) -> async_graphql::Result<Book> {
        let service = authorized(ctx)?;
        service.remove(id).await.map_err(book_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::books::{self, repository::BookRepository};
    use bookshelf_kernel::settings::DatabaseSettings;
    use serde_json::json;

    async fn schema() -> (BookSchema, BookService) {
        let pool = bookshelf_db::connect(&DatabaseSettings {
            path: ":memory:".to_string(),
            ..DatabaseSettings::default()
        })
        .await
        .unwrap();
        bookshelf_db::apply_migrations(&pool, &books::module_migrations())
            .await
            .unwrap();
        let service = BookService::new(BookRepository::new(pool));
        (build_schema(service.clone(), true), service)
    }

    fn signed_in() -> RequestAuth {
        RequestAuth(Ok(serde_json::from_value(json!({ "sub": "auth0|reader" })).unwrap()))
    }

    fn first_code(response: &async_graphql::Response) -> serde_json::Value {
        let errors = serde_json::to_value(&response.errors).unwrap();
        errors[0]["extensions"]["code"].clone()
    }

    #[tokio::test]
    async fn sdl_exposes_the_book_operations() {
        let (schema, _) = schema().await;
        let sdl = schema.sdl();
        for fragment in [
            "books: [Book!]!",
            "book(id: Int!): Book",
            "createBook(createBookInput: CreateBookInput!): Book!",
            "updateBook(updateBookInput: UpdateBookInput!): Book!",
            "removeBook(id: Int!): Book!",
        ] {
            assert!(sdl.contains(fragment), "schema is missing `{fragment}`:\n{sdl}");
        }
    }

    #[tokio::test]
    async fn missing_auth_data_is_unauthorized() {
        let (schema, service) = schema().await;
        let response = schema
            .execute(
                r#"mutation { createBook(createBookInput: {name: "Dune", description: "Sci-fi novel"}) { id } }"#,
            )
            .await;

        assert_eq!(first_code(&response), json!("UNAUTHORIZED"));
        assert_eq!(service.repository().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn rejected_token_is_unauthorized() {
        let (schema, _) = schema().await;
        let request = async_graphql::Request::new("{ books { id } }")
            .data(RequestAuth(Err(AuthError::MissingKeyId)));
        let response = schema.execute(request).await;

        assert_eq!(first_code(&response), json!("UNAUTHORIZED"));
        assert_eq!(response.errors[0].message, INVALID_TOKEN);
    }

    #[tokio::test]
    async fn unknown_book_is_not_found() {
        let (schema, _) = schema().await;
        let request = async_graphql::Request::new("{ book(id: 7) { id } }").data(signed_in());
        let response = schema.execute(request).await;

        assert_eq!(first_code(&response), json!("NOT_FOUND"));
        assert_eq!(response.errors[0].message, "Book not found with ID: 7");
        assert_eq!(response.data.into_json().unwrap(), json!({ "book": null }));
    }

    #[tokio::test]
    async fn invalid_input_is_bad_user_input() {
        let (schema, _) = schema().await;
        let request = async_graphql::Request::new(
            r#"mutation { createBook(createBookInput: {name: "", description: "Sci-fi novel"}) { id } }"#,
        )
        .data(signed_in());
        let response = schema.execute(request).await;

        assert_eq!(first_code(&response), json!("BAD_USER_INPUT"));
        let errors = serde_json::to_value(&response.errors).unwrap();
        assert_eq!(errors[0]["extensions"]["details"][0]["field"], "name");
    }
}
