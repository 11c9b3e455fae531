use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::book::{Book, CreateBookInput, UpdateBookInput};
use crate::error::ClientError;

const GET_BOOKS: &str = "query GetBooks {
  books { id name description }
}";

const CREATE_BOOK: &str = "mutation CreateBook($createBookInput: CreateBookInput!) {
  createBook(createBookInput: $createBookInput) { id name description }
}";

const UPDATE_BOOK: &str = "mutation UpdateBook($updateBookInput: UpdateBookInput!) {
  updateBook(updateBookInput: $updateBookInput) { id name description }
}";

const REMOVE_BOOK: &str = "mutation RemoveBook($id: Int!) {
  removeBook(id: $id) { id name description }
}";

/// Remote book catalog operations
#[async_trait]
pub trait BookApi: Send + Sync {
    async fn books(&self) -> Result<Vec<Book>, ClientError>;
    async fn create_book(&self, input: CreateBookInput) -> Result<Book, ClientError>;
    async fn update_book(&self, input: UpdateBookInput) -> Result<Book, ClientError>;
    async fn remove_book(&self, id: i32) -> Result<Book, ClientError>;
}

/// Supplies the bearer token attached to every request
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn access_token(&self) -> Option<String>;
}

/// A token fixed at construction
#[derive(Debug, Clone)]
pub struct StaticToken(Option<String>);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Some(token.into()))
    }

    pub fn none() -> Self {
        Self(None)
    }
}

#[async_trait]
impl TokenSource for StaticToken {
    async fn access_token(&self) -> Option<String> {
        self.0.clone().filter(|token| !token.is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct GraphqlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphqlErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct GraphqlErrorEntry {
    message: String,
    #[serde(default)]
    extensions: Option<Value>,
}

impl GraphqlErrorEntry {
    fn code(&self) -> Option<String> {
        self.extensions
            .as_ref()?
            .get("code")?
            .as_str()
            .map(str::to_string)
    }
}

#[derive(Deserialize)]
struct BooksData {
    books: Vec<Book>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateBookData {
    create_book: Book,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateBookData {
    update_book: Book,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoveBookData {
    remove_book: Book,
}

/// [`BookApi`] over HTTP against a GraphQL endpoint
pub struct GraphqlClient {
    http: reqwest::Client,
    endpoint: String,
    tokens: Arc<dyn TokenSource>,
}

impl GraphqlClient {
    pub fn new(
        endpoint: impl Into<String>,
        tokens: Arc<dyn TokenSource>,
    ) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
            tokens,
        })
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        operation: &str,
        query: &str,
        variables: Value,
    ) -> Result<T, ClientError> {
        let token = self
            .tokens
            .access_token()
            .await
            .ok_or(ClientError::MissingToken)?;

        let response: GraphqlResponse<T> = self
            .http
            .post(&self.endpoint)
            .bearer_auth(token)
            .json(&json!({
                "operationName": operation,
                "query": query,
                "variables": variables,
            }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(error) = response.errors.into_iter().next() {
            let code = error.code();
            tracing::warn!(operation, ?code, message = %error.message, "graphql operation failed");
            if code.as_deref() == Some("UNAUTHORIZED") {
                return Err(ClientError::Unauthorized(error.message));
            }
            return Err(ClientError::Graphql {
                code,
                message: error.message,
            });
        }
        response.data.ok_or(ClientError::EmptyResponse)
    }
}

#[async_trait]
impl BookApi for GraphqlClient {
    async fn books(&self) -> Result<Vec<Book>, ClientError> {
        let data: BooksData = self.execute("GetBooks", GET_BOOKS, json!({})).await?;
        Ok(data.books)
    }

    async fn create_book(&self, input: CreateBookInput) -> Result<Book, ClientError> {
        let data: CreateBookData = self
            .execute("CreateBook", CREATE_BOOK, json!({ "createBookInput": input }))
            .await?;
        Ok(data.create_book)
    }

    async fn update_book(&self, input: UpdateBookInput) -> Result<Book, ClientError> {
        let data: UpdateBookData = self
            .execute("UpdateBook", UPDATE_BOOK, json!({ "updateBookInput": input }))
            .await?;
        Ok(data.update_book)
    }

    async fn remove_book(&self, id: i32) -> Result<Book, ClientError> {
        let data: RemoveBookData = self
            .execute("RemoveBook", REMOVE_BOOK, json!({ "id": id }))
            .await?;
        Ok(data.remove_book)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header::AUTHORIZATION, HeaderMap};
    use axum::{routing::post, Json, Router};

    /// Answers GetBooks and CreateBook for `Bearer valid`, UNAUTHORIZED otherwise.
    async fn stub(headers: HeaderMap, Json(body): Json<Value>) -> Json<Value> {
        let authorized = headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            == Some("Bearer valid");
        if !authorized {
            return Json(json!({
                "data": null,
                "errors": [{ "message": "Invalid authentication token", "extensions": { "code": "UNAUTHORIZED" } }]
            }));
        }

        match body["operationName"].as_str() {
            Some("GetBooks") => Json(json!({
                "data": { "books": [{ "id": 1, "name": "Dune", "description": "Sci-fi novel" }] }
            })),
            Some("CreateBook") => {
                let input = &body["variables"]["createBookInput"];
                Json(json!({
                    "data": { "createBook": { "id": 2, "name": input["name"], "description": input["description"] } }
                }))
            }
            _ => Json(json!({
                "data": null,
                "errors": [{ "message": "Book not found with ID: 9", "extensions": { "code": "NOT_FOUND" } }]
            })),
        }
    }

    async fn serve_stub() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, Router::new().route("/graphql", post(stub)))
                .await
                .unwrap();
        });
        format!("http://{address}/graphql")
    }

    fn client(endpoint: &str, token: StaticToken) -> GraphqlClient {
        GraphqlClient::new(endpoint, Arc::new(token)).unwrap()
    }

    #[tokio::test]
    async fn fetches_and_creates_books() {
        let endpoint = serve_stub().await;
        let client = client(&endpoint, StaticToken::new("valid"));

        let books = client.books().await.unwrap();
        assert_eq!(books[0].name, "Dune");

        let created = client
            .create_book(CreateBookInput {
                name: "Hyperion".to_string(),
                description: "Space opera".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(created.id, 2);
        assert_eq!(created.name, "Hyperion");
    }

    #[tokio::test]
    async fn unauthorized_code_is_typed() {
        let endpoint = serve_stub().await;
        let client = client(&endpoint, StaticToken::new("stale"));

        let err = client.books().await.unwrap_err();
        assert!(matches!(err, ClientError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn other_codes_are_carried_through() {
        let endpoint = serve_stub().await;
        let client = client(&endpoint, StaticToken::new("valid"));

        let err = client.remove_book(9).await.unwrap_err();
        assert_eq!(err.code(), Some("NOT_FOUND"));
        assert_eq!(err.to_string(), "Book not found with ID: 9");
    }

    #[tokio::test]
    async fn missing_token_fails_before_sending() {
        // Nothing listens here; reaching the network would be a transport error.
        let client = client("http://127.0.0.1:9/graphql", StaticToken::none());
        assert!(matches!(
            client.books().await,
            Err(ClientError::MissingToken)
        ));
    }
}
