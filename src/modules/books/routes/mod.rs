use std::sync::Arc;

use async_graphql::http::GraphiQLSource;
use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::{
    extract::State,
    http::HeaderMap,
    response::Html,
    routing::{get, post},
    Router,
};
use bookshelf_authz::{authenticate, TokenVerifier};

use super::schema::{BookSchema, RequestAuth};
use crate::utils;

pub const GRAPHQL_PATH: &str = "/graphql";

#[derive(Clone)]
pub struct GraphqlState {
    pub schema: BookSchema,
    pub verifier: Arc<dyn TokenVerifier>,
    /// Absolute endpoint the playground page posts to
    pub endpoint: String,
}

/// Routes for the Books module: the GraphQL endpoint and a health probe.
pub fn router(state: GraphqlState, playground: bool) -> Router {
    let prefix = utils::log_prefix("books");
    tracing::info!(target: "project.routes", %prefix, playground, "registering books routes");

    let graphql = if playground {
        get(playground_page).post(graphql_handler)
    } else {
        post(graphql_handler)
    };

    Router::new()
        .route(GRAPHQL_PATH, graphql)
        .route("/health", get(health_check))
        .with_state(state)
}

/// Authenticate, then execute. A failed check is attached to the request
/// rather than rejected here, so callers get a GraphQL error instead of a 401.
async fn graphql_handler(
    State(state): State<GraphqlState>,
    headers: HeaderMap,
    request: GraphQLRequest,
) -> GraphQLResponse {
    let auth = authenticate(state.verifier.as_ref(), &headers).await;
    if let Err(err) = &auth {
        tracing::debug!(target: "project.routes", error = %err, "unauthenticated graphql request");
    }

    let request = request.into_inner().data(RequestAuth(auth));
    state.schema.execute(request).await.into()
}

async fn playground_page(State(state): State<GraphqlState>) -> Html<String> {
    Html(GraphiQLSource::build().endpoint(&state.endpoint).finish())
}

async fn health_check() -> &'static str {
    "books module is healthy"
}
