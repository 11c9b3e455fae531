use thiserror::Error;

/// Failures talking to the catalog API. None of them touch the cache.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("no access token available")]
    MissingToken,

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("{message}")]
    Graphql {
        code: Option<String>,
        message: String,
    },

    #[error("response carried no data")]
    EmptyResponse,

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl ClientError {
    /// GraphQL `extensions.code`, when the server sent one
    pub fn code(&self) -> Option<&str> {
        match self {
            ClientError::Unauthorized(_) => Some("UNAUTHORIZED"),
            ClientError::Graphql { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}
