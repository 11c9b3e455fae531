//! Bearer token authentication for bookshelf.
//!
//! Trust is delegated to an external issuer: tokens are verified against the
//! issuer's published key set and nothing is persisted locally. Every failure
//! is an [`AuthError`], which callers surface as "unauthorized".

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{header::AUTHORIZATION, HeaderMap};
use bookshelf_kernel::{InitCtx, Module};
use thiserror::Error;

pub mod claims;
pub mod jwks;

pub use claims::{Audience, Claims};
pub use jwks::{HttpKeySource, JwksVerifier, KeySource};

/// Reasons a request fails authentication.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing authorization header")]
    MissingHeader,

    #[error("authorization header is not a bearer token")]
    MalformedHeader,

    #[error("malformed token: {0}")]
    MalformedToken(String),

    #[error("token header carries no key id")]
    MissingKeyId,

    #[error("no signing key matches key id '{0}'")]
    UnknownKey(String),

    #[error("signing keys unavailable: {0}")]
    KeySetUnavailable(String),

    #[error("signing key refresh rate limit exceeded")]
    RateLimited,

    #[error("token rejected: {0}")]
    InvalidToken(#[source] jsonwebtoken::errors::Error),
}

/// Capability that turns a bearer token into verified claims.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Claims, AuthError>;

    /// Prepare any cached state ahead of the first request.
    async fn warm_up(&self) -> Result<(), AuthError> {
        Ok(())
    }
}

/// Pull the token out of an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingHeader)?
        .to_str()
        .map_err(|_| AuthError::MalformedHeader)?;

    let (scheme, token) = value
        .trim()
        .split_once(' ')
        .ok_or(AuthError::MalformedHeader)?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(AuthError::MalformedHeader);
    }
    Ok(token)
}

/// Extract and verify the bearer token of a request.
pub async fn authenticate(
    verifier: &dyn TokenVerifier,
    headers: &HeaderMap,
) -> Result<Claims, AuthError> {
    let token = bearer_token(headers)?;
    verifier.verify(token).await
}

/// Core module that warms the verifier's key cache at startup.
pub struct AuthModule {
    verifier: Arc<dyn TokenVerifier>,
}

impl AuthModule {
    pub fn new(verifier: Arc<dyn TokenVerifier>) -> Self {
        Self { verifier }
    }
}

#[async_trait]
impl Module for AuthModule {
    fn name(&self) -> &'static str {
        "authz"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        // A cold cache is refilled on the first request, so this is not fatal.
        match self.verifier.warm_up().await {
            Ok(()) => tracing::info!(
                module = self.name(),
                issuer = %ctx.settings.auth.issuer(),
                "signing keys loaded"
            ),
            Err(err) => tracing::warn!(
                module = self.name(),
                error = %err,
                "could not pre-load signing keys"
            ),
        }
        Ok(())
    }
}
