//! Verification against an issuer's published JSON Web Key Set.

use std::collections::VecDeque;
use std::str::FromStr;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use bookshelf_kernel::settings::AuthSettings;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use tokio::sync::RwLock;

use crate::{AuthError, Claims, TokenVerifier};

const FETCH_WINDOW: Duration = Duration::from_secs(60);
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Where the issuer's key set comes from.
#[async_trait]
pub trait KeySource: Send + Sync {
    async fn fetch(&self) -> Result<JwkSet, AuthError>;
}

/// Fetches the key set over HTTPS from the issuer's well-known URI.
pub struct HttpKeySource {
    client: reqwest::Client,
    uri: String,
}

impl HttpKeySource {
    pub fn new(uri: impl Into<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .context("failed to build key set http client")?;
        Ok(Self {
            client,
            uri: uri.into(),
        })
    }
}

#[async_trait]
impl KeySource for HttpKeySource {
    async fn fetch(&self) -> Result<JwkSet, AuthError> {
        let unavailable = |err: reqwest::Error| AuthError::KeySetUnavailable(err.to_string());
        let keys = self
            .client
            .get(&self.uri)
            .send()
            .await
            .map_err(unavailable)?
            .error_for_status()
            .map_err(unavailable)?
            .json::<JwkSet>()
            .await
            .map_err(unavailable)?;

        tracing::debug!(target: "bookshelf-authz", uri = %self.uri, keys = keys.keys.len(), "fetched signing keys");
        Ok(keys)
    }
}

/// Sliding one-minute window over key set fetches. Zero disables the limit.
struct FetchLimiter {
    per_minute: u32,
    recent: VecDeque<Instant>,
}

impl FetchLimiter {
    fn new(per_minute: u32) -> Self {
        Self {
            per_minute,
            recent: VecDeque::new(),
        }
    }

    fn try_acquire(&mut self, now: Instant) -> bool {
        if self.per_minute == 0 {
            return true;
        }
        while let Some(&oldest) = self.recent.front() {
            if now.duration_since(oldest) >= FETCH_WINDOW {
                self.recent.pop_front();
            } else {
                break;
            }
        }
        if self.recent.len() >= self.per_minute as usize {
            return false;
        }
        self.recent.push_back(now);
        true
    }
}

struct CachedKeys {
    keys: JwkSet,
    fetched_at: Instant,
}

/// [`TokenVerifier`] backed by a cached, rate-limited JWKS.
///
/// A token whose key id is missing from the cache, or a cache older than
/// the TTL, triggers a refetch. Refetches are capped per minute so a flood of
/// tokens with made-up key ids cannot hammer the issuer.
pub struct JwksVerifier<S = HttpKeySource> {
    source: S,
    validation: Validation,
    ttl: Duration,
    cache: RwLock<Option<CachedKeys>>,
    limiter: Mutex<FetchLimiter>,
}

impl JwksVerifier<HttpKeySource> {
    pub fn from_settings(settings: &AuthSettings) -> anyhow::Result<Self> {
        let source = HttpKeySource::new(settings.jwks_uri())?;
        Self::new(source, settings)
    }
}

impl<S: KeySource> JwksVerifier<S> {
    pub fn new(source: S, settings: &AuthSettings) -> anyhow::Result<Self> {
        let algorithms = settings
            .algorithms
            .iter()
            .map(|name| {
                Algorithm::from_str(name).map_err(|_| anyhow!("unsupported signing algorithm '{name}'"))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        let first = *algorithms
            .first()
            .ok_or_else(|| anyhow!("auth.algorithms must list at least one algorithm"))?;

        let mut validation = Validation::new(first);
        validation.algorithms = algorithms;
        validation.set_issuer(&[settings.issuer()]);
        validation.set_audience(&[settings.audience.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);

        Ok(Self {
            source,
            validation,
            ttl: Duration::from_secs(settings.jwks_cache_ttl_secs),
            cache: RwLock::new(None),
            limiter: Mutex::new(FetchLimiter::new(settings.jwks_requests_per_minute)),
        })
    }

    /// Fetch the key set now, subject to the rate limit. Returns the key count.
    pub async fn refresh(&self) -> Result<usize, AuthError> {
        let mut cache = self.cache.write().await;
        self.fetch_into(&mut cache).await
    }

    async fn fetch_into(&self, cache: &mut Option<CachedKeys>) -> Result<usize, AuthError> {
        let allowed = self
            .limiter
            .lock()
            .map(|mut limiter| limiter.try_acquire(Instant::now()))
            .unwrap_or(false);
        if !allowed {
            tracing::warn!(target: "bookshelf-authz", "signing key refresh rate limited");
            return Err(AuthError::RateLimited);
        }

        let keys = self.source.fetch().await?;
        let count = keys.keys.len();
        *cache = Some(CachedKeys {
            keys,
            fetched_at: Instant::now(),
        });
        Ok(count)
    }

    fn lookup(&self, cache: &Option<CachedKeys>, kid: &str) -> Option<Result<DecodingKey, AuthError>> {
        let cached = cache.as_ref()?;
        if cached.fetched_at.elapsed() >= self.ttl {
            return None;
        }
        let jwk = cached.keys.find(kid)?;
        Some(DecodingKey::from_jwk(jwk).map_err(|err| {
            AuthError::KeySetUnavailable(format!("unusable key '{kid}': {err}"))
        }))
    }

    async fn signing_key(&self, kid: &str) -> Result<DecodingKey, AuthError> {
        {
            let cache = self.cache.read().await;
            if let Some(key) = self.lookup(&cache, kid) {
                return key;
            }
        }

        let mut cache = self.cache.write().await;
        // Another request may have refreshed while this one waited for the lock.
        if let Some(key) = self.lookup(&cache, kid) {
            return key;
        }
        self.fetch_into(&mut cache).await?;
        self.lookup(&cache, kid)
            .unwrap_or_else(|| Err(AuthError::UnknownKey(kid.to_string())))
    }
}

#[async_trait]
impl<S: KeySource> TokenVerifier for JwksVerifier<S> {
    async fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let header = decode_header(token).map_err(|err| AuthError::MalformedToken(err.to_string()))?;
        let kid = header.kid.ok_or(AuthError::MissingKeyId)?;
        let key = self.signing_key(&kid).await?;

        let data = decode::<Claims>(token, &key, &self.validation).map_err(AuthError::InvalidToken)?;
        Ok(data.claims)
    }

    async fn warm_up(&self) -> Result<(), AuthError> {
        self.refresh().await.map(|_| ())
    }
}
