use std::path::PathBuf;

use anyhow::{anyhow, bail, Context};
use serde::{Deserialize, Serialize};

const DEFAULT_ENV: &str = "local";
const ENV_VAR_NAME: &str = "BOOKSHELF_ENV";
const CONFIG_DIR_ENV: &str = "BOOKSHELF_CONFIG_DIR";
const ENV_PREFIX: &str = "BOOKSHELF";

/// Deployment environment the application is running in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Local,
    Staging,
    Production,
}

impl Environment {
    fn parse(value: &str) -> anyhow::Result<Self> {
        match value {
            "local" => Ok(Environment::Local),
            "staging" => Ok(Environment::Staging),
            "production" => Ok(Environment::Production),
            other => Err(anyhow!(
                "unsupported environment '{}'; expected local/staging/production",
                other
            )),
        }
    }
}

/// Top-level configuration structure loaded from layered sources.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
    #[serde(default)]
    pub auth: AuthSettings,
    #[serde(default)]
    pub graphql: GraphqlSettings,
    #[serde(default)]
    pub cors: CorsSettings,
}

impl Settings {
    /// Load configuration by layering `.env`, base file, and environment overlay.
    pub fn load() -> anyhow::Result<Self> {
        // Allow missing `.env` files without failing.
        let _ = dotenvy::dotenv();

        let environment = std::env::var(ENV_VAR_NAME).unwrap_or_else(|_| DEFAULT_ENV.to_string());
        let config_dir = match std::env::var(CONFIG_DIR_ENV) {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => std::env::current_dir()
                .with_context(|| "unable to resolve current directory")?
                .join("config"),
        };

        let base_path = config_dir.join("base.toml");
        let environment_path = config_dir.join(format!("{}.toml", environment));

        let builder = config::Config::builder()
            .add_source(config::File::from(base_path).required(false))
            .add_source(config::File::from(environment_path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            );

        let cfg = builder
            .build()
            .with_context(|| "failed to build configuration")?;

        let mut settings: Settings = cfg
            .try_deserialize()
            .with_context(|| "failed to deserialize configuration")?;

        // The selector variable wins over any `environment` key in the files.
        settings.environment = Environment::parse(&environment)?;

        Ok(settings)
    }

    /// Check the settings required to serve authenticated traffic.
    pub fn validate(&self) -> anyhow::Result<()> {
        let mut missing = Vec::new();
        if self.auth.issuer_url.trim().is_empty() {
            missing.push("auth.issuer_url");
        }
        if self.auth.audience.trim().is_empty() {
            missing.push("auth.audience");
        }
        if !missing.is_empty() {
            bail!("missing required settings: {}", missing.join(", "));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "ServerSettings::default_host")]
    pub host: String,
    #[serde(default = "ServerSettings::default_port")]
    pub port: u16,
    #[serde(default = "ServerSettings::default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl ServerSettings {
    fn default_host() -> String {
        "0.0.0.0".to_string()
    }

    fn default_port() -> u16 {
        4000
    }

    fn default_request_timeout_ms() -> u64 {
        15000
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
            request_timeout_ms: Self::default_request_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default = "DatabaseSettings::default_path")]
    pub path: String,
    #[serde(default = "DatabaseSettings::default_max_connections")]
    pub max_connections: u32,
}

impl DatabaseSettings {
    fn default_path() -> String {
        "books.db".to_string()
    }

    fn default_max_connections() -> u32 {
        5
    }

    /// SQLite connection URL. `:memory:` maps to a private in-memory database.
    pub fn url(&self) -> String {
        if self.path == ":memory:" {
            "sqlite::memory:".to_string()
        } else {
            format!("sqlite://{}?mode=rwc", self.path)
        }
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: Self::default_path(),
            max_connections: Self::default_max_connections(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetrySettings {
    #[serde(default)]
    pub log_format: LogFormat,
    #[serde(default = "TelemetrySettings::default_log_level")]
    pub log_level: String,
}

impl TelemetrySettings {
    fn default_log_level() -> String {
        "info".to_string()
    }
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Pretty,
            log_level: Self::default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Identity provider settings used to verify bearer tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSettings {
    #[serde(default)]
    pub issuer_url: String,
    #[serde(default)]
    pub audience: String,
    /// Overrides the key set location derived from `issuer_url`.
    #[serde(default)]
    pub jwks_uri: Option<String>,
    #[serde(default = "AuthSettings::default_algorithms")]
    pub algorithms: Vec<String>,
    #[serde(default = "AuthSettings::default_jwks_requests_per_minute")]
    pub jwks_requests_per_minute: u32,
    #[serde(default = "AuthSettings::default_jwks_cache_ttl_secs")]
    pub jwks_cache_ttl_secs: u64,
}

impl AuthSettings {
    fn default_algorithms() -> Vec<String> {
        vec!["RS256".to_string()]
    }

    fn default_jwks_requests_per_minute() -> u32 {
        5
    }

    fn default_jwks_cache_ttl_secs() -> u64 {
        600
    }

    fn issuer_base(&self) -> &str {
        self.issuer_url.trim_end_matches('/')
    }

    /// Issuer claim expected in tokens; the provider publishes it with a trailing slash.
    pub fn issuer(&self) -> String {
        format!("{}/", self.issuer_base())
    }

    pub fn jwks_uri(&self) -> String {
        self.jwks_uri
            .clone()
            .unwrap_or_else(|| format!("{}/.well-known/jwks.json", self.issuer_base()))
    }
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            issuer_url: String::new(),
            audience: String::new(),
            jwks_uri: None,
            algorithms: Self::default_algorithms(),
            jwks_requests_per_minute: Self::default_jwks_requests_per_minute(),
            jwks_cache_ttl_secs: Self::default_jwks_cache_ttl_secs(),
        }
    }
}

/// GraphQL endpoint toggles. Unset values follow the environment.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GraphqlSettings {
    #[serde(default)]
    pub playground: Option<bool>,
    #[serde(default)]
    pub introspection: Option<bool>,
}

impl GraphqlSettings {
    pub fn playground_enabled(&self, environment: &Environment) -> bool {
        self.playground
            .unwrap_or(*environment == Environment::Local)
    }

    pub fn introspection_enabled(&self, environment: &Environment) -> bool {
        self.introspection
            .unwrap_or(*environment == Environment::Local)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsSettings {
    /// One origin or a comma-separated list.
    #[serde(default = "CorsSettings::default_frontend_url")]
    pub frontend_url: String,
}

impl CorsSettings {
    fn default_frontend_url() -> String {
        "http://localhost:3000".to_string()
    }

    pub fn origins(&self) -> Vec<String> {
        self.frontend_url
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect()
    }
}

impl Default for CorsSettings {
    fn default() -> Self {
        Self {
            frontend_url: Self::default_frontend_url(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_environment_is_local() {
        let settings = Settings::default();
        assert_eq!(settings.environment, Environment::Local);
    }

    #[test]
    fn default_database_is_books_file() {
        let settings = Settings::default();
        assert_eq!(settings.database.path, "books.db");
        assert_eq!(settings.database.url(), "sqlite://books.db?mode=rwc");
    }

    #[test]
    fn memory_database_url() {
        let database = DatabaseSettings {
            path: ":memory:".to_string(),
            ..DatabaseSettings::default()
        };
        assert_eq!(database.url(), "sqlite::memory:");
    }

    #[test]
    fn issuer_and_jwks_uri_derive_from_issuer_url() {
        let auth = AuthSettings {
            issuer_url: "https://tenant.example.com/".to_string(),
            ..AuthSettings::default()
        };
        assert_eq!(auth.issuer(), "https://tenant.example.com/");
        assert_eq!(
            auth.jwks_uri(),
            "https://tenant.example.com/.well-known/jwks.json"
        );
    }

    #[test]
    fn explicit_jwks_uri_wins() {
        let auth = AuthSettings {
            issuer_url: "https://tenant.example.com".to_string(),
            jwks_uri: Some("https://keys.example.com/jwks".to_string()),
            ..AuthSettings::default()
        };
        assert_eq!(auth.jwks_uri(), "https://keys.example.com/jwks");
    }

    #[test]
    fn validate_names_missing_auth_settings() {
        let err = Settings::default().validate().unwrap_err().to_string();
        assert!(err.contains("auth.issuer_url"));
        assert!(err.contains("auth.audience"));
    }

    #[test]
    fn validate_accepts_complete_auth() {
        let mut settings = Settings::default();
        settings.auth.issuer_url = "https://tenant.example.com".to_string();
        settings.auth.audience = "https://books.example.com".to_string();
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn cors_origins_split_on_commas() {
        let cors = CorsSettings {
            frontend_url: "http://localhost:3000, https://books.example.com,".to_string(),
        };
        assert_eq!(
            cors.origins(),
            vec!["http://localhost:3000", "https://books.example.com"]
        );
    }

    #[test]
    fn playground_follows_environment_unless_overridden() {
        let graphql = GraphqlSettings::default();
        assert!(graphql.playground_enabled(&Environment::Local));
        assert!(!graphql.playground_enabled(&Environment::Production));

        let forced = GraphqlSettings {
            playground: Some(true),
            introspection: Some(false),
        };
        assert!(forced.playground_enabled(&Environment::Production));
        assert!(!forced.introspection_enabled(&Environment::Local));
    }
}
