//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `ACCESS_TOKEN_SECRET` - Session token signing secret (min 32 chars, high entropy)
//! - `RESTAURANT_DATABASE_URL` - `PostgreSQL` connection string (falls back to
//!   `DATABASE_URL`; not needed with the memory store)
//!
//! ## Optional
//! - `RESTAURANT_STORE` - `postgres` (default) or `memory`
//! - `RESTAURANT_HOST` - Bind address (default: 127.0.0.1)
//! - `RESTAURANT_PORT` - Listen port (default: 5000)
//! - `RESTAURANT_ALLOWED_ORIGINS` - Comma-separated CORS origins
//!   (default: `http://localhost:5173`)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use axum::http::HeaderValue;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_TOKEN_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:5173";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Which document store backs the server.
#[derive(Debug, Clone)]
pub enum StoreBackend {
    /// `PostgreSQL` documents table.
    Postgres {
        /// Connection URL (contains password)
        database_url: SecretString,
    },
    /// In-process store; data is lost on restart.
    Memory,
}

/// Restaurant API configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Document store selection
    pub store: StoreBackend,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Session token signing secret
    pub token_secret: SecretString,
    /// Origins allowed to make credentialed cross-site requests
    pub allowed_origins: Vec<HeaderValue>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the token secret fails validation (length, placeholder detection,
    /// entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// See [`ServerConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(&lookup);

        let store = match env.or_default("RESTAURANT_STORE", "postgres").as_str() {
            "postgres" => StoreBackend::Postgres {
                database_url: env.database_url("RESTAURANT_DATABASE_URL")?,
            },
            "memory" => StoreBackend::Memory,
            other => {
                return Err(ConfigError::InvalidEnvVar(
                    "RESTAURANT_STORE".to_string(),
                    format!("expected `postgres` or `memory`, got `{other}`"),
                ));
            }
        };

        let host = env
            .or_default("RESTAURANT_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("RESTAURANT_HOST".to_string(), e.to_string()))?;
        let port = env
            .or_default("RESTAURANT_PORT", "5000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("RESTAURANT_PORT".to_string(), e.to_string()))?;

        let token_secret = env.validated_secret("ACCESS_TOKEN_SECRET")?;
        validate_token_secret(&token_secret, "ACCESS_TOKEN_SECRET")?;

        let allowed_origins = parse_origins(
            &env.or_default("RESTAURANT_ALLOWED_ORIGINS", DEFAULT_ALLOWED_ORIGINS),
            "RESTAURANT_ALLOWED_ORIGINS",
        )?;

        Ok(Self {
            store,
            host,
            port,
            token_secret,
            allowed_origins,
            sentry_dsn: env.optional("SENTRY_DSN"),
            sentry_environment: env.optional("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Load the `PostgreSQL` URL the way the server does, for operator tooling.
///
/// # Errors
///
/// Returns `ConfigError::MissingEnvVar` if neither `RESTAURANT_DATABASE_URL`
/// nor `DATABASE_URL` is set.
pub fn database_url_from_env() -> Result<SecretString, ConfigError> {
    let _ = dotenvy::dotenv();
    let lookup = |key: &str| std::env::var(key).ok();
    Env(&lookup).database_url("RESTAURANT_DATABASE_URL")
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Variable lookup with the typed accessors used above.
struct Env<'a>(&'a dyn Fn(&str) -> Option<String>);

impl Env<'_> {
    /// Get an optional variable; empty values count as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.is_empty())
    }

    /// Get a required variable.
    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    /// Get a variable with a default value.
    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    /// Get database URL with fallback to generic `DATABASE_URL` (set by managed postgres attach).
    fn database_url(&self, primary_key: &str) -> Result<SecretString, ConfigError> {
        self.optional(primary_key)
            .or_else(|| self.optional("DATABASE_URL"))
            .map(SecretString::from)
            .ok_or_else(|| ConfigError::MissingEnvVar(primary_key.to_string()))
    }

    /// Load and validate a secret.
    fn validated_secret(&self, key: &str) -> Result<SecretString, ConfigError> {
        let value = self.required(key)?;
        validate_secret_strength(&value, key)?;
        Ok(SecretString::from(value))
    }
}

/// Parse a comma-separated origin list into header values.
fn parse_origins(raw: &str, var_name: &str) -> Result<Vec<HeaderValue>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(|origin| {
            HeaderValue::from_str(origin.trim_end_matches('/')).map_err(|e| {
                ConfigError::InvalidEnvVar(var_name.to_string(), format!("{origin}: {e}"))
            })
        })
        .collect()
}

/// Validate that a token secret meets minimum length requirements.
fn validate_token_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_TOKEN_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_TOKEN_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("appears to be a placeholder (contains '{pattern}')"),
        ));
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const STRONG_SECRET: &str = "aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6%";

    fn load(vars: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        // "ab" has entropy of 1 bit per char (50% a, 50% b)
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-jwt-key-here", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        assert!(validate_secret_strength(STRONG_SECRET, "TEST_VAR").is_ok());
    }

    #[test]
    fn test_validate_token_secret_too_short() {
        let secret = SecretString::from("short");
        assert!(validate_token_secret(&secret, "TEST_TOKEN").is_err());
    }

    #[test]
    fn test_memory_store_defaults() {
        let config = load(&[
            ("RESTAURANT_STORE", "memory"),
            ("ACCESS_TOKEN_SECRET", STRONG_SECRET),
        ])
        .unwrap();

        assert!(matches!(config.store, StoreBackend::Memory));
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:5000");
        assert_eq!(config.allowed_origins, vec!["http://localhost:5173"]);
        assert!(config.sentry_dsn.is_none());
    }

    #[test]
    fn test_postgres_store_falls_back_to_database_url() {
        let config = load(&[
            ("DATABASE_URL", "postgres://localhost/restaurant"),
            ("ACCESS_TOKEN_SECRET", STRONG_SECRET),
        ])
        .unwrap();

        let StoreBackend::Postgres { database_url } = config.store else {
            panic!("expected postgres backend");
        };
        assert_eq!(database_url.expose_secret(), "postgres://localhost/restaurant");
    }

    #[test]
    fn test_postgres_store_requires_url() {
        let result = load(&[("ACCESS_TOKEN_SECRET", STRONG_SECRET)]);
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(var)) if var == "RESTAURANT_DATABASE_URL"));
    }

    #[test]
    fn test_rejects_unknown_store() {
        let result = load(&[
            ("RESTAURANT_STORE", "mongodb"),
            ("ACCESS_TOKEN_SECRET", STRONG_SECRET),
        ]);
        assert!(matches!(result, Err(ConfigError::InvalidEnvVar(_, _))));
    }

    #[test]
    fn test_requires_token_secret() {
        let result = load(&[("RESTAURANT_STORE", "memory")]);
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(var)) if var == "ACCESS_TOKEN_SECRET"));
    }

    #[test]
    fn test_parses_origin_list() {
        let origins = parse_origins(
            "http://localhost:5173, https://restaurant.example.app/ ,",
            "TEST_ORIGINS",
        )
        .unwrap();
        assert_eq!(
            origins,
            vec!["http://localhost:5173", "https://restaurant.example.app"]
        );

        assert!(parse_origins("http://bad\u{1}origin", "TEST_ORIGINS").is_err());
    }

    #[test]
    fn test_debug_redacts_token_secret() {
        let config = load(&[
            ("RESTAURANT_STORE", "memory"),
            ("ACCESS_TOKEN_SECRET", STRONG_SECRET),
        ])
        .unwrap();
        assert!(!format!("{config:?}").contains(STRONG_SECRET));
    }
}
