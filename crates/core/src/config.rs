//! Process configuration from environment variables.
//!
//! Required values fail fast at startup; optional values fall back to
//! documented defaults, logging a warning when set but unparsable.

use crate::error::CoreError;

/// Default Anthropic-compatible API endpoint.
pub const DEFAULT_API_BASE_URL: &str = "https://api.anthropic.com";
/// Default model for agent turns and structuring.
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
/// Default bearer token lifetime in hours.
pub const DEFAULT_TOKEN_TTL_HOURS: i64 = 24;

/// Parse an environment variable with a default fallback.
///
/// - Not set: returns `default` silently (expected case).
/// - Set but unparsable: logs a warning and returns `default`.
pub fn env_parse_or<T: std::str::FromStr + std::fmt::Display>(var: &str, default: T) -> T {
    match std::env::var(var) {
        Ok(raw) => match raw.parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(var, value = %raw, default = %default, "unparsable env var, using default");
                default
            },
        },
        Err(_) => default,
    }
}

fn env_required(var: &'static str) -> Result<String, CoreError> {
    std::env::var(var).ok().filter(|v| !v.is_empty()).ok_or(CoreError::MissingConfig(var))
}

/// Everything the server needs to start.
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection string
    pub database_url: String,
    /// LLM API credential
    pub api_key: String,
    /// LLM API base URL
    pub api_base_url: String,
    /// Model used for agent turns and structuring
    pub model: String,
    /// HMAC secret for bearer tokens
    pub jwt_secret: String,
    /// Token lifetime
    pub token_ttl_hours: i64,
    /// Allowed CORS origins
    pub cors_origins: Vec<String>,
    /// Enables stricter internal assertions and verbose errors in logs
    pub debug: bool,
    /// Bind host
    pub host: String,
    /// Bind port
    pub port: u16,
}

impl Config {
    /// Load configuration, failing on any missing required value.
    ///
    /// # Errors
    /// Returns `CoreError::MissingConfig` naming the first absent variable.
    pub fn from_env() -> Result<Self, CoreError> {
        let database_url = env_required("QUILL_DATABASE_URL")?;
        let api_key = env_required("ANTHROPIC_API_KEY")?;
        let jwt_secret = env_required("QUILL_JWT_SECRET")?;

        let api_base_url = std::env::var("QUILL_API_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_owned());
        let model = std::env::var("QUILL_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_owned());
        let cors_origins = std::env::var("QUILL_CORS_ORIGINS")
            .map(|raw| raw.split(',').map(|s| s.trim().to_owned()).filter(|s| !s.is_empty()).collect())
            .unwrap_or_else(|_| {
                vec![
                    "http://localhost:3000".to_owned(),
                    "http://localhost:5173".to_owned(),
                ]
            });

        Ok(Self {
            database_url,
            api_key,
            api_base_url,
            model,
            jwt_secret,
            token_ttl_hours: env_parse_or("QUILL_TOKEN_TTL_HOURS", DEFAULT_TOKEN_TTL_HOURS),
            cors_origins,
            debug: env_parse_or("QUILL_DEBUG", false),
            host: std::env::var("QUILL_HOST").unwrap_or_else(|_| "127.0.0.1".to_owned()),
            port: env_parse_or("QUILL_PORT", 8300),
        })
    }
}
