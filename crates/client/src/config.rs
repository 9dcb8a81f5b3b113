//! Client configuration loaded from the environment.

use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Base URL used when `GUDANG_API_URL` is not set.
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000/api";

/// Quiet period before a search keystroke turns into a request.
pub const DEFAULT_SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

/// How the session token is presented in the `Authorization` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthScheme {
    /// `Authorization: Token <token>` (DRF token authentication).
    #[default]
    Token,
    /// `Authorization: Bearer <token>`.
    Bearer,
}

impl AuthScheme {
    pub fn header_value(&self, token: &str) -> String {
        match self {
            AuthScheme::Token => format!("Token {token}"),
            AuthScheme::Bearer => format!("Bearer {token}"),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid API URL '{value}': {reason}")]
    InvalidUrl { value: String, reason: String },
    #[error("invalid value for {key}: '{value}'")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API root; resource paths are appended to it.
    pub base_url: Url,
    /// Token to start the session with (e.g. issued earlier and stored by the shell).
    pub token: Option<String>,
    pub auth_scheme: AuthScheme,
    pub search_debounce: Duration,
    /// Per-request timeout. `None` keeps the transport default.
    pub http_timeout: Option<Duration>,
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: parse_base_url(base_url)?,
            token: None,
            auth_scheme: AuthScheme::default(),
            search_debounce: DEFAULT_SEARCH_DEBOUNCE,
            http_timeout: None,
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Load from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup.
    ///
    /// Recognised keys: `GUDANG_API_URL`, `GUDANG_AUTH_TOKEN`,
    /// `GUDANG_AUTH_SCHEME` (`token` | `bearer`), `GUDANG_SEARCH_DEBOUNCE_MS`,
    /// `GUDANG_HTTP_TIMEOUT_MS`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_url = get("GUDANG_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let mut config = Self::new(&api_url)?;

        config.token = get("GUDANG_AUTH_TOKEN").map(|t| t.trim().to_string());

        if let Some(raw) = get("GUDANG_AUTH_SCHEME") {
            config.auth_scheme = match raw.trim().to_ascii_lowercase().as_str() {
                "token" => AuthScheme::Token,
                "bearer" => AuthScheme::Bearer,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: "GUDANG_AUTH_SCHEME",
                        value: raw,
                    });
                }
            };
        }

        if let Some(raw) = get("GUDANG_SEARCH_DEBOUNCE_MS") {
            config.search_debounce = parse_millis("GUDANG_SEARCH_DEBOUNCE_MS", &raw)?;
        }

        if let Some(raw) = get("GUDANG_HTTP_TIMEOUT_MS") {
            config.http_timeout = Some(parse_millis("GUDANG_HTTP_TIMEOUT_MS", &raw)?);
        }

        Ok(config)
    }
}

fn parse_millis(key: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    raw.trim()
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|_| ConfigError::InvalidValue {
            key,
            value: raw.to_string(),
        })
}

/// Parse the API root, forcing a trailing slash so `Url::join` appends instead of replacing.
fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let trimmed = raw.trim();
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    };
    let url = Url::parse(&with_slash).map_err(|e| ConfigError::InvalidUrl {
        value: raw.to_string(),
        reason: e.to_string(),
    })?;
    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidUrl {
            value: raw.to_string(),
            reason: "expected an http(s) URL".to_string(),
        });
    }
    Ok(url)
}
