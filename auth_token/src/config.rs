//! Session-side configuration, read from `AUTH_TOKEN_*` environment variables

use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_COOKIE_NAME: &str = "auth-token";
pub const DEFAULT_STORE_URL: &str = "redis://127.0.0.1:6379";
pub const DEFAULT_STORE_TIMEOUT_MS: u64 = 500;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}

impl ConfigError {
    pub fn invalid(key: &str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

/// Backend used to resolve session tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreType {
    Memory,
    Redis,
}

impl FromStr for StoreType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "redis" => Ok(Self::Redis),
            other => Err(format!(
                "unsupported store type '{other}', supported types are 'memory' and 'redis'"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Name of the cookie carrying the session token
    pub cookie_name: String,
    pub store_type: StoreType,
    pub store_url: String,
    /// Prepended to the token to form the store key
    pub key_prefix: String,
    /// Upper bound for a single store round-trip
    pub lookup_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            store_type: StoreType::Redis,
            store_url: DEFAULT_STORE_URL.to_string(),
            key_prefix: String::new(),
            lookup_timeout: Duration::from_millis(DEFAULT_STORE_TIMEOUT_MS),
        }
    }
}

impl SessionConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    ///
    /// Unset keys fall back to [`SessionConfig::default`]; set but unparsable
    /// keys are an error.
    pub fn from_source<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(name) = lookup("AUTH_TOKEN_COOKIE_NAME") {
            config.cookie_name = validate_cookie_name(&name)?;
        }
        if let Some(store_type) = lookup("AUTH_TOKEN_STORE_TYPE") {
            config.store_type = store_type
                .parse()
                .map_err(|e| ConfigError::invalid("AUTH_TOKEN_STORE_TYPE", e))?;
        }
        if let Some(url) = lookup("AUTH_TOKEN_STORE_URL") {
            config.store_url = url;
        }
        if let Some(prefix) = lookup("AUTH_TOKEN_STORE_PREFIX") {
            config.key_prefix = prefix;
        }
        if let Some(ms) = lookup("AUTH_TOKEN_STORE_TIMEOUT_MS") {
            config.lookup_timeout = parse_millis("AUTH_TOKEN_STORE_TIMEOUT_MS", &ms)?;
        }

        Ok(config)
    }
}

/// Parse a positive millisecond count into a [`Duration`].
pub fn parse_millis(key: &str, value: &str) -> Result<Duration, ConfigError> {
    let ms: u64 = value
        .trim()
        .parse()
        .map_err(|_| ConfigError::invalid(key, format!("'{value}' is not a number of milliseconds")))?;
    if ms == 0 {
        return Err(ConfigError::invalid(key, "must be greater than zero"));
    }
    Ok(Duration::from_millis(ms))
}

fn validate_cookie_name(name: &str) -> Result<String, ConfigError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ConfigError::invalid("AUTH_TOKEN_COOKIE_NAME", "must not be empty"));
    }
    if name
        .chars()
        .any(|c| c.is_whitespace() || c.is_control() || matches!(c, '=' | ';' | ',' | '"'))
    {
        return Err(ConfigError::invalid(
            "AUTH_TOKEN_COOKIE_NAME",
            format!("'{name}' is not a valid cookie name"),
        ));
    }
    Ok(name.to_string())
}
