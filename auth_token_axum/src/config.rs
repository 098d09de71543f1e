//! Gateway configuration, read from `AUTH_TOKEN_*` environment variables

use std::str::FromStr;
use std::time::Duration;

use auth_token::{ConfigError, parse_millis};
use http::{HeaderName, HeaderValue, StatusCode};

pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:4567";
pub const DEFAULT_REDIRECT_URL: &str = "/login";
pub const DEFAULT_USER_HEADER: &str = "x-user-id";
pub const DEFAULT_HEALTH_PATH: &str = "/_gateway/health";
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// What to answer when the session store cannot be consulted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreFailurePolicy {
    /// Redirect like any other denial
    #[default]
    Redirect,
    /// Fail closed with 503 Service Unavailable
    Error,
}

impl FromStr for StoreFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "redirect" => Ok(Self::Redirect),
            "error" => Ok(Self::Error),
            other => Err(format!(
                "unsupported policy '{other}', expected 'redirect' or 'error'"
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Scheme, authority and optional base path of the backend, without a trailing slash
    pub backend_url: String,
    /// `Location` sent on every denial
    pub redirect_location: HeaderValue,
    /// Status sent on every denial, always within 300..=399
    pub redirect_status: StatusCode,
    /// Request header carrying the resolved user id to the backend
    pub user_header: HeaderName,
    /// Response header echoing the user id back to the client, if any
    pub response_user_header: Option<HeaderName>,
    pub request_timeout: Duration,
    pub max_body_bytes: usize,
    pub store_failure_policy: StoreFailurePolicy,
    /// Gateway-owned health endpoint; `None` disables it
    pub health_path: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            redirect_location: HeaderValue::from_static(DEFAULT_REDIRECT_URL),
            redirect_status: StatusCode::FOUND,
            user_header: HeaderName::from_static(DEFAULT_USER_HEADER),
            response_user_header: None,
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            store_failure_policy: StoreFailurePolicy::Redirect,
            health_path: Some(DEFAULT_HEALTH_PATH.to_string()),
        }
    }
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    ///
    /// Unset keys keep their default; set but invalid keys are an error.
    pub fn from_source<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("AUTH_TOKEN_BACKEND_URL") {
            config.backend_url = parse_backend_url(&url)?;
        }
        if let Some(location) = lookup("AUTH_TOKEN_REDIRECT_URL") {
            config.redirect_location = parse_redirect_location(&location)?;
        }
        if let Some(status) = lookup("AUTH_TOKEN_REDIRECT_STATUS") {
            config.redirect_status = parse_redirect_status(&status)?;
        }
        if let Some(name) = lookup("AUTH_TOKEN_USER_HEADER") {
            config.user_header = parse_header_name("AUTH_TOKEN_USER_HEADER", &name)?;
        }
        if let Some(name) = lookup("AUTH_TOKEN_RESPONSE_USER_HEADER") {
            config.response_user_header = if name.trim().is_empty() {
                None
            } else {
                Some(parse_header_name("AUTH_TOKEN_RESPONSE_USER_HEADER", &name)?)
            };
        }
        if let Some(ms) = lookup("AUTH_TOKEN_REQUEST_TIMEOUT_MS") {
            config.request_timeout = parse_millis("AUTH_TOKEN_REQUEST_TIMEOUT_MS", &ms)?;
        }
        if let Some(bytes) = lookup("AUTH_TOKEN_MAX_BODY_BYTES") {
            config.max_body_bytes = bytes.trim().parse().map_err(|_| {
                ConfigError::invalid("AUTH_TOKEN_MAX_BODY_BYTES", format!("'{bytes}' is not a byte count"))
            })?;
        }
        if let Some(policy) = lookup("AUTH_TOKEN_STORE_FAILURE_POLICY") {
            config.store_failure_policy = policy
                .parse()
                .map_err(|e| ConfigError::invalid("AUTH_TOKEN_STORE_FAILURE_POLICY", e))?;
        }
        if let Some(path) = lookup("AUTH_TOKEN_HEALTH_PATH") {
            config.health_path = parse_health_path(&path)?;
        }

        Ok(config)
    }
}

fn parse_backend_url(value: &str) -> Result<String, ConfigError> {
    const KEY: &str = "AUTH_TOKEN_BACKEND_URL";

    let url = url::Url::parse(value.trim())
        .map_err(|e| ConfigError::invalid(KEY, format!("'{value}' is not a URL: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::invalid(KEY, "scheme must be http or https"));
    }
    if url.host_str().is_none() {
        return Err(ConfigError::invalid(KEY, "URL must have a host"));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(ConfigError::invalid(KEY, "URL must not carry a query or fragment"));
    }

    Ok(url.as_str().trim_end_matches('/').to_string())
}

fn parse_redirect_location(value: &str) -> Result<HeaderValue, ConfigError> {
    const KEY: &str = "AUTH_TOKEN_REDIRECT_URL";

    let value = value.trim();
    let is_path = value.starts_with('/');
    if !is_path && url::Url::parse(value).is_err() {
        return Err(ConfigError::invalid(
            KEY,
            format!("'{value}' is neither an absolute path nor a URL"),
        ));
    }
    HeaderValue::from_str(value)
        .map_err(|_| ConfigError::invalid(KEY, "not a valid header value"))
}

fn parse_redirect_status(value: &str) -> Result<StatusCode, ConfigError> {
    const KEY: &str = "AUTH_TOKEN_REDIRECT_STATUS";

    let code: u16 = value
        .trim()
        .parse()
        .map_err(|_| ConfigError::invalid(KEY, format!("'{value}' is not a status code")))?;
    let status = StatusCode::from_u16(code)
        .map_err(|_| ConfigError::invalid(KEY, format!("'{value}' is not a status code")))?;
    if !status.is_redirection() {
        return Err(ConfigError::invalid(KEY, "must be within 300..=399"));
    }
    Ok(status)
}

fn parse_header_name(key: &str, value: &str) -> Result<HeaderName, ConfigError> {
    HeaderName::from_bytes(value.trim().as_bytes())
        .map_err(|_| ConfigError::invalid(key, format!("'{value}' is not a valid header name")))
}

fn parse_health_path(value: &str) -> Result<Option<String>, ConfigError> {
    const KEY: &str = "AUTH_TOKEN_HEALTH_PATH";

    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    if !value.starts_with('/') {
        return Err(ConfigError::invalid(KEY, "must start with '/'"));
    }
    // Keep axum's route syntax out of a literal path
    if value.contains(['{', '}', '*', '?', '#']) {
        return Err(ConfigError::invalid(KEY, format!("'{value}' must be a literal path")));
    }
    Ok(Some(value.to_string()))
}
