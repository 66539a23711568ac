//! WeChat OAuth Error Types
//!
//! Error hierarchy for token acquisition, refresh, storage and profile calls.
//!
//! Three kinds of failure are terminal for the call that raised them:
//! transport failures (prefixed with `WeChatAPI`), provider errors reported in
//! the `errcode`/`errmsg` body fields, and missing tokens for a subject.

use std::time::Duration;
use thiserror::Error;

/// Prefix applied to the name of every transport error surfaced by the core.
pub const TRANSPORT_NAME_PREFIX: &str = "WeChatAPI";

/// Root error type for the WeChat OAuth integration.
#[derive(Error, Debug)]
pub enum WeChatOAuthError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("{name}: {source}")]
    Transport {
        name: String,
        #[source]
        source: TransportError,
    },

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("No token for {subject_id}, please authorize first.")]
    NoToken { subject_id: String },

    #[error("Token for {subject_id} is expired and has no refresh token")]
    NoRefreshToken { subject_id: String },

    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl WeChatOAuthError {
    /// Wrap a transport failure, relabelling its name with the provider prefix.
    pub fn from_transport(source: TransportError) -> Self {
        Self::Transport {
            name: format!("{}{}", TRANSPORT_NAME_PREFIX, source.name()),
            source,
        }
    }

    /// Identifying name of the error, stable across messages.
    pub fn name(&self) -> &str {
        match self {
            Self::Configuration(_) => "ConfigurationError",
            Self::InvalidRequest { .. } => "InvalidRequestError",
            Self::Transport { name, .. } => name,
            Self::Provider(_) => "WeChatAPIError",
            Self::NoToken { .. } => "NoOAuthTokenError",
            Self::NoRefreshToken { .. } => "NoRefreshTokenError",
            Self::InvalidResponse { .. } => "InvalidResponseError",
            Self::Storage(_) => "StorageError",
        }
    }

    /// Stable error code for log fields.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "WECHAT_CONFIG",
            Self::InvalidRequest { .. } => "WECHAT_REQUEST",
            Self::Transport { .. } => "WECHAT_TRANSPORT",
            Self::Provider(_) => "WECHAT_PROVIDER",
            Self::NoToken { .. } | Self::NoRefreshToken { .. } => "WECHAT_TOKEN",
            Self::InvalidResponse { .. } => "WECHAT_RESPONSE",
            Self::Storage(_) => "WECHAT_STORAGE",
        }
    }

    /// Check if the caller has to send the user through authorization again.
    pub fn needs_reauth(&self) -> bool {
        match self {
            Self::NoToken { .. } | Self::NoRefreshToken { .. } => true,
            Self::Provider(e) => e.needs_reauth(),
            _ => false,
        }
    }

    /// Provider error code, if this is a provider error.
    pub fn provider_code(&self) -> Option<i64> {
        match self {
            Self::Provider(e) => Some(e.code),
            _ => None,
        }
    }
}

/// Configuration error.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Environment error: {message}")]
    Environment { message: String },
}

/// Failure below the provider API: network, protocol or body decoding.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Connection failed: {message}")]
    ConnectionFailed { message: String },

    #[error("Request timeout after {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("Unexpected redirect to: {location}")]
    UnexpectedRedirect { location: String },

    #[error("Response too large: {size} bytes")]
    ResponseTooLarge { size: usize },

    #[error("Unexpected HTTP status {status}")]
    HttpStatus { status: u16, body: String },

    #[error("Invalid JSON: {message}")]
    InvalidJson { message: String },

    #[error("Failed to read response body: {message}")]
    Body { message: String },
}

impl TransportError {
    /// Name of the error kind, before the provider prefix is applied.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ConnectionFailed { .. } => "ConnectionError",
            Self::Timeout { .. } => "ResponseTimeoutError",
            Self::UnexpectedRedirect { .. } => "RedirectError",
            Self::ResponseTooLarge { .. } => "ResponseTooLargeError",
            Self::HttpStatus { .. } => "HttpStatusError",
            Self::InvalidJson { .. } => "JSONResponseFormatError",
            Self::Body { .. } => "ResponseBodyError",
        }
    }
}

/// Application error reported by the provider in a transport-level success.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("WeChat API error {code}: {message}")]
pub struct ProviderError {
    /// Value of `errcode`.
    pub code: i64,
    /// Value of `errmsg`.
    pub message: String,
}

impl ProviderError {
    /// Invalid or expired access token.
    pub const INVALID_CREDENTIAL: i64 = 40001;
    /// Invalid authorization code.
    pub const INVALID_CODE: i64 = 40029;
    /// Invalid refresh token.
    pub const INVALID_REFRESH_TOKEN: i64 = 40030;
    /// Access token expired.
    pub const ACCESS_TOKEN_EXPIRED: i64 = 42001;
    /// Refresh token expired.
    pub const REFRESH_TOKEN_EXPIRED: i64 = 42002;
    /// Authorization code already used.
    pub const CODE_BEEN_USED: i64 = 40163;

    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Codes after which only a fresh authorization code helps.
    pub fn needs_reauth(&self) -> bool {
        matches!(
            self.code,
            Self::INVALID_CODE
                | Self::INVALID_REFRESH_TOKEN
                | Self::REFRESH_TOKEN_EXPIRED
                | Self::CODE_BEEN_USED
        )
    }
}

/// Storage error.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Read failed: {message}")]
    ReadFailed { message: String },

    #[error("Write failed: {message}")]
    WriteFailed { message: String },

    #[error("Corrupted data: {message}")]
    CorruptedData { message: String },
}

/// Result type for WeChat OAuth operations.
pub type WeChatOAuthResult<T> = Result<T, WeChatOAuthError>;

/// Reject an empty required argument before anything is sent.
pub(crate) fn require_non_empty(value: &str, field: &str) -> Result<(), WeChatOAuthError> {
    if value.is_empty() {
        return Err(WeChatOAuthError::InvalidRequest {
            message: format!("{} must not be empty", field),
        });
    }
    Ok(())
}

/// Extract a provider error from a decoded response body.
///
/// A body signals an error when it carries an `errcode` that is present and
/// not `0`, `""`, `null` or `false`. A numeric string is read as its number,
/// so `"0"` is a success as well. Codes that are not integers map to `-1`.
pub fn provider_error_from_body(body: &serde_json::Value) -> Option<ProviderError> {
    let code = body.get("errcode")?;

    let code = match code {
        serde_json::Value::Null | serde_json::Value::Bool(false) => return None,
        serde_json::Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(0), _) => return None,
            (Some(c), _) => c,
            (None, Some(f)) if f == 0.0 => return None,
            (None, _) => -1,
        },
        serde_json::Value::String(s) if s.is_empty() => return None,
        serde_json::Value::String(s) => match s.parse::<i64>() {
            Ok(0) => return None,
            Ok(c) => c,
            Err(_) => -1,
        },
        _ => -1,
    };

    let message = body
        .get("errmsg")
        .and_then(|m| m.as_str())
        .unwrap_or_default()
        .to_string();

    Some(ProviderError { code, message })
}
