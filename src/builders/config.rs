//! Configuration Builder
//!
//! Fluent builder for WeChat OAuth configuration.

use std::time::Duration;

use crate::error::{ConfigurationError, WeChatOAuthError};
use crate::token::TokenManagerConfig;
use crate::types::{RequestOptions, WeChatOAuthConfig, DEFAULT_TIMEOUT};
use secrecy::SecretString;

/// WeChat OAuth configuration builder.
#[derive(Default)]
pub struct WeChatOAuthConfigBuilder {
    app_id: Option<String>,
    app_secret: Option<SecretString>,
    request_defaults: RequestOptions,
    timeout: Option<Duration>,
    serialize_refresh: bool,
}

impl WeChatOAuthConfigBuilder {
    /// Create new configuration builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set application id.
    pub fn app_id(mut self, app_id: impl Into<String>) -> Self {
        self.app_id = Some(app_id.into());
        self
    }

    /// Set application secret.
    pub fn app_secret(mut self, app_secret: impl Into<String>) -> Self {
        self.app_secret = Some(SecretString::new(app_secret.into()));
        self
    }

    /// Replace the default request options.
    pub fn request_defaults(mut self, defaults: RequestOptions) -> Self {
        self.request_defaults = defaults;
        self
    }

    /// Add a header sent with every request.
    pub fn default_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.request_defaults = self.request_defaults.header(name, value);
        self
    }

    /// Set request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Serialize per-subject refreshes.
    pub fn serialize_refresh(mut self, enable: bool) -> Self {
        self.serialize_refresh = enable;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> Result<WeChatOAuthConfig, WeChatOAuthError> {
        let app_id = self
            .app_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ConfigurationError::MissingField {
                field: "app_id".to_string(),
            })?;

        let app_secret = self
            .app_secret
            .ok_or_else(|| ConfigurationError::MissingField {
                field: "app_secret".to_string(),
            })?;

        let mut request_defaults = self.request_defaults;
        request_defaults.timeout = self
            .timeout
            .or(request_defaults.timeout)
            .or(Some(DEFAULT_TIMEOUT));

        if request_defaults.timeout == Some(Duration::ZERO) {
            return Err(ConfigurationError::InvalidConfig {
                message: "timeout must be greater than zero".to_string(),
            }
            .into());
        }

        Ok(WeChatOAuthConfig {
            app_id,
            app_secret,
            request_defaults,
            manager: TokenManagerConfig {
                serialize_refresh: self.serialize_refresh,
            },
        })
    }
}

/// Create a new WeChat OAuth configuration builder.
pub fn wechat_oauth_config() -> WeChatOAuthConfigBuilder {
    WeChatOAuthConfigBuilder::new()
}
