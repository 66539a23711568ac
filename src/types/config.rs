//! Configuration Types
//!
//! Application credentials, fixed provider endpoints and authorization scopes.

use secrecy::SecretString;
use std::time::Duration;

use crate::error::{ConfigurationError, WeChatOAuthError};
use crate::token::TokenManagerConfig;
use crate::types::RequestOptions;

/// Code-for-token exchange endpoint.
pub const ACCESS_TOKEN_ENDPOINT: &str = "https://api.weixin.qq.com/sns/oauth2/access_token";
/// Refresh-token exchange endpoint.
pub const REFRESH_TOKEN_ENDPOINT: &str = "https://api.weixin.qq.com/sns/oauth2/refresh_token";
/// User-info endpoint.
pub const USER_INFO_ENDPOINT: &str = "https://api.weixin.qq.com/sns/userinfo";
/// Token + openid check endpoint.
pub const AUTH_CHECK_ENDPOINT: &str = "https://api.weixin.qq.com/sns/auth";
/// In-app authorization page.
pub const AUTHORIZE_ENDPOINT: &str = "https://open.weixin.qq.com/connect/oauth2/authorize";
/// Website (QR code) login page.
pub const WEBSITE_AUTHORIZE_ENDPOINT: &str = "https://open.weixin.qq.com/connect/qrconnect";

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Authorization scope requested on the redirect page.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthorizeScope {
    /// Silent authorization, openid only.
    Base,
    /// Prompted authorization, allows fetching the user profile.
    UserInfo,
    /// Website login via QR code.
    Login,
}

impl AuthorizeScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Base => "snsapi_base",
            Self::UserInfo => "snsapi_userinfo",
            Self::Login => "snsapi_login",
        }
    }
}

/// WeChat OAuth configuration.
#[derive(Clone)]
pub struct WeChatOAuthConfig {
    /// Application id (`appid`).
    pub app_id: String,
    /// Application secret.
    pub app_secret: SecretString,
    /// Defaults every request option is merged over.
    pub request_defaults: RequestOptions,
    /// Token manager behavior.
    pub manager: TokenManagerConfig,
}

impl WeChatOAuthConfig {
    /// Load configuration from the environment.
    ///
    /// Reads `WECHAT_APP_ID`, `WECHAT_APP_SECRET` and the optional
    /// `WECHAT_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, WeChatOAuthError> {
        let app_id = env_var("WECHAT_APP_ID")?;
        let app_secret = env_var("WECHAT_APP_SECRET")?;

        let mut builder = crate::builders::wechat_oauth_config()
            .app_id(app_id)
            .app_secret(app_secret);

        if let Ok(raw) = std::env::var("WECHAT_TIMEOUT_SECS") {
            let secs: u64 = raw.trim().parse().map_err(|_| ConfigurationError::Environment {
                message: format!("WECHAT_TIMEOUT_SECS is not a number: {}", raw),
            })?;
            builder = builder.timeout(Duration::from_secs(secs));
        }

        builder.build()
    }
}

impl std::fmt::Debug for WeChatOAuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeChatOAuthConfig")
            .field("app_id", &self.app_id)
            .field("app_secret", &"[REDACTED]")
            .field("request_defaults", &self.request_defaults)
            .field("manager", &self.manager)
            .finish()
    }
}

fn env_var(name: &str) -> Result<String, ConfigurationError> {
    std::env::var(name).map_err(|_| ConfigurationError::Environment {
        message: format!("{} must be set", name),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_strings() {
        assert_eq!(AuthorizeScope::Base.as_str(), "snsapi_base");
        assert_eq!(AuthorizeScope::UserInfo.as_str(), "snsapi_userinfo");
        assert_eq!(AuthorizeScope::Login.as_str(), "snsapi_login");
    }
}
