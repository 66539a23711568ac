//! WeChat OAuth Integration Module
//!
//! Access-token lifecycle and user profile lookups for WeChat web
//! authorization (authorization code + refresh token).
//!
//! # Features
//!
//! - Authorization code exchange (`sns/oauth2/access_token`)
//! - Token refresh (`sns/oauth2/refresh_token`)
//! - Lazy refresh-on-read of stored tokens, keyed by `openid`
//! - User profile lookup (`sns/userinfo`)
//! - Direct token check (`sns/auth`)
//! - Pluggable token stores and HTTP transports
//!
//! # Example
//!
//! ```rust,ignore
//! use wechat_oauth_integration::{wechat_oauth_config, FileTokenStore, WeChatOAuthClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = wechat_oauth_config()
//!         .app_id("wx-app-id")
//!         .app_secret("wx-app-secret")
//!         .build()?;
//!
//!     let client = WeChatOAuthClient::with_store(config, FileTokenStore::new("/var/lib/tokens"))?;
//!
//!     // On the redirect callback:
//!     let token = client.exchange_code_for_token("CODE").await?;
//!
//!     // Later, from any process sharing the store:
//!     let profile = client.get_user(token.subject_id()).await?;
//!     println!("{}", profile.display_name);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - `types`: Token, profile, request option and configuration types
//! - `error`: Error hierarchy (transport, provider, missing token)
//! - `core`: HTTP transport and the request helper every call goes through
//! - `token`: Token stores and the token manager
//! - `profile`: User profile lookups
//! - `flows`: Authorization redirect URLs
//! - `builders`: Fluent configuration builder
//! - `client`: High-level client combining all functionality

pub mod builders;
pub mod client;
pub mod core;
pub mod error;
pub mod flows;
pub mod profile;
pub mod token;
pub mod types;

// Re-export main client
pub use client::WeChatOAuthClient;

// Re-export builders
pub use builders::{wechat_oauth_config, WeChatOAuthConfigBuilder};

// Re-export errors
pub use error::{
    provider_error_from_body, ConfigurationError, ProviderError, StorageError, TransportError,
    WeChatOAuthError, WeChatOAuthResult,
};

// Re-export types
pub use types::{
    AccessToken, AuthorizeScope, DataType, RequestOptions, UserProfile, WeChatOAuthConfig,
};

// Re-export core components
pub use core::{
    ApiRequester, HttpMethod, HttpRequest, HttpResponse, HttpTransport, MockHttpTransport,
    ReqwestHttpTransport,
};

// Re-export flows
pub use flows::{authorize_url, authorize_url_for_website};

// Re-export token management
pub use token::{
    DefaultTokenManager, FileTokenStore, InMemoryTokenStore, MockTokenStore, TokenManager,
    TokenManagerConfig, TokenStore,
};

// Re-export profiles
pub use profile::{ProfileFetcher, UserQuery};
