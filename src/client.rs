//! WeChat OAuth Client
//!
//! High-level client combining token management, profile lookups and
//! authorization URL building.

use std::sync::Arc;
use tracing::warn;

use crate::core::{ApiRequester, HttpTransport, ReqwestHttpTransport};
use crate::error::WeChatOAuthError;
use crate::flows;
use crate::profile::{ProfileFetcher, UserQuery};
use crate::token::{DefaultTokenManager, InMemoryTokenStore, TokenManager, TokenStore};
use crate::types::{AccessToken, AuthorizeScope, UserProfile, WeChatOAuthConfig};

/// WeChat OAuth client.
pub struct WeChatOAuthClient<
    T: HttpTransport = ReqwestHttpTransport,
    S: TokenStore = InMemoryTokenStore,
> {
    config: WeChatOAuthConfig,
    manager: Arc<DefaultTokenManager<T, S>>,
    profiles: ProfileFetcher<T, DefaultTokenManager<T, S>>,
}

impl WeChatOAuthClient<ReqwestHttpTransport, InMemoryTokenStore> {
    /// Create a client with the reqwest transport and an in-memory store.
    ///
    /// Tokens are kept in this process only. Use
    /// [`WeChatOAuthClient::with_store`] to share tokens between processes.
    pub fn new(config: WeChatOAuthConfig) -> Result<Self, WeChatOAuthError> {
        warn!(
            app_id = %config.app_id,
            "using in-memory token store; do not keep OAuth tokens in memory in production"
        );
        Self::with_store(config, InMemoryTokenStore::new())
    }
}

impl<S: TokenStore> WeChatOAuthClient<ReqwestHttpTransport, S> {
    /// Create a client with the reqwest transport and the given store.
    pub fn with_store(config: WeChatOAuthConfig, store: S) -> Result<Self, WeChatOAuthError> {
        let transport = ReqwestHttpTransport::new().map_err(WeChatOAuthError::from_transport)?;
        Ok(Self::with_components(config, transport, store))
    }
}

impl<T: HttpTransport, S: TokenStore> WeChatOAuthClient<T, S> {
    /// Create a client with custom implementations.
    pub fn with_components(config: WeChatOAuthConfig, transport: T, store: S) -> Self {
        Self::with_shared_components(config, Arc::new(transport), Arc::new(store))
    }

    /// Create a client over transport and store instances shared with the caller.
    pub fn with_shared_components(
        config: WeChatOAuthConfig,
        transport: Arc<T>,
        store: Arc<S>,
    ) -> Self {
        let requester = Arc::new(ApiRequester::new(
            transport,
            config.request_defaults.clone(),
        ));
        let manager = Arc::new(DefaultTokenManager::new(
            config.clone(),
            requester.clone(),
            store,
        ));
        let profiles = ProfileFetcher::new(requester, manager.clone());

        Self {
            config,
            manager,
            profiles,
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &WeChatOAuthConfig {
        &self.config
    }

    /// Get the token manager.
    pub fn token_manager(&self) -> &Arc<DefaultTokenManager<T, S>> {
        &self.manager
    }

    // ========== Authorization URLs ==========

    /// URL of the in-app authorization page.
    pub fn authorize_url(
        &self,
        redirect_uri: &str,
        state: Option<&str>,
        scope: Option<AuthorizeScope>,
    ) -> String {
        flows::authorize_url(&self.config.app_id, redirect_uri, state, scope)
    }

    /// URL of the website QR-code login page.
    pub fn authorize_url_for_website(
        &self,
        redirect_uri: &str,
        state: Option<&str>,
        scope: Option<AuthorizeScope>,
    ) -> String {
        flows::authorize_url_for_website(&self.config.app_id, redirect_uri, state, scope)
    }

    // ========== Tokens ==========

    /// Exchange an authorization code for a token.
    pub async fn exchange_code_for_token(
        &self,
        code: &str,
    ) -> Result<AccessToken, WeChatOAuthError> {
        self.manager.exchange_code_for_token(code).await
    }

    /// Exchange a refresh token for a new token.
    pub async fn refresh(&self, refresh_token: &str) -> Result<AccessToken, WeChatOAuthError> {
        self.manager.refresh(refresh_token).await
    }

    /// Get a valid token for a subject, refreshing if expired.
    pub async fn get_valid_token(
        &self,
        subject_id: &str,
    ) -> Result<AccessToken, WeChatOAuthError> {
        self.manager.get_valid_token(subject_id).await
    }

    /// Validate a token directly against the provider.
    pub async fn check_token(
        &self,
        subject_id: &str,
        access_token: &str,
    ) -> Result<(), WeChatOAuthError> {
        self.manager.check_token(subject_id, access_token).await
    }

    // ========== Profiles ==========

    /// Fetch a profile with an explicit access token.
    pub async fn fetch_profile(
        &self,
        subject_id: &str,
        access_token: &str,
        lang: &str,
    ) -> Result<UserProfile, WeChatOAuthError> {
        self.profiles
            .fetch_profile(subject_id, access_token, lang)
            .await
    }

    /// Get a subject's profile using its stored token.
    pub async fn get_user(
        &self,
        query: impl Into<UserQuery> + Send,
    ) -> Result<UserProfile, WeChatOAuthError> {
        self.profiles.get_user(query).await
    }

    /// Exchange a code and fetch the authorizing user's profile.
    pub async fn get_user_by_code(&self, code: &str) -> Result<UserProfile, WeChatOAuthError> {
        self.profiles.get_user_by_code(code).await
    }
}
