//! Token Manager
//!
//! Acquires tokens from authorization codes, refreshes expired tokens and
//! serves cached tokens while they are still valid.
//!
//! Per subject the token moves through
//! `Unauthorized -> Valid -> Expired -> Valid -> ...`: an authorization code
//! yields the first token, and every later expiry is repaired lazily by a
//! refresh when the token is next read. Every newly obtained token is
//! persisted through the [`TokenStore`] before it is returned.

use async_trait::async_trait;
use chrono::Utc;
use secrecy::ExposeSecret;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::core::{ApiRequester, HttpTransport};
use crate::error::{require_non_empty, WeChatOAuthError};
use crate::token::TokenStore;
use crate::types::{
    AccessToken, RequestOptions, WeChatOAuthConfig, ACCESS_TOKEN_ENDPOINT, AUTH_CHECK_ENDPOINT,
    REFRESH_TOKEN_ENDPOINT,
};

/// Token manager interface.
#[async_trait]
pub trait TokenManager: Send + Sync {
    /// Exchange a one-time authorization code for a token and persist it.
    async fn exchange_code_for_token(&self, code: &str) -> Result<AccessToken, WeChatOAuthError>;

    /// Exchange a refresh token for a new token and persist it.
    async fn refresh(&self, refresh_token: &str) -> Result<AccessToken, WeChatOAuthError>;

    /// Get a valid token for a subject, refreshing an expired one first.
    async fn get_valid_token(&self, subject_id: &str) -> Result<AccessToken, WeChatOAuthError>;

    /// Validate a token + subject pair directly against the provider.
    async fn check_token(
        &self,
        subject_id: &str,
        access_token: &str,
    ) -> Result<(), WeChatOAuthError>;

    /// Get the stored token without applying the validity policy.
    async fn stored_token(&self, subject_id: &str)
        -> Result<Option<AccessToken>, WeChatOAuthError>;
}

/// Token manager configuration.
#[derive(Debug, Clone, Default)]
pub struct TokenManagerConfig {
    /// Serialize refreshes per subject.
    ///
    /// When disabled, concurrent readers of the same expired token each send
    /// their own refresh request. Enable it when refresh tokens are
    /// single-use for the application.
    pub serialize_refresh: bool,
}

/// Default token manager implementation.
pub struct DefaultTokenManager<T: HttpTransport, S: TokenStore> {
    config: WeChatOAuthConfig,
    requester: Arc<ApiRequester<T>>,
    store: Arc<S>,
    refresh_locks: tokio::sync::Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl<T: HttpTransport, S: TokenStore> DefaultTokenManager<T, S> {
    /// Create new token manager.
    pub fn new(config: WeChatOAuthConfig, requester: Arc<ApiRequester<T>>, store: Arc<S>) -> Self {
        Self {
            config,
            requester,
            store,
            refresh_locks: tokio::sync::Mutex::new(HashMap::new()),
        }
    }

    /// Requester shared with other components calling the provider.
    pub fn requester(&self) -> &Arc<ApiRequester<T>> {
        &self.requester
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    fn now_ms() -> i64 {
        Utc::now().timestamp_millis()
    }

    /// Stamp the issue time and persist a freshly exchanged token.
    async fn process_token(&self, data: Value) -> Result<AccessToken, WeChatOAuthError> {
        let token = AccessToken::from(data).issued_at(Self::now_ms());

        if token.subject_id().is_empty() {
            return Err(WeChatOAuthError::InvalidResponse {
                message: "token response has no openid".to_string(),
            });
        }

        self.store.save(token.subject_id(), &token).await?;

        info!(
            subject_id = token.subject_id(),
            expires_in = token.expires_in_secs(),
            "stored WeChat access token"
        );

        Ok(token)
    }

    async fn load_valid_or_refresh(
        &self,
        subject_id: &str,
    ) -> Result<AccessToken, WeChatOAuthError> {
        let stored = self
            .store
            .load(subject_id)
            .await?
            .ok_or_else(|| WeChatOAuthError::NoToken {
                subject_id: subject_id.to_string(),
            })?;

        if stored.is_valid_at(Self::now_ms()) {
            debug!(subject_id, "serving cached WeChat access token");
            return Ok(stored);
        }

        let refresh_token =
            stored
                .refresh_token()
                .ok_or_else(|| WeChatOAuthError::NoRefreshToken {
                    subject_id: subject_id.to_string(),
                })?;

        info!(subject_id, "WeChat access token expired, refreshing");
        self.refresh(refresh_token).await
    }

    async fn refresh_lock(&self, subject_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.refresh_locks
            .lock()
            .await
            .entry(subject_id.to_string())
            .or_default()
            .clone()
    }

    /// Drop this caller's handle and forget the subject's lock once no other
    /// caller holds or waits on it.
    async fn release_refresh_lock(&self, subject_id: &str, lock: Arc<tokio::sync::Mutex<()>>) {
        let mut locks = self.refresh_locks.lock().await;
        drop(lock);

        if locks
            .get(subject_id)
            .is_some_and(|entry| Arc::strong_count(entry) == 1)
        {
            locks.remove(subject_id);
        }
    }
}

#[async_trait]
impl<T: HttpTransport, S: TokenStore> TokenManager for DefaultTokenManager<T, S> {
    async fn exchange_code_for_token(&self, code: &str) -> Result<AccessToken, WeChatOAuthError> {
        require_non_empty(code, "code")?;

        let options = RequestOptions::json([
            ("appid", self.config.app_id.as_str()),
            ("secret", self.config.app_secret.expose_secret().as_str()),
            ("code", code),
            ("grant_type", "authorization_code"),
        ]);

        let data = self.requester.request(ACCESS_TOKEN_ENDPOINT, options).await?;
        self.process_token(data).await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<AccessToken, WeChatOAuthError> {
        require_non_empty(refresh_token, "refresh_token")?;

        let options = RequestOptions::json([
            ("appid", self.config.app_id.as_str()),
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ]);

        let data = self.requester.request(REFRESH_TOKEN_ENDPOINT, options).await?;
        self.process_token(data).await
    }

    async fn get_valid_token(&self, subject_id: &str) -> Result<AccessToken, WeChatOAuthError> {
        require_non_empty(subject_id, "subject_id")?;

        if !self.config.manager.serialize_refresh {
            return self.load_valid_or_refresh(subject_id).await;
        }

        let lock = self.refresh_lock(subject_id).await;
        let result = {
            let _guard = lock.lock().await;
            self.load_valid_or_refresh(subject_id).await
        };
        self.release_refresh_lock(subject_id, lock).await;
        result
    }

    async fn check_token(
        &self,
        subject_id: &str,
        access_token: &str,
    ) -> Result<(), WeChatOAuthError> {
        require_non_empty(subject_id, "subject_id")?;
        require_non_empty(access_token, "access_token")?;

        let options =
            RequestOptions::json([("access_token", access_token), ("openid", subject_id)]);

        self.requester.request(AUTH_CHECK_ENDPOINT, options).await?;
        Ok(())
    }

    async fn stored_token(
        &self,
        subject_id: &str,
    ) -> Result<Option<AccessToken>, WeChatOAuthError> {
        require_non_empty(subject_id, "subject_id")?;
        self.store.load(subject_id).await
    }
}
