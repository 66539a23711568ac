//! Profile Fetcher
//!
//! Fetches the user-info profile with a valid access token.

use std::sync::Arc;

use crate::core::{ApiRequester, HttpTransport};
use crate::error::{require_non_empty, WeChatOAuthError};
use crate::token::TokenManager;
use crate::types::{RequestOptions, UserProfile, USER_INFO_ENDPOINT};

/// Language used when a query does not name one.
pub const DEFAULT_LANG: &str = "en";

/// Subject and language of a profile lookup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserQuery {
    pub subject_id: String,
    /// `zh_CN`, `zh_TW` or `en`.
    pub lang: String,
}

impl UserQuery {
    pub fn new(subject_id: impl Into<String>) -> Self {
        Self {
            subject_id: subject_id.into(),
            lang: DEFAULT_LANG.to_string(),
        }
    }

    pub fn lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = lang.into();
        self
    }
}

impl From<&str> for UserQuery {
    fn from(subject_id: &str) -> Self {
        Self::new(subject_id)
    }
}

impl From<String> for UserQuery {
    fn from(subject_id: String) -> Self {
        Self::new(subject_id)
    }
}

/// Fetches user profiles, obtaining tokens through a [`TokenManager`].
pub struct ProfileFetcher<T: HttpTransport, M: TokenManager> {
    requester: Arc<ApiRequester<T>>,
    manager: Arc<M>,
}

impl<T: HttpTransport, M: TokenManager> ProfileFetcher<T, M> {
    pub fn new(requester: Arc<ApiRequester<T>>, manager: Arc<M>) -> Self {
        Self { requester, manager }
    }

    /// Call the user-info endpoint with an access token.
    pub async fn fetch_profile(
        &self,
        subject_id: &str,
        access_token: &str,
        lang: &str,
    ) -> Result<UserProfile, WeChatOAuthError> {
        require_non_empty(subject_id, "subject_id")?;

        let options = RequestOptions::json([
            ("access_token", access_token),
            ("openid", subject_id),
            ("lang", lang),
        ]);

        let data = self.requester.request(USER_INFO_ENDPOINT, options).await?;

        serde_json::from_value(data).map_err(|e| WeChatOAuthError::InvalidResponse {
            message: format!("malformed user info: {}", e),
        })
    }

    /// Get the profile for a subject, refreshing its token first if expired.
    pub async fn get_user(
        &self,
        query: impl Into<UserQuery> + Send,
    ) -> Result<UserProfile, WeChatOAuthError> {
        let query = query.into();
        let token = self.manager.get_valid_token(&query.subject_id).await?;
        self.fetch_profile(&query.subject_id, token.value(), &query.lang)
            .await
    }

    /// Exchange an authorization code and fetch the authorizing user's profile.
    pub async fn get_user_by_code(&self, code: &str) -> Result<UserProfile, WeChatOAuthError> {
        let token = self.manager.exchange_code_for_token(code).await?;
        self.get_user(token.subject_id()).await
    }
}
