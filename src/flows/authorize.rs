//! Authorization Redirect URLs
//!
//! Builders for the pages users are sent to in order to obtain a code.

use crate::types::{AuthorizeScope, AUTHORIZE_ENDPOINT, WEBSITE_AUTHORIZE_ENDPOINT};

/// Fragment the provider expects on redirect page URLs.
const REDIRECT_FRAGMENT: &str = "#wechat_redirect";

/// URL of the in-app authorization page.
///
/// Scope defaults to [`AuthorizeScope::Base`], state to the empty string.
pub fn authorize_url(
    app_id: &str,
    redirect_uri: &str,
    state: Option<&str>,
    scope: Option<AuthorizeScope>,
) -> String {
    build_url(
        AUTHORIZE_ENDPOINT,
        app_id,
        redirect_uri,
        state,
        scope.unwrap_or(AuthorizeScope::Base),
    )
}

/// URL of the website QR-code login page.
///
/// Scope defaults to [`AuthorizeScope::Login`], state to the empty string.
pub fn authorize_url_for_website(
    app_id: &str,
    redirect_uri: &str,
    state: Option<&str>,
    scope: Option<AuthorizeScope>,
) -> String {
    build_url(
        WEBSITE_AUTHORIZE_ENDPOINT,
        app_id,
        redirect_uri,
        state,
        scope.unwrap_or(AuthorizeScope::Login),
    )
}

fn build_url(
    endpoint: &str,
    app_id: &str,
    redirect_uri: &str,
    state: Option<&str>,
    scope: AuthorizeScope,
) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("appid", app_id)
        .append_pair("redirect_uri", redirect_uri)
        .append_pair("response_type", "code")
        .append_pair("scope", scope.as_str())
        .append_pair("state", state.unwrap_or(""))
        .finish();

    format!("{}?{}{}", endpoint, query, REDIRECT_FRAGMENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorize_url_defaults() {
        let url = authorize_url("wx-app", "https://example.com/callback", None, None);
        assert_eq!(
            url,
            "https://open.weixin.qq.com/connect/oauth2/authorize?appid=wx-app\
             &redirect_uri=https%3A%2F%2Fexample.com%2Fcallback&response_type=code\
             &scope=snsapi_base&state=#wechat_redirect"
        );
    }

    #[test]
    fn test_authorize_url_with_scope_and_state() {
        let url = authorize_url(
            "wx-app",
            "https://example.com/cb",
            Some("xyz"),
            Some(AuthorizeScope::UserInfo),
        );
        assert!(url.contains("scope=snsapi_userinfo"));
        assert!(url.contains("state=xyz"));
        assert!(url.ends_with("#wechat_redirect"));
    }

    #[test]
    fn test_website_url() {
        let url = authorize_url_for_website("wx-app", "https://example.com/cb", Some("s"), None);
        assert!(url.starts_with("https://open.weixin.qq.com/connect/qrconnect?"));
        assert!(url.contains("scope=snsapi_login"));
    }
}
