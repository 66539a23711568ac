//! API Requester
//!
//! The single path every provider call goes through: option merging,
//! dispatch, transport error relabelling and provider error detection.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::core::{HttpMethod, HttpRequest, HttpTransport};
use crate::error::{provider_error_from_body, TransportError, WeChatOAuthError};
use crate::types::{DataType, RequestOptions};

/// Sends provider requests over an injected transport.
pub struct ApiRequester<T: HttpTransport> {
    transport: Arc<T>,
    defaults: RequestOptions,
}

impl<T: HttpTransport> ApiRequester<T> {
    /// Create a requester with manager-wide default options.
    pub fn new(transport: Arc<T>, defaults: RequestOptions) -> Self {
        Self {
            transport,
            defaults,
        }
    }

    /// Default options every call is merged over.
    pub fn defaults(&self) -> &RequestOptions {
        &self.defaults
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    /// Send a request and return the decoded body.
    ///
    /// Fails with a `WeChatAPI`-prefixed transport error when the call itself
    /// fails, and with a provider error when the body carries a non-zero
    /// `errcode`.
    pub async fn request(
        &self,
        url: &str,
        options: RequestOptions,
    ) -> Result<Value, WeChatOAuthError> {
        let options = options.merged_over(&self.defaults);
        let http_request = build_http_request(url, &options);

        debug!(
            method = http_request.method.as_str(),
            url = %http_request.url,
            "sending WeChat API request"
        );

        let response = self
            .transport
            .send(http_request)
            .await
            .map_err(WeChatOAuthError::from_transport)?;

        if !response.is_success() {
            return Err(WeChatOAuthError::from_transport(TransportError::HttpStatus {
                status: response.status,
                body: response.body,
            }));
        }

        let data = match options.data_type.unwrap_or_default() {
            DataType::Json => serde_json::from_str::<Value>(&response.body).map_err(|e| {
                WeChatOAuthError::from_transport(TransportError::InvalidJson {
                    message: e.to_string(),
                })
            })?,
            DataType::Text => Value::String(response.body),
        };

        if let Some(error) = provider_error_from_body(&data) {
            debug!(code = error.code, url = %url, "WeChat API returned an error");
            return Err(WeChatOAuthError::Provider(error));
        }

        Ok(data)
    }
}

fn build_http_request(url: &str, options: &RequestOptions) -> HttpRequest {
    let method = options.method.unwrap_or(HttpMethod::Get);
    let mut headers = options.headers.clone();
    let params: Vec<(String, String)> = options
        .data
        .as_ref()
        .map(|data| data.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
        .unwrap_or_default();

    let (query, body) = match method {
        HttpMethod::Get => (params, None),
        HttpMethod::Post => {
            headers
                .entry("content-type".to_string())
                .or_insert_with(|| "application/x-www-form-urlencoded".to_string());
            let body = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(params.iter())
                .finish();
            (Vec::new(), Some(body))
        }
    };

    if options.data_type.unwrap_or_default() == DataType::Json {
        headers
            .entry("accept".to_string())
            .or_insert_with(|| "application/json".to_string());
    }

    HttpRequest {
        method,
        url: url.to_string(),
        query,
        headers,
        body,
        timeout: options.timeout,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{HttpResponse, MockHttpTransport};
    use serde_json::json;
    use std::time::Duration;

    fn requester(transport: Arc<MockHttpTransport>) -> ApiRequester<MockHttpTransport> {
        let defaults = RequestOptions::new()
            .header("User-Agent", "wechat-oauth")
            .timeout(Duration::from_secs(30));
        ApiRequester::new(transport, defaults)
    }

    #[tokio::test]
    async fn test_success_returns_decoded_body() {
        let transport = Arc::new(MockHttpTransport::new());
        transport.queue_json(&json!({"openid": "u1", "nickname": "Alice"}));

        let data = requester(transport.clone())
            .request(
                "https://api.weixin.qq.com/sns/userinfo",
                RequestOptions::json([("openid", "u1")]),
            )
            .await
            .unwrap();

        assert_eq!(data["nickname"], "Alice");

        let request = transport.get_last_request().unwrap();
        assert_eq!(request.method, HttpMethod::Get);
        assert_eq!(request.query_param("openid"), Some("u1"));
        assert_eq!(request.headers["user-agent"], "wechat-oauth");
        assert_eq!(request.timeout, Some(Duration::from_secs(30)));
        assert!(request.body.is_none());
    }

    #[tokio::test]
    async fn test_call_options_merge_over_defaults() {
        let transport = Arc::new(MockHttpTransport::new());
        transport.queue_json(&json!({}));

        let options = RequestOptions::new()
            .header("user-agent", "custom")
            .timeout(Duration::from_secs(2));
        requester(transport.clone())
            .request("https://api.weixin.qq.com/sns/auth", options)
            .await
            .unwrap();

        let request = transport.get_last_request().unwrap();
        assert_eq!(request.headers["user-agent"], "custom");
        assert_eq!(request.timeout, Some(Duration::from_secs(2)));
    }

    #[tokio::test]
    async fn test_provider_error_is_surfaced() {
        let transport = Arc::new(MockHttpTransport::new());
        transport.queue_json(&json!({"errcode": 40001, "errmsg": "invalid credential"}));

        let error = requester(transport)
            .request("https://api.weixin.qq.com/sns/userinfo", RequestOptions::new())
            .await
            .unwrap_err();

        assert_eq!(error.name(), "WeChatAPIError");
        assert_eq!(error.provider_code(), Some(40001));
    }

    #[tokio::test]
    async fn test_transport_error_is_prefixed() {
        let transport = Arc::new(MockHttpTransport::new());
        transport.queue_error(TransportError::ConnectionFailed {
            message: "connection refused".to_string(),
        });

        let error = requester(transport)
            .request("https://api.weixin.qq.com/sns/userinfo", RequestOptions::new())
            .await
            .unwrap_err();

        assert_eq!(error.name(), "WeChatAPIConnectionError");
        assert!(error.to_string().contains("connection refused"));
    }

    #[tokio::test]
    async fn test_invalid_json_and_bad_status() {
        let transport = Arc::new(MockHttpTransport::new());
        transport.queue_response(HttpResponse {
            status: 200,
            headers: Default::default(),
            body: "<html>".to_string(),
        });
        transport.queue_response(HttpResponse {
            status: 502,
            headers: Default::default(),
            body: "bad gateway".to_string(),
        });
        let requester = requester(transport);

        let error = requester
            .request("https://api.weixin.qq.com/sns/auth", RequestOptions::new())
            .await
            .unwrap_err();
        assert_eq!(error.name(), "WeChatAPIJSONResponseFormatError");

        let error = requester
            .request("https://api.weixin.qq.com/sns/auth", RequestOptions::new())
            .await
            .unwrap_err();
        assert_eq!(error.name(), "WeChatAPIHttpStatusError");
    }

    #[tokio::test]
    async fn test_text_and_post_requests() {
        let transport = Arc::new(MockHttpTransport::new());
        transport.queue_response(HttpResponse {
            status: 200,
            headers: Default::default(),
            body: "ok".to_string(),
        });

        let options = RequestOptions::json([("a", "1 2"), ("b", "x&y")])
            .method(HttpMethod::Post)
            .data_type(DataType::Text);
        let data = requester(transport.clone())
            .request("https://example.com/form", options)
            .await
            .unwrap();
        assert_eq!(data, Value::String("ok".to_string()));

        let request = transport.get_last_request().unwrap();
        assert!(request.query.is_empty());
        assert_eq!(request.body.as_deref(), Some("a=1+2&b=x%26y"));
        assert_eq!(
            request.headers["content-type"],
            "application/x-www-form-urlencoded"
        );
    }
}
