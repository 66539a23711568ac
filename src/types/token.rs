//! Token Types
//!
//! The access token issued for one WeChat user.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Access token for one subject (`openid`).
///
/// Built from the raw fields returned by the provider or read back from a
/// token store. Construction never fails: missing or malformed fields only
/// make [`AccessToken::is_valid`] return `false`. Values are immutable; a
/// refresh produces a new `AccessToken`.
///
/// Serialized with the provider's field names (`access_token`, `expires_in`,
/// `refresh_token`, `openid`, `scope`, `unionid`) plus `create_at`, the
/// issue time in epoch milliseconds stamped by the token manager.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Value")]
pub struct AccessToken {
    #[serde(rename = "access_token")]
    token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
    #[serde(rename = "expires_in")]
    expires_in_secs: u64,
    #[serde(rename = "create_at")]
    issued_at_ms: i64,
    #[serde(rename = "openid")]
    subject_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    scope: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    unionid: Option<String>,
}

impl AccessToken {
    /// Build a token from a mapping of raw fields.
    pub fn from_fields(fields: &Map<String, Value>) -> Self {
        Self {
            token: string_field(fields, "access_token").unwrap_or_default(),
            refresh_token: string_field(fields, "refresh_token").filter(|s| !s.is_empty()),
            expires_in_secs: int_field(fields, "expires_in")
                .and_then(|v| u64::try_from(v).ok())
                .unwrap_or(0),
            issued_at_ms: int_field(fields, "create_at").unwrap_or(0),
            subject_id: string_field(fields, "openid").unwrap_or_default(),
            scope: string_field(fields, "scope"),
            unionid: string_field(fields, "unionid"),
        }
    }

    /// Copy of this token with the issue time replaced.
    pub(crate) fn issued_at(mut self, issued_at_ms: i64) -> Self {
        self.issued_at_ms = issued_at_ms;
        self
    }

    /// Opaque access token value.
    pub fn value(&self) -> &str {
        &self.token
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    pub fn expires_in_secs(&self) -> u64 {
        self.expires_in_secs
    }

    /// Issue time in epoch milliseconds, set at acquisition time.
    pub fn issued_at_ms(&self) -> i64 {
        self.issued_at_ms
    }

    /// Subject (`openid`) the token was issued for.
    pub fn subject_id(&self) -> &str {
        &self.subject_id
    }

    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    pub fn union_id(&self) -> Option<&str> {
        self.unionid.as_deref()
    }

    /// Expiration time in epoch milliseconds.
    pub fn expires_at_ms(&self) -> i64 {
        let lifetime_ms = i64::try_from(self.expires_in_secs)
            .unwrap_or(i64::MAX)
            .saturating_mul(1000);
        self.issued_at_ms.saturating_add(lifetime_ms)
    }

    /// Check validity against the current clock.
    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now().timestamp_millis())
    }

    /// Check validity at a given time (epoch milliseconds).
    pub fn is_valid_at(&self, now_ms: i64) -> bool {
        !self.token.is_empty() && now_ms < self.expires_at_ms()
    }
}

impl From<Value> for AccessToken {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(fields) => Self::from_fields(&fields),
            _ => Self::default(),
        }
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"[REDACTED]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("expires_in_secs", &self.expires_in_secs)
            .field("issued_at_ms", &self.issued_at_ms)
            .field("subject_id", &self.subject_id)
            .field("scope", &self.scope)
            .field("unionid", &self.unionid)
            .finish()
    }
}

fn string_field(fields: &Map<String, Value>, key: &str) -> Option<String> {
    match fields.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

// Stores written by other processes may hold numbers as strings.
fn int_field(fields: &Map<String, Value>, key: &str) -> Option<i64> {
    match fields.get(key)? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_u64().map(|v| i64::try_from(v).unwrap_or(i64::MAX)))
            .or_else(|| n.as_f64().map(|v| v as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn token_issued_at(issued_at_ms: i64, expires_in: u64) -> AccessToken {
        AccessToken::from(json!({
            "access_token": "AT1",
            "expires_in": expires_in,
            "refresh_token": "RT1",
            "openid": "u1",
            "scope": "snsapi_userinfo",
            "create_at": issued_at_ms
        }))
    }

    #[test]
    fn test_validity_boundary() {
        let token = token_issued_at(1_000_000, 7200);
        let expires_at = 1_000_000 + 7_200_000;

        assert!(token.is_valid_at(1_000_000));
        assert!(token.is_valid_at(expires_at - 1));
        assert!(!token.is_valid_at(expires_at));
        assert!(!token.is_valid_at(expires_at + 1));
    }

    #[test]
    fn test_is_valid_uses_current_time() {
        let now = Utc::now().timestamp_millis();
        assert!(token_issued_at(now, 7200).is_valid());
        assert!(!token_issued_at(now - 10_000_000, 7200).is_valid());
    }

    #[test]
    fn test_empty_token_is_never_valid() {
        let token = AccessToken::from(json!({
            "access_token": "",
            "expires_in": 7200,
            "create_at": 0
        }));
        assert!(!token.is_valid_at(0));
    }

    #[test]
    fn test_malformed_fields_are_invalid_not_errors() {
        let token = AccessToken::from(json!({
            "access_token": ["not", "a", "string"],
            "expires_in": "soon",
            "openid": null
        }));
        assert_eq!(token.value(), "");
        assert_eq!(token.expires_in_secs(), 0);
        assert_eq!(token.subject_id(), "");
        assert!(!token.is_valid_at(0));

        assert_eq!(AccessToken::from(json!("garbage")), AccessToken::default());
    }

    #[test]
    fn test_numeric_strings_are_accepted() {
        let token = AccessToken::from(json!({
            "access_token": "AT1",
            "expires_in": "7200",
            "create_at": "1000",
            "openid": "u1"
        }));
        assert_eq!(token.expires_in_secs(), 7200);
        assert_eq!(token.issued_at_ms(), 1000);
        assert!(token.is_valid_at(1000 + 7_199_999));
    }

    #[test]
    fn test_store_format_uses_provider_field_names() {
        let token = token_issued_at(42, 7200);
        let value = serde_json::to_value(&token).unwrap();

        assert_eq!(value["access_token"], "AT1");
        assert_eq!(value["refresh_token"], "RT1");
        assert_eq!(value["openid"], "u1");
        assert_eq!(value["create_at"], 42);
        assert!(value.get("unionid").is_none());

        let restored: AccessToken = serde_json::from_value(value).unwrap();
        assert_eq!(restored, token);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let output = format!("{:?}", token_issued_at(0, 7200));
        assert!(!output.contains("AT1"));
        assert!(!output.contains("RT1"));
        assert!(output.contains("u1"));
    }
}
