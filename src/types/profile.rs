//! User Profile Types

use serde::{Deserialize, Deserializer, Serialize};

/// Normalized profile returned by the user-info endpoint.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(rename = "openid", default)]
    pub subject_id: String,
    #[serde(rename = "nickname", default)]
    pub display_name: String,
    /// Sex code as reported by the provider (`1` male, `2` female, `0` unknown).
    #[serde(default, deserialize_with = "string_or_number")]
    pub sex: String,
    #[serde(default)]
    pub province: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub country: String,
    #[serde(rename = "headimgurl", default)]
    pub avatar_url: String,
    /// Privileges in the order returned by the provider.
    #[serde(rename = "privilege", default, deserialize_with = "null_as_empty")]
    pub privileges: Vec<String>,
    #[serde(rename = "unionid", default, skip_serializing_if = "Option::is_none")]
    pub union_id: Option<String>,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => s,
        Some(serde_json::Value::Number(n)) => n.to_string(),
        _ => String::new(),
    })
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}
