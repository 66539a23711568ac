//! Request Option Types
//!
//! Per-call options and the manager-wide defaults they are merged over.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use crate::core::HttpMethod;

/// Expected format of a response body.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DataType {
    /// Decode the body as JSON.
    #[default]
    Json,
    /// Keep the body as a string.
    Text,
}

/// Options for a single provider request.
///
/// Header names are stored lowercased.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestOptions {
    /// HTTP method (GET when unset).
    pub method: Option<HttpMethod>,
    /// Query parameters for GET, form body for POST.
    pub data: Option<BTreeMap<String, String>>,
    /// Expected decode format (JSON when unset).
    pub data_type: Option<DataType>,
    /// Request headers.
    pub headers: HashMap<String, String>,
    /// Request timeout, forwarded to the transport.
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options carrying the given request data, decoded as JSON.
    pub fn json<K, V>(data: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            data: Some(
                data.into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
            data_type: Some(DataType::Json),
            ..Self::default()
        }
    }

    pub fn method(mut self, method: HttpMethod) -> Self {
        self.method = Some(method);
        self
    }

    pub fn data_type(mut self, data_type: DataType) -> Self {
        self.data_type = Some(data_type);
        self
    }

    /// Set a header; the name is lowercased.
    pub fn header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Merge these call options over `defaults`.
    ///
    /// Headers are merged by name with the call's value winning. Every other
    /// option set on the call replaces the default entirely.
    pub fn merged_over(&self, defaults: &RequestOptions) -> RequestOptions {
        let mut headers: HashMap<String, String> = defaults
            .headers
            .iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), v.clone()))
            .collect();
        for (name, value) in &self.headers {
            headers.insert(name.to_ascii_lowercase(), value.clone());
        }

        RequestOptions {
            method: self.method.or(defaults.method),
            data: self.data.clone().or_else(|| defaults.data.clone()),
            data_type: self.data_type.or(defaults.data_type),
            headers,
            timeout: self.timeout.or(defaults.timeout),
        }
    }
}
