//! Builders
//!
//! Fluent builder patterns for WeChat OAuth configuration.

pub mod config;

pub use config::{wechat_oauth_config, WeChatOAuthConfigBuilder};
