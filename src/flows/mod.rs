//! WeChat OAuth Flows
//!
//! The authorization-code flow starts by redirecting the user to a provider
//! page; the code it returns is exchanged by the token manager.

pub mod authorize;

pub use authorize::{authorize_url, authorize_url_for_website};
