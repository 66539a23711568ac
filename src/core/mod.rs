//! WeChat OAuth Core Components
//!
//! Core infrastructure for provider requests.

pub mod request;
pub mod transport;

pub use request::*;
pub use transport::*;
