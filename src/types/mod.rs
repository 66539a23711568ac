//! WeChat OAuth Types
//!
//! Core type definitions for token, profile and request handling.

pub mod config;
pub mod profile;
pub mod request;
pub mod token;

pub use config::*;
pub use profile::*;
pub use request::*;
pub use token::*;
