//! Token Management
//!
//! Token lifecycle management for WeChat OAuth.
//!
//! This module provides:
//!
//! - **Token Store**: Persistence boundary keyed by subject id (`openid`)
//! - **Token Manager**: Code exchange, refresh, and lazy refresh-on-read

pub mod manager;
pub mod storage;

// Token Store
pub use storage::{FileTokenStore, InMemoryTokenStore, MockTokenStore, TokenStore};

// Token Manager
pub use manager::{DefaultTokenManager, TokenManager, TokenManagerConfig};
