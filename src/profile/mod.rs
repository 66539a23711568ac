//! User Profiles
//!
//! Profile lookups against the user-info endpoint.

pub mod fetcher;

pub use fetcher::{ProfileFetcher, UserQuery, DEFAULT_LANG};
