//! Token Storage
//!
//! Persistence boundary for access tokens, keyed by subject id.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::error::{StorageError, WeChatOAuthError};
use crate::types::AccessToken;

/// Token store interface.
///
/// The store is the system of record for tokens. One entry per subject;
/// `save` overwrites. A missing entry means the subject never authorized.
/// Implementations decide their own concurrency discipline.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Load the token stored for a subject.
    async fn load(&self, subject_id: &str) -> Result<Option<AccessToken>, WeChatOAuthError>;

    /// Store the token for a subject, replacing any previous one.
    async fn save(&self, subject_id: &str, token: &AccessToken) -> Result<(), WeChatOAuthError>;
}

/// In-memory token store.
///
/// State lives in this instance only; processes do not see each other's
/// tokens. Not suitable for multi-process deployments.
#[derive(Default)]
pub struct InMemoryTokenStore {
    tokens: Mutex<HashMap<String, AccessToken>>,
}

impl InMemoryTokenStore {
    /// Create new in-memory token store.
    pub fn new() -> Self {
        Self::default()
    }

    fn tokens(&self) -> Result<MutexGuard<'_, HashMap<String, AccessToken>>, StorageError> {
        self.tokens.lock().map_err(|_| StorageError::ReadFailed {
            message: "token map lock poisoned".to_string(),
        })
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn load(&self, subject_id: &str) -> Result<Option<AccessToken>, WeChatOAuthError> {
        Ok(self.tokens()?.get(subject_id).cloned())
    }

    async fn save(&self, subject_id: &str, token: &AccessToken) -> Result<(), WeChatOAuthError> {
        self.tokens()?.insert(subject_id.to_string(), token.clone());
        Ok(())
    }
}

/// File-backed token store: one JSON document per subject in a directory.
///
/// Writes go to a temporary file that is then renamed over the target, so
/// readers in other processes never observe a partial document. Every write
/// uses its own temporary file; concurrent saves for one subject leave the
/// last renamed document in place.
pub struct FileTokenStore {
    dir: PathBuf,
}

/// Sequence for temporary file names, shared by every store in the process.
static WRITE_SEQ: AtomicU64 = AtomicU64::new(0);

impl FileTokenStore {
    /// Create a store rooted at `dir`. The directory is created on first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, subject_id: &str) -> PathBuf {
        let name: String = url::form_urlencoded::byte_serialize(subject_id.as_bytes()).collect();
        self.dir.join(format!("{}.json", name))
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn load(&self, subject_id: &str) -> Result<Option<AccessToken>, WeChatOAuthError> {
        let path = self.path_for(subject_id);

        let contents = match tokio::fs::read(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(StorageError::ReadFailed {
                    message: format!("{}: {}", path.display(), e),
                }
                .into())
            }
        };

        let token = serde_json::from_slice::<AccessToken>(&contents).map_err(|e| {
            StorageError::CorruptedData {
                message: format!("{}: {}", path.display(), e),
            }
        })?;

        Ok(Some(token))
    }

    async fn save(&self, subject_id: &str, token: &AccessToken) -> Result<(), WeChatOAuthError> {
        let write_failed = |e: std::io::Error| StorageError::WriteFailed {
            message: e.to_string(),
        };

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(write_failed)?;

        let contents = serde_json::to_vec(token).map_err(|e| StorageError::WriteFailed {
            message: e.to_string(),
        })?;

        let path = self.path_for(subject_id);
        let seq = WRITE_SEQ.fetch_add(1, Ordering::Relaxed);
        let tmp = path.with_extension(format!("json.{}.{}.tmp", std::process::id(), seq));
        tokio::fs::write(&tmp, contents).await.map_err(write_failed)?;

        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(write_failed(e).into());
        }
        Ok(())
    }
}

/// Mock token store for testing.
#[derive(Default)]
pub struct MockTokenStore {
    tokens: Mutex<HashMap<String, AccessToken>>,
    load_history: Mutex<Vec<String>>,
    save_history: Mutex<Vec<(String, AccessToken)>>,
    should_fail: Mutex<bool>,
}

impl MockTokenStore {
    /// Create new mock token store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set store to fail all operations.
    pub fn set_should_fail(&self, should_fail: bool) -> &Self {
        *self.should_fail.lock().unwrap() = should_fail;
        self
    }

    /// Pre-populate a token without recording a save.
    pub fn add_token(&self, subject_id: &str, token: AccessToken) -> &Self {
        self.tokens
            .lock()
            .unwrap()
            .insert(subject_id.to_string(), token);
        self
    }

    /// Current token for a subject.
    pub fn get_token(&self, subject_id: &str) -> Option<AccessToken> {
        self.tokens.lock().unwrap().get(subject_id).cloned()
    }

    /// Get load history.
    pub fn get_load_history(&self) -> Vec<String> {
        self.load_history.lock().unwrap().clone()
    }

    /// Get save history.
    pub fn get_save_history(&self) -> Vec<(String, AccessToken)> {
        self.save_history.lock().unwrap().clone()
    }

    fn check_error(&self) -> Result<(), WeChatOAuthError> {
        if *self.should_fail.lock().unwrap() {
            return Err(WeChatOAuthError::Storage(StorageError::WriteFailed {
                message: "Mock storage failure".to_string(),
            }));
        }
        Ok(())
    }
}

#[async_trait]
impl TokenStore for MockTokenStore {
    async fn load(&self, subject_id: &str) -> Result<Option<AccessToken>, WeChatOAuthError> {
        self.check_error()?;

        self.load_history
            .lock()
            .unwrap()
            .push(subject_id.to_string());
        Ok(self.get_token(subject_id))
    }

    async fn save(&self, subject_id: &str, token: &AccessToken) -> Result<(), WeChatOAuthError> {
        self.check_error()?;

        self.save_history
            .lock()
            .unwrap()
            .push((subject_id.to_string(), token.clone()));
        self.tokens
            .lock()
            .unwrap()
            .insert(subject_id.to_string(), token.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn create_test_token(value: &str) -> AccessToken {
        AccessToken::from(json!({
            "access_token": value,
            "expires_in": 7200,
            "refresh_token": "RT1",
            "openid": "u1",
            "create_at": chrono::Utc::now().timestamp_millis()
        }))
    }

    #[tokio::test]
    async fn test_in_memory_last_write_wins() {
        let store = InMemoryTokenStore::new();
        assert!(store.load("u1").await.unwrap().is_none());

        store.save("u1", &create_test_token("AT1")).await.unwrap();
        store.save("u1", &create_test_token("AT2")).await.unwrap();

        let loaded = store.load("u1").await.unwrap().unwrap();
        assert_eq!(loaded.value(), "AT2");
        assert!(store.load("u2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_in_memory_stores_are_independent() {
        let first = InMemoryTokenStore::new();
        let second = InMemoryTokenStore::new();

        first.save("u1", &create_test_token("AT1")).await.unwrap();
        assert!(second.load("u1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("tokens"));
        let token = create_test_token("AT1");

        assert!(store.load("u1").await.unwrap().is_none());
        store.save("u1", &token).await.unwrap();

        let reopened = FileTokenStore::new(dir.path().join("tokens"));
        assert_eq!(reopened.load("u1").await.unwrap(), Some(token));
    }

    #[tokio::test]
    async fn test_file_store_encodes_subject_ids() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path());

        store
            .save("../escape/u1", &create_test_token("AT1"))
            .await
            .unwrap();

        assert!(store.load("../escape/u1").await.unwrap().is_some());
        assert!(!dir.path().join("../escape").exists());
    }

    #[tokio::test]
    async fn test_file_store_corrupted_data() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path());
        std::fs::write(dir.path().join("u1.json"), b"{not json").unwrap();

        let error = store.load("u1").await.unwrap_err();
        assert!(matches!(
            error,
            WeChatOAuthError::Storage(StorageError::CorruptedData { .. })
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_file_store_concurrent_saves_for_one_subject() {
        let dir = tempfile::tempdir().unwrap();
        let store = std::sync::Arc::new(FileTokenStore::new(dir.path()));

        for round in 0..50 {
            let handles: Vec<_> = (0..4)
                .map(|i| {
                    let store = store.clone();
                    let value = format!("AT{}", "x".repeat(round + i * 40));
                    tokio::spawn(async move { store.save("u1", &create_test_token(&value)).await })
                })
                .collect();

            for handle in handles {
                handle.await.unwrap().unwrap();
            }

            let loaded = store.load("u1").await.unwrap().unwrap();
            assert!(loaded.value().starts_with("AT"));
        }

        let leftovers = std::fs::read_dir(dir.path())
            .unwrap()
            .filter(|entry| {
                let name = entry.as_ref().unwrap().file_name();
                name.to_string_lossy().ends_with(".tmp")
            })
            .count();
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn test_mock_store_history() {
        let store = MockTokenStore::new();
        store.save("u1", &create_test_token("AT1")).await.unwrap();
        store.load("u1").await.unwrap();

        let saves = store.get_save_history();
        assert_eq!(saves.len(), 1);
        assert_eq!(saves[0].0, "u1");
        assert_eq!(store.get_load_history(), vec!["u1".to_string()]);

        store.set_should_fail(true);
        assert!(store.load("u1").await.is_err());
    }
}
