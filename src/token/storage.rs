//! Token Storage
//!
//! Persistence of the access/refresh token pair. A store either holds a
//! complete pair or nothing; partial or unreadable state loads as absent.

use async_trait::async_trait;
use serde::Deserialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

use crate::error::{AnalyticsError, StorageError};
use crate::types::Tokens;

/// Default token file name, relative to the working directory.
pub const DEFAULT_TOKEN_FILE: &str = "tokens.json";

/// Token storage interface.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Load the stored pair, or `None` if nothing complete is stored.
    ///
    /// Only I/O failures other than a missing file are errors.
    async fn load(&self) -> Result<Option<Tokens>, AnalyticsError>;

    /// Replace the stored pair.
    async fn save(&self, tokens: &Tokens) -> Result<(), AnalyticsError>;
}

/// Lenient on-disk shape; anything other than two non-empty strings is discarded.
#[derive(Deserialize)]
struct PersistedTokens {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
}

fn parse_tokens(contents: &str) -> Option<Tokens> {
    let persisted: PersistedTokens = serde_json::from_str(contents).ok()?;
    Tokens::new(persisted.access_token?, persisted.refresh_token?)
}

/// JSON file token storage.
///
/// Writes go to a temporary file in the same directory which is flushed,
/// synced and renamed over the target, so readers never observe a
/// half-written pair.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parent_dir(path: &Path) -> PathBuf {
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), StorageError> {
        let dir = Self::parent_dir(path);
        std::fs::create_dir_all(&dir).map_err(|e| StorageError::WriteFailed {
            message: format!("{}: {}", dir.display(), e),
        })?;

        let write_failed = |e: std::io::Error| StorageError::WriteFailed {
            message: format!("{}: {}", path.display(), e),
        };

        let mut file = tempfile::NamedTempFile::new_in(&dir).map_err(write_failed)?;
        file.write_all(contents).map_err(write_failed)?;
        file.flush().map_err(write_failed)?;
        file.as_file().sync_all().map_err(write_failed)?;
        file.persist(path).map_err(|e| write_failed(e.error))?;
        Ok(())
    }
}

impl Default for FileTokenStore {
    fn default() -> Self {
        Self::new(DEFAULT_TOKEN_FILE)
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn load(&self) -> Result<Option<Tokens>, AnalyticsError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No token file");
                return Ok(None);
            }
            Err(e) => {
                return Err(AnalyticsError::Storage(StorageError::ReadFailed {
                    message: format!("{}: {}", self.path.display(), e),
                }))
            }
        };

        let tokens = parse_tokens(&contents);
        if tokens.is_none() {
            warn!(path = %self.path.display(), "Ignoring incomplete token file");
        }
        Ok(tokens)
    }

    async fn save(&self, tokens: &Tokens) -> Result<(), AnalyticsError> {
        let contents = serde_json::to_vec(tokens).map_err(|e| {
            AnalyticsError::Storage(StorageError::WriteFailed {
                message: e.to_string(),
            })
        })?;

        let path = self.path.clone();
        tokio::task::spawn_blocking(move || Self::write_atomic(&path, &contents))
            .await
            .map_err(|e| {
                AnalyticsError::Storage(StorageError::WriteFailed {
                    message: e.to_string(),
                })
            })??;

        debug!(path = %self.path.display(), "Saved tokens");
        Ok(())
    }
}

/// In-memory token storage.
#[derive(Default)]
pub struct InMemoryTokenStore {
    tokens: Mutex<Option<Tokens>>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn load(&self) -> Result<Option<Tokens>, AnalyticsError> {
        Ok(self
            .tokens
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone())
    }

    async fn save(&self, tokens: &Tokens) -> Result<(), AnalyticsError> {
        *self.tokens.lock().unwrap_or_else(|e| e.into_inner()) = Some(tokens.clone());
        Ok(())
    }
}

/// Mock token storage for testing.
#[derive(Default)]
pub struct MockTokenStore {
    tokens: Mutex<Option<Tokens>>,
    save_history: Mutex<Vec<Tokens>>,
    load_count: Mutex<u32>,
    should_fail: Mutex<bool>,
}

impl MockTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate tokens.
    pub fn add_tokens(&self, tokens: Tokens) -> &Self {
        *self.tokens.lock().unwrap_or_else(|e| e.into_inner()) = Some(tokens);
        self
    }

    /// Set storage to fail all operations.
    pub fn set_should_fail(&self, should_fail: bool) -> &Self {
        *self.should_fail.lock().unwrap_or_else(|e| e.into_inner()) = should_fail;
        self
    }

    /// Get save history.
    pub fn get_save_history(&self) -> Vec<Tokens> {
        self.save_history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn get_load_count(&self) -> u32 {
        *self.load_count.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Currently stored pair.
    pub fn current(&self) -> Option<Tokens> {
        self.tokens
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn check_error(&self) -> Result<(), AnalyticsError> {
        if *self.should_fail.lock().unwrap_or_else(|e| e.into_inner()) {
            return Err(AnalyticsError::Storage(StorageError::WriteFailed {
                message: "Mock storage failure".to_string(),
            }));
        }
        Ok(())
    }
}

#[async_trait]
impl TokenStore for MockTokenStore {
    async fn load(&self) -> Result<Option<Tokens>, AnalyticsError> {
        self.check_error()?;
        *self.load_count.lock().unwrap_or_else(|e| e.into_inner()) += 1;
        Ok(self.current())
    }

    async fn save(&self, tokens: &Tokens) -> Result<(), AnalyticsError> {
        self.check_error()?;
        self.save_history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(tokens.clone());
        *self.tokens.lock().unwrap_or_else(|e| e.into_inner()) = Some(tokens.clone());
        Ok(())
    }
}
