//! Credential store mapping chat users to GitLab access tokens.
//!
//! The whole table is persisted as one flat JSON object
//! (`{"@user:server": "token", ...}`) after every mutation. The in-memory
//! table is authoritative; a failed write is logged and otherwise ignored.
//! Tokens are stored unencrypted.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, error, info};

use crate::atomic::{atomic_write_json, read_json_optional};
use crate::error::Result;

/// Default location of the credential document, relative to the working directory.
pub const DEFAULT_TOKENS_FILE: &str = "tokens.json";

/// Persistent user ID → access token table.
#[derive(Debug)]
pub struct CredentialStore {
    path: PathBuf,
    tokens: RwLock<HashMap<String, String>>,
}

impl CredentialStore {
    /// Loads the table from `path`.
    ///
    /// A missing file yields an empty table. A file that exists but cannot be
    /// read or parsed is an error: the caller must not continue with a
    /// corrupted table.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let tokens: HashMap<String, String> = read_json_optional(&path)?.unwrap_or_default();
        info!(path = %path.display(), count = tokens.len(), "Loaded access tokens");
        Ok(Self {
            path,
            tokens: RwLock::new(tokens),
        })
    }

    /// Creates an empty store that persists to `path` without reading it.
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            tokens: RwLock::new(HashMap::new()),
        }
    }

    /// Path of the backing document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the token stored for `user_id`.
    pub fn get(&self, user_id: &str) -> Option<String> {
        self.read().get(user_id).cloned()
    }

    /// Whether a token is stored for `user_id`.
    pub fn contains(&self, user_id: &str) -> bool {
        self.read().contains_key(user_id)
    }

    /// Number of stored tokens.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Inserts or overwrites the token for `user_id`, then persists.
    pub fn put(&self, user_id: &str, token: &str) {
        let mut tokens = self.write();
        tokens.insert(user_id.to_string(), token.to_string());
        self.persist(&tokens);
    }

    /// Removes the token for `user_id` if present, then persists.
    ///
    /// Returns whether an entry was removed.
    pub fn remove(&self, user_id: &str) -> bool {
        let mut tokens = self.write();
        let removed = tokens.remove(user_id).is_some();
        self.persist(&tokens);
        removed
    }

    fn persist(&self, tokens: &HashMap<String, String>) {
        match atomic_write_json(&self.path, tokens) {
            Ok(()) => debug!(path = %self.path.display(), count = tokens.len(), "Saved access tokens"),
            Err(e) => error!(path = %self.path.display(), error = %e, "Failed to save access tokens"),
        }
    }

    // A panicking writer cannot leave the map half-updated, so a poisoned
    // lock still guards a consistent table.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, String>> {
        self.tokens.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, String>> {
        self.tokens.write().unwrap_or_else(|e| e.into_inner())
    }
}
