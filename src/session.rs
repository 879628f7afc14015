use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use tempfile::NamedTempFile;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

pub const TOKEN_KEY: &str = "token";
pub const DISPLAY_NAME_KEY: &str = "loggedInUser";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Persistent string key/value storage behind the session.
///
/// `set_all` and `remove_all` apply every key or none of them.
#[async_trait]
pub trait SessionBackend: Send + Sync {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    async fn set_all(&self, entries: &[(&str, &str)]) -> anyhow::Result<()>;
    async fn remove_all(&self, keys: &[&str]) -> anyhow::Result<()>;
}

#[derive(Clone, Default)]
pub struct MemoryBackend {
    inner: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionBackend for MemoryBackend {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let map = self.inner.read().await;
        Ok(map.get(key).cloned())
    }

    async fn set_all(&self, entries: &[(&str, &str)]) -> anyhow::Result<()> {
        let mut map = self.inner.write().await;
        for (key, value) in entries {
            map.insert(key.to_string(), value.to_string());
        }
        Ok(())
    }

    async fn remove_all(&self, keys: &[&str]) -> anyhow::Result<()> {
        let mut map = self.inner.write().await;
        for key in keys {
            map.remove(*key);
        }
        Ok(())
    }
}

/// Keeps all keys in a single JSON object file, readable by its owner only.
#[derive(Clone)]
pub struct FileBackend {
    path: PathBuf,
    fs_lock: Arc<Mutex<()>>,
}

impl FileBackend {
    pub fn new(path: PathBuf) -> Self {
        Self { path, fs_lock: Arc::new(Mutex::new(())) }
    }

    fn read_map(&self) -> anyhow::Result<HashMap<String, String>> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let raw = std::fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        if raw.trim().is_empty() {
            return Ok(HashMap::new());
        }
        let map = serde_json::from_str(&raw)
            .with_context(|| format!("corrupt session file {}", self.path.display()))?;
        Ok(map)
    }

    /// A damaged file is replaced on the next write instead of blocking it.
    /// The flag is set when the file on disk was discarded.
    fn read_map_for_write(&self) -> (HashMap<String, String>, bool) {
        match self.read_map() {
            Ok(map) => (map, false),
            Err(e) => {
                warn!("discarding unreadable session file: {e:#}");
                (HashMap::new(), true)
            }
        }
    }

    fn write_map(&self, map: &HashMap<String, String>) -> anyhow::Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
        let body = serde_json::to_string_pretty(map)?;

        // written next to the target then renamed over it
        let mut tmp = NamedTempFile::new_in(&dir)
            .with_context(|| format!("failed to create temp file in {}", dir.display()))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tmp.as_file()
                .set_permissions(std::fs::Permissions::from_mode(0o600))
                .context("failed to restrict session file permissions")?;
        }
        tmp.write_all(body.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)
            .map_err(|e| e.error)
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        Ok(())
    }
}

#[async_trait]
impl SessionBackend for FileBackend {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let _lock = self.fs_lock.lock().await;
        Ok(self.read_map()?.remove(key))
    }

    async fn set_all(&self, entries: &[(&str, &str)]) -> anyhow::Result<()> {
        let _lock = self.fs_lock.lock().await;
        let (mut map, _) = self.read_map_for_write();
        for (key, value) in entries {
            map.insert(key.to_string(), value.to_string());
        }
        self.write_map(&map)
    }

    async fn remove_all(&self, keys: &[&str]) -> anyhow::Result<()> {
        let _lock = self.fs_lock.lock().await;
        let (mut map, discarded) = self.read_map_for_write();
        let mut changed = discarded;
        for key in keys {
            changed |= map.remove(*key).is_some();
        }
        if changed {
            self.write_map(&map)?;
        }
        Ok(())
    }
}

/// Token and display name of the logged-in user.
#[derive(Clone)]
pub struct SessionStore {
    backend: Arc<dyn SessionBackend>,
}

impl SessionStore {
    pub fn new(backend: Arc<dyn SessionBackend>) -> Self {
        Self { backend }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()))
    }

    async fn read(&self, key: &str) -> Option<String> {
        match self.backend.get(key).await {
            Ok(value) => value,
            Err(e) => {
                warn!(key, "session read failed: {e:#}");
                None
            }
        }
    }

    pub async fn token(&self) -> Option<String> {
        self.read(TOKEN_KEY).await.filter(|t| !t.is_empty())
    }

    /// The name is stored JSON-encoded; quotes are stripped on the way out.
    /// A blank name reads as no name.
    pub async fn display_name(&self) -> Option<String> {
        let raw = self.read(DISPLAY_NAME_KEY).await?;
        let decoded = serde_json::from_str::<String>(&raw).unwrap_or(raw);
        Some(decoded.replace('"', "")).filter(|name| !name.trim().is_empty())
    }

    /// Token and name are written together; on failure neither is stored.
    pub async fn set_session(&self, token: &str, display_name: &str) -> Result<(), SessionError> {
        let encoded = serde_json::to_string(display_name).context("failed to encode display name")?;
        self.backend
            .set_all(&[(TOKEN_KEY, token), (DISPLAY_NAME_KEY, &encoded)])
            .await
            .context("failed to persist session")?;
        debug!("session stored");
        Ok(())
    }

    pub async fn clear_session(&self) -> Result<(), SessionError> {
        self.backend
            .remove_all(&[TOKEN_KEY, DISPLAY_NAME_KEY])
            .await
            .context("failed to remove session")?;
        debug!("session cleared");
        Ok(())
    }
}
