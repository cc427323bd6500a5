//! Implements TokenCache: a JSON key-value file plus an in-memory variant.
//!
//! Holds the provider's access/refresh tokens between runs.

use crate::domain::DomainError;
use crate::ports::TokenCache;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::debug;

/// On-disk shape: key -> value.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct CacheData {
    entries: HashMap<String, String>,
}

/// JSON file-based token cache.
pub struct JsonTokenCache {
    path: PathBuf,
    cache: RwLock<CacheData>,
}

impl JsonTokenCache {
    /// Open the cache, loading existing entries. A missing or unreadable file starts empty.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let data = std::fs::read_to_string(&path)
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default();
        Self {
            path,
            cache: RwLock::new(data),
        }
    }

    /// Write-replace: temp file, fsync, rename over the target.
    fn save(&self, data: &CacheData) -> Result<(), DomainError> {
        let json =
            serde_json::to_string_pretty(data).map_err(|e| DomainError::Cache(e.to_string()))?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| DomainError::Cache(format!("create cache dir: {}", e)))?;
        }

        let temp_path = self.path.with_extension("json.tmp");
        let mut f = std::fs::File::create(&temp_path)
            .map_err(|e| DomainError::Cache(format!("create temp file: {}", e)))?;
        f.write_all(json.as_bytes())
            .map_err(|e| DomainError::Cache(format!("write temp file: {}", e)))?;
        f.sync_all()
            .map_err(|e| DomainError::Cache(format!("sync temp file: {}", e)))?;
        drop(f);

        std::fs::rename(&temp_path, &self.path)
            .map_err(|e| DomainError::Cache(format!("atomic rename failed: {}", e)))
    }

    fn poisoned() -> DomainError {
        DomainError::Cache("token cache lock poisoned".into())
    }

    /// Apply `change` to a copy, persist it, then swap it in. Memory never runs ahead of the file.
    /// Returns false when `change` reported nothing to write.
    fn commit(&self, change: impl FnOnce(&mut CacheData) -> bool) -> Result<bool, DomainError> {
        let mut cache = self.cache.write().map_err(|_| Self::poisoned())?;
        let mut next = cache.clone();
        if !change(&mut next) {
            return Ok(false);
        }
        self.save(&next)?;
        *cache = next;
        Ok(true)
    }
}

impl TokenCache for JsonTokenCache {
    fn get(&self, key: &str) -> Result<Option<String>, DomainError> {
        let cache = self.cache.read().map_err(|_| Self::poisoned())?;
        Ok(cache.entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), DomainError> {
        self.commit(|data| {
            data.entries.insert(key.to_string(), value.to_string());
            true
        })?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), DomainError> {
        if self.commit(|data| data.entries.remove(key).is_some())? {
            debug!(key, "token cache entry removed");
        }
        Ok(())
    }
}

/// Process-local cache. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryTokenCache {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryTokenCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenCache for MemoryTokenCache {
    fn get(&self, key: &str) -> Result<Option<String>, DomainError> {
        let entries = self
            .entries
            .read()
            .map_err(|_| DomainError::Cache("token cache lock poisoned".into()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), DomainError> {
        self.entries
            .write()
            .map_err(|_| DomainError::Cache("token cache lock poisoned".into()))?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), DomainError> {
        self.entries
            .write()
            .map_err(|_| DomainError::Cache("token cache lock poisoned".into()))?
            .remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_cache_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let cache = JsonTokenCache::open(&path);
        cache.set("a", "1").unwrap();
        cache.set("b", "2").unwrap();
        cache.remove("a").unwrap();
        cache.remove("never-set").unwrap();

        let reopened = JsonTokenCache::open(&path);
        assert_eq!(reopened.get("a").unwrap(), None);
        assert_eq!(reopened.get("b").unwrap(), Some("2".to_string()));
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{not json").unwrap();
        let cache = JsonTokenCache::open(&path);
        assert_eq!(cache.get("anything").unwrap(), None);
    }

    #[test]
    fn failed_write_leaves_memory_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let cache = JsonTokenCache::open(&path);
        cache.set("token", "abc").unwrap();

        // A directory squatting on the temp path makes every save fail.
        let blocker = path.with_extension("json.tmp");
        std::fs::create_dir(&blocker).unwrap();
        assert!(matches!(cache.remove("token"), Err(DomainError::Cache(_))));
        assert!(cache.set("other", "x").is_err());
        assert_eq!(cache.get("token").unwrap().as_deref(), Some("abc"));
        assert_eq!(cache.get("other").unwrap(), None);
        assert_eq!(JsonTokenCache::open(&path).get("token").unwrap().as_deref(), Some("abc"));

        std::fs::remove_dir(&blocker).unwrap();
        cache.remove("token").unwrap();
        assert_eq!(cache.get("token").unwrap(), None);
        assert_eq!(JsonTokenCache::open(&path).get("token").unwrap(), None);
    }

    #[test]
    fn memory_cache_round_trip() {
        let cache = MemoryTokenCache::new();
        cache.set("k", "v").unwrap();
        assert_eq!(cache.get("k").unwrap().as_deref(), Some("v"));
        cache.remove("k").unwrap();
        assert_eq!(cache.get("k").unwrap(), None);
    }
}
