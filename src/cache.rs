//! Response cache keyed by URL.
//!
//! Entries live in an in-memory map shared by every request, optionally
//! backed by a directory on disk so responses survive restarts. Entries never
//! expire; use [`Cache::clear`] to drop them.
//!
//! # Cache Location
//!
//! The default on-disk location is platform-specific:
//! - Linux: `~/.cache/mwsite/`
//! - macOS: `~/Library/Caches/mwsite/`
//! - Windows: `%LOCALAPPDATA%\mwsite\`
//!
//! # Example
//!
//! ```
//! use mwsite::Cache;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let cache = Cache::in_memory();
//! cache.set("my_key", &"cached value".to_string()).await.unwrap();
//!
//! let value: Option<String> = cache.get("my_key").await;
//! assert_eq!(value, Some("cached value".to_string()));
//! # }
//! ```

use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::Result;

/// Distinguishes temp files written concurrently by the same process.
static WRITE_SEQ: AtomicU64 = AtomicU64::new(0);

/// A shared two-tier cache.
///
/// Values are stored serialized as JSON. A write replaces the whole entry,
/// so concurrent writers to one key resolve to last-write-wins and readers
/// never observe a partial value.
pub struct Cache {
    entries: RwLock<HashMap<String, Arc<str>>>,
    dir: Option<PathBuf>,
}

impl Cache {
    /// Creates a cache that only lives in memory.
    pub fn in_memory() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            dir: None,
        }
    }

    /// Creates a cache persisted under `dir`.
    ///
    /// The directory is created on first write.
    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            dir: Some(dir.into()),
        }
    }

    /// Platform cache directory for this application.
    pub fn default_dir() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from(".cache"))
            .join("mwsite")
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// Converts a cache key to a file name.
    ///
    /// Alphanumerics and `-` are kept; every other byte becomes `_XX`. The
    /// mapping is injective, so distinct URLs never share a file.
    fn cache_file_name(key: &str) -> String {
        let mut name = String::with_capacity(key.len() + 5);
        for byte in key.bytes() {
            if byte.is_ascii_alphanumeric() || byte == b'-' {
                name.push(byte as char);
            } else {
                name.push_str(&format!("_{:02x}", byte));
            }
        }
        name.push_str(".json");
        name
    }

    /// Retrieves a value from the cache.
    ///
    /// Returns `None` if the key is absent or its entry no longer
    /// deserializes into `T`.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let cached = self.entries.read().await.get(key).cloned();

        let raw = match cached {
            Some(raw) => raw,
            None => {
                let raw: Arc<str> = self.read_disk(key).await?.into();
                // Another task may have stored a fresher value meanwhile.
                self.entries
                    .write()
                    .await
                    .entry(key.to_string())
                    .or_insert_with(|| raw.clone());
                raw
            }
        };

        serde_json::from_str(&raw).ok()
    }

    /// Stores a value in the cache.
    ///
    /// The in-memory entry is always updated. A disk write failure is
    /// returned to the caller but leaves the in-memory entry in place.
    pub async fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let raw: Arc<str> = serde_json::to_string(value)?.into();

        self.entries
            .write()
            .await
            .insert(key.to_string(), raw.clone());

        if let Some(dir) = &self.dir {
            write_atomic(dir, &Self::cache_file_name(key), &raw).await?;
        }
        Ok(())
    }

    /// Number of entries currently held in memory.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Clears all cached entries, in memory and on disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache directory cannot be read.
    pub async fn clear(&self) -> Result<()> {
        self.entries.write().await.clear();

        let Some(dir) = &self.dir else {
            return Ok(());
        };
        if !fs::try_exists(dir).await? {
            return Ok(());
        }

        let mut entries = fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().map(|e| e == "json").unwrap_or(false) {
                let _ = fs::remove_file(path).await;
            }
        }
        Ok(())
    }

    async fn read_disk(&self, key: &str) -> Option<String> {
        let dir = self.dir.as_ref()?;
        let path = dir.join(Self::cache_file_name(key));
        match fs::read_to_string(&path).await {
            Ok(content) => {
                debug!("Loaded cached response for {} from disk", key);
                Some(content)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!("Failed to read cache entry {}: {}", path.display(), e);
                None
            }
        }
    }
}

impl Default for Cache {
    fn default() -> Self {
        Self::with_dir(Self::default_dir())
    }
}

/// Writes `content` to `dir/file_name` through a temp file and a rename.
async fn write_atomic(dir: &Path, file_name: &str, content: &str) -> Result<()> {
    fs::create_dir_all(dir).await?;

    let seq = WRITE_SEQ.fetch_add(1, Ordering::Relaxed);
    let tmp = dir.join(format!("{}.{}.{}.tmp", file_name, std::process::id(), seq));
    fs::write(&tmp, content).await?;

    if let Err(e) = fs::rename(&tmp, dir.join(file_name)).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::join_all;

    #[test]
    fn test_cache_file_name_is_injective() {
        let a = Cache::cache_file_name("https://host/a/b");
        let b = Cache::cache_file_name("https://host/a_b");
        assert_ne!(a, b);
        assert!(a.ends_with(".json"));
        assert!(!a.contains('/'));
        assert_eq!(Cache::cache_file_name("abc-1"), "abc-1.json");
    }

    #[tokio::test]
    async fn test_in_memory_roundtrip() {
        let cache = Cache::in_memory();
        assert!(cache.is_empty().await);

        cache.set("k", &vec![1, 2, 3]).await.unwrap();
        let value: Option<Vec<i32>> = cache.get("k").await;
        assert_eq!(value, Some(vec![1, 2, 3]));
        assert_eq!(cache.get::<Vec<i32>>("missing").await, None);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_disk_entries_survive_new_instance() {
        let tmp = tempfile::tempdir().unwrap();

        let cache = Cache::with_dir(tmp.path());
        cache
            .set("https://registry.example/@scope/logger", &"stored".to_string())
            .await
            .unwrap();

        let reopened = Cache::with_dir(tmp.path());
        let value: Option<String> = reopened.get("https://registry.example/@scope/logger").await;
        assert_eq!(value.as_deref(), Some("stored"));
        assert_eq!(reopened.len().await, 1);
    }

    #[tokio::test]
    async fn test_clear_removes_memory_and_disk() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = Cache::with_dir(tmp.path());
        cache.set("a", &1).await.unwrap();
        cache.set("b", &2).await.unwrap();

        cache.clear().await.unwrap();

        assert!(cache.is_empty().await);
        assert_eq!(cache.get::<i32>("a").await, None);
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_clear_without_dir_on_disk() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = Cache::with_dir(tmp.path().join("never-created"));
        cache.clear().await.unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_writes_last_write_wins() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = Arc::new(Cache::with_dir(tmp.path()));

        let writers = (0..32).map(|i| {
            let cache = cache.clone();
            tokio::spawn(async move {
                let value = vec![i; 64];
                cache.set("shared", &value).await.unwrap();
                let other = format!("key-{}", i);
                cache.set(&other, &value).await.unwrap();
            })
        });
        for result in join_all(writers).await {
            result.unwrap();
        }

        let value: Vec<i32> = cache.get("shared").await.unwrap();
        assert_eq!(value.len(), 64);
        assert!(value.iter().all(|v| *v == value[0]));

        let reopened = Cache::with_dir(tmp.path());
        let on_disk: Vec<i32> = reopened.get("shared").await.unwrap();
        assert_eq!(on_disk.len(), 64);
        assert!(on_disk.iter().all(|v| *v == on_disk[0]));

        for i in 0..32 {
            let value: Vec<i32> = cache.get(&format!("key-{}", i)).await.unwrap();
            assert_eq!(value, vec![i; 64]);
        }

        let leftovers = std::fs::read_dir(tmp.path())
            .unwrap()
            .flatten()
            .filter(|e| e.path().extension().map(|x| x == "tmp").unwrap_or(false))
            .count();
        assert_eq!(leftovers, 0);
    }
}
