//! Time-bounded key/value cache for slow-changing Salsa lists.
//!
//! Groups rarely change, so the fetched list is kept for a day by default.
//! [`FileCache`] persists entries as JSON under the XDG cache dir so separate
//! CLI invocations share them; [`MemoryCache`] is process-local.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::client::{Group, SalsaClient, Tag, Transport};

pub const GROUPS_CACHE_KEY: &str = "salsa-groups";

/// Get/set store with per-entry TTL.
pub trait CacheStore {
    /// The value under `key`, unless missing or expired.
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&mut self, key: &str, value: Value, ttl: Duration) -> Result<()>;
    fn delete(&mut self, key: &str) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: HashMap<String, (Value, Instant)>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStore for MemoryCache {
    fn get(&self, key: &str) -> Option<Value> {
        let (value, expires) = self.entries.get(key)?;
        (Instant::now() < *expires).then(|| value.clone())
    }

    fn set(&mut self, key: &str, value: Value, ttl: Duration) -> Result<()> {
        self.entries
            .insert(key.to_string(), (value, Instant::now() + ttl));
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FileEntry {
    value: Value,
    /// Unix seconds.
    expires_at: i64,
}

/// JSON-file cache; every write rewrites the whole file.
#[derive(Debug)]
pub struct FileCache {
    path: PathBuf,
    entries: BTreeMap<String, FileEntry>,
}

impl FileCache {
    /// `~/.cache/salsa-bridge/cache.json`.
    pub fn default_path() -> Result<PathBuf> {
        let xdg_dirs = xdg::BaseDirectories::with_prefix("salsa-bridge")?;
        Ok(xdg_dirs.get_cache_home().join("salsa-bridge").join("cache.json"))
    }

    /// Open the cache at `path`. A missing or unreadable file starts empty.
    pub fn open(path: &Path) -> Result<Self> {
        let entries = match std::fs::read(path) {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "discarding corrupt cache file");
                BTreeMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(e).with_context(|| format!("read cache: {}", path.display()));
            }
        };
        Ok(Self {
            path: path.to_path_buf(),
            entries,
        })
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create dir: {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(&self.entries).context("serialize cache")?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("write cache: {}", self.path.display()))?;
        Ok(())
    }
}

impl CacheStore for FileCache {
    fn get(&self, key: &str) -> Option<Value> {
        let entry = self.entries.get(key)?;
        (chrono::Utc::now().timestamp() < entry.expires_at).then(|| entry.value.clone())
    }

    fn set(&mut self, key: &str, value: Value, ttl: Duration) -> Result<()> {
        let ttl = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        let expires_at = chrono::Utc::now().timestamp().saturating_add(ttl);
        self.entries
            .insert(key.to_string(), FileEntry { value, expires_at });
        self.save()
    }

    fn delete(&mut self, key: &str) -> Result<()> {
        if self.entries.remove(key).is_some() {
            self.save()?;
        }
        Ok(())
    }
}

/// Group and tag lookups backed by a cache store.
pub struct GroupDirectory<S: CacheStore> {
    store: S,
    ttl: Duration,
    tags: Option<Vec<Tag>>,
}

impl<S: CacheStore> GroupDirectory<S> {
    pub fn new(store: S, ttl: Duration) -> Self {
        Self {
            store,
            ttl,
            tags: None,
        }
    }

    /// Cached groups, fetching from Salsa when the cache is cold or expired.
    /// Empty results are not cached.
    pub fn groups<T: Transport>(&mut self, client: &mut SalsaClient<T>) -> Vec<Group> {
        if let Some(value) = self.store.get(GROUPS_CACHE_KEY) {
            match serde_json::from_value::<Vec<Group>>(value) {
                Ok(groups) => {
                    tracing::debug!(count = groups.len(), "groups served from cache");
                    return groups;
                }
                Err(e) => tracing::warn!(error = %e, "ignoring malformed cached groups"),
            }
        }

        tracing::debug!("retrieving groups");
        let groups = client.get_groups();
        if !groups.is_empty() {
            let stored = serde_json::to_value(&groups)
                .map_err(anyhow::Error::from)
                .and_then(|v| self.store.set(GROUPS_CACHE_KEY, v, self.ttl));
            if let Err(e) = stored {
                tracing::warn!(error = %e, "could not cache groups");
            }
        }
        groups
    }

    /// Drop the cached group list so the next lookup hits Salsa.
    pub fn invalidate(&mut self) -> Result<()> {
        self.store.delete(GROUPS_CACHE_KEY)
    }

    /// Tags, fetched once per directory.
    pub fn tags<T: Transport>(&mut self, client: &mut SalsaClient<T>) -> Vec<Tag> {
        if let Some(tags) = &self.tags {
            return tags.clone();
        }
        let tags = client.get_tags();
        if !tags.is_empty() {
            self.tags = Some(tags.clone());
        }
        tags
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}
