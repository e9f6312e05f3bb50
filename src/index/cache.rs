//! Index disk caches.
//!
//! [`IndexCache`] keeps the last successful raw response of every index,
//! one file per URL. The file name is the SHA-256 of the URL, so it is
//! stable across runs and safe on every filesystem.
//!
//! [`IndexNameCache`] remembers each index's display name by id, so names
//! stay available while an index is unreachable.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::error::{Error, Result, ResultExt};

/// Raw index response cache.
pub struct IndexCache {
    cache_dir: PathBuf,
}

impl IndexCache {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    /// Create the cache directory. Returns `true` if it did not exist yet.
    pub fn ensure_dir(&self) -> Result<bool> {
        if self.cache_dir.is_dir() {
            return Ok(false);
        }
        fs::create_dir_all(&self.cache_dir)
            .with_context(format!("creating {}", self.cache_dir.display()))?;
        Ok(true)
    }

    /// Cache file for an index URL.
    pub fn path_for(&self, url: &str) -> PathBuf {
        let digest = Sha256::digest(url.as_bytes());
        let name: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
        self.cache_dir.join(format!("{}.json", name))
    }

    /// Store a raw response body verbatim.
    pub fn store(&self, url: &str, body: &[u8]) -> Result<PathBuf> {
        let path = self.path_for(url);
        fs::write(&path, body).with_context(format!("caching index {}", url))?;
        Ok(path)
    }

    /// Last cached response for `url`, if any.
    pub fn load(&self, url: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(url);
        if !path.exists() {
            return Ok(None);
        }
        fs::read(&path)
            .map(Some)
            .map_err(|e| Error::storage(&path, e.to_string()))
    }
}

/// Persisted index id -> display name map.
pub struct IndexNameCache {
    path: PathBuf,
    names: BTreeMap<String, String>,
}

impl IndexNameCache {
    /// Open the cache file. A missing file is an empty cache; an unreadable
    /// one is a storage error.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let names = if path.exists() {
            let contents = fs::read(&path).map_err(|e| Error::storage(&path, e.to_string()))?;
            serde_json::from_slice(&contents).map_err(|e| Error::storage(&path, e.to_string()))?
        } else {
            BTreeMap::new()
        };
        Ok(Self { path, names })
    }

    pub fn get(&self, index_id: &str) -> Option<&str> {
        self.names.get(index_id).map(String::as_str)
    }

    /// Record a name and write the cache if it changed.
    pub fn insert(&mut self, index_id: &str, name: &str) -> Result<()> {
        if self.get(index_id) == Some(name) {
            return Ok(());
        }
        self.names.insert(index_id.to_string(), name.to_string());
        self.save()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).with_context(format!("creating {}", dir.display()))?;
        }
        let contents = serde_json::to_vec_pretty(&self.names)
            .map_err(|e| Error::storage(&self.path, e.to_string()))?;
        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, &contents)
            .with_context(format!("writing {}", temp_path.display()))?;
        fs::rename(&temp_path, &self.path)
            .with_context(format!("replacing {}", self.path.display()))?;
        Ok(())
    }
}
