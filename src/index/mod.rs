//! Index synchronization engine.
//!
//! # Architecture
//!
//! - **DTOs** (`dto.rs`) - the published index manifest format
//! - **Adapter** (`adapter.rs`) - manifest -> [`IndexMetadata`] + variants
//! - **Cache** (`cache.rs`) - raw responses per URL, index names by id
//! - **Resolve** (`resolve.rs`) - merge of stored and index variants
//!
//! A sync pass is a full rebuild. [`IndexManager::synchronize`] drops every
//! contribution and listener of the previous pass, then starts one fetch per
//! enabled index. Each finished fetch is parsed and kept as that index's
//! contribution; a failing index is logged and contributes nothing.
//! Contributions are combined in configured order whenever they are read,
//! so results do not depend on which fetch finished first.

pub mod adapter;
pub mod cache;
pub mod dto;
pub mod resolve;

pub use adapter::{ParsedIndex, parse_index};
pub use cache::{IndexCache, IndexNameCache};

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::{IndexSettings, IndexSource, StorageConfig};
use crate::error::Result;
use crate::fetch::{Listener, TaskKey, TaskMessage, TaskSpawner, TaskUpdate};
use crate::model::{IndexMetadata, TrackId, Variant};
use crate::store::LocalStore;

/// URLs shorter than this are treated as unset.
const MIN_URL_LEN: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Uninitialized,
    Initializing,
    Ready,
}

pub struct IndexManager {
    settings: Arc<dyn IndexSettings>,
    spawner: TaskSpawner,
    cache: IndexCache,
    names: IndexNameCache,
    fallback_to_cache: bool,
    state: SyncState,
    /// In-flight fetches of the current pass, by URL
    listeners: HashMap<String, Listener>,
    /// URLs of the current pass in configured order
    pass: Vec<String>,
    /// Parsed contributions of the current pass, by URL
    loaded: HashMap<String, ParsedIndex>,
}

impl IndexManager {
    pub fn new(
        storage: &StorageConfig,
        settings: Arc<dyn IndexSettings>,
        spawner: TaskSpawner,
        fallback_to_cache: bool,
    ) -> Result<Self> {
        Ok(Self {
            settings,
            spawner,
            cache: IndexCache::new(storage.index_cache_dir()),
            names: IndexNameCache::open(storage.index_names_path())?,
            fallback_to_cache,
            state: SyncState::Uninitialized,
            listeners: HashMap::new(),
            pass: Vec::new(),
            loaded: HashMap::new(),
        })
    }

    /// Prepare the cache directory and start the first sync pass.
    ///
    /// A no-op once initialized. On first run (no cache directory yet)
    /// there is nothing to sync and the manager goes straight to ready.
    pub fn init(&mut self) -> Result<()> {
        if self.state != SyncState::Uninitialized {
            return Ok(());
        }
        self.state = SyncState::Initializing;

        match self.cache.ensure_dir() {
            Ok(true) => {
                tracing::info!(target: "jukebox::index", "Created index cache, skipping first sync");
            }
            Ok(false) => {
                self.synchronize();
            }
            Err(e) => {
                self.state = SyncState::Uninitialized;
                tracing::error!(target: "jukebox::index", "Index manager failed to initialize: {}", e);
                return Err(e);
            }
        }

        self.state = SyncState::Ready;
        Ok(())
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn configured_indexes(&self) -> Vec<IndexSource> {
        self.settings.index_sources()
    }

    /// Start a full sync pass. Returns the number of fetches started.
    ///
    /// Fetches of the previous pass are not aborted; their results no
    /// longer match a listener and are dropped on arrival.
    pub fn synchronize(&mut self) -> usize {
        self.listeners.clear();
        self.pass.clear();
        self.loaded.clear();

        for source in self.configured_indexes() {
            let url = source.url.trim().to_string();
            if !source.enabled || url.len() < MIN_URL_LEN {
                tracing::debug!(target: "jukebox::index", url = %url, enabled = source.enabled, "Skipping index");
                continue;
            }
            if self.listeners.contains_key(&url) {
                tracing::warn!(target: "jukebox::index", url = %url, "Index configured twice, fetching once");
                continue;
            }

            tracing::info!(target: "jukebox::index", url = %url, "Fetching index");
            let listener = self.spawner.spawn_fetch(TaskKey::Index(url.clone()), url.clone());
            self.listeners.insert(url.clone(), listener);
            self.pass.push(url);
        }

        self.listeners.len()
    }

    /// Apply a fetch result. Messages from superseded passes are ignored.
    pub fn handle_message(&mut self, message: TaskMessage) {
        let TaskKey::Index(url) = &message.key else {
            return;
        };
        if !self
            .listeners
            .get(url)
            .is_some_and(|listener| listener.accepts(&message))
        {
            tracing::trace!(target: "jukebox::index", url = %url, ticket = message.ticket, "Dropping stale index message");
            return;
        }
        let TaskUpdate::Finished(result) = message.update else {
            return;
        };
        self.listeners.remove(url);

        let (body, fetched) = match result {
            Ok(body) => (body, true),
            Err(e) => {
                tracing::error!(target: "jukebox::index", url = %url, "Failed to fetch index: {}", e);
                match self.cached_body(url) {
                    Some(body) => (body, false),
                    None => return,
                }
            }
        };

        let parsed = match parse_index(&body, url) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::error!(target: "jukebox::index", url = %url, "Failed to load index: {}", e);
                return;
            }
        };

        if fetched {
            match self.cache.store(url, &body) {
                Ok(path) => {
                    tracing::debug!(target: "jukebox::index", url = %url, path = %path.display(), "Index cached");
                }
                Err(e) => {
                    tracing::warn!(target: "jukebox::index", url = %url, "Failed to cache index: {}", e);
                }
            }
        }

        self.load_index(url, parsed);
    }

    fn cached_body(&self, url: &str) -> Option<Vec<u8>> {
        if !self.fallback_to_cache {
            return None;
        }
        match self.cache.load(url) {
            Ok(Some(body)) => {
                tracing::info!(target: "jukebox::index", url = %url, "Using cached index");
                Some(body)
            }
            Ok(None) => None,
            Err(e) => {
                tracing::error!(target: "jukebox::index", url = %url, "Failed to read cached index: {}", e);
                None
            }
        }
    }

    fn load_index(&mut self, url: &str, parsed: ParsedIndex) {
        if let Err(e) = self.names.insert(&parsed.metadata.id, &parsed.metadata.name) {
            tracing::warn!(
                target: "jukebox::index",
                id = %parsed.metadata.id,
                path = %self.names.path().display(),
                "Failed to cache index name: {}",
                e
            );
        }
        tracing::info!(
            target: "jukebox::index",
            id = %parsed.metadata.id,
            name = %parsed.metadata.name,
            variants = parsed.variants.len(),
            "Index loaded"
        );
        self.loaded.insert(url.to_string(), parsed);
    }

    fn contributions(&self) -> impl Iterator<Item = &ParsedIndex> {
        self.pass.iter().filter_map(|url| self.loaded.get(url))
    }

    /// Index-declared variants of a track, in configured index order.
    pub fn index_variants(&self, track_id: TrackId) -> Vec<&Variant> {
        resolve::index_variants_for(track_id, self.contributions())
    }

    /// The merged variant list of a track. See [`resolve::merge`].
    pub fn resolve(&self, store: &LocalStore, track_id: TrackId) -> Result<Vec<Variant>> {
        let set = store.get_variants(track_id)?;
        Ok(resolve::merge(set, self.index_variants(track_id)))
    }

    /// Last known display name of an index, even if it is unreachable now.
    pub fn index_name(&self, index_id: &str) -> Option<&str> {
        self.names.get(index_id)
    }

    /// Metadata of an index loaded in the current pass.
    pub fn index_metadata(&self, index_id: &str) -> Option<&IndexMetadata> {
        self.contributions()
            .map(|index| &index.metadata)
            .find(|metadata| metadata.id == index_id)
    }

    /// Indexes loaded in the current pass, in configured order.
    pub fn loaded_indexes(&self) -> Vec<&IndexMetadata> {
        self.contributions().map(|index| &index.metadata).collect()
    }

    pub fn is_syncing(&self) -> bool {
        !self.listeners.is_empty()
    }
}
