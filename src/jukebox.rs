//! The `Jukebox` facade.
//!
//! Owns the store, the index engine, the download orchestrator and the
//! event bus. Every public call runs on the caller's thread and returns
//! without waiting for the network; fetch results queue up in an inbox and
//! are applied by [`Jukebox::pump`] (or one of its blocking variants), so all
//! state changes happen on the thread that owns the `Jukebox`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, unbounded};
use tokio::runtime::Handle;

use crate::config::{Config, IndexSettings, IndexSource};
use crate::download::DownloadManager;
use crate::error::Result;
use crate::events::{EventBus, SongEvent};
use crate::fetch::{HttpClient, HttpFetch, TaskKey, TaskMessage, TaskSpawner};
use crate::index::{IndexManager, SyncState};
use crate::model::{IndexMetadata, TrackId, Variant, VariantSet};
use crate::store::LocalStore;

/// Context of a display-title lookup.
#[derive(Debug, Clone, Copy, Default)]
pub struct TitleQuery {
    /// Ask for the host's own title regardless of the active variant
    pub suppress_override: bool,
}

pub struct Jukebox {
    store: LocalStore,
    index: IndexManager,
    downloads: DownloadManager,
    events: EventBus,
    inbox: Receiver<TaskMessage>,
    initialized: bool,
}

impl Jukebox {
    /// Create a jukebox that fetches over HTTP on `runtime`.
    pub fn open(config: &Config, runtime: Handle) -> Result<Self> {
        let fetcher = Arc::new(HttpClient::new(config.indexes.fetch_timeout())?);
        Self::with_fetcher(config, runtime, fetcher, Arc::new(config.indexes.clone()))
    }

    /// Create a jukebox with a custom transport and index list provider.
    pub fn with_fetcher(
        config: &Config,
        runtime: Handle,
        fetcher: Arc<dyn HttpFetch>,
        settings: Arc<dyn IndexSettings>,
    ) -> Result<Self> {
        let (outbox, inbox) = unbounded();
        let spawner = TaskSpawner::new(runtime, fetcher, outbox);
        let index = IndexManager::new(
            &config.storage,
            settings,
            spawner.clone(),
            config.indexes.fallback_to_cache,
        )?;

        Ok(Self {
            store: LocalStore::new(&config.storage),
            index,
            downloads: DownloadManager::new(spawner),
            events: EventBus::new(),
            inbox,
            initialized: false,
        })
    }

    /// Load persisted manifests, then start the first index sync.
    pub fn init(&mut self) -> Result<()> {
        if self.initialized {
            return Ok(());
        }
        self.store.init()?;
        self.index.init()?;
        self.initialized = true;
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn sync_state(&self) -> SyncState {
        self.index.state()
    }

    pub fn subscribe(&mut self) -> Receiver<SongEvent> {
        self.events.subscribe()
    }

    // ------------------------------------------------------------------
    // Indexes
    // ------------------------------------------------------------------

    pub fn configured_indexes(&self) -> Vec<IndexSource> {
        self.index.configured_indexes()
    }

    /// Start a full index sync. Returns the number of fetches started.
    pub fn synchronize(&mut self) -> usize {
        self.index.synchronize()
    }

    pub fn index_name(&self, index_id: &str) -> Option<&str> {
        self.index.index_name(index_id)
    }

    pub fn index_metadata(&self, index_id: &str) -> Option<&IndexMetadata> {
        self.index.index_metadata(index_id)
    }

    pub fn loaded_indexes(&self) -> Vec<&IndexMetadata> {
        self.index.loaded_indexes()
    }

    // ------------------------------------------------------------------
    // Variants
    // ------------------------------------------------------------------

    /// Every variant of a track: stored ones merged with index declarations.
    pub fn variants(&mut self, track_id: TrackId) -> Result<Vec<Variant>> {
        self.store.load(track_id)?;
        self.index.resolve(&self.store, track_id)
    }

    /// The track's stored set, created on first access.
    pub fn variant_set(&mut self, track_id: TrackId) -> Result<&VariantSet> {
        self.store.load(track_id)
    }

    pub fn add_variant(&mut self, track_id: TrackId, variant: Variant) -> Result<()> {
        self.store.add_variant(track_id, variant)?;
        self.events.state_changed(track_id);
        Ok(())
    }

    pub fn remove_variant(&mut self, track_id: TrackId, unique_id: &str) -> Result<Variant> {
        let removed = self.store.remove_variant(track_id, unique_id)?;
        self.events.state_changed(track_id);
        Ok(removed)
    }

    pub fn set_active(&mut self, track_id: TrackId, unique_id: &str) -> Result<()> {
        self.store.set_active(track_id, unique_id)?;
        self.events.state_changed(track_id);
        Ok(())
    }

    /// Title the host should show for a track, or `None` for its own.
    pub fn display_title(&self, track_id: TrackId, query: TitleQuery) -> Option<String> {
        if query.suppress_override || !self.initialized {
            return None;
        }
        let set = self.store.get_variants(track_id).ok()?;
        if set.is_default_active() {
            return None;
        }
        Some(set.active().metadata().name.clone())
    }

    // ------------------------------------------------------------------
    // Downloads
    // ------------------------------------------------------------------

    pub fn download_variant(&mut self, track_id: TrackId, unique_id: &str) -> Result<()> {
        self.store.load(track_id)?;
        self.downloads.download_variant(
            &self.store,
            &self.index,
            &mut self.events,
            track_id,
            unique_id,
        )
    }

    pub fn stop_download(&mut self, track_id: TrackId, unique_id: &str) -> Result<()> {
        self.downloads
            .stop_download(&mut self.events, track_id, unique_id)
    }

    pub fn download_progress(&self, unique_id: &str) -> Option<f32> {
        self.downloads.progress(unique_id)
    }

    // ------------------------------------------------------------------
    // Message pump
    // ------------------------------------------------------------------

    /// Apply every queued fetch message. Never blocks.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(message) = self.inbox.try_recv() {
            self.dispatch(message);
            applied += 1;
        }
        applied
    }

    /// Wait up to `timeout` for a message, then apply everything queued.
    /// Returns `false` if nothing arrived.
    pub fn pump_timeout(&mut self, timeout: Duration) -> bool {
        match self.inbox.recv_timeout(timeout) {
            Ok(message) => {
                self.dispatch(message);
                self.pump();
                true
            }
            Err(_) => false,
        }
    }

    /// Whether any index fetch or download is still in flight.
    pub fn is_busy(&self) -> bool {
        self.index.is_syncing() || self.downloads.in_flight() > 0
    }

    /// Pump until nothing is in flight. Returns `false` on timeout.
    pub fn wait_idle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.is_busy() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.inbox.recv_timeout(remaining) {
                Ok(message) => self.dispatch(message),
                Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => return false,
            }
        }
        self.pump();
        true
    }

    fn dispatch(&mut self, message: TaskMessage) {
        match message.key {
            TaskKey::Index(_) => self.index.handle_message(message),
            TaskKey::Download(_) => {
                self.downloads
                    .handle_message(&mut self.store, &mut self.events, message)
            }
        }
    }
}
