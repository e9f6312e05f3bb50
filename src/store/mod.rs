//! Local variant store.
//!
//! Owns the authoritative per-track manifests. Sets are loaded from disk
//! once, kept in memory, and written back synchronously on every mutation:
//! a mutator works on a copy, persists it, and only then replaces the
//! in-memory set, so a failed write leaves both sides as they were.
//!
//! Manifests that fail to parse are never rewritten. They are skipped at
//! startup and surface as [`Error::Storage`] when the track is loaded.

mod manifest;

pub use manifest::{MANIFEST_VERSION, ManifestFile};

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::StorageConfig;
use crate::error::{Error, Result, ResultExt};
use crate::model::{TrackId, Variant, VariantSet};

pub struct LocalStore {
    manifests_dir: PathBuf,
    songs_dir: PathBuf,
    host_audio_dir: PathBuf,
    sets: HashMap<TrackId, VariantSet>,
}

impl LocalStore {
    pub fn new(storage: &StorageConfig) -> Self {
        Self {
            manifests_dir: storage.manifests_dir(),
            songs_dir: storage.songs_dir(),
            host_audio_dir: storage.host_audio_dir.clone(),
            sets: HashMap::new(),
        }
    }

    /// Create the storage directories and load every readable manifest.
    ///
    /// Returns the number of tracks loaded. Unreadable manifests are logged
    /// and left on disk untouched.
    pub fn init(&mut self) -> Result<usize> {
        fs::create_dir_all(&self.manifests_dir)
            .with_context(format!("creating {}", self.manifests_dir.display()))?;
        fs::create_dir_all(&self.songs_dir)
            .with_context(format!("creating {}", self.songs_dir.display()))?;

        let entries = fs::read_dir(&self.manifests_dir)
            .with_context(format!("reading {}", self.manifests_dir.display()))?;

        let mut loaded = 0;
        for entry in entries.filter_map(|e| e.ok()) {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(track_id) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse::<i32>().ok())
                .map(TrackId)
            else {
                tracing::debug!(target: "jukebox::store", path = %path.display(), "Ignoring non-manifest file");
                continue;
            };

            match self.read_manifest(track_id, &path) {
                Ok(set) => {
                    self.sets.insert(track_id, set);
                    loaded += 1;
                }
                Err(e) => {
                    tracing::error!(target: "jukebox::store", track = %track_id, "Skipping unreadable manifest: {}", e);
                }
            }
        }

        tracing::info!(target: "jukebox::store", tracks = loaded, "Local store initialized");
        Ok(loaded)
    }

    /// The track's set, reading or creating its manifest on first access.
    pub fn load(&mut self, track_id: TrackId) -> Result<&VariantSet> {
        if !self.sets.contains_key(&track_id) {
            let path = self.manifest_path(track_id);
            let set = if path.exists() {
                self.read_manifest(track_id, &path)?
            } else {
                let set = VariantSet::new(track_id, self.default_audio_path(track_id));
                self.persist(&set)?;
                tracing::debug!(target: "jukebox::store", track = %track_id, "Created manifest");
                set
            };
            self.sets.insert(track_id, set);
        }
        self.get_variants(track_id)
    }

    /// The already-loaded set of a track.
    pub fn get_variants(&self, track_id: TrackId) -> Result<&VariantSet> {
        self.sets
            .get(&track_id)
            .ok_or_else(|| Error::not_found(format!("track {}", track_id)))
    }

    /// Add a variant, replacing any existing record with the same id.
    pub fn add_variant(&mut self, track_id: TrackId, variant: Variant) -> Result<()> {
        let unique_id = variant.unique_id().to_string();
        self.mutate(track_id, |set| set.upsert(variant))?;
        tracing::info!(target: "jukebox::store", track = %track_id, unique_id = %unique_id, "Added variant");
        Ok(())
    }

    pub fn remove_variant(&mut self, track_id: TrackId, unique_id: &str) -> Result<Variant> {
        let removed = self.mutate(track_id, |set| set.remove(unique_id))?;
        tracing::info!(target: "jukebox::store", track = %track_id, unique_id = %unique_id, "Removed variant");
        Ok(removed)
    }

    pub fn set_active(&mut self, track_id: TrackId, unique_id: &str) -> Result<()> {
        self.mutate(track_id, |set| set.set_active(unique_id))?;
        tracing::info!(target: "jukebox::store", track = %track_id, unique_id = %unique_id, "Activated variant");
        Ok(())
    }

    pub fn active_variant(&self, track_id: TrackId) -> Option<&Variant> {
        self.sets.get(&track_id).map(|set| set.active())
    }

    /// A fresh, unused path in the songs directory.
    pub fn generate_file_path(&self, extension: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.songs_dir)
            .with_context(format!("creating {}", self.songs_dir.display()))?;
        loop {
            let path = self
                .songs_dir
                .join(format!("{}.{}", uuid::Uuid::new_v4().simple(), extension));
            if !path.exists() {
                return Ok(path);
            }
        }
    }

    pub fn manifest_path(&self, track_id: TrackId) -> PathBuf {
        self.manifests_dir.join(format!("{}.json", track_id))
    }

    /// Tracks currently held in memory, ascending.
    pub fn tracks(&self) -> Vec<TrackId> {
        let mut tracks: Vec<_> = self.sets.keys().copied().collect();
        tracks.sort();
        tracks
    }

    fn default_audio_path(&self, track_id: TrackId) -> PathBuf {
        self.host_audio_dir.join(format!("{}.mp3", track_id))
    }

    fn mutate<T>(
        &mut self,
        track_id: TrackId,
        apply: impl FnOnce(&mut VariantSet) -> Result<T>,
    ) -> Result<T> {
        let mut set = self.load(track_id)?.clone();
        let output = apply(&mut set)?;
        self.persist(&set)?;
        self.sets.insert(track_id, set);
        Ok(output)
    }

    fn read_manifest(&self, track_id: TrackId, path: &Path) -> Result<VariantSet> {
        let contents = fs::read(path).map_err(|e| Error::storage(path, e.to_string()))?;
        let manifest: ManifestFile =
            serde_json::from_slice(&contents).map_err(|e| Error::storage(path, e.to_string()))?;
        manifest.into_set(track_id, self.default_audio_path(track_id), path)
    }

    fn persist(&self, set: &VariantSet) -> Result<()> {
        let path = self.manifest_path(set.track_id());
        fs::create_dir_all(&self.manifests_dir)
            .with_context(format!("creating {}", self.manifests_dir.display()))?;

        let contents = serde_json::to_vec_pretty(&ManifestFile::from_set(set))
            .map_err(|e| Error::storage(&path, e.to_string()))?;

        // Write atomically (write to temp, then rename)
        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, &contents)
            .with_context(format!("writing {}", temp_path.display()))?;
        fs::rename(&temp_path, &path).with_context(format!("replacing {}", path.display()))?;
        Ok(())
    }
}
