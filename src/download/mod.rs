//! Download orchestrator.
//!
//! Turns a hosted variant into a local file. At most one download per
//! unique id is in flight; starting another one for the same id aborts the
//! previous task. Progress is broadcast as it arrives and every download
//! ends with exactly one state-changed event, whatever the outcome.
//!
//! On success the body is written to a fresh path in the songs directory
//! and committed to the store as a local variant, which becomes active.
//! A failed commit is logged; the written file is not removed.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result, ResultExt};
use crate::events::EventBus;
use crate::fetch::{Listener, TaskKey, TaskMessage, TaskSpawner, TaskUpdate};
use crate::index::IndexManager;
use crate::model::{HostedVariant, LocalVariant, TrackId, Variant, VariantMetadata};
use crate::store::LocalStore;

/// Used when the URL has no usable file extension.
pub const DEFAULT_EXTENSION: &str = "mp3";

/// One in-flight download.
struct DownloadTask {
    variant: HostedVariant,
    listener: Listener,
    progress: f32,
}

impl DownloadTask {
    fn track_id(&self) -> TrackId {
        self.variant.metadata.track_id
    }
}

pub struct DownloadManager {
    spawner: TaskSpawner,
    tasks: HashMap<String, DownloadTask>,
}

impl DownloadManager {
    pub fn new(spawner: TaskSpawner) -> Self {
        Self {
            spawner,
            tasks: HashMap::new(),
        }
    }

    /// Start downloading the variant `unique_id` of a track.
    ///
    /// The variant is looked up in the merged view, so both stored and
    /// index-declared hosted variants can be downloaded.
    pub fn download_variant(
        &mut self,
        store: &LocalStore,
        index: &IndexManager,
        events: &mut EventBus,
        track_id: TrackId,
        unique_id: &str,
    ) -> Result<()> {
        let variants = index.resolve(store, track_id)?;
        let variant = variants
            .iter()
            .find(|v| v.unique_id() == unique_id)
            .ok_or_else(|| Error::not_found(format!("variant {} in track {}", unique_id, track_id)))?;
        let hosted = variant.downloadable()?.clone();

        self.start(events, hosted);
        Ok(())
    }

    /// Start fetching a hosted variant, replacing any download of the same id.
    pub fn start(&mut self, events: &mut EventBus, variant: HostedVariant) {
        let track_id = variant.metadata.track_id;
        let unique_id = variant.metadata.unique_id.clone();

        if let Some(previous) = self.tasks.remove(&unique_id) {
            tracing::info!(target: "jukebox::download", unique_id = %unique_id, "Restarting download");
            previous.listener.cancel();
        }

        tracing::info!(target: "jukebox::download", track = %track_id, unique_id = %unique_id, url = %variant.url, "Starting download");
        let listener = self
            .spawner
            .spawn_fetch(TaskKey::Download(unique_id.clone()), variant.url.clone());
        self.tasks.insert(
            unique_id.clone(),
            DownloadTask {
                variant,
                listener,
                progress: 0.0,
            },
        );
        events.download_progress(track_id, &unique_id, 0.0);
    }

    /// Cancel an in-flight download.
    pub fn stop_download(
        &mut self,
        events: &mut EventBus,
        track_id: TrackId,
        unique_id: &str,
    ) -> Result<()> {
        match self.tasks.get(unique_id) {
            Some(task) if task.track_id() == track_id => {}
            _ => {
                return Err(Error::not_found(format!(
                    "download of {} for track {}",
                    unique_id, track_id
                )));
            }
        }
        if let Some(task) = self.tasks.remove(unique_id) {
            task.listener.cancel();
        }
        tracing::info!(target: "jukebox::download", track = %track_id, unique_id = %unique_id, "Download stopped");
        events.state_changed(track_id);
        Ok(())
    }

    /// Last reported progress, or `None` if nothing is in flight for the id.
    pub fn progress(&self, unique_id: &str) -> Option<f32> {
        self.tasks.get(unique_id).map(|task| task.progress)
    }

    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_downloading(&self, unique_id: &str) -> bool {
        self.tasks.contains_key(unique_id)
    }

    /// Apply a task message. Messages of stopped or replaced tasks are ignored.
    pub fn handle_message(
        &mut self,
        store: &mut LocalStore,
        events: &mut EventBus,
        message: TaskMessage,
    ) {
        let TaskKey::Download(unique_id) = &message.key else {
            return;
        };
        let Some(task) = self
            .tasks
            .get_mut(unique_id)
            .filter(|task| task.listener.accepts(&message))
        else {
            tracing::trace!(target: "jukebox::download", unique_id = %unique_id, ticket = message.ticket, "Dropping stale download message");
            return;
        };

        match message.update {
            TaskUpdate::Progress(progress) => {
                task.progress = progress;
                events.download_progress(task.track_id(), unique_id, progress);
            }
            TaskUpdate::Finished(result) => {
                let Some(task) = self.tasks.remove(unique_id) else {
                    return;
                };
                let track_id = task.track_id();
                match result {
                    Ok(body) => match commit(store, &task.variant, &body) {
                        Ok(path) => {
                            tracing::info!(target: "jukebox::download", track = %track_id, unique_id = %unique_id, path = %path.display(), "Download committed");
                        }
                        Err(e) => {
                            tracing::error!(target: "jukebox::download", track = %track_id, unique_id = %unique_id, "Failed to commit download: {}", e);
                        }
                    },
                    Err(e) => {
                        tracing::error!(target: "jukebox::download", track = %track_id, unique_id = %unique_id, "Download failed: {}", e);
                    }
                }
                events.state_changed(track_id);
            }
        }
    }
}

/// Write a downloaded body and register it as the track's active variant.
fn commit(store: &mut LocalStore, hosted: &HostedVariant, body: &[u8]) -> Result<PathBuf> {
    let track_id = hosted.metadata.track_id;
    let unique_id = hosted.metadata.unique_id.as_str();

    let path = store.generate_file_path(&extension_for(&hosted.url))?;
    fs::write(&path, body).with_context(format!("writing {}", path.display()))?;

    // A private link replaces its earlier download instead of updating it in place.
    if hosted.origin_index_id.is_none() {
        match store.remove_variant(track_id, unique_id) {
            Ok(_) => {}
            Err(e) if matches!(e.root(), Error::NotFound(_)) => {}
            Err(e) => return Err(e),
        }
    }

    let local = Variant::Local(LocalVariant {
        metadata: VariantMetadata {
            size_bytes: Some(body.len() as u64),
            ..hosted.metadata.clone()
        },
        path: path.clone(),
        source_url: Some(hosted.url.clone()),
        origin_index_id: hosted.origin_index_id.clone(),
    });
    store.add_variant(track_id, local)?;
    store.set_active(track_id, unique_id)?;
    Ok(path)
}

/// File extension for a download, taken from the URL path.
pub fn extension_for(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|url| url.path_segments()?.last().map(str::to_string))
        .and_then(|name| {
            Path::new(&name)
                .extension()?
                .to_str()
                .map(str::to_ascii_lowercase)
        })
        .filter(|ext| ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
}
