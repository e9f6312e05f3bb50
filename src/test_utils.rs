//! Test utilities and fixtures for jukebox tests.
//!
//! Variant factories, throwaway storage roots, a runtime for fetch tasks,
//! and a builder for index manifests.
//!
//! # Example
//!
//! ```ignore
//! use crate::test_utils::{IndexBuilder, temp_storage};
//!
//! #[test]
//! fn test_something() {
//!     let (storage, _dir) = temp_storage();
//!     let body = IndexBuilder::new("hub", "Song Hub")
//!         .hosted("abc", &[911], "http://x/y.mp3")
//!         .build();
//!     // ... test logic
//! }
//! ```

use std::path::PathBuf;

use serde_json::{Map, Value, json};
use tempfile::TempDir;
use tokio::runtime::Runtime;

use crate::config::StorageConfig;
use crate::model::{
    HostedVariant, LocalVariant, StreamingVariant, TrackId, Variant, VariantMetadata,
};

/// Storage rooted in a fresh temporary directory.
///
/// Keep the `TempDir` alive for the duration of your test.
pub fn temp_storage() -> (StorageConfig, TempDir) {
    let dir = tempfile::tempdir().expect("Failed to create temp directory");
    (StorageConfig::rooted_at(dir.path()), dir)
}

/// Multi-threaded runtime for spawned fetch tasks.
pub fn test_runtime() -> Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("Failed to build test runtime")
}

fn metadata(track: i32, unique_id: &str) -> VariantMetadata {
    VariantMetadata::new(
        TrackId(track),
        unique_id,
        format!("Song {}", unique_id),
        "Test Artist",
    )
}

/// A user-added local file.
pub fn local(track: i32, unique_id: &str, path: &str) -> Variant {
    Variant::Local(LocalVariant {
        metadata: metadata(track, unique_id),
        path: PathBuf::from(path),
        source_url: None,
        origin_index_id: None,
    })
}

pub fn streaming(track: i32, unique_id: &str, stream_id: &str, origin: Option<&str>) -> Variant {
    Variant::Streaming(StreamingVariant {
        metadata: metadata(track, unique_id),
        stream_id: stream_id.to_string(),
        origin_index_id: origin.map(str::to_string),
    })
}

/// A hosted file that has not been downloaded.
pub fn hosted(track: i32, unique_id: &str, url: &str, origin: Option<&str>) -> Variant {
    Variant::Hosted(HostedVariant {
        metadata: metadata(track, unique_id),
        url: url.to_string(),
        origin_index_id: origin.map(str::to_string),
        local_path: None,
    })
}

/// Builds index manifest JSON the way index servers publish it.
pub struct IndexBuilder {
    id: String,
    name: String,
    youtube: Map<String, Value>,
    hosted: Map<String, Value>,
}

impl IndexBuilder {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            youtube: Map::new(),
            hosted: Map::new(),
        }
    }

    pub fn youtube(mut self, key: &str, songs: &[i32], yt_id: &str) -> Self {
        self.youtube.insert(
            key.to_string(),
            json!({
                "songs": songs,
                "name": format!("Song {}", key),
                "artist": "Index Artist",
                "startOffset": 0,
                "ytID": yt_id,
            }),
        );
        self
    }

    pub fn hosted(mut self, key: &str, songs: &[i32], url: &str) -> Self {
        self.hosted.insert(
            key.to_string(),
            json!({
                "songs": songs,
                "name": format!("Song {}", key),
                "artist": "Index Artist",
                "startOffset": 0,
                "url": url,
            }),
        );
        self
    }

    pub fn build(self) -> String {
        json!({
            "manifest": 1,
            "id": self.id,
            "name": self.name,
            "nongs": {
                "youtube": self.youtube,
                "hosted": self.hosted,
            },
        })
        .to_string()
    }
}
