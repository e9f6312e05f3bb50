//! Index manifest Data Transfer Objects
//!
//! These types match what index servers publish. Convert to domain types in
//! `adapter.rs`; do not use them elsewhere.
//!
//! Example manifest:
//! ```json
//! {
//!   "manifest": 1,
//!   "id": "song-file-hub",
//!   "name": "Song File Hub",
//!   "description": "Community uploads",
//!   "nongs": {
//!     "youtube": {
//!       "a1b2": { "songs": [911], "name": "Song", "artist": "Artist",
//!                 "startOffset": 0, "ytID": "dQw4w9WgXcQ" }
//!     },
//!     "hosted": {
//!       "abc": { "songs": [911, 912], "name": "Song", "artist": "Artist",
//!                "startOffset": 1500, "url": "http://x/y.mp3" }
//!     }
//!   }
//! }
//! ```
//!
//! `url` is not part of the published manifest; it is set to the address
//! the manifest was fetched from before deserializing.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IndexManifest {
    /// Manifest format version
    #[serde(default)]
    pub manifest: Option<u32>,
    pub id: String,
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub nongs: Entries,
}

/// Variant declarations, keyed by each variant's unique id, in document order.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Entries {
    #[serde(default)]
    pub youtube: IndexMap<String, YoutubeEntry>,
    #[serde(default)]
    pub hosted: IndexMap<String, HostedEntry>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct YoutubeEntry {
    pub songs: Vec<i32>,
    pub name: String,
    pub artist: String,
    #[serde(rename = "startOffset", default)]
    pub start_offset: i64,
    #[serde(rename = "ytID")]
    pub yt_id: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HostedEntry {
    pub songs: Vec<i32>,
    pub name: String,
    pub artist: String,
    #[serde(rename = "startOffset", default)]
    pub start_offset: i64,
    pub url: String,
}
