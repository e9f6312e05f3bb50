//! On-disk manifest format.
//!
//! One JSON file per track. The default variant is implicit (its path is
//! derived from the host audio directory), so only user-added variants are
//! written, in set order, together with the active id.
//!
//! Example:
//! ```json
//! {
//!   "version": 1,
//!   "track_id": 911,
//!   "active": "abc",
//!   "variants": [
//!     {
//!       "unique_id": "abc",
//!       "name": "Song",
//!       "artist": "Artist",
//!       "start_offset_ms": 0,
//!       "kind": "local",
//!       "path": "/data/jukebox/songs/0b7c.mp3",
//!       "source_url": "http://x/y.mp3"
//!     }
//!   ]
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    HostedVariant, LocalVariant, StreamingVariant, TrackId, Variant, VariantMetadata, VariantSet,
};

/// Current manifest format version.
pub const MANIFEST_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestFile {
    pub version: u32,
    pub track_id: i32,
    pub active: String,
    #[serde(default)]
    pub variants: Vec<VariantRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantRecord {
    #[serde(flatten)]
    pub metadata: MetadataRecord,
    #[serde(flatten)]
    pub source: SourceRecord,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataRecord {
    pub unique_id: String,
    pub name: String,
    pub artist: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    #[serde(default)]
    pub start_offset_ms: i64,
}

/// Kind-specific fields, tagged by `kind`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceRecord {
    Local {
        path: PathBuf,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source_url: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        origin_index_id: Option<String>,
    },
    Streaming {
        stream_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        origin_index_id: Option<String>,
    },
    Hosted {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        origin_index_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        local_path: Option<PathBuf>,
    },
}

impl ManifestFile {
    pub fn from_set(set: &VariantSet) -> Self {
        Self {
            version: MANIFEST_VERSION,
            track_id: set.track_id().0,
            active: set.active_id().to_string(),
            variants: set.variants().iter().map(VariantRecord::from_variant).collect(),
        }
    }

    /// Rebuild the in-memory set. `path` is only used for error reporting.
    pub fn into_set(
        self,
        track_id: TrackId,
        default_path: impl Into<PathBuf>,
        path: &Path,
    ) -> Result<VariantSet> {
        if self.version != MANIFEST_VERSION {
            return Err(Error::storage(
                path,
                format!("unsupported manifest version {}", self.version),
            ));
        }
        if self.track_id != track_id.0 {
            return Err(Error::storage(
                path,
                format!(
                    "manifest belongs to track {}, expected {}",
                    self.track_id, track_id
                ),
            ));
        }

        let variants = self
            .variants
            .into_iter()
            .map(|record| record.into_variant(track_id))
            .collect();

        VariantSet::from_parts(track_id, default_path, variants, self.active)
            .map_err(|e| Error::storage(path, e.to_string()))
    }
}

impl VariantRecord {
    fn from_variant(variant: &Variant) -> Self {
        let meta = variant.metadata();
        let metadata = MetadataRecord {
            unique_id: meta.unique_id.clone(),
            name: meta.name.clone(),
            artist: meta.artist.clone(),
            size_bytes: meta.size_bytes,
            start_offset_ms: meta.start_offset_ms,
        };
        let source = match variant {
            Variant::Local(v) => SourceRecord::Local {
                path: v.path.clone(),
                source_url: v.source_url.clone(),
                origin_index_id: v.origin_index_id.clone(),
            },
            Variant::Streaming(v) => SourceRecord::Streaming {
                stream_id: v.stream_id.clone(),
                origin_index_id: v.origin_index_id.clone(),
            },
            Variant::Hosted(v) => SourceRecord::Hosted {
                url: v.url.clone(),
                origin_index_id: v.origin_index_id.clone(),
                local_path: v.local_path.clone(),
            },
        };
        Self { metadata, source }
    }

    fn into_variant(self, track_id: TrackId) -> Variant {
        let metadata = VariantMetadata {
            track_id,
            unique_id: self.metadata.unique_id,
            name: self.metadata.name,
            artist: self.metadata.artist,
            size_bytes: self.metadata.size_bytes,
            start_offset_ms: self.metadata.start_offset_ms,
        };
        match self.source {
            SourceRecord::Local {
                path,
                source_url,
                origin_index_id,
            } => Variant::Local(LocalVariant {
                metadata,
                path,
                source_url,
                origin_index_id,
            }),
            SourceRecord::Streaming {
                stream_id,
                origin_index_id,
            } => Variant::Streaming(StreamingVariant {
                metadata,
                stream_id,
                origin_index_id,
            }),
            SourceRecord::Hosted {
                url,
                origin_index_id,
                local_path,
            } => Variant::Hosted(HostedVariant {
                metadata,
                url,
                origin_index_id,
                local_path,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{hosted, local, streaming};

    fn sample_set() -> VariantSet {
        let mut set = VariantSet::new(TrackId(911), "/host/911.mp3");
        set.upsert(local(911, "a", "/songs/a.mp3")).unwrap();
        set.upsert(streaming(911, "b", "dQw4w9WgXcQ", Some("idx"))).unwrap();
        set.upsert(hosted(911, "c", "http://x/c.ogg", None)).unwrap();
        set.set_active("b").unwrap();
        set
    }

    #[test]
    fn test_manifest_preserves_order_kinds_and_active() {
        let set = sample_set();
        let json = serde_json::to_string(&ManifestFile::from_set(&set)).unwrap();
        let parsed: ManifestFile = serde_json::from_str(&json).unwrap();
        let restored = parsed
            .into_set(TrackId(911), "/host/911.mp3", Path::new("911.json"))
            .unwrap();

        assert_eq!(restored, set);
    }

    #[test]
    fn test_kind_tag_is_written() {
        let json = serde_json::to_value(ManifestFile::from_set(&sample_set())).unwrap();
        let kinds: Vec<_> = json["variants"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v["kind"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(kinds, vec!["local", "streaming", "hosted"]);
        assert_eq!(json["variants"][1]["stream_id"], "dQw4w9WgXcQ");
        assert!(json["variants"][0].get("source_url").is_none());
    }

    #[test]
    fn test_unknown_version_is_storage_error() {
        let manifest = ManifestFile {
            version: 99,
            track_id: 1,
            active: "default".to_string(),
            variants: vec![],
        };
        let err = manifest
            .into_set(TrackId(1), "/host/1.mp3", Path::new("1.json"))
            .unwrap_err();
        assert!(matches!(err, Error::Storage { .. }));
    }

    #[test]
    fn test_track_mismatch_is_storage_error() {
        let manifest = ManifestFile {
            version: MANIFEST_VERSION,
            track_id: 2,
            active: "default".to_string(),
            variants: vec![],
        };
        let err = manifest
            .into_set(TrackId(1), "/host/1.mp3", Path::new("1.json"))
            .unwrap_err();
        assert!(matches!(err, Error::Storage { .. }));
    }

    #[test]
    fn test_dangling_active_is_storage_error() {
        let json = r#"{"version":1,"track_id":5,"active":"gone","variants":[]}"#;
        let manifest: ManifestFile = serde_json::from_str(json).unwrap();
        let err = manifest
            .into_set(TrackId(5), "/host/5.mp3", Path::new("5.json"))
            .unwrap_err();
        assert!(matches!(err, Error::Storage { .. }));
    }
}
