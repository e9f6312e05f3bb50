//! Adapter layer: convert index manifest DTOs to domain models.
//!
//! This is the ONLY place where index DTO types become variants.

use super::dto;
use crate::error::{Error, Result};
use crate::model::{
    HostedVariant, IndexMetadata, StreamingVariant, TrackId, Variant, VariantMetadata,
};

/// One index manifest, converted.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedIndex {
    pub metadata: IndexMetadata,
    /// Declared variants in manifest order: streaming entries, then hosted,
    /// each in document order, expanded once per listed track.
    pub variants: Vec<Variant>,
}

/// Parse a raw manifest body fetched from `url`.
pub fn parse_index(body: &[u8], url: &str) -> Result<ParsedIndex> {
    let mut value: serde_json::Value = serde_json::from_slice(body)
        .map_err(|e| Error::parse(format!("index {}: {}", url, e)))?;

    let Some(object) = value.as_object_mut() else {
        return Err(Error::parse(format!("index {} is not a JSON object", url)));
    };
    object.insert("url".to_string(), serde_json::Value::String(url.to_string()));

    let manifest: dto::IndexManifest = serde_json::from_value(value)
        .map_err(|e| Error::parse(format!("index {}: {}", url, e)))?;

    Ok(to_parsed_index(manifest))
}

fn to_parsed_index(manifest: dto::IndexManifest) -> ParsedIndex {
    let index_id = manifest.id.clone();
    let mut variants = Vec::new();

    for (key, entry) in manifest.nongs.youtube {
        for &song in &entry.songs {
            variants.push(Variant::Streaming(StreamingVariant {
                metadata: metadata(song, &key, &entry.name, &entry.artist, entry.start_offset),
                stream_id: entry.yt_id.clone(),
                origin_index_id: Some(index_id.clone()),
            }));
        }
    }

    for (key, entry) in manifest.nongs.hosted {
        for &song in &entry.songs {
            variants.push(Variant::Hosted(HostedVariant {
                metadata: metadata(song, &key, &entry.name, &entry.artist, entry.start_offset),
                url: entry.url.clone(),
                origin_index_id: Some(index_id.clone()),
                local_path: None,
            }));
        }
    }

    ParsedIndex {
        metadata: IndexMetadata {
            id: manifest.id,
            name: manifest.name,
            url: manifest.url,
            description: manifest.description,
        },
        variants,
    }
}

fn metadata(song: i32, key: &str, name: &str, artist: &str, start_offset: i64) -> VariantMetadata {
    VariantMetadata {
        start_offset_ms: start_offset,
        ..VariantMetadata::new(TrackId(song), key, name, artist)
    }
}
