//! Core data models for song variants.
//!
//! Defines the primary entities: [`Variant`], [`VariantSet`], and
//! [`IndexMetadata`].
//!
//! A track owns one [`VariantSet`]: the permanent default variant (the host's
//! original audio) plus the variants the user added, with exactly one of
//! them active. Variants are identified by `unique_id`; two variants are the
//! same variant iff their ids match, regardless of kind or source.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Identity reserved for the built-in default variant of every track.
pub const DEFAULT_UNIQUE_ID: &str = "default";

/// Opaque integer key of a host audio asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackId(pub i32);

impl TrackId {
    /// Map a host built-in audio id into the track key space.
    ///
    /// Built-in audio lives at negative keys (`-id - 1`) so it never
    /// collides with regular, positive song ids.
    pub fn from_builtin_audio(audio_id: i32) -> Self {
        Self(!audio_id)
    }
}

impl From<i32> for TrackId {
    fn from(value: i32) -> Self {
        Self(value)
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Metadata shared by every variant kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantMetadata {
    /// Track this variant belongs to
    pub track_id: TrackId,
    /// Stable identity, unique within the track's set
    pub unique_id: String,
    /// Display name (song title)
    pub name: String,
    /// Artist name
    pub artist: String,
    /// File size, when known
    pub size_bytes: Option<u64>,
    /// Playback start offset in milliseconds
    pub start_offset_ms: i64,
}

impl VariantMetadata {
    /// Create metadata with no size and a zero start offset.
    pub fn new(
        track_id: TrackId,
        unique_id: impl Into<String>,
        name: impl Into<String>,
        artist: impl Into<String>,
    ) -> Self {
        Self {
            track_id,
            unique_id: unique_id.into(),
            name: name.into(),
            artist: artist.into(),
            size_bytes: None,
            start_offset_ms: 0,
        }
    }
}

/// An audio file already on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalVariant {
    pub metadata: VariantMetadata,
    /// Absolute path of the audio file
    pub path: PathBuf,
    /// URL the file was downloaded from, if any
    pub source_url: Option<String>,
    /// Index the downloaded variant was declared by
    pub origin_index_id: Option<String>,
}

/// A reference to a streaming platform (e.g. a video id).
///
/// Not downloadable here; turning the reference into audio is someone
/// else's job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamingVariant {
    pub metadata: VariantMetadata,
    /// Platform reference
    pub stream_id: String,
    pub origin_index_id: Option<String>,
}

/// A remotely hosted audio file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostedVariant {
    pub metadata: VariantMetadata,
    pub url: String,
    pub origin_index_id: Option<String>,
    /// Where the file landed after a successful download
    pub local_path: Option<PathBuf>,
}

/// Kind tag of a [`Variant`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantKind {
    Local,
    Streaming,
    Hosted,
}

impl fmt::Display for VariantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Local => "local",
            Self::Streaming => "streaming",
            Self::Hosted => "hosted",
        };
        f.pad(name)
    }
}

/// One alternative audio source for a track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Variant {
    Local(LocalVariant),
    Streaming(StreamingVariant),
    Hosted(HostedVariant),
}

impl Variant {
    pub fn metadata(&self) -> &VariantMetadata {
        match self {
            Self::Local(v) => &v.metadata,
            Self::Streaming(v) => &v.metadata,
            Self::Hosted(v) => &v.metadata,
        }
    }

    pub fn unique_id(&self) -> &str {
        &self.metadata().unique_id
    }

    pub fn track_id(&self) -> TrackId {
        self.metadata().track_id
    }

    pub fn kind(&self) -> VariantKind {
        match self {
            Self::Local(_) => VariantKind::Local,
            Self::Streaming(_) => VariantKind::Streaming,
            Self::Hosted(_) => VariantKind::Hosted,
        }
    }

    /// Index that declared this variant, if it was learned from one.
    pub fn origin_index_id(&self) -> Option<&str> {
        match self {
            Self::Local(v) => v.origin_index_id.as_deref(),
            Self::Streaming(v) => v.origin_index_id.as_deref(),
            Self::Hosted(v) => v.origin_index_id.as_deref(),
        }
    }

    /// The hosted variant to fetch, or why this kind can't be downloaded.
    pub fn downloadable(&self) -> Result<&HostedVariant> {
        match self {
            Self::Hosted(hosted) => Ok(hosted),
            other => Err(Error::unsupported(format!(
                "{} variant {} cannot be downloaded",
                other.kind(),
                other.unique_id()
            ))),
        }
    }

    /// Playable file on disk, if there is one.
    pub fn local_path(&self) -> Option<&Path> {
        match self {
            Self::Local(v) => Some(&v.path),
            Self::Hosted(v) => v.local_path.as_deref(),
            Self::Streaming(_) => None,
        }
    }
}

/// The variant collection of one track.
///
/// Holds the default variant, the user-added variants in insertion order,
/// and the id of the active one. The active id always references a member
/// of the set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantSet {
    track_id: TrackId,
    default: Variant,
    variants: Vec<Variant>,
    active: String,
}

impl VariantSet {
    /// A fresh set holding only the default variant, which is active.
    pub fn new(track_id: TrackId, default_path: impl Into<PathBuf>) -> Self {
        let default = Variant::Local(LocalVariant {
            metadata: VariantMetadata::new(track_id, DEFAULT_UNIQUE_ID, "", ""),
            path: default_path.into(),
            source_url: None,
            origin_index_id: None,
        });
        Self {
            track_id,
            default,
            variants: Vec::new(),
            active: DEFAULT_UNIQUE_ID.to_string(),
        }
    }

    /// Rebuild a set from persisted parts, checking its invariants.
    pub fn from_parts(
        track_id: TrackId,
        default_path: impl Into<PathBuf>,
        variants: Vec<Variant>,
        active: impl Into<String>,
    ) -> Result<Self> {
        let mut set = Self::new(track_id, default_path);
        for variant in variants {
            if set.contains(variant.unique_id()) {
                return Err(Error::invalid(format!(
                    "duplicate variant {} in track {}",
                    variant.unique_id(),
                    track_id
                )));
            }
            set.check_insertable(&variant)?;
            set.variants.push(variant);
        }
        set.set_active(&active.into())?;
        Ok(set)
    }

    pub fn track_id(&self) -> TrackId {
        self.track_id
    }

    /// The host's original audio. Always present.
    pub fn default_variant(&self) -> &Variant {
        &self.default
    }

    /// User-added variants in store order.
    pub fn variants(&self) -> &[Variant] {
        &self.variants
    }

    pub fn active_id(&self) -> &str {
        &self.active
    }

    pub fn active(&self) -> &Variant {
        self.get(&self.active).unwrap_or(&self.default)
    }

    pub fn is_default_active(&self) -> bool {
        self.active == DEFAULT_UNIQUE_ID
    }

    pub fn get(&self, unique_id: &str) -> Option<&Variant> {
        if unique_id == DEFAULT_UNIQUE_ID {
            return Some(&self.default);
        }
        self.variants.iter().find(|v| v.unique_id() == unique_id)
    }

    pub fn contains(&self, unique_id: &str) -> bool {
        self.get(unique_id).is_some()
    }

    /// Default first, then user-added variants.
    pub fn iter(&self) -> impl Iterator<Item = &Variant> {
        std::iter::once(&self.default).chain(self.variants.iter())
    }

    /// Total variant count, default included.
    pub fn len(&self) -> usize {
        self.variants.len() + 1
    }

    /// Never true; a set always holds its default variant.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Add a variant, replacing in place any variant with the same id.
    pub fn upsert(&mut self, variant: Variant) -> Result<()> {
        self.check_insertable(&variant)?;
        match self
            .variants
            .iter_mut()
            .find(|v| v.unique_id() == variant.unique_id())
        {
            Some(existing) => *existing = variant,
            None => self.variants.push(variant),
        }
        Ok(())
    }

    /// Remove a variant. The active id falls back to the default if it
    /// pointed at the removed one.
    pub fn remove(&mut self, unique_id: &str) -> Result<Variant> {
        if unique_id == DEFAULT_UNIQUE_ID {
            return Err(Error::invalid(format!(
                "the default variant of track {} cannot be removed",
                self.track_id
            )));
        }
        let position = self
            .variants
            .iter()
            .position(|v| v.unique_id() == unique_id)
            .ok_or_else(|| {
                Error::not_found(format!("variant {} in track {}", unique_id, self.track_id))
            })?;
        let removed = self.variants.remove(position);
        if self.active == unique_id {
            self.active = DEFAULT_UNIQUE_ID.to_string();
        }
        Ok(removed)
    }

    pub fn set_active(&mut self, unique_id: &str) -> Result<()> {
        if !self.contains(unique_id) {
            return Err(Error::not_found(format!(
                "variant {} in track {}",
                unique_id, self.track_id
            )));
        }
        self.active = unique_id.to_string();
        Ok(())
    }

    fn check_insertable(&self, variant: &Variant) -> Result<()> {
        if variant.track_id() != self.track_id {
            return Err(Error::invalid(format!(
                "variant {} belongs to track {}, not {}",
                variant.unique_id(),
                variant.track_id(),
                self.track_id
            )));
        }
        if variant.unique_id() == DEFAULT_UNIQUE_ID {
            return Err(Error::invalid(format!(
                "'{}' is reserved for the default variant",
                DEFAULT_UNIQUE_ID
            )));
        }
        if variant.unique_id().is_empty() {
            return Err(Error::invalid("variant id must not be empty"));
        }
        Ok(())
    }
}

/// A remote index as described by its own manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexMetadata {
    pub id: String,
    pub name: String,
    /// URL the manifest was fetched from
    pub url: String,
    pub description: Option<String>,
}
