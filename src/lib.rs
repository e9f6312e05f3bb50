//! Jukebox - alternative audio sources for host tracks.
//!
//! Every track of the host application can carry several variants: local
//! files, streaming references and hosted files. One of them is active.
//! Variants come from the user or from remote indexes, and hosted ones can be
//! downloaded into local files.
//!
//! [`Jukebox`] is the entry point; it ties together the [`store`], the
//! [`index`] sync engine and the [`download`] orchestrator.

pub mod config;
pub mod download;
pub mod error;
pub mod events;
pub mod fetch;
pub mod index;
pub mod jukebox;
pub mod model;
pub mod store;
#[cfg(test)]
pub mod test_utils;

pub use error::{Error, Result};
pub use events::SongEvent;
pub use jukebox::{Jukebox, TitleQuery};
pub use model::{TrackId, Variant, VariantKind, VariantSet};
