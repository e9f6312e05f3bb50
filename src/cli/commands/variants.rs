//! Variant listing, download and editing commands.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use jukebox::model::{LocalVariant, VariantMetadata};
use jukebox::{Jukebox, SongEvent, TrackId, Variant};
use tracing::warn;

/// List every variant of a track, stored and index-declared
pub fn cmd_list(jukebox: &mut Jukebox, track: i32, timeout: Duration) -> anyhow::Result<()> {
    let track = TrackId(track);
    if !jukebox.wait_idle(timeout) {
        warn!("Index sync still running, list may be incomplete");
    }

    let variants = jukebox.variants(track)?;
    let active = jukebox.variant_set(track)?.active_id().to_string();

    println!("Track {}:", track);
    for variant in &variants {
        let marker = if variant.unique_id() == active { "*" } else { " " };
        let meta = variant.metadata();
        let source = match variant {
            Variant::Local(v) => v.path.display().to_string(),
            Variant::Streaming(v) => format!("stream {}", v.stream_id),
            Variant::Hosted(v) => v.url.clone(),
        };
        print!(
            "{} {:<9} {:<20} {}",
            marker,
            variant.kind(),
            variant.unique_id(),
            source
        );
        if !meta.name.is_empty() {
            print!("  \"{}\" by {}", meta.name, meta.artist);
        }
        if let Some(index_id) = variant.origin_index_id() {
            print!("  [{}]", jukebox.index_name(index_id).unwrap_or(index_id));
        }
        println!();
    }
    Ok(())
}

/// Download a hosted variant, showing progress until it ends
pub fn cmd_download(
    jukebox: &mut Jukebox,
    track: i32,
    unique_id: &str,
    timeout: Duration,
) -> anyhow::Result<()> {
    let track = TrackId(track);
    if !jukebox.wait_idle(timeout) {
        warn!("Index sync still running, variant may be unknown");
    }

    let previous = local_path(jukebox, track, unique_id)?;
    let events = jukebox.subscribe();
    jukebox.download_variant(track, unique_id)?;

    let mut stdout = std::io::stdout();
    while jukebox.is_busy() {
        jukebox.pump_timeout(Duration::from_millis(200));
        for event in events.try_iter() {
            if let SongEvent::DownloadProgress { progress, .. } = event {
                print!("\rDownloading {}: {:>3.0}%", unique_id, progress * 100.0);
                stdout.flush()?;
            }
        }
    }
    println!();

    match local_path(jukebox, track, unique_id)? {
        Some(path) if Some(&path) != previous.as_ref() => {
            println!("Saved to {}", path.display());
            Ok(())
        }
        _ => anyhow::bail!("Download of {} failed, see log for details", unique_id),
    }
}

fn local_path(jukebox: &mut Jukebox, track: TrackId, unique_id: &str) -> anyhow::Result<Option<PathBuf>> {
    let set = jukebox.variant_set(track)?;
    Ok(match set.get(unique_id) {
        Some(Variant::Local(v)) => Some(v.path.clone()),
        _ => None,
    })
}

/// Make a variant active
pub fn cmd_activate(jukebox: &mut Jukebox, track: i32, unique_id: &str) -> anyhow::Result<()> {
    jukebox.set_active(TrackId(track), unique_id)?;
    println!("Track {} now plays {}", track, unique_id);
    Ok(())
}

/// Remove a variant
pub fn cmd_remove(jukebox: &mut Jukebox, track: i32, unique_id: &str) -> anyhow::Result<()> {
    let removed = jukebox.remove_variant(TrackId(track), unique_id)?;
    println!("Removed {} variant {}", removed.kind(), unique_id);
    Ok(())
}

/// Add a local file as a variant
pub fn cmd_add(
    jukebox: &mut Jukebox,
    track: i32,
    path: &Path,
    name: &str,
    artist: &str,
    unique_id: Option<&str>,
    activate: bool,
) -> anyhow::Result<()> {
    if !path.is_file() {
        anyhow::bail!("{} is not a file", path.display());
    }
    let track = TrackId(track);
    let unique_id = unique_id
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string());

    let mut metadata = VariantMetadata::new(track, unique_id.clone(), name, artist);
    metadata.size_bytes = std::fs::metadata(path).ok().map(|m| m.len());

    let variant = Variant::Local(LocalVariant {
        metadata,
        path: std::path::absolute(path)?,
        source_url: None,
        origin_index_id: None,
    });
    jukebox.add_variant(track, variant)?;
    if activate {
        jukebox.set_active(track, &unique_id)?;
    }
    println!("Added {} to track {}", unique_id, track);
    Ok(())
}
