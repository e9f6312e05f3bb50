//! CLI command definitions and dispatch.
//!
//! Each group of subcommands is implemented in its own submodule:
//! - `sync`: index listing and synchronization
//! - `variants`: listing, downloading and editing a track's variants

mod sync;
mod variants;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tokio::runtime::Runtime;

use jukebox::Jukebox;
use jukebox::config::{self, Config};

pub use sync::{cmd_indexes, cmd_sync};
pub use variants::{cmd_activate, cmd_add, cmd_download, cmd_list, cmd_remove};

/// Jukebox CLI
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file (defaults to the OS config directory)
    #[arg(long, global = true, env = "JUKEBOX_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Show configured indexes and their last known names
    Indexes,
    /// Fetch every enabled index and report what was loaded
    Sync,
    /// List all variants of a track
    List {
        /// Track id
        #[arg(allow_hyphen_values = true)]
        track: i32,
    },
    /// Download a hosted variant and make it active
    Download {
        /// Track id
        #[arg(allow_hyphen_values = true)]
        track: i32,
        /// Variant unique id
        unique_id: String,
    },
    /// Make a variant the active one
    Activate {
        /// Track id
        #[arg(allow_hyphen_values = true)]
        track: i32,
        /// Variant unique id
        unique_id: String,
    },
    /// Remove a variant from a track
    Remove {
        /// Track id
        #[arg(allow_hyphen_values = true)]
        track: i32,
        /// Variant unique id
        unique_id: String,
    },
    /// Add a local audio file as a variant
    Add {
        /// Track id
        #[arg(allow_hyphen_values = true)]
        track: i32,
        /// Path to the audio file
        path: PathBuf,
        /// Song title
        #[arg(long)]
        name: String,
        /// Artist name
        #[arg(long)]
        artist: String,
        /// Variant unique id (generated if omitted)
        #[arg(long)]
        unique_id: Option<String>,
        /// Make the new variant active
        #[arg(long)]
        activate: bool,
    },
}

/// Run the specified CLI command.
pub fn run_command(cli: &Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => config::load_from(path),
        None => config::load(),
    };
    let rt = Runtime::new()?;
    let mut jukebox = Jukebox::open(&config, rt.handle().clone())?;
    jukebox.init()?;

    match &cli.command {
        Commands::Indexes => cmd_indexes(&jukebox),
        Commands::Sync => cmd_sync(&mut jukebox, sync_timeout(&config)),
        Commands::List { track } => cmd_list(&mut jukebox, *track, sync_timeout(&config)),
        Commands::Download { track, unique_id } => {
            cmd_download(&mut jukebox, *track, unique_id, sync_timeout(&config))
        }
        Commands::Activate { track, unique_id } => cmd_activate(&mut jukebox, *track, unique_id),
        Commands::Remove { track, unique_id } => cmd_remove(&mut jukebox, *track, unique_id),
        Commands::Add {
            track,
            path,
            name,
            artist,
            unique_id,
            activate,
        } => cmd_add(
            &mut jukebox,
            *track,
            path,
            name,
            artist,
            unique_id.as_deref(),
            *activate,
        ),
    }
}

/// How long to wait for a sync pass: one fetch timeout plus slack.
fn sync_timeout(config: &Config) -> Duration {
    config.indexes.fetch_timeout() + Duration::from_secs(5)
}
