//! Jukebox - manage alternative audio sources for host tracks.
//!
//! Command-line front end: synchronize remote indexes, inspect a track's
//! variants, download hosted variants and choose the active one.

mod cli;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(EnvFilter::from_default_env().add_directive("jukebox=info".parse()?))
        .init();

    cli::run_command(&args)
}
