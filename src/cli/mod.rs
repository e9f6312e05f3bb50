//! Command-line interface for jukebox.
//!
//! This module provides CLI commands for synchronizing indexes and managing
//! the variants of a track.

mod commands;

pub use commands::{Cli, Commands, run_command};
