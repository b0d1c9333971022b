use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "audioplayer", version)]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,

    /// Player config file (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Play resources as one playlist on the simulated backend, printing
    /// playback updates as JSON lines
    Play {
        /// Files or http(s) URLs, in playlist order
        #[arg(required = true)]
        resources: Vec<String>,

        /// MIME type for every resource (required for URLs)
        #[arg(long)]
        format: Option<String>,

        /// Volume percent (1..=100)
        #[arg(long)]
        volume: Option<u8>,

        /// Restart the playlist when it ends
        #[arg(long)]
        repeat: bool,

        /// Reshuffle on restart (with --repeat)
        #[arg(long)]
        shuffle: bool,

        /// Start paused
        #[arg(long)]
        paused: bool,

        /// Processing tick period in milliseconds
        #[arg(long, default_value_t = 100)]
        tick_ms: u64,

        /// Simulated track length in ticks
        #[arg(long, default_value_t = 50)]
        track_ticks: u32,
    },

    /// List supported formats and their stages
    Formats,
}
