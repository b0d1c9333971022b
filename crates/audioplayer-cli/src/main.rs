//! audioplayer: command line front end for the player engine.
//!
//! Plays a playlist against the in-memory backend, which a small simulator
//! drives through duration, tag and end-of-stream messages. Every playback
//! update is printed to stdout as one JSON line; logs go to stderr.

mod cli;
mod sim;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use audioplayer::backend::memory::MemoryBackend;
use audioplayer::config::PlayerConfig;
use audioplayer::events::PlayerEvent;
use audioplayer::{AudioPlayer, StartOptions, Track};
use clap::Parser;
use crossbeam_channel::Receiver;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args = cli::Args::parse();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("info,audioplayer=info")
        }))
        .init();

    let config = match &args.config {
        Some(path) => PlayerConfig::load(path)?,
        None => PlayerConfig::default(),
    };

    match args.cmd {
        cli::Command::Formats => {
            for format in config.pipelines.formats() {
                let stages: Vec<&str> = config
                    .pipelines
                    .stages_for(format)
                    .unwrap_or_default()
                    .iter()
                    .map(|stage| stage.factory.as_str())
                    .collect();
                println!("{format}: {}", stages.join(" ! "));
            }
        }
        cli::Command::Play {
            resources,
            format,
            volume,
            repeat,
            shuffle,
            paused,
            tick_ms,
            track_ticks,
        } => {
            let options = StartOptions {
                volume,
                paused,
                repeat,
                shuffle,
            };
            play(config, &resources, format.as_deref(), options, tick_ms, track_ticks)?;
        }
    }
    Ok(())
}

fn play(
    config: PlayerConfig,
    resources: &[String],
    format: Option<&str>,
    options: StartOptions,
    tick_ms: u64,
    track_ticks: u32,
) -> Result<()> {
    let (first, rest) = resources.split_first().context("no resources to play")?;
    let backend = MemoryBackend::new();
    let mut player = AudioPlayer::new(backend.clone(), config);
    let updates = player.events().subscribe();

    let stop = Arc::new(AtomicBool::new(false));
    let stop_flag = stop.clone();
    ctrlc::set_handler(move || stop_flag.store(true, Ordering::SeqCst))
        .context("install ctrl-c handler")?;

    let id = player
        .start_playback(first, format, options)
        .with_context(|| format!("start {first}"))?;
    let tracks: Vec<Track> = rest
        .iter()
        .map(|resource| Track::new(resource.clone(), format.map(str::to_string)))
        .collect();
    let added = player.add_tracks(id, tracks)?;
    tracing::info!(player_id = %id, tracks = added + 1, "playlist ready");

    let tick = Duration::from_millis(tick_ms);
    let mut sim = sim::Simulator::new(backend, track_ticks, tick);
    while player.player_count() > 0 {
        if stop.load(Ordering::SeqCst) {
            tracing::info!("interrupted");
            player.shutdown();
            break;
        }
        sim.step();
        player.tick();
        print_updates(&updates)?;
        std::thread::sleep(tick);
    }
    print_updates(&updates)
}

fn print_updates(updates: &Receiver<PlayerEvent>) -> Result<()> {
    for event in updates.try_iter() {
        println!("{}", serde_json::to_string(&event).context("encode update")?);
    }
    Ok(())
}
