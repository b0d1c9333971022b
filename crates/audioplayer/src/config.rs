//! Configuration loading and parsing.
//!
//! Defines the player config schema and resolves defaults.

use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use crate::pipeline::{PipelineTable, StageSpec};

const DEFAULT_MAX_PLAYLIST_TRACKS: usize = 100;
const DEFAULT_VOLUME: u8 = 100;
const DEFAULT_PROGRESS_UPDATE_SECONDS: u32 = 15;

/// Resolved player configuration.
#[derive(Clone, Debug)]
pub struct PlayerConfig {
    /// Playlist capacity; adds beyond it are rejected.
    pub max_playlist_tracks: usize,
    /// Volume used when a start command does not specify one.
    pub default_volume: u8,
    /// Progress probe reporting period.
    pub progress_update_seconds: u32,
    /// Format stages per MIME type.
    pub pipelines: PipelineTable,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            max_playlist_tracks: DEFAULT_MAX_PLAYLIST_TRACKS,
            default_volume: DEFAULT_VOLUME,
            progress_update_seconds: DEFAULT_PROGRESS_UPDATE_SECONDS,
            pipelines: PipelineTable::default(),
        }
    }
}

/// Player configuration file (TOML).
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlayerConfigFile {
    pub max_playlist_tracks: Option<usize>,
    pub default_volume: Option<u8>,
    pub progress_update_seconds: Option<u32>,
    /// Per-format overrides; each replaces the built-in entry for its MIME type.
    #[serde(default)]
    pub pipelines: Vec<PipelineEntry>,
}

/// One `[[pipelines]]` table.
#[derive(Debug, Deserialize)]
pub struct PipelineEntry {
    pub mime: String,
    pub stages: Vec<StageSpec>,
}

impl PlayerConfig {
    /// Load a TOML config file and resolve it against the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read config {:?}", path))?;
        Self::from_toml(&raw).with_context(|| format!("parse config {:?}", path))
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        let file: PlayerConfigFile = toml::from_str(raw)?;
        Self::resolve(file)
    }

    fn resolve(file: PlayerConfigFile) -> Result<Self> {
        let mut config = Self::default();
        if let Some(max) = file.max_playlist_tracks {
            if max == 0 {
                bail!("max_playlist_tracks must be at least 1");
            }
            config.max_playlist_tracks = max;
        }
        if let Some(volume) = file.default_volume {
            if !(1..=100).contains(&volume) {
                bail!("default_volume must be between 1 and 100");
            }
            config.default_volume = volume;
        }
        if let Some(seconds) = file.progress_update_seconds {
            config.progress_update_seconds = seconds;
        }
        for entry in file.pipelines {
            if entry.stages.is_empty() {
                bail!("pipeline for {} has no stages", entry.mime);
            }
            config.pipelines.insert(entry.mime, entry.stages);
        }
        Ok(config)
    }
}
