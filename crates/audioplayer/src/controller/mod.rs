//! Player controller.
//!
//! [`AudioPlayer`] owns the backend, the registry and the event bus. Public
//! commands live in `commands`, playlist movement in `navigation` and the
//! per-tick bus drain in `processor`. Every mutating call takes `&mut self`,
//! so commands and ticks never interleave.

mod commands;
mod navigation;
mod processor;

use std::path::Path;

use audioplayer_types::{PlaybackInfo, PlaybackState, Track};

use crate::backend::{BackendState, MediaBackend};
use crate::config::PlayerConfig;
use crate::error::{PlayerError, Result};
use crate::events::EventBus;
use crate::pipeline::{self, ChainRequest, PipelineTable};
use crate::player::{Player, PlayerId, observable_state};
use crate::registry::PlayerRegistry;
use crate::resource::{self, ResourceKind};

/// Options for [`AudioPlayer::start_playback`].
#[derive(Clone, Debug, Default)]
pub struct StartOptions {
    /// Volume percent; the configured default when `None`.
    pub volume: Option<u8>,
    /// Load the first track paused instead of playing.
    pub paused: bool,
    pub repeat: bool,
    pub shuffle: bool,
}

/// Options for [`AudioPlayer::pause_playback`]. `force_pause` wins when both
/// force flags are set.
#[derive(Clone, Debug, Default)]
pub struct PauseOptions {
    pub force_pause: bool,
    pub force_play: bool,
    pub volume: Option<u8>,
}

pub struct AudioPlayer<B: MediaBackend> {
    backend: B,
    registry: PlayerRegistry,
    config: PlayerConfig,
    events: EventBus,
}

impl<B: MediaBackend> AudioPlayer<B> {
    pub fn new(backend: B, config: PlayerConfig) -> Self {
        Self::with_events(backend, config, EventBus::new())
    }

    pub fn with_events(backend: B, config: PlayerConfig, events: EventBus) -> Self {
        tracing::info!(
            formats = config.pipelines.formats().count(),
            max_playlist_tracks = config.max_playlist_tracks,
            "audio player ready"
        );
        Self {
            backend,
            registry: PlayerRegistry::new(),
            config,
            events,
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    /// Number of live players, including ones flagged for destruction.
    pub fn player_count(&self) -> usize {
        self.registry.len()
    }

    fn player(&self, id: PlayerId) -> Result<&Player> {
        self.registry.get(id).ok_or(PlayerError::UnknownPlayer(id))
    }

    fn player_mut(&mut self, id: PlayerId) -> Result<&mut Player> {
        self.registry
            .get_mut(id)
            .ok_or(PlayerError::UnknownPlayer(id))
    }

    /// Validate a resource and its declared format. Files may leave the format
    /// empty; it is sniffed on first load.
    fn make_track(&self, resource: &str, audio_format: Option<&str>) -> Result<Track> {
        let kind = resource::classify(resource)?;
        match (kind, audio_format) {
            (_, Some(format)) if !self.config.pipelines.supports(format) => {
                Err(PlayerError::UnsupportedFormat(format.to_string()))
            }
            (_, Some(format)) => Ok(Track::new(resource, Some(format.to_string()))),
            (ResourceKind::Stream, None) => Err(PlayerError::MissingFormat),
            (ResourceKind::File, None) => Ok(Track::new(resource, None)),
        }
    }

    /// Select `index`, drop the old chain and build one for the selected
    /// track, then move it to `target`.
    ///
    /// A failed load leaves the player stopped; subscribers that last saw it
    /// running get a `Stopped` update.
    fn load_track(&mut self, id: PlayerId, index: usize, target: BackendState) -> Result<()> {
        let published = self.player(id)?.last_observed_state;
        let result = self.rebuild_chain(id, index, target);
        if result.is_err() {
            self.publish_stop_after_failed_load(id, published);
        }
        result
    }

    fn rebuild_chain(&mut self, id: PlayerId, index: usize, target: BackendState) -> Result<()> {
        let playlist = &mut self.player_mut(id)?.playlist;
        playlist.select(index)?;
        playlist.clear_track_state();
        self.registry.reset(&self.backend, id);

        let backend = &self.backend;
        let config = &self.config;
        let player = self
            .registry
            .get_mut(id)
            .ok_or(PlayerError::UnknownPlayer(id))?;
        let track = player
            .playlist
            .current_track()
            .cloned()
            .ok_or(PlayerError::InvalidTrackIndex(index))?;
        let kind = resource::classify(&track.resource)?;
        let audio_format = match (track.audio_format, kind) {
            (Some(format), _) => format,
            (None, ResourceKind::File) => {
                let format = resolve_file_format(&config.pipelines, Path::new(&track.resource))?;
                if let Some(current) = player.playlist.current_track_mut() {
                    current.audio_format = Some(format.clone());
                }
                format
            }
            (None, ResourceKind::Stream) => return Err(PlayerError::MissingFormat),
        };

        let request = ChainRequest {
            name: id.to_string(),
            source_factory: kind.source_factory(),
            location: &track.resource,
            audio_format: &audio_format,
            volume: player.playlist.volume(),
            progress_update_seconds: config.progress_update_seconds,
        };
        let active = pipeline::build_chain(backend, &config.pipelines, &request)?;
        let chain = active.chain;
        player.chain = Some(active);
        backend.set_state(chain, target)?;
        tracing::info!(
            player_id = %id,
            index,
            resource = %track.resource,
            format = %audio_format,
            "track loaded"
        );
        Ok(())
    }

    fn publish_stop_after_failed_load(&mut self, id: PlayerId, published: PlaybackState) {
        let Some(player) = self.registry.get_mut(id) else {
            return;
        };
        let state = player.query_state(&self.backend);
        if state != PlaybackState::Stopped || published == PlaybackState::Stopped {
            return;
        }
        player.last_observed_state = state;
        self.events.playback_update(player.playback_info(state));
    }

    /// Publish the player's state if it changed since the last publish, or
    /// unconditionally when `force` is set. Transient `Ready` is never
    /// published.
    fn emit_playback_state(&mut self, id: PlayerId, force: bool) -> Result<()> {
        let player = self
            .registry
            .get_mut(id)
            .ok_or(PlayerError::UnknownPlayer(id))?;
        let state = match &player.chain {
            Some(active) => self.backend.state(active.chain)?,
            None => BackendState::Null,
        };
        let Some(observed) = observable_state(state) else {
            return Ok(());
        };
        if observed == player.last_observed_state && !force {
            return Ok(());
        }
        player.last_observed_state = observed;
        self.events.playback_update(player.playback_info(observed));
        Ok(())
    }

    /// Current info for `id`; unknown ids report `Stopped` without a track.
    pub fn playback_info(&self, id: PlayerId) -> PlaybackInfo {
        match self.registry.get(id) {
            Some(player) => player.playback_info(player.query_state(&self.backend)),
            None => PlaybackInfo {
                player_id: id.to_string(),
                ..Default::default()
            },
        }
    }
}

/// Sniff a file's format and require a pipeline for it.
fn resolve_file_format(table: &PipelineTable, path: &Path) -> Result<String> {
    match resource::sniff_file_format(path) {
        Some(format) if table.supports(format) => Ok(format.to_string()),
        _ => Err(PlayerError::UnsupportedFile),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::PathBuf;

    use tempfile::TempDir;

    use super::*;
    use crate::backend::ChainId;
    use crate::backend::memory::MemoryBackend;
    use crate::events::PlayerEvent;

    pub(crate) struct Harness {
        pub player: AudioPlayer<MemoryBackend>,
        pub backend: MemoryBackend,
        pub updates: crossbeam_channel::Receiver<PlayerEvent>,
        pub dir: TempDir,
    }

    impl Harness {
        pub fn new() -> Self {
            Self::with_config(PlayerConfig::default())
        }

        pub fn with_config(config: PlayerConfig) -> Self {
            let backend = MemoryBackend::new();
            let player = AudioPlayer::new(backend.clone(), config);
            let updates = player.events().subscribe();
            Self {
                player,
                backend,
                updates,
                dir: tempfile::tempdir().unwrap(),
            }
        }

        /// Write a small MPEG file and return its path.
        pub fn mp3(&self, name: &str) -> String {
            self.file(name, b"ID3\x04\x00\x00\x00\x00\x00\x00")
        }

        pub fn file(&self, name: &str, bytes: &[u8]) -> String {
            let path: PathBuf = self.dir.path().join(name);
            std::fs::write(&path, bytes).unwrap();
            path.to_string_lossy().into_owned()
        }

        pub fn chain(&self, id: PlayerId) -> ChainId {
            self.backend.chain_named(&id.to_string()).unwrap()
        }

        /// Drain published updates.
        pub fn drain(&self) -> Vec<PlaybackInfo> {
            self.updates
                .try_iter()
                .map(|event| match event {
                    PlayerEvent::PlaybackUpdate(info) => info,
                })
                .collect()
        }

        /// Start a player on `names` (mp3 files) and settle its first state.
        pub fn start(&mut self, names: &[&str], options: StartOptions) -> PlayerId {
            let first = self.mp3(names[0]);
            let id = self.player.start_playback(&first, None, options).unwrap();
            for name in &names[1..] {
                let path = self.mp3(name);
                assert!(self.player.add_track(id, &path, None, None).unwrap());
            }
            self.player.tick();
            self.drain();
            id
        }
    }
}
