//! Public player commands.

use std::path::Path;

use audioplayer_types::{PlaybackInfo, PlaybackState, PlaylistSnapshot, Track};

use super::{AudioPlayer, PauseOptions, StartOptions, resolve_file_format};
use crate::backend::{BackendState, MediaBackend, StageProperty};
use crate::error::{PlayerError, Result};
use crate::pipeline::volume_gain;
use crate::player::{PlayerId, observable_state};
use crate::playlist::validate_volume;

impl<B: MediaBackend> AudioPlayer<B> {
    /// Create a player and start playing `resource`.
    ///
    /// Stream resources need `audio_format`; files are sniffed when it is
    /// omitted. If the chain cannot be built the new player is destroyed
    /// before returning [`PlayerError::PlaybackFailed`].
    pub fn start_playback(
        &mut self,
        resource: &str,
        audio_format: Option<&str>,
        options: StartOptions,
    ) -> Result<PlayerId> {
        let volume = validate_volume(options.volume.unwrap_or(self.config.default_volume))?;
        let mut track = self.make_track(resource, audio_format)?;
        if track.audio_format.is_none() {
            track.audio_format = Some(resolve_file_format(
                &self.config.pipelines,
                Path::new(resource),
            )?);
        }

        let id = self
            .registry
            .create(self.config.max_playlist_tracks, volume);
        if let Some(player) = self.registry.get_mut(id) {
            player.playlist.repeat = options.repeat;
            player.playlist.shuffle = options.shuffle;
            player.playlist.add(track, None);
        }

        let target = if options.paused {
            BackendState::Paused
        } else {
            BackendState::Playing
        };
        if let Err(err) = self.load_track(id, 0, target) {
            tracing::error!(player_id = %id, resource, error = %err, "unable to start playback");
            self.registry.destroy_now(&self.backend, id);
            return Err(PlayerError::PlaybackFailed(Box::new(err)));
        }
        tracing::info!(player_id = %id, resource, "player started");
        Ok(id)
    }

    /// Insert a track at `index` (append when `None`). Returns `false` when
    /// the playlist is full.
    pub fn add_track(
        &mut self,
        id: PlayerId,
        resource: &str,
        audio_format: Option<&str>,
        index: Option<usize>,
    ) -> Result<bool> {
        self.player(id)?;
        let track = self.make_track(resource, audio_format)?;
        let player = self.player_mut(id)?;
        let added = player.playlist.add(track, index);
        if added {
            tracing::info!(player_id = %id, resource, position = ?index, "track added");
        } else {
            tracing::warn!(player_id = %id, resource, "playlist limit reached");
        }
        Ok(added)
    }

    /// Append tracks until the playlist is full. Every track is validated
    /// before any is added. Returns how many were added.
    pub fn add_tracks(&mut self, id: PlayerId, tracks: Vec<Track>) -> Result<usize> {
        self.player(id)?;
        let tracks = tracks
            .iter()
            .map(|track| self.make_track(&track.resource, track.audio_format.as_deref()))
            .collect::<Result<Vec<_>>>()?;
        let requested = tracks.len();
        let player = self.player_mut(id)?;
        let mut added = 0;
        for track in tracks {
            if !player.playlist.add(track, None) {
                break;
            }
            added += 1;
        }
        if added < requested {
            tracing::warn!(
                player_id = %id,
                added,
                requested,
                "all tracks were not added (playlist limit reached)"
            );
        }
        Ok(added)
    }

    pub fn remove_track(&mut self, id: PlayerId, index: usize) -> Result<()> {
        let player = self.player_mut(id)?;
        let removed = player.playlist.remove(index)?;
        tracing::info!(player_id = %id, index, resource = %removed.resource, "track removed");
        Ok(())
    }

    /// Toggle between playing and paused, or force one side. Returns the
    /// requested state.
    pub fn pause_playback(&mut self, id: PlayerId, options: PauseOptions) -> Result<PlaybackState> {
        if let Some(volume) = options.volume {
            self.set_volume(id, volume)?;
        }
        let player = self.player(id)?;
        let Some(chain) = player.chain.as_ref().map(|active| active.chain) else {
            return Ok(PlaybackState::Stopped);
        };
        let current = self.backend.state(chain)?;
        let target = if options.force_pause {
            BackendState::Paused
        } else if options.force_play {
            BackendState::Playing
        } else if current == BackendState::Playing {
            BackendState::Paused
        } else {
            BackendState::Playing
        };
        self.backend.set_state(chain, target)?;
        tracing::info!(player_id = %id, state = ?target, "pause toggled");
        Ok(observable_state(target).unwrap_or_default())
    }

    /// Stop the chain now, notify `Stopped` and free the player at the next
    /// tick.
    pub fn stop_playback(&mut self, id: PlayerId) -> Result<()> {
        let player = self
            .registry
            .get_mut(id)
            .ok_or(PlayerError::UnknownPlayer(id))?;
        if let Some(active) = &player.chain {
            self.backend.set_state(active.chain, BackendState::Null)?;
        }
        player.last_observed_state = PlaybackState::Stopped;
        let info = player.playback_info(PlaybackState::Stopped);
        self.registry.mark_for_destroy(id);
        self.events.playback_update(info);
        tracing::info!(player_id = %id, "playback stopped");
        Ok(())
    }

    /// Play the next track. Returns `false` at the end of a non-repeating
    /// playlist.
    pub fn play_next_track(&mut self, id: PlayerId) -> Result<bool> {
        let playlist = &self.player(id)?.playlist;
        if playlist.next_index().is_none() && !playlist.repeat {
            tracing::info!(player_id = %id, "no next track");
            return Ok(false);
        }
        if self.advance(id)? {
            Ok(true)
        } else {
            Err(PlayerError::NextTrackFailed)
        }
    }

    /// Play the previous track. Returns `false` on the first track or when
    /// the track fails to load.
    pub fn play_previous_track(&mut self, id: PlayerId) -> Result<bool> {
        self.retreat(id)
    }

    /// Jump to `index`. Out-of-range indexes fail without touching the
    /// player; a track that fails to load yields `false`.
    pub fn play_track(&mut self, id: PlayerId, index: usize) -> Result<bool> {
        self.play_at(id, index)
    }

    pub fn set_volume(&mut self, id: PlayerId, volume: u8) -> Result<()> {
        let volume = validate_volume(volume)?;
        let player = self
            .registry
            .get_mut(id)
            .ok_or(PlayerError::UnknownPlayer(id))?;
        if let Some(active) = &player.chain {
            self.backend
                .set_property(active.volume, StageProperty::Volume(volume_gain(volume)))?;
        }
        player.playlist.set_volume(volume)?;
        tracing::info!(player_id = %id, volume, "volume set");
        Ok(())
    }

    pub fn set_repeat(&mut self, id: PlayerId, repeat: bool, shuffle: bool) -> Result<()> {
        let player = self.player_mut(id)?;
        player.playlist.repeat = repeat;
        player.playlist.shuffle = shuffle;
        tracing::info!(player_id = %id, repeat, shuffle, "repeat mode set");
        Ok(())
    }

    /// Shuffle the playlist; the current track moves to the front.
    pub fn shuffle_playlist(&mut self, id: PlayerId) -> Result<()> {
        self.player_mut(id)?.playlist.shuffle();
        tracing::info!(player_id = %id, "playlist shuffled");
        Ok(())
    }

    /// Info for every live player, oldest first.
    pub fn get_players(&self) -> Vec<PlaybackInfo> {
        self.registry
            .ids()
            .into_iter()
            .map(|id| self.playback_info(id))
            .collect()
    }

    pub fn get_playlist(&self, id: PlayerId) -> Result<PlaylistSnapshot> {
        Ok(self.player(id)?.playlist.snapshot())
    }

    /// Destroy every player.
    pub fn shutdown(&mut self) {
        let count = self.registry.len();
        self.registry.destroy_all(&self.backend);
        tracing::info!(players = count, "audio player shut down");
    }
}
