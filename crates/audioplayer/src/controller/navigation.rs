//! Playlist movement: advance, retreat, absolute jumps and the end-of-playlist
//! policy.

use super::AudioPlayer;
use crate::backend::{BackendState, MediaBackend};
use crate::error::{PlayerError, Result};
use crate::player::PlayerId;

impl<B: MediaBackend> AudioPlayer<B> {
    /// Move to the next track and play it. At the end of the playlist the
    /// end-of-playlist policy decides. Load failures are logged and yield
    /// `false`.
    pub(crate) fn advance(&mut self, id: PlayerId) -> Result<bool> {
        let next = self.player(id)?.playlist.next_index();
        match next {
            Some(index) => Ok(self.load_or_log(id, index)),
            None => self.end_of_playlist(id),
        }
    }

    /// Without repeat the player is flagged for destruction. With repeat the
    /// playlist restarts at 0, reshuffled first when shuffle is on (the
    /// finished track stays first).
    fn end_of_playlist(&mut self, id: PlayerId) -> Result<bool> {
        let player = self.player_mut(id)?;
        if !player.playlist.repeat {
            self.registry.mark_for_destroy(id);
            tracing::info!(player_id = %id, "end of playlist");
            return Ok(false);
        }
        if player.playlist.shuffle {
            player.playlist.shuffle();
        }
        tracing::info!(player_id = %id, shuffle = player.playlist.shuffle, "playlist restarting");
        Ok(self.load_or_log(id, 0))
    }

    /// Move to the previous track. On the first track nothing happens and
    /// `false` is returned. Load failures are logged and yield `false`.
    pub(crate) fn retreat(&mut self, id: PlayerId) -> Result<bool> {
        let Some(index) = self.player(id)?.playlist.previous_index() else {
            return Ok(false);
        };
        Ok(self.load_or_log(id, index))
    }

    /// Absolute jump. Out-of-range indexes fail before anything changes.
    pub(crate) fn play_at(&mut self, id: PlayerId, index: usize) -> Result<bool> {
        if index >= self.player(id)?.playlist.len() {
            return Err(PlayerError::InvalidTrackIndex(index));
        }
        Ok(self.load_or_log(id, index))
    }

    fn load_or_log(&mut self, id: PlayerId, index: usize) -> bool {
        match self.load_track(id, index, BackendState::Playing) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(player_id = %id, index, error = %err, "unable to load track");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use audioplayer_types::PlaybackState;

    use crate::backend::{BackendState, BusMessage};
    use crate::controller::StartOptions;
    use crate::controller::test_support::Harness;
    use crate::error::PlayerError;

    #[test]
    fn next_moves_through_playlist() {
        let mut h = Harness::new();
        let id = h.start(&["a.mp3", "b.mp3"], StartOptions::default());
        let first_chain = h.chain(id);

        assert!(h.player.play_next_track(id).unwrap());
        let info = h.player.playback_info(id);
        assert_eq!(info.index, Some(1));
        assert!(info.track.unwrap().resource.ends_with("b.mp3"));
        assert_ne!(h.chain(id), first_chain);
        assert_eq!(h.backend.live_chains().len(), 1);

        assert!(!h.player.play_next_track(id).unwrap());
        assert_eq!(h.player.playback_info(id).index, Some(1));
        assert_eq!(h.player.player_count(), 1);
    }

    #[test]
    fn next_failure_is_reported() {
        let mut h = Harness::new();
        let id = h.start(&["a.mp3", "b.mp3"], StartOptions::default());
        h.backend.disable_factory("id3demux");
        assert!(matches!(
            h.player.play_next_track(id),
            Err(PlayerError::NextTrackFailed)
        ));
        assert!(h.backend.live_chains().is_empty());
        assert_eq!(h.backend.live_stage_count(), 0);
    }

    #[test]
    fn next_with_repeat_wraps_to_first_track() {
        let mut h = Harness::new();
        let id = h.start(
            &["a.mp3", "b.mp3"],
            StartOptions {
                repeat: true,
                ..Default::default()
            },
        );
        h.player.play_track(id, 1).unwrap();
        assert!(h.player.play_next_track(id).unwrap());
        assert_eq!(h.player.playback_info(id).index, Some(0));
    }

    #[test]
    fn previous_on_first_track_is_a_no_op() {
        let mut h = Harness::new();
        let id = h.start(&["a.mp3", "b.mp3"], StartOptions::default());
        let chain = h.chain(id);
        assert!(!h.player.play_previous_track(id).unwrap());
        assert_eq!(h.chain(id), chain);
        assert_eq!(h.backend.state_of(chain), Some(BackendState::Playing));

        h.player.play_track(id, 1).unwrap();
        assert!(h.player.play_previous_track(id).unwrap());
        assert_eq!(h.player.playback_info(id).index, Some(0));
    }

    #[test]
    fn previous_load_failure_is_false() {
        let mut h = Harness::new();
        let id = h.start(&["a.mp3", "b.mp3"], StartOptions::default());
        h.player.play_track(id, 1).unwrap();
        h.backend.disable_factory("autoaudiosink");
        assert!(!h.player.play_previous_track(id).unwrap());
        let info = h.player.playback_info(id);
        assert_eq!(info.index, Some(0));
        assert_eq!(info.state, PlaybackState::Stopped);
        assert!(h.backend.live_chains().is_empty());
    }

    #[test]
    fn play_track_out_of_range_changes_nothing() {
        let mut h = Harness::new();
        let id = h.start(&["a.mp3", "b.mp3"], StartOptions::default());
        let chain = h.chain(id);
        assert!(matches!(
            h.player.play_track(id, 2),
            Err(PlayerError::InvalidTrackIndex(2))
        ));
        assert_eq!(h.chain(id), chain);
        assert_eq!(h.player.playback_info(id).index, Some(0));
    }

    #[test]
    fn play_track_load_failure_is_false() {
        let mut h = Harness::new();
        let id = h.start(&["a.mp3", "b.mp3"], StartOptions::default());
        h.backend.disable_factory("filesrc");
        assert!(!h.player.play_track(id, 1).unwrap());
        assert_eq!(h.player.playback_info(id).state, PlaybackState::Stopped);
    }

    #[test]
    fn failed_reload_tells_subscribers_the_player_stopped() {
        let mut h = Harness::new();
        let id = h.start(&["a.mp3", "b.mp3"], StartOptions::default());
        h.backend.disable_factory("filesrc");
        assert!(!h.player.play_track(id, 1).unwrap());
        h.player.tick();
        h.player.tick();

        let updates = h.drain();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].state, PlaybackState::Stopped);
        assert_eq!(updates[0].index, Some(1));
        assert_eq!(h.player.player_count(), 1);
    }

    #[test]
    fn eos_with_failed_next_load_publishes_stopped() {
        let mut h = Harness::new();
        let id = h.start(&["a.mp3", "b.mp3"], StartOptions::default());
        h.backend.disable_factory("mpg123audiodec");
        h.backend.push_message(h.chain(id), BusMessage::Eos);
        h.player.tick();

        let updates = h.drain();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].state, PlaybackState::Stopped);
        assert_eq!(updates[0].index, Some(1));
    }

    #[test]
    fn out_of_range_select_publishes_nothing() {
        let mut h = Harness::new();
        let id = h.start(&["a.mp3"], StartOptions::default());
        assert!(h.player.play_track(id, 5).is_err());
        assert!(h.drain().is_empty());
        assert_eq!(h.player.playback_info(id).state, PlaybackState::Playing);
    }

    #[test]
    fn deferred_file_format_is_filled_on_load() {
        let mut h = Harness::new();
        let id = h.start(&["a.mp3"], StartOptions::default());
        let flac = h.file("b.flac", b"fLaC\x00\x00\x00\x22");
        h.player.add_track(id, &flac, None, None).unwrap();
        assert_eq!(h.player.get_playlist(id).unwrap().tracks[1].audio_format, None);

        assert!(h.player.play_next_track(id).unwrap());
        let snapshot = h.player.get_playlist(id).unwrap();
        assert_eq!(snapshot.tracks[1].audio_format.as_deref(), Some("audio/flac"));
        assert_eq!(h.backend.stage_factories(h.chain(id))[2], "flacparse");
    }

    #[test]
    fn end_of_playlist_without_repeat_flags_until_sweep() {
        let mut h = Harness::new();
        let id = h.start(&["a.mp3"], StartOptions::default());
        h.backend.push_message(h.chain(id), BusMessage::Eos);
        h.player.tick();
        assert_eq!(h.player.player_count(), 0);
        let updates = h.drain();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].state, PlaybackState::Stopped);
    }

    #[test]
    fn end_of_playlist_with_repeat_and_shuffle_keeps_finished_track_first() {
        let mut h = Harness::new();
        let names: Vec<String> = (0..8).map(|i| format!("{i}.mp3")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let id = h.start(
            &refs,
            StartOptions {
                repeat: true,
                shuffle: true,
                ..Default::default()
            },
        );
        h.player.play_track(id, 7).unwrap();
        h.player.tick();
        h.drain();

        h.backend.push_message(h.chain(id), BusMessage::Eos);
        h.player.tick();

        assert_eq!(h.player.player_count(), 1);
        let snapshot = h.player.get_playlist(id).unwrap();
        assert_eq!(snapshot.index, Some(0));
        assert!(snapshot.tracks[0].resource.ends_with("7.mp3"));
        assert_eq!(snapshot.tracks.len(), 8);
        let updates = h.drain();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].state, PlaybackState::Playing);
        assert_eq!(updates[0].index, Some(0));
    }
}
