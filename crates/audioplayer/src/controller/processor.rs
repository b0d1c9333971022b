//! Per-tick bus processing.
//!
//! Each tick drains every player's bus, folds the messages into state and
//! notifications, then sweeps players flagged for destruction.

use super::AudioPlayer;
use crate::backend::{BackendState, BusMessage, MediaBackend, TagList};
use crate::error::{PlayerError, Result};
use crate::metadata;
use crate::player::PlayerId;

impl<B: MediaBackend> AudioPlayer<B> {
    /// Run one processing cycle. Call periodically from the host loop.
    pub fn tick(&mut self) {
        for id in self.registry.ids() {
            if let Err(err) = self.drain_player(id) {
                tracing::error!(player_id = %id, error = %err, "failed to process player messages");
            }
        }
        let removed = self.registry.sweep(&self.backend);
        if !removed.is_empty() {
            tracing::debug!(count = removed.len(), "swept players");
        }
    }

    fn drain_player(&mut self, id: PlayerId) -> Result<()> {
        loop {
            let Some(chain) = self
                .registry
                .get(id)
                .and_then(|player| player.chain.as_ref())
                .map(|active| active.chain)
            else {
                return Ok(());
            };
            let Some(message) = self.backend.pop_message(chain) else {
                return Ok(());
            };
            self.dispatch(id, message)?;
        }
    }

    fn dispatch(&mut self, id: PlayerId, message: BusMessage) -> Result<()> {
        match message {
            BusMessage::Eos => {
                tracing::info!(player_id = %id, "end of stream");
                self.stop_chain(id)?;
                self.advance(id)?;
                self.emit_playback_state(id, false)
            }
            BusMessage::StateChanged { old, new, pending } => {
                tracing::trace!(player_id = %id, ?old, ?new, ?pending, "state changed");
                self.emit_playback_state(id, false)
            }
            BusMessage::Error { message, debug: details } => {
                self.stop_chain(id)?;
                tracing::error!(
                    player_id = %id,
                    error = %message,
                    debug = details.as_deref().unwrap_or_default(),
                    "playback error"
                );
                self.emit_playback_state(id, false)
            }
            BusMessage::Tag(tags) => self.on_tags(id, &tags),
            BusMessage::DurationChanged => self.on_duration_changed(id),
            BusMessage::Other(kind) => {
                tracing::trace!(player_id = %id, kind = %kind, "ignored bus message");
                Ok(())
            }
        }
    }

    fn stop_chain(&mut self, id: PlayerId) -> Result<()> {
        if let Some(active) = &self.player(id)?.chain {
            self.backend.set_state(active.chain, BackendState::Null)?;
        }
        Ok(())
    }

    fn on_tags(&mut self, id: PlayerId, tags: &TagList) -> Result<()> {
        let player = self
            .registry
            .get_mut(id)
            .ok_or(PlayerError::UnknownPlayer(id))?;
        if player.tags_received {
            return Ok(());
        }
        metadata::merge_tags(&mut player.pending_metadata, tags);
        if !metadata::is_complete(&player.pending_metadata) {
            return Ok(());
        }
        player.playlist.metadata = Some(player.pending_metadata.clone());
        player.tags_received = true;
        tracing::debug!(player_id = %id, "track metadata complete");
        self.emit_playback_state(id, true)
    }

    fn on_duration_changed(&mut self, id: PlayerId) -> Result<()> {
        let player = self
            .registry
            .get_mut(id)
            .ok_or(PlayerError::UnknownPlayer(id))?;
        let Some(active) = &player.chain else {
            return Ok(());
        };
        let Some(duration) = self.backend.query_duration(active.chain) else {
            return Ok(());
        };
        player.playlist.duration = Some(duration.as_secs());
        self.emit_playback_state(id, false)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use audioplayer_types::{PlaybackState, TrackNumber};

    use crate::backend::{BackendState, BusMessage, MediaBackend, TagValue};
    use crate::controller::test_support::Harness;
    use crate::controller::{PauseOptions, StartOptions};

    fn tag(name: &str, value: TagValue) -> (String, TagValue) {
        (name.to_string(), value)
    }

    #[test]
    fn identical_states_are_published_once() {
        let mut h = Harness::new();
        let id = h.start(&["a.mp3"], StartOptions::default());
        let chain = h.chain(id);
        for _ in 0..3 {
            h.backend.push_message(
                chain,
                BusMessage::StateChanged {
                    old: BackendState::Paused,
                    new: BackendState::Playing,
                    pending: None,
                },
            );
        }
        h.player.tick();
        assert!(h.drain().is_empty());
    }

    #[test]
    fn ready_state_is_never_published() {
        let mut h = Harness::new();
        let id = h.start(&["a.mp3"], StartOptions::default());
        let chain = h.chain(id);
        h.backend.set_state(chain, BackendState::Ready).unwrap();
        h.player.tick();
        assert!(h.drain().is_empty());

        h.player
            .pause_playback(id, PauseOptions { force_pause: true, ..Default::default() })
            .unwrap();
        h.player.tick();
        let updates = h.drain();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].state, PlaybackState::Paused);
    }

    #[test]
    fn eos_advances_to_next_track() {
        let mut h = Harness::new();
        let id = h.start(&["a.mp3", "b.mp3"], StartOptions::default());
        h.backend.push_message(h.chain(id), BusMessage::Eos);
        h.player.tick();

        let updates = h.drain();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].state, PlaybackState::Playing);
        assert_eq!(updates[0].index, Some(1));
        assert_eq!(h.backend.live_chains().len(), 1);
        assert_eq!(h.player.player_count(), 1);
    }

    #[test]
    fn error_stops_player_but_keeps_it() {
        let mut h = Harness::new();
        let id = h.start(&["a.mp3"], StartOptions::default());
        let chain = h.chain(id);
        h.backend.push_message(
            chain,
            BusMessage::Error {
                message: "decoder failed".into(),
                debug: Some("mpg123: bad frame".into()),
            },
        );
        h.player.tick();

        assert_eq!(h.backend.state_of(chain), Some(BackendState::Null));
        let updates = h.drain();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].state, PlaybackState::Stopped);
        assert_eq!(h.player.player_count(), 1);
    }

    #[test]
    fn tags_publish_once_when_complete() {
        let mut h = Harness::new();
        let id = h.start(&["a.mp3"], StartOptions::default());
        let chain = h.chain(id);
        h.backend.push_message(
            chain,
            BusMessage::Tag(vec![
                tag("title", TagValue::Text("Blue in Green".into())),
                tag("track-number", TagValue::UInt(3)),
            ]),
        );
        h.player.tick();
        assert!(h.drain().is_empty());

        h.backend
            .push_message(chain, BusMessage::Tag(vec![tag("bitrate", TagValue::UInt(256_000))]));
        h.backend
            .push_message(chain, BusMessage::Tag(vec![tag("title", TagValue::Text("Other".into()))]));
        h.player.tick();

        let updates = h.drain();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].state, PlaybackState::Playing);
        let metadata = updates[0].metadata.clone().unwrap();
        assert_eq!(metadata.title.as_deref(), Some("Blue in Green"));
        assert_eq!(metadata.track, Some(TrackNumber::Number(3)));
        assert_eq!(metadata.bitrate_avg, Some(256_000));
        assert_eq!(h.player.playback_info(id).metadata, Some(metadata));
    }

    #[test]
    fn duration_is_stored_in_whole_seconds() {
        let mut h = Harness::new();
        let id = h.start(&["a.mp3"], StartOptions::default());
        let chain = h.chain(id);
        h.backend.push_message(chain, BusMessage::DurationChanged);
        h.player.tick();
        assert_eq!(h.player.playback_info(id).duration, None);

        h.backend.set_duration(chain, Duration::from_millis(187_900));
        h.backend.push_message(chain, BusMessage::DurationChanged);
        h.player.tick();
        assert_eq!(h.player.playback_info(id).duration, Some(187));
        assert!(h.drain().is_empty());
    }

    #[test]
    fn other_messages_are_ignored() {
        let mut h = Harness::new();
        let id = h.start(&["a.mp3"], StartOptions::default());
        h.backend
            .push_message(h.chain(id), BusMessage::Other("buffering".into()));
        h.player.tick();
        assert!(h.drain().is_empty());
    }

    #[test]
    fn players_are_processed_independently() {
        let mut h = Harness::new();
        let first = h.start(&["a.mp3"], StartOptions::default());
        let second = h.start(&["b.mp3", "c.mp3"], StartOptions::default());
        h.backend.push_message(h.chain(first), BusMessage::Eos);
        h.backend.push_message(h.chain(second), BusMessage::Eos);
        h.player.tick();

        assert_eq!(h.player.player_count(), 1);
        assert_eq!(h.player.playback_info(second).index, Some(1));
        let updates = h.drain();
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0].player_id, first.to_string());
        assert_eq!(updates[0].state, PlaybackState::Stopped);
        assert_eq!(updates[1].player_id, second.to_string());
        assert_eq!(updates[1].state, PlaybackState::Playing);
    }

    #[test]
    fn failing_player_does_not_block_others() {
        let mut h = Harness::new();
        let broken = h.start(&["a.mp3", "b.mp3"], StartOptions::default());
        let healthy = h.start(&["c.mp3", "d.mp3"], StartOptions::default());
        let broken_chain = h.chain(broken);
        h.backend.freeze_chain(broken_chain);
        h.backend.push_message(broken_chain, BusMessage::Eos);
        h.backend.push_message(h.chain(healthy), BusMessage::Eos);
        h.player.tick();

        assert_eq!(h.player.playback_info(broken).index, Some(0));
        assert_eq!(h.player.playback_info(healthy).index, Some(1));
        let updates = h.drain();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].player_id, healthy.to_string());
    }
}
