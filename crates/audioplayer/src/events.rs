//! In-process event bus for playback updates.
//!
//! Every subscriber gets its own unbounded channel; disconnected subscribers
//! are dropped on the next publish.

use std::sync::{Arc, Mutex};

use audioplayer_types::PlaybackInfo;
use crossbeam_channel::{Receiver, Sender, unbounded};
use serde::Serialize;

/// Outbound events published by the player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum PlayerEvent {
    PlaybackUpdate(PlaybackInfo),
}

#[derive(Clone, Default)]
pub struct EventBus {
    subscribers: Arc<Mutex<Vec<Sender<PlayerEvent>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to events published from now on.
    pub fn subscribe(&self) -> Receiver<PlayerEvent> {
        let (tx, rx) = unbounded();
        self.subscribers
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .push(tx);
        rx
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .map(|subs| subs.len())
            .unwrap_or_default()
    }

    /// Notify subscribers of a player's observable state.
    pub fn playback_update(&self, info: PlaybackInfo) {
        tracing::debug!(
            player_id = %info.player_id,
            state = %info.state,
            index = ?info.index,
            "playback update"
        );
        self.publish(PlayerEvent::PlaybackUpdate(info));
    }

    fn publish(&self, event: PlayerEvent) {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(|err| err.into_inner());
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}
