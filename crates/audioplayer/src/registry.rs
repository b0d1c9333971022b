//! In-memory player registry.
//!
//! Owns every live player. Players are flagged for destruction at any time
//! and freed only by [`PlayerRegistry::sweep`], which runs once per tick.

use std::collections::HashMap;

use crate::backend::MediaBackend;
use crate::player::{Lifecycle, Player, PlayerId};

#[derive(Debug, Default)]
pub struct PlayerRegistry {
    players: HashMap<PlayerId, Player>,
    /// Creation order.
    order: Vec<PlayerId>,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a stopped player with an empty playlist.
    pub fn create(&mut self, max_tracks: usize, volume: u8) -> PlayerId {
        let player = Player::new(max_tracks, volume);
        let id = player.id();
        self.players.insert(id, player);
        self.order.push(id);
        tracing::debug!(player_id = %id, "player created");
        id
    }

    pub fn get(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn get_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.get_mut(&id)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Player ids, oldest first.
    pub fn ids(&self) -> Vec<PlayerId> {
        self.order.clone()
    }

    pub fn reset<B: MediaBackend>(&mut self, backend: &B, id: PlayerId) {
        if let Some(player) = self.players.get_mut(&id) {
            player.reset(backend);
        }
    }

    /// Flag a player for the next sweep. Idempotent; returns `false` for
    /// unknown ids.
    pub fn mark_for_destroy(&mut self, id: PlayerId) -> bool {
        match self.players.get_mut(&id) {
            Some(player) => {
                if player.lifecycle != Lifecycle::PendingDestroy {
                    player.lifecycle = Lifecycle::PendingDestroy;
                    tracing::debug!(player_id = %id, "player flagged for destruction");
                }
                true
            }
            None => false,
        }
    }

    /// Reset and drop every flagged player. Returns the removed ids.
    pub fn sweep<B: MediaBackend>(&mut self, backend: &B) -> Vec<PlayerId> {
        let flagged: Vec<PlayerId> = self
            .order
            .iter()
            .copied()
            .filter(|id| self.players.get(id).is_some_and(Player::is_pending_destroy))
            .collect();
        for id in &flagged {
            self.destroy_now(backend, *id);
        }
        flagged
    }

    /// Reset and drop a player immediately. Only for the sweep, shutdown and
    /// players whose start failed before any command could see them.
    pub(crate) fn destroy_now<B: MediaBackend>(&mut self, backend: &B, id: PlayerId) {
        if let Some(mut player) = self.players.remove(&id) {
            self.order.retain(|other| *other != id);
            player.reset(backend);
            tracing::info!(player_id = %id, "player destroyed");
        }
    }

    pub fn destroy_all<B: MediaBackend>(&mut self, backend: &B) {
        for id in self.ids() {
            self.destroy_now(backend, id);
        }
    }
}
