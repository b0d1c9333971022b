//! One playback session: playlist, live chain and state bookkeeping.

use std::fmt;

use audioplayer_types::{PlaybackInfo, PlaybackState, TrackMetadata};
use uuid::Uuid;

use crate::backend::{BackendState, MediaBackend};
use crate::pipeline::{self, ActiveChain};
use crate::playlist::Playlist;

/// Opaque player identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PlayerId(Uuid);

impl PlayerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PlayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for PlayerId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Destruction is two-phase: flag now, free at the next sweep.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lifecycle {
    Active,
    PendingDestroy,
}

/// Map a backend state onto the observable one. `Ready` has no mapping.
pub fn observable_state(state: BackendState) -> Option<PlaybackState> {
    match state {
        BackendState::Null => Some(PlaybackState::Stopped),
        BackendState::Ready => None,
        BackendState::Paused => Some(PlaybackState::Paused),
        BackendState::Playing => Some(PlaybackState::Playing),
    }
}

#[derive(Debug)]
pub struct Player {
    id: PlayerId,
    pub playlist: Playlist,
    pub chain: Option<ActiveChain>,
    pub last_observed_state: PlaybackState,
    pub tags_received: bool,
    /// Tags merged so far for the current track.
    pub pending_metadata: TrackMetadata,
    pub lifecycle: Lifecycle,
}

impl Player {
    pub fn new(max_tracks: usize, volume: u8) -> Self {
        Self {
            id: PlayerId::new(),
            playlist: Playlist::new(max_tracks, volume),
            chain: None,
            last_observed_state: PlaybackState::Stopped,
            tags_received: false,
            pending_metadata: TrackMetadata::default(),
            lifecycle: Lifecycle::Active,
        }
    }

    pub fn id(&self) -> PlayerId {
        self.id
    }

    pub fn is_pending_destroy(&self) -> bool {
        self.lifecycle == Lifecycle::PendingDestroy
    }

    /// Tear down the chain and clear per-chain state. Playlist and identity
    /// survive.
    pub fn reset<B: MediaBackend>(&mut self, backend: &B) {
        if let Some(active) = self.chain.take() {
            pipeline::teardown_chain(backend, &active);
            tracing::debug!(player_id = %self.id, chain = active.chain.0, "chain released");
        }
        self.tags_received = false;
        self.pending_metadata = TrackMetadata::default();
        self.last_observed_state = PlaybackState::Stopped;
    }

    /// Observable state as reported by the backend right now.
    pub fn query_state<B: MediaBackend>(&self, backend: &B) -> PlaybackState {
        self.chain
            .as_ref()
            .and_then(|active| backend.state(active.chain).ok())
            .and_then(observable_state)
            .unwrap_or(PlaybackState::Stopped)
    }

    pub fn playback_info(&self, state: PlaybackState) -> PlaybackInfo {
        PlaybackInfo {
            player_id: self.id.to_string(),
            state,
            duration: self.playlist.duration,
            track: self.playlist.current_track().cloned(),
            metadata: self.playlist.metadata.clone(),
            index: self.playlist.current_index(),
        }
    }
}
