//! Multi-player audio playback engine.
//!
//! Each player owns a playlist and at most one processing chain built on an
//! abstract [`backend::MediaBackend`]. Commands run through
//! [`controller::AudioPlayer`]; backend bus messages are folded into playback
//! updates once per [`controller::AudioPlayer::tick`].

pub mod backend;
pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod metadata;
pub mod pipeline;
pub mod player;
pub mod playlist;
pub mod registry;
pub mod resource;

pub use audioplayer_types::{PlaybackInfo, PlaybackState, PlaylistSnapshot, Track, TrackMetadata};
pub use controller::{AudioPlayer, PauseOptions, StartOptions};
pub use error::{PlayerError, Result};
pub use player::PlayerId;
