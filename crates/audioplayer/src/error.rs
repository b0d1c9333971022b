//! Error taxonomy for player commands.
//!
//! User-facing failures are returned synchronously and leave state untouched.
//! Backend failures surface as [`PlayerError::Backend`] or, while a chain is
//! being assembled, as [`PlayerError::PipelineConfiguration`].

use crate::backend::BackendError;
use crate::player::PlayerId;

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, PlayerError>;

#[derive(Debug, thiserror::Error)]
pub enum PlayerError {
    #[error("Player \"{0}\" does not exist")]
    UnknownPlayer(PlayerId),

    /// Stream resources cannot be sniffed, so the format must be given.
    #[error("Url resource must have audio_format specified")]
    MissingFormat,

    #[error("Audio format \"{0}\" is not supported")]
    UnsupportedFormat(String),

    /// File content did not match any configured format.
    #[error("Audio file not supported")]
    UnsupportedFile,

    #[error("Resource is invalid (file may not exist)")]
    InvalidResource(String),

    #[error("Track index is invalid")]
    InvalidTrackIndex(usize),

    #[error("You can't remove current track")]
    RemoveCurrentTrack,

    #[error("Volume must be between 1 and 100")]
    InvalidVolume(u8),

    /// A stage could not be created, configured or linked.
    #[error("Error configuring audio player: stage \"{stage}\" ({factory}): {source}")]
    PipelineConfiguration {
        stage: String,
        factory: String,
        #[source]
        source: BackendError,
    },

    #[error("Unable to play resource")]
    PlaybackFailed(#[source] Box<PlayerError>),

    #[error("Error playing next track")]
    NextTrackFailed,

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
}
