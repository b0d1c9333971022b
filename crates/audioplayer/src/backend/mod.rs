//! Media backend abstraction.
//!
//! Implementations own the real decode/output machinery. The player only sees
//! opaque chain and stage handles, a state machine and a non-blocking bus.

pub mod memory;

use std::time::Duration;

use thiserror::Error;

/// Handle to a processing chain owned by the backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChainId(pub u64);

/// Handle to one stage inside a chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StageId(pub u64);

/// Backend chain state. `Ready` is a transient waypoint and never observable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendState {
    Null,
    Ready,
    Paused,
    Playing,
}

/// Stage property assignments used by the player.
#[derive(Clone, Debug, PartialEq)]
pub enum StageProperty {
    /// Source location (file path or URL).
    Location(String),
    /// Linear gain, `1.0` is unity.
    Volume(f64),
    /// Progress probe reporting period in seconds.
    UpdateFreq(u32),
    /// Progress probe console output toggle.
    Silent(bool),
}

impl StageProperty {
    /// Property name as known to the backend.
    pub fn key(&self) -> &'static str {
        match self {
            StageProperty::Location(_) => "location",
            StageProperty::Volume(_) => "volume",
            StageProperty::UpdateFreq(_) => "update-freq",
            StageProperty::Silent(_) => "silent",
        }
    }
}

/// Typed tag value carried by a [`BusMessage::Tag`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TagValue {
    Text(String),
    UInt(u32),
    Date { year: i32 },
}

/// Ordered `(tag name, value)` pairs from one tag message.
pub type TagList = Vec<(String, TagValue)>;

/// Asynchronous message popped from a chain bus.
#[derive(Clone, Debug, PartialEq)]
pub enum BusMessage {
    Eos,
    StateChanged {
        old: BackendState,
        new: BackendState,
        pending: Option<BackendState>,
    },
    Error {
        message: String,
        debug: Option<String>,
    },
    Tag(TagList),
    DurationChanged,
    /// Anything the player does not act on (buffering, clock, ...).
    Other(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum BackendError {
    /// No stage factory with this name is available.
    #[error("stage factory {0:?} unavailable")]
    FactoryUnavailable(String),
    #[error("unknown chain {0:?}")]
    UnknownChain(ChainId),
    #[error("unknown stage {0:?}")]
    UnknownStage(StageId),
    #[error("cannot link {from:?} to {to:?}")]
    LinkFailed { from: StageId, to: StageId },
    /// The requested state change was refused.
    #[error("state change refused: {0}")]
    StateChange(String),
}

/// Chain construction, state control and bus access.
///
/// Methods take `&self`; implementations keep their own interior state.
pub trait MediaBackend {
    /// Create an empty chain with the given name.
    fn new_chain(&self, name: &str) -> Result<ChainId, BackendError>;
    /// Instantiate a stage from `factory` and add it to `chain`.
    fn make_stage(
        &self,
        chain: ChainId,
        factory: &str,
        name: &str,
    ) -> Result<StageId, BackendError>;
    fn link(&self, from: StageId, to: StageId) -> Result<(), BackendError>;
    fn unlink(&self, from: StageId, to: StageId) -> Result<(), BackendError>;
    /// Remove a stage from its chain and free it.
    fn remove_stage(&self, chain: ChainId, stage: StageId) -> Result<(), BackendError>;
    /// Free the chain and anything still attached to it.
    fn release_chain(&self, chain: ChainId);
    fn set_state(&self, chain: ChainId, state: BackendState) -> Result<(), BackendError>;
    fn state(&self, chain: ChainId) -> Result<BackendState, BackendError>;
    /// Pop the next bus message without blocking.
    fn pop_message(&self, chain: ChainId) -> Option<BusMessage>;
    fn query_duration(&self, chain: ChainId) -> Option<Duration>;
    fn set_property(&self, stage: StageId, property: StageProperty) -> Result<(), BackendError>;
}
