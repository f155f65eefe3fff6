//! Error types for the playback engine

use crate::session::SessionId;
use crate::AccessState;
use marquee_core::{CoreError, MediaCategory, TrackId};
use thiserror::Error;

/// Failure reported by the platform audio primitive
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Channel error: {0}")]
pub struct ChannelError(pub String);

impl ChannelError {
    /// Create a channel error
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// Errors from the playback resource arbiter
///
/// These never reach the UI: controllers translate `NotOwner` into a
/// superseded session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceError {
    /// The caller's session does not hold the channel
    #[error("Session {session} does not own the playback channel")]
    NotOwner {
        /// Session that attempted the operation
        session: SessionId,
        /// Current owner, if any
        owner: Option<SessionId>,
    },

    /// Transport operation with no source loaded
    #[error("No media source loaded")]
    NoSource,

    /// Platform failed to load the source
    #[error(transparent)]
    Channel(#[from] ChannelError),
}

/// Access gate errors
#[derive(Debug, Error)]
pub enum AccessError {
    /// Submitted activation code was empty after trimming
    #[error("Activation code is empty")]
    EmptyCode,

    /// Preview requested with a zero duration
    #[error("Preview duration must be at least one second")]
    InvalidPreviewDuration,

    /// Operation not allowed in the current state
    #[error("Cannot {operation} while {state:?}")]
    InvalidTransition {
        /// Attempted operation
        operation: &'static str,
        /// State the gate was in
        state: AccessState,
    },
}

/// Playback errors surfaced to the user
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// Current track has not finished loading
    #[error("Track is not ready yet")]
    NotReady,

    /// Current item cannot be played by the audio channel
    #[error("Track {track_id} is {} and cannot be played", .category.label())]
    UnsupportedMedia {
        /// Offending track
        track_id: TrackId,
        /// Its media category
        category: MediaCategory,
    },

    /// Content has no tracks or slides
    #[error("Nothing to play")]
    NoContent,

    /// Slideshow interval of zero
    #[error("Slideshow interval must be greater than zero")]
    InvalidInterval,

    /// Access was not granted for this operation
    #[error("Playback is locked")]
    Locked,
}

/// Errors returned by the engine runtime handle
#[derive(Debug, Error)]
pub enum EngineError {
    /// Unknown or unmounted player view
    #[error("Player view {0} is not mounted")]
    ViewNotFound(u64),

    /// Runtime has shut down
    #[error("Engine runtime is not running")]
    Closed,

    /// Collaborator failure (content lookup, validation transport, URL resolution)
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Access gate rejected the request
    #[error(transparent)]
    Access(#[from] AccessError),

    /// Playback rejected the request
    #[error(transparent)]
    Playback(#[from] PlaybackError),
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;
