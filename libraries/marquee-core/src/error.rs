//! Core error types for Marquee
use crate::types::{ContentId, TrackId};
use thiserror::Error;

/// Result type alias using `CoreError`
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core error type shared by the collaborator traits
#[derive(Error, Debug)]
pub enum CoreError {
    /// Entity not found
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Content item not found
    #[error("Content not found: {0}")]
    ContentNotFound(ContentId),

    /// No streamable URL could be resolved for a track
    #[error("No media URL for track: {0}")]
    MediaUrlNotFound(TrackId),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Network / transport error
    #[error("Network error: {0}")]
    Network(String),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl CoreError {
    /// Create a not found error
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a network error
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// Whether this error came from the transport rather than the data
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Io(_))
    }
}
