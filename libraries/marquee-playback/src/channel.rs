//! Platform-agnostic audio channel trait
//!
//! Abstracts the one physical audio output the platform gives us. The
//! engine never talks to a channel directly: every call goes through
//! `PlaybackResource`, which enforces single ownership.

use crate::error::ChannelError;
use crate::session::SourceTicket;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Platform audio primitive
///
/// Implementors wrap whatever the platform offers (a native player, a
/// browser audio element, a simulated channel in tests). Status is
/// reported asynchronously: either through `poll_status` or by pushing
/// `StatusUpdate`s into the runtime. Each update must carry the ticket
/// given to the `load` call that produced the source.
pub trait AudioChannel: Send {
    /// Load a source, replacing nothing (the resource unloads first)
    ///
    /// # Errors
    /// Returns `ChannelError` if the platform refuses the source outright.
    /// Asynchronous load failures are reported as status with `error` set.
    fn load(&mut self, ticket: SourceTicket, url: &str) -> Result<(), ChannelError>;

    /// Unload the current source and discard any buffered state
    fn unload(&mut self);

    /// Start or resume output
    fn play(&mut self);

    /// Pause output
    fn pause(&mut self);

    /// Seek within the current source
    fn seek(&mut self, position: Duration);

    /// Collect status produced since the last poll
    ///
    /// `elapsed` is the wall-clock time since the previous poll. Platforms
    /// that push status from callbacks can keep the default.
    fn poll_status(&mut self, elapsed: Duration) -> Vec<StatusUpdate> {
        let _ = elapsed;
        Vec::new()
    }
}

/// Raw status snapshot pushed by the platform
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelStatus {
    /// Source finished loading and can be played
    pub is_loaded: bool,

    /// Output is running
    pub is_playing: bool,

    /// Waiting on data
    pub is_buffering: bool,

    /// Current position
    pub position: Duration,

    /// Total duration, once known
    pub duration: Option<Duration>,

    /// Source reached its end since the previous update
    pub did_just_finish: bool,

    /// Load or decode failure
    pub error: Option<String>,
}

impl ChannelStatus {
    /// Status reported once a source has loaded
    pub fn loaded(duration: Duration) -> Self {
        Self {
            is_loaded: true,
            duration: Some(duration),
            ..Self::default()
        }
    }

    /// Status reported while playing
    pub fn playing(position: Duration, duration: Duration) -> Self {
        Self {
            is_loaded: true,
            is_playing: true,
            position,
            duration: Some(duration),
            ..Self::default()
        }
    }

    /// Status reported at natural end of the source
    pub fn finished(duration: Duration) -> Self {
        Self {
            is_loaded: true,
            position: duration,
            duration: Some(duration),
            did_just_finish: true,
            ..Self::default()
        }
    }

    /// Status reported when the source failed to load or decode
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }
}

/// A status snapshot stamped with the source it describes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusUpdate {
    /// Ticket issued when the source was loaded
    pub ticket: SourceTicket,

    /// Snapshot
    pub status: ChannelStatus,
}

impl StatusUpdate {
    /// Stamp a status with its ticket
    pub fn new(ticket: SourceTicket, status: ChannelStatus) -> Self {
        Self { ticket, status }
    }
}
