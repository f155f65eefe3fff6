//! Engine Events
//!
//! Event-based communication for UI synchronization. Components queue
//! events as they change state; the owner drains them after each call:
//! - Access state transitions (locked, validating, granted, ...)
//! - Transport changes (play/pause, track index)
//! - Preview countdown ticks and expiry
//! - Slide changes and media errors

use crate::gate::AccessState;
use crate::session::SessionId;
use marquee_core::{ContentId, TrackId};
use serde::{Deserialize, Serialize};

/// Why a session stopped holding the playback channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// Preview countdown reached zero
    Expired,
    /// Preview cancelled by the visitor
    Cancelled,
    /// Player view unmounted
    Unmounted,
    /// Another session took the channel
    Superseded,
}

/// Events emitted by the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EngineEvent {
    /// Access gate changed state
    AccessStateChanged {
        /// Content the gate guards
        content_id: ContentId,
        /// New state
        state: AccessState,
        /// Denial reason, for `Denied`
        reason: Option<String>,
    },

    /// Play/pause flag or current track changed
    PlaybackStateChanged {
        /// Session holding the channel
        session: SessionId,
        /// Output running
        is_playing: bool,
        /// Current track index
        track_index: usize,
    },

    /// Current track reached its end naturally
    TrackFinished {
        /// Session the track played under
        session: SessionId,
        /// Finished track
        track_id: TrackId,
    },

    /// One second of preview elapsed
    PreviewTick {
        /// Previewed content
        content_id: ContentId,
        /// Seconds left
        remaining_seconds: u32,
    },

    /// Preview ran out; surrounding navigation should redirect
    PreviewExpired {
        /// Previewed content
        content_id: ContentId,
    },

    /// Visible slide changed
    SlideChanged {
        /// Slideshow session
        session: SessionId,
        /// New slide index
        slide_index: usize,
        /// Whether autoplay is still running
        autoplay: bool,
    },

    /// A track could not be played
    MediaError {
        /// Session the track belongs to
        session: SessionId,
        /// Offending track
        track_id: TrackId,
        /// Human readable reason
        message: String,
    },

    /// A session stopped holding the channel
    SessionEnded {
        /// Ended session
        session: SessionId,
        /// Why it ended
        reason: EndReason,
    },
}

impl EngineEvent {
    /// Session the event refers to, if any
    pub fn session(&self) -> Option<SessionId> {
        match self {
            EngineEvent::PlaybackStateChanged { session, .. }
            | EngineEvent::TrackFinished { session, .. }
            | EngineEvent::SlideChanged { session, .. }
            | EngineEvent::MediaError { session, .. }
            | EngineEvent::SessionEnded { session, .. } => Some(*session),
            EngineEvent::AccessStateChanged { .. }
            | EngineEvent::PreviewTick { .. }
            | EngineEvent::PreviewExpired { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_accessor() {
        let session = SessionId::generate();
        let event = EngineEvent::SessionEnded {
            session,
            reason: EndReason::Superseded,
        };
        assert_eq!(event.session(), Some(session));

        let tick = EngineEvent::PreviewTick {
            content_id: ContentId::new("c"),
            remaining_seconds: 3,
        };
        assert_eq!(tick.session(), None);
    }

    #[test]
    fn events_serialize_for_ui_bridges() {
        let event = EngineEvent::AccessStateChanged {
            content_id: ContentId::new("show"),
            state: AccessState::Denied,
            reason: Some("Invalid activation code".to_string()),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("AccessStateChanged"));
        assert!(json.contains("Denied"));
    }
}
