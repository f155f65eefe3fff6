//! Access sessions and source tickets

use chrono::{DateTime, Utc};
use marquee_core::ContentId;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque identifier, unique per access grant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generate a fresh session ID
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short form keeps log lines readable
        let full = self.0.simple().to_string();
        write!(f, "{}", &full[..8])
    }
}

/// How access to a content item was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessMode {
    /// Content is not protected
    Public,

    /// A valid activation code was supplied
    CodeGranted,

    /// Time-boxed anonymous preview
    Preview,
}

/// One grant of viewing rights to a content item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessSession {
    /// Unique per grant
    pub session_id: SessionId,

    /// Content the grant applies to
    pub content_id: ContentId,

    /// How access was obtained
    pub mode: AccessMode,

    /// When access was granted
    pub granted_at: DateTime<Utc>,
}

impl AccessSession {
    /// Create a new session with a fresh ID
    pub fn new(content_id: ContentId, mode: AccessMode) -> Self {
        Self {
            session_id: SessionId::generate(),
            content_id,
            mode,
            granted_at: Utc::now(),
        }
    }

    /// Whether this is a time-boxed preview
    pub fn is_preview(&self) -> bool {
        self.mode == AccessMode::Preview
    }
}

/// Stamp attached to every loaded source
///
/// The channel echoes the ticket on each status push, so updates can be
/// matched against the source that is *currently* loaded, not merely the
/// session that owns the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceTicket {
    /// Session the source was loaded for
    pub session: SessionId,

    /// Monotonic load counter of the resource
    pub generation: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_ids_are_unique() {
        let a = AccessSession::new(ContentId::new("c"), AccessMode::Public);
        let b = AccessSession::new(ContentId::new("c"), AccessMode::Public);
        assert_ne!(a.session_id, b.session_id);
    }

    #[test]
    fn display_is_short() {
        assert_eq!(SessionId::generate().to_string().len(), 8);
    }

    #[test]
    fn preview_detection() {
        let preview = AccessSession::new(ContentId::new("c"), AccessMode::Preview);
        assert!(preview.is_preview());
        let granted = AccessSession::new(ContentId::new("c"), AccessMode::CodeGranted);
        assert!(!granted.is_preview());
    }
}
