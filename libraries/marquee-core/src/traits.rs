//! Collaborator traits consumed by the playback engine
//!
//! These abstract the REST service: the engine never performs transport
//! itself, it only awaits these calls.
use crate::error::Result;
use crate::types::{ContentId, ContentItem, TrackId};
use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

/// Outcome of an activation code check that reached the service
///
/// Transport failures are reported as `Err(CoreError::Network)` instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeVerdict {
    /// Code unlocks the content
    Accepted,
    /// Code is unknown, expired or for another item
    Rejected,
}

/// Content lookup (playlist or slideshow)
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ContentRepository: Send + Sync {
    /// Fetch a content item by ID
    ///
    /// # Errors
    /// Returns `CoreError::ContentNotFound` if the item does not exist
    async fn fetch(&self, id: &ContentId) -> Result<ContentItem>;
}

/// Activation code validation
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ActivationCodeValidator: Send + Sync {
    /// Validate `code` for `content_id`
    ///
    /// `code` is already trimmed and non-empty.
    async fn validate(&self, code: &str, content_id: &ContentId) -> Result<CodeVerdict>;
}

/// Track URL resolution for tracks without a pre-resolved URL
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MediaUrlResolver: Send + Sync {
    /// Resolve a streamable URL for `track_id`
    async fn resolve(&self, track_id: &TrackId) -> Result<String>;
}
