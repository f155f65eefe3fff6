//! In-memory catalog
//!
//! A JSON-backed stand-in for the REST service. It implements all three
//! collaborator traits so the engine can run headless (CLI, tests).
//!
//! ```json
//! {
//!   "items": [ { "id": "mix", "kind": "playlist", "tracks": [] } ],
//!   "activation_codes": { "mix": ["MIX2024"] },
//!   "media_urls": { "t1": "https://cdn.example/t1.mp3" }
//! }
//! ```

use crate::error::{CoreError, Result};
use crate::traits::{ActivationCodeValidator, CodeVerdict, ContentRepository, MediaUrlResolver};
use crate::types::{ContentId, ContentItem, TrackId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// JSON-backed catalog of content, activation codes and media URLs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    /// Content items
    #[serde(default)]
    pub items: Vec<ContentItem>,

    /// Valid activation codes per content item
    #[serde(default)]
    pub activation_codes: HashMap<ContentId, Vec<String>>,

    /// Resolver table for tracks without a pre-resolved URL
    #[serde(default)]
    pub media_urls: HashMap<TrackId, String>,
}

impl Catalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a catalog from a JSON string
    ///
    /// Tracks carrying a `mime_type` get their category derived from it.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let mut catalog: Self = serde_json::from_str(json)?;
        catalog.items.iter_mut().for_each(ContentItem::classify_media);
        Ok(catalog)
    }

    /// Load a catalog from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let catalog = Self::from_json_str(&raw)?;
        tracing::debug!(
            path = %path.as_ref().display(),
            items = catalog.items.len(),
            "Catalog loaded"
        );
        Ok(catalog)
    }

    /// Add or replace a content item
    pub fn insert(&mut self, mut item: ContentItem) {
        item.classify_media();
        self.items.retain(|existing| existing.id != item.id);
        self.items.push(item);
    }

    /// Register an activation code for a content item
    pub fn add_activation_code(&mut self, content_id: ContentId, code: impl Into<String>) {
        self.activation_codes
            .entry(content_id)
            .or_default()
            .push(code.into());
    }

    /// Register a resolvable URL for a track
    pub fn set_media_url(&mut self, track_id: TrackId, url: impl Into<String>) {
        self.media_urls.insert(track_id, url.into());
    }

    /// Look up a content item
    pub fn get(&self, id: &ContentId) -> Option<&ContentItem> {
        self.items.iter().find(|item| &item.id == id)
    }

    fn find_track_url(&self, track_id: &TrackId) -> Option<String> {
        if let Some(url) = self.media_urls.get(track_id) {
            return Some(url.clone());
        }

        self.items.iter().find_map(|item| {
            item.tracks()
                .iter()
                .chain(item.soundtrack())
                .find(|track| &track.id == track_id)
                .and_then(|track| track.media_url.clone())
        })
    }
}

#[async_trait]
impl ContentRepository for Catalog {
    async fn fetch(&self, id: &ContentId) -> Result<ContentItem> {
        self.get(id)
            .cloned()
            .ok_or_else(|| CoreError::ContentNotFound(id.clone()))
    }
}

#[async_trait]
impl ActivationCodeValidator for Catalog {
    async fn validate(&self, code: &str, content_id: &ContentId) -> Result<CodeVerdict> {
        if self.get(content_id).is_none() {
            return Err(CoreError::ContentNotFound(content_id.clone()));
        }

        let accepted = self
            .activation_codes
            .get(content_id)
            .is_some_and(|codes| codes.iter().any(|valid| valid == code));

        Ok(if accepted {
            CodeVerdict::Accepted
        } else {
            CodeVerdict::Rejected
        })
    }
}

#[async_trait]
impl MediaUrlResolver for Catalog {
    async fn resolve(&self, track_id: &TrackId) -> Result<String> {
        self.find_track_url(track_id)
            .ok_or_else(|| CoreError::MediaUrlNotFound(track_id.clone()))
    }
}
