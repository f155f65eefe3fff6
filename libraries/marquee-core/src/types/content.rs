//! Content domain types: playlists, slideshows and their entries
use crate::types::{ContentId, MediaCategory, SlideId, TrackId};
use serde::{Deserialize, Serialize};

/// Kind of content item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    /// Ordered list of audio tracks
    Playlist,
    /// Ordered list of images, optionally with a soundtrack
    Slideshow,
}

/// A playable track
///
/// `media_url` may be absent, in which case the URL is resolved lazily
/// through a `MediaUrlResolver` when the track becomes current.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    /// Unique track identifier
    pub id: TrackId,

    /// Display title
    pub title: String,

    /// Pre-resolved streamable URL (optional)
    #[serde(default)]
    pub media_url: Option<String>,

    /// MIME type reported by the service, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,

    /// Media category derived from the MIME type
    #[serde(default, alias = "mime_category")]
    pub category: MediaCategory,
}

impl Track {
    /// Create an audio track with a pre-resolved URL
    pub fn new(id: impl Into<String>, title: impl Into<String>, media_url: impl Into<String>) -> Self {
        Self {
            id: TrackId::new(id),
            title: title.into(),
            media_url: Some(media_url.into()),
            mime_type: None,
            category: MediaCategory::Audio,
        }
    }

    /// Create an audio track whose URL must be resolved on demand
    pub fn unresolved(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: TrackId::new(id),
            title: title.into(),
            media_url: None,
            mime_type: None,
            category: MediaCategory::Audio,
        }
    }

    /// Override the media category
    #[must_use]
    pub fn with_category(mut self, category: MediaCategory) -> Self {
        self.category = category;
        self
    }

    /// Set the MIME type and derive the category from it
    #[must_use]
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self.classify();
        self
    }

    /// Re-derive `category` from `mime_type`, if one is set
    pub fn classify(&mut self) {
        if let Some(mime) = &self.mime_type {
            self.category = MediaCategory::from_mime(mime);
        }
    }
}

/// A slideshow image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slide {
    /// Unique slide identifier
    pub id: SlideId,

    /// Image location
    pub image_url: String,

    /// Caption shown under the image
    #[serde(default)]
    pub caption: String,

    /// Position in the slideshow (ascending)
    pub order: u32,
}

impl Slide {
    /// Create a new slide
    pub fn new(id: impl Into<String>, image_url: impl Into<String>, order: u32) -> Self {
        Self {
            id: SlideId::new(id),
            image_url: image_url.into(),
            caption: String::new(),
            order,
        }
    }

    /// Attach a caption
    #[must_use]
    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = caption.into();
        self
    }
}

/// Entries of a content item, by kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContentBody {
    /// Playlist tracks in playback order
    Playlist {
        /// Tracks in playback order
        tracks: Vec<Track>,
    },

    /// Slideshow slides (ordered by `Slide::order`) and optional soundtrack
    Slideshow {
        /// Slides, not necessarily sorted
        slides: Vec<Slide>,
        /// Single background track for the whole slideshow
        #[serde(default)]
        soundtrack: Option<Track>,
    },
}

/// A catalog entry that can be rendered by a player
///
/// Created by the content repository and treated as immutable for the
/// lifetime of a playback session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    /// Unique content identifier
    pub id: ContentId,

    /// Display title
    #[serde(default)]
    pub title: String,

    /// Whether viewing requires an activation code (or a preview)
    #[serde(default)]
    pub is_protected: bool,

    /// Tracks or slides
    #[serde(flatten)]
    pub body: ContentBody,
}

impl ContentItem {
    /// Create an unprotected playlist
    pub fn playlist(id: impl Into<String>, title: impl Into<String>, tracks: Vec<Track>) -> Self {
        Self {
            id: ContentId::new(id),
            title: title.into(),
            is_protected: false,
            body: ContentBody::Playlist { tracks },
        }
    }

    /// Create an unprotected slideshow without soundtrack
    pub fn slideshow(id: impl Into<String>, title: impl Into<String>, slides: Vec<Slide>) -> Self {
        Self {
            id: ContentId::new(id),
            title: title.into(),
            is_protected: false,
            body: ContentBody::Slideshow {
                slides,
                soundtrack: None,
            },
        }
    }

    /// Mark the item as protected
    #[must_use]
    pub fn protected(mut self) -> Self {
        self.is_protected = true;
        self
    }

    /// Attach a soundtrack (ignored for playlists)
    #[must_use]
    pub fn with_soundtrack(mut self, track: Track) -> Self {
        if let ContentBody::Slideshow { soundtrack, .. } = &mut self.body {
            *soundtrack = Some(track);
        }
        self
    }

    /// Kind of this item
    pub fn kind(&self) -> ContentKind {
        match self.body {
            ContentBody::Playlist { .. } => ContentKind::Playlist,
            ContentBody::Slideshow { .. } => ContentKind::Slideshow,
        }
    }

    /// Playlist tracks (empty for slideshows)
    pub fn tracks(&self) -> &[Track] {
        match &self.body {
            ContentBody::Playlist { tracks } => tracks,
            ContentBody::Slideshow { .. } => &[],
        }
    }

    /// Slides sorted by their `order` field (empty for playlists)
    ///
    /// Sorting is stable, so slides sharing an order keep catalog order.
    pub fn slides_in_order(&self) -> Vec<Slide> {
        match &self.body {
            ContentBody::Slideshow { slides, .. } => {
                let mut sorted = slides.clone();
                sorted.sort_by_key(|slide| slide.order);
                sorted
            }
            ContentBody::Playlist { .. } => Vec::new(),
        }
    }

    /// Derive every track's category from its MIME type
    pub fn classify_media(&mut self) {
        match &mut self.body {
            ContentBody::Playlist { tracks } => tracks.iter_mut().for_each(Track::classify),
            ContentBody::Slideshow { soundtrack, .. } => {
                if let Some(track) = soundtrack {
                    track.classify();
                }
            }
        }
    }

    /// Slideshow soundtrack, if any
    pub fn soundtrack(&self) -> Option<&Track> {
        match &self.body {
            ContentBody::Slideshow { soundtrack, .. } => soundtrack.as_ref(),
            ContentBody::Playlist { .. } => None,
        }
    }

    /// Number of tracks or slides
    pub fn len(&self) -> usize {
        match &self.body {
            ContentBody::Playlist { tracks } => tracks.len(),
            ContentBody::Slideshow { slides, .. } => slides.len(),
        }
    }

    /// Whether the item has no tracks or slides
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
