//! Marquee Core
//!
//! Platform-agnostic domain types and collaborator traits for the Marquee
//! protected content player.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Domain Types**: `ContentItem`, `Track`, `Slide`, `MediaCategory`
//! - **Collaborator Traits**: `ContentRepository`, `ActivationCodeValidator`,
//!   `MediaUrlResolver`
//! - **Error Handling**: Unified `CoreError` and `Result` types
//! - **In-memory Catalog**: a JSON-backed implementation of all three traits
//!
//! # Example
//!
//! ```rust
//! use marquee_core::{ContentItem, ContentKind, Track};
//!
//! let playlist = ContentItem::playlist(
//!     "mix-1",
//!     "Morning Mix",
//!     vec![Track::new("t1", "Sunrise", "https://cdn.example/sunrise.mp3")],
//! )
//! .protected();
//!
//! assert_eq!(playlist.kind(), ContentKind::Playlist);
//! assert!(playlist.is_protected);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod catalog;
pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use catalog::Catalog;
pub use error::{CoreError, Result};
pub use traits::{ActivationCodeValidator, CodeVerdict, ContentRepository, MediaUrlResolver};
pub use types::{
    ContentBody, ContentId, ContentItem, ContentKind, MediaCategory, Slide, SlideId, Track,
    TrackId,
};
