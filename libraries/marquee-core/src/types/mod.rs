mod content;
mod ids;
mod media;

pub use content::{ContentBody, ContentItem, ContentKind, Slide, Track};
pub use ids::{ContentId, SlideId, TrackId};
pub use media::MediaCategory;
