//! Marquee - Protected Content Playback
//!
//! Platform-agnostic engine that decides whether a visitor may render a
//! playlist or slideshow and then drives playback on the one audio
//! channel the platform provides.
//!
//! This crate provides:
//! - Access gating (public, activation code, time-boxed preview)
//! - A one-second preview countdown that expires exactly once
//! - Single-owner arbitration of the audio channel across player views
//! - Playlist navigation and transport (wraparound, loop/stop policy)
//! - Slideshow autoplay with a once-per-session soundtrack
//! - Ticket-stamped status synchronization that drops stale updates
//!
//! # Architecture
//!
//! Components are plain state machines that queue `EngineEvent`s and are
//! handed the `PlaybackResource` by `&mut` on every call; nothing reaches
//! the channel through global state. `EngineRuntime` hosts them in a
//! single tokio task and is the only place where time passes or network
//! calls are awaited.
//!
//! Platform audio output is provided through the `AudioChannel` trait.
//!
//! # Example: Unprotected Playlist
//!
//! ```rust
//! use marquee_core::{ContentItem, Track};
//! use marquee_playback::{
//!     AccessState, ContentPlayer, EngineConfig, PlaybackResource, SimulatedChannel,
//! };
//! use std::sync::Arc;
//!
//! let mut resource = PlaybackResource::new(Box::new(SimulatedChannel::new()));
//! let playlist = ContentItem::playlist(
//!     "mix",
//!     "Morning Mix",
//!     vec![Track::new("t1", "Sunrise", "sunrise.mp3")],
//! );
//!
//! let mut player = ContentPlayer::new(Arc::new(playlist), EngineConfig::default());
//! assert_eq!(player.evaluate(&mut resource), AccessState::Granted);
//! assert_eq!(resource.loaded_url(), Some("sunrise.mp3"));
//! ```
//!
//! # Example: Preview Countdown
//!
//! ```rust
//! use marquee_core::{ContentItem, Slide};
//! use marquee_playback::{
//!     AccessState, ContentPlayer, EngineConfig, PlaybackResource, SimulatedChannel,
//! };
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let mut resource = PlaybackResource::new(Box::new(SimulatedChannel::new()));
//! let show = ContentItem::slideshow("show", "Gallery", vec![Slide::new("s1", "a.png", 1)])
//!     .protected();
//!
//! let mut player = ContentPlayer::new(Arc::new(show), EngineConfig::default());
//! player.evaluate(&mut resource);
//! player.start_preview(Some(5), &mut resource).unwrap();
//!
//! player.advance_clock(Duration::from_secs(5), &mut resource);
//! assert_eq!(player.access_state(), AccessState::Expired);
//! ```

mod channel;
mod controller;
mod error;
mod events;
mod gate;
mod player;
mod resource;
pub mod runtime;
mod session;
mod simulated;
mod slideshow;
mod status;
mod timer;
pub mod types;

// Public exports
pub use channel::{AudioChannel, ChannelStatus, StatusUpdate};
pub use controller::{LoadRequest, PlaybackController, ResolutionRequest, TransportState};
pub use error::{AccessError, ChannelError, EngineError, PlaybackError, ResourceError, Result};
pub use events::{EndReason, EngineEvent};
pub use gate::{AccessGate, AccessState, ValidationTicket};
pub use player::{ContentPlayer, PlayerSnapshot, Surface};
pub use resource::PlaybackResource;
pub use runtime::{Collaborators, EngineHandle, EngineRuntime, RuntimeEvent, ViewId};
pub use session::{AccessMode, AccessSession, SessionId, SourceTicket};
pub use simulated::{ChannelLog, ChannelLogSnapshot, SimulatedChannel};
pub use slideshow::SlideshowCycler;
pub use status::{StatusSink, StatusSync, SyncOutcome};
pub use timer::{PreviewState, PreviewTimer, TimerTick};
pub use types::{CompletionPolicy, Direction, EngineConfig, SeekTarget};
