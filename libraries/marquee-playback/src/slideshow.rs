//! Slideshow cycler - autoplay slide advancement with an optional soundtrack
//!
//! Slide changes run on their own interval, independent of any audio
//! clock. The soundtrack is loaded once per session and loops; slide
//! changes never touch the channel.

use crate::channel::ChannelStatus;
use crate::controller::{LoadRequest, ResolutionRequest};
use crate::error::{PlaybackError, ResourceError, Result};
use crate::events::{EndReason, EngineEvent};
use crate::resource::PlaybackResource;
use crate::session::{AccessSession, SessionId};
use crate::status::StatusSink;
use crate::types::Direction;
use marquee_core::{CoreError, Slide, Track};
use std::time::Duration;
use tracing::{debug, warn};

/// Advances slides for one session
#[derive(Debug)]
pub struct SlideshowCycler {
    session: SessionId,
    slides: Vec<Slide>,
    current_index: usize,

    // Some while autoplay runs
    interval: Option<Duration>,

    soundtrack: Option<Track>,
    soundtrack_requested: bool,
    channel_acquired: bool,
    audio_playing: bool,
    superseded: bool,
    pending_resolution: Option<ResolutionRequest>,

    pending_events: Vec<EngineEvent>,
}

impl SlideshowCycler {
    /// Create a cycler over `slides`, already sorted by order
    pub fn new(session: &AccessSession, slides: Vec<Slide>, soundtrack: Option<Track>) -> Self {
        Self {
            session: session.session_id,
            slides,
            current_index: 0,
            interval: None,
            soundtrack,
            soundtrack_requested: false,
            channel_acquired: false,
            audio_playing: false,
            superseded: false,
            pending_resolution: None,
            pending_events: Vec::new(),
        }
    }

    // ===== Autoplay =====

    /// Start advancing every `interval`
    pub fn start(&mut self, interval: Duration) -> Result<()> {
        if interval.is_zero() {
            return Err(PlaybackError::InvalidInterval);
        }
        if self.slides.is_empty() {
            return Err(PlaybackError::NoContent);
        }
        self.interval = Some(interval);
        debug!(session = %self.session, ?interval, "Slideshow autoplay started");
        Ok(())
    }

    /// Stop autoplay; returns whether it was running
    pub fn stop(&mut self) -> bool {
        self.interval.take().is_some()
    }

    /// One autoplay interval elapsed
    ///
    /// Returns the new slide index, or `None` when autoplay is off.
    pub fn on_interval(&mut self) -> Option<usize> {
        self.interval?;
        if self.slides.len() <= 1 {
            return None;
        }
        self.current_index = Direction::Forward.step(self.current_index, self.slides.len());
        self.emit_slide();
        Some(self.current_index)
    }

    /// Manual navigation; always stops autoplay
    pub fn manual_advance(&mut self, direction: Direction) -> usize {
        if self.stop() {
            debug!(session = %self.session, "Autoplay stopped by manual navigation");
        }
        self.current_index = direction.step(self.current_index, self.slides.len());
        if !self.slides.is_empty() {
            self.emit_slide();
        }
        self.current_index
    }

    // ===== Soundtrack =====

    /// Load the soundtrack, at most once per session
    pub fn attach_soundtrack(&mut self, resource: &mut PlaybackResource) -> LoadRequest {
        if self.soundtrack_requested || self.superseded {
            return LoadRequest::Unchanged;
        }
        let Some(track) = self.soundtrack.clone() else {
            return LoadRequest::Unchanged;
        };
        self.soundtrack_requested = true;

        if !track.category.is_audio_playable() {
            self.report_media_error(&track, format!("{} cannot be played", track.category.label()));
            return LoadRequest::Idle;
        }

        resource.acquire(self.session);
        self.channel_acquired = true;
        match track.media_url.as_deref() {
            Some(url) => self.load_url(&track, url, resource),
            None => {
                let request = ResolutionRequest {
                    session: self.session,
                    track_id: track.id.clone(),
                    index: None,
                };
                self.pending_resolution = Some(request.clone());
                LoadRequest::Resolve(request)
            }
        }
    }

    /// Apply the resolver's answer for the soundtrack
    pub fn load_resolved(
        &mut self,
        request: &ResolutionRequest,
        outcome: std::result::Result<String, CoreError>,
        resource: &mut PlaybackResource,
    ) -> LoadRequest {
        let Some(track) = self.soundtrack.clone() else {
            return LoadRequest::Unchanged;
        };
        if self.superseded
            || request.session != self.session
            || request.index.is_some()
            || request.track_id != track.id
            || resource.current_ticket().is_some_and(|t| t.session == self.session)
        {
            debug!(session = %self.session, "Dropping stale soundtrack resolution");
            return LoadRequest::Unchanged;
        }

        match outcome {
            Ok(url) => self.load_url(&track, &url, resource),
            Err(err) => {
                self.report_media_error(&track, err.to_string());
                LoadRequest::Idle
            }
        }
    }

    /// Pending soundtrack URL lookup
    pub fn take_pending_resolution(&mut self) -> Option<ResolutionRequest> {
        self.pending_resolution.take()
    }

    // ===== Lifecycle =====

    /// Stop synchronizing audio; slides keep cycling
    pub fn notify_superseded(&mut self) {
        if self.superseded {
            return;
        }
        debug!(session = %self.session, "Soundtrack superseded");
        self.superseded = true;
        self.audio_playing = false;
        self.pending_resolution = None;
        self.pending_events.push(EngineEvent::SessionEnded {
            session: self.session,
            reason: EndReason::Superseded,
        });
    }

    /// Clear autoplay and release the channel
    ///
    /// Idempotent.
    pub fn teardown(&mut self, resource: &mut PlaybackResource) {
        self.stop();
        resource.release(self.session);
        self.channel_acquired = false;
        self.pending_resolution = None;
        self.audio_playing = false;
    }

    // ===== State Queries =====

    /// Session this cycler runs under
    pub fn session_id(&self) -> SessionId {
        self.session
    }

    /// Index of the visible slide
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// Visible slide
    pub fn current_slide(&self) -> Option<&Slide> {
        self.slides.get(self.current_index)
    }

    /// Slides in display order
    pub fn slides(&self) -> &[Slide] {
        &self.slides
    }

    /// Autoplay interval while running
    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    /// Whether autoplay is running
    pub fn is_autoplaying(&self) -> bool {
        self.interval.is_some()
    }

    /// Whether the soundtrack is audible
    pub fn is_audio_playing(&self) -> bool {
        self.audio_playing
    }

    /// Whether another session took the channel
    pub fn is_superseded(&self) -> bool {
        self.superseded
    }

    /// Whether this cycler expects to own the channel
    pub fn holds_channel(&self) -> bool {
        self.channel_acquired && !self.superseded
    }

    /// Drain all pending events
    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.pending_events)
    }

    fn load_url(&mut self, track: &Track, url: &str, resource: &mut PlaybackResource) -> LoadRequest {
        match resource.load_source(self.session, url) {
            Ok(ticket) => {
                debug!(session = %self.session, url, "Soundtrack loading");
                LoadRequest::Loading(ticket)
            }
            Err(ResourceError::NotOwner { .. }) => {
                self.notify_superseded();
                LoadRequest::Idle
            }
            Err(err) => {
                self.report_media_error(track, err.to_string());
                LoadRequest::Idle
            }
        }
    }

    fn report_media_error(&mut self, track: &Track, message: String) {
        warn!(session = %self.session, track = %track.id, %message, "Soundtrack error");
        self.pending_events.push(EngineEvent::MediaError {
            session: self.session,
            track_id: track.id.clone(),
            message,
        });
    }

    fn emit_slide(&mut self) {
        self.pending_events.push(EngineEvent::SlideChanged {
            session: self.session,
            slide_index: self.current_index,
            autoplay: self.interval.is_some(),
        });
    }
}

impl StatusSink for SlideshowCycler {
    fn session_id(&self) -> SessionId {
        self.session
    }

    fn apply_status(&mut self, status: &ChannelStatus, resource: &mut PlaybackResource) {
        if self.superseded {
            return;
        }

        if let Some(message) = &status.error {
            self.audio_playing = false;
            if let Some(track) = self.soundtrack.clone() {
                self.report_media_error(&track, message.clone());
            }
            return;
        }

        // Background audio starts on load and loops at the end
        let outcome = if status.did_just_finish {
            resource
                .seek(self.session, Duration::ZERO)
                .and_then(|()| resource.play(self.session))
        } else if status.is_loaded && !status.is_playing && !self.audio_playing {
            resource.play(self.session)
        } else {
            self.audio_playing = status.is_playing;
            return;
        };

        match outcome {
            Ok(()) => self.audio_playing = true,
            Err(ResourceError::NotOwner { .. }) => self.notify_superseded(),
            Err(err) => debug!(session = %self.session, %err, "Soundtrack play skipped"),
        }
    }
}
