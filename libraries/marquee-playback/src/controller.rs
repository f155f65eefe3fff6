//! Playback controller - track navigation and transport for one session
//!
//! Holds the current track index and the transport flags derived from
//! channel status. All channel access goes through `PlaybackResource`
//! under the controller's session id; a `NotOwner` answer means another
//! session won the channel, and the controller stands down for good.

use crate::channel::ChannelStatus;
use crate::error::{PlaybackError, ResourceError, Result};
use crate::events::{EndReason, EngineEvent};
use crate::resource::PlaybackResource;
use crate::session::{AccessSession, SessionId, SourceTicket};
use crate::status::StatusSink;
use crate::types::{CompletionPolicy, Direction, EngineConfig, SeekTarget};
use marquee_core::{CoreError, Track, TrackId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

/// Transport flags for the current track
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransportState {
    /// Source finished loading
    pub loaded: bool,
    /// Output running
    pub playing: bool,
    /// Waiting on data
    pub buffering: bool,
    /// Current position
    pub position: Duration,
    /// Track duration, once known
    pub duration: Option<Duration>,
}

impl TransportState {
    /// Position in seconds
    pub fn position_seconds(&self) -> f64 {
        self.position.as_secs_f64()
    }

    /// Duration in seconds, once known
    pub fn duration_seconds(&self) -> Option<f64> {
        self.duration.map(|d| d.as_secs_f64())
    }
}

/// A track URL the runtime must resolve before loading
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionRequest {
    /// Session that asked
    pub session: SessionId,
    /// Track to resolve
    pub track_id: TrackId,
    /// Playlist index, `None` for a slideshow soundtrack
    pub index: Option<usize>,
}

/// What happened to the channel after a navigation or load
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadRequest {
    /// Source handed to the channel; status will follow
    Loading(SourceTicket),
    /// URL must be resolved first
    Resolve(ResolutionRequest),
    /// Nothing changed (single track, stale result, out of range)
    Unchanged,
    /// Nothing loadable: empty list, no playable track or superseded
    Idle,
}

/// Track navigation and transport for one session
#[derive(Debug)]
pub struct PlaybackController {
    session: SessionId,
    tracks: Vec<Track>,
    current_index: usize,
    transport: TransportState,

    completion: CompletionPolicy,
    skip_unplayable: bool,
    preview_window: Option<Duration>,

    // Start output as soon as the pending source reports loaded
    play_when_loaded: bool,

    attached: bool,
    superseded: bool,

    // Unplayable tracks skipped in a row; bounds skipping to one lap
    consecutive_failures: usize,

    resolved_urls: HashMap<TrackId, String>,
    pending_resolution: Option<ResolutionRequest>,

    pending_events: Vec<EngineEvent>,
}

impl PlaybackController {
    /// Create a controller for `session` over `tracks`
    pub fn new(session: &AccessSession, tracks: Vec<Track>, config: &EngineConfig) -> Self {
        Self {
            session: session.session_id,
            tracks,
            current_index: 0,
            transport: TransportState::default(),
            completion: config.completion,
            skip_unplayable: config.skip_unplayable,
            preview_window: None,
            play_when_loaded: config.playlist_autoplay,
            attached: false,
            superseded: false,
            consecutive_failures: 0,
            resolved_urls: HashMap::new(),
            pending_resolution: None,
            pending_events: Vec::new(),
        }
    }

    /// Restrict seeking to the first `window` of every track
    #[must_use]
    pub fn with_preview_window(mut self, window: Duration) -> Self {
        self.preview_window = Some(window);
        self
    }

    /// Take the channel and load the first track
    pub fn attach(&mut self, resource: &mut PlaybackResource) -> LoadRequest {
        if self.superseded {
            return LoadRequest::Idle;
        }
        resource.acquire(self.session);
        self.attached = true;
        self.load_current(resource, Direction::Forward)
    }

    // ===== Navigation =====

    /// Skip to the next track, wrapping to the first
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self, resource: &mut PlaybackResource) -> LoadRequest {
        self.navigate(Direction::Forward, resource)
    }

    /// Go to the previous track, wrapping to the last
    pub fn previous(&mut self, resource: &mut PlaybackResource) -> LoadRequest {
        self.navigate(Direction::Backward, resource)
    }

    /// Move one track in `direction`
    ///
    /// A single-track list stays where it is.
    pub fn navigate(&mut self, direction: Direction, resource: &mut PlaybackResource) -> LoadRequest {
        if self.superseded || self.tracks.is_empty() {
            return LoadRequest::Idle;
        }
        if self.tracks.len() == 1 {
            return LoadRequest::Unchanged;
        }

        self.play_when_loaded |= self.transport.playing;
        self.consecutive_failures = 0;
        self.current_index = direction.step(self.current_index, self.tracks.len());
        debug!(session = %self.session, index = self.current_index, ?direction, "Track changed");
        self.load_current(resource, direction)
    }

    /// Jump to `index`
    pub fn skip_to(&mut self, index: usize, resource: &mut PlaybackResource) -> LoadRequest {
        if self.superseded || index >= self.tracks.len() || index == self.current_index {
            return LoadRequest::Unchanged;
        }

        self.play_when_loaded |= self.transport.playing;
        self.consecutive_failures = 0;
        self.current_index = index;
        self.load_current(resource, Direction::Forward)
    }

    // ===== Transport =====

    /// Toggle between playing and paused
    ///
    /// Returns the new playing flag.
    pub fn toggle_play_pause(&mut self, resource: &mut PlaybackResource) -> Result<bool> {
        let track = self
            .tracks
            .get(self.current_index)
            .ok_or(PlaybackError::NoContent)?;
        if !track.category.is_audio_playable() {
            return Err(PlaybackError::UnsupportedMedia {
                track_id: track.id.clone(),
                category: track.category,
            });
        }
        if self.superseded {
            return Ok(false);
        }
        if !self.transport.loaded {
            return Err(PlaybackError::NotReady);
        }

        let outcome = if self.transport.playing {
            resource.pause(self.session)
        } else {
            resource.play(self.session)
        };

        match outcome {
            Ok(()) => {
                self.transport.playing = !self.transport.playing;
                self.emit_state();
                Ok(self.transport.playing)
            }
            Err(ResourceError::NotOwner { .. }) => {
                self.mark_superseded();
                Ok(false)
            }
            Err(_) => Err(PlaybackError::NotReady),
        }
    }

    /// Seek within the current track
    ///
    /// The target is clamped to `[0, duration]`, or to the preview window
    /// when one is set. Returns the position actually requested.
    pub fn seek(&mut self, target: SeekTarget, resource: &mut PlaybackResource) -> Result<Duration> {
        if !self.transport.loaded {
            return Err(PlaybackError::NotReady);
        }
        let duration = self.transport.duration.ok_or(PlaybackError::NotReady)?;
        if self.superseded {
            return Ok(self.transport.position);
        }

        let limit = self
            .preview_window
            .map_or(duration, |window| window.min(duration));
        let seconds = match target {
            SeekTarget::Seconds(seconds) => seconds,
            SeekTarget::Fraction(fraction) => clamp_finite(fraction, 1.0) * duration.as_secs_f64(),
        };
        let position = Duration::from_secs_f64(clamp_finite(seconds, limit.as_secs_f64()));

        match resource.seek(self.session, position) {
            Ok(()) => {
                self.transport.position = position;
                Ok(position)
            }
            Err(ResourceError::NotOwner { .. }) => {
                self.mark_superseded();
                Ok(self.transport.position)
            }
            Err(_) => Err(PlaybackError::NotReady),
        }
    }

    /// Handle natural end of the current track
    pub fn on_track_completion(&mut self, resource: &mut PlaybackResource) -> LoadRequest {
        if self.superseded {
            return LoadRequest::Idle;
        }
        if let Some(track) = self.tracks.get(self.current_index) {
            self.pending_events.push(EngineEvent::TrackFinished {
                session: self.session,
                track_id: track.id.clone(),
            });
        }

        let len = self.tracks.len();
        match self.completion {
            CompletionPolicy::Loop if len == 1 => {
                self.restart(resource);
                LoadRequest::Unchanged
            }
            CompletionPolicy::Stop if self.current_index + 1 >= len => {
                debug!(session = %self.session, "Playlist finished");
                self.transport.playing = false;
                self.emit_state();
                LoadRequest::Unchanged
            }
            _ => {
                self.play_when_loaded = true;
                self.consecutive_failures = 0;
                self.current_index = Direction::Forward.step(self.current_index, len);
                self.load_current(resource, Direction::Forward)
            }
        }
    }

    // ===== URL Resolution =====

    /// Pending URL lookup, if the current track had no URL
    pub fn take_pending_resolution(&mut self) -> Option<ResolutionRequest> {
        self.pending_resolution.take()
    }

    /// Apply the resolver's answer for `request`
    ///
    /// Results for a different session or a track that is no longer
    /// current are dropped.
    pub fn load_resolved(
        &mut self,
        request: &ResolutionRequest,
        outcome: std::result::Result<String, CoreError>,
        resource: &mut PlaybackResource,
    ) -> LoadRequest {
        let is_current = request.session == self.session
            && request.index == Some(self.current_index)
            && self
                .tracks
                .get(self.current_index)
                .is_some_and(|track| track.id == request.track_id);
        if self.superseded || !is_current {
            debug!(session = %self.session, track = %request.track_id, "Dropping stale URL resolution");
            return LoadRequest::Unchanged;
        }

        match outcome {
            Ok(url) => {
                if resource.is_owner(self.session) && resource.loaded_url() == Some(url.as_str()) {
                    return LoadRequest::Unchanged;
                }
                self.resolved_urls
                    .insert(request.track_id.clone(), url.clone());
                self.load_url(&url, Direction::Forward, resource)
            }
            Err(err) => {
                self.report_media_error(request.track_id.clone(), err.to_string());
                if self.try_skip(Direction::Forward) {
                    self.load_current(resource, Direction::Forward)
                } else {
                    LoadRequest::Idle
                }
            }
        }
    }

    // ===== Lifecycle =====

    /// Stop synchronizing; another session owns the channel
    pub fn notify_superseded(&mut self) {
        self.mark_superseded();
    }

    /// Release the channel and drop pending work
    ///
    /// Idempotent.
    pub fn teardown(&mut self, resource: &mut PlaybackResource) {
        resource.release(self.session);
        self.pending_resolution = None;
        self.play_when_loaded = false;
        self.transport.playing = false;
    }

    // ===== State Queries =====

    /// Session this controller plays under
    pub fn session_id(&self) -> SessionId {
        self.session
    }

    /// Current track index
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// Current track
    pub fn current_track(&self) -> Option<&Track> {
        self.tracks.get(self.current_index)
    }

    /// All tracks
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Transport flags
    pub fn transport(&self) -> &TransportState {
        &self.transport
    }

    /// Whether another session took the channel
    pub fn is_superseded(&self) -> bool {
        self.superseded
    }

    /// Whether this controller expects to own the channel
    pub fn holds_channel(&self) -> bool {
        self.attached && !self.superseded
    }

    /// Drain all pending events
    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.pending_events)
    }

    // ===== Internal =====

    fn load_current(&mut self, resource: &mut PlaybackResource, direction: Direction) -> LoadRequest {
        if self.superseded {
            return LoadRequest::Idle;
        }
        self.transport = TransportState::default();
        self.pending_resolution = None;
        if self.tracks.is_empty() {
            return LoadRequest::Idle;
        }

        loop {
            let track = &self.tracks[self.current_index];
            if track.category.is_audio_playable() {
                break;
            }
            let (track_id, label) = (track.id.clone(), track.category.label());
            self.report_media_error(track_id, format!("{label} cannot be played"));
            if !self.try_skip(direction) {
                self.emit_state();
                return LoadRequest::Idle;
            }
        }

        let track = &self.tracks[self.current_index];
        let url = track
            .media_url
            .clone()
            .or_else(|| self.resolved_urls.get(&track.id).cloned());

        match url {
            Some(url) => self.load_url(&url, direction, resource),
            None => {
                let request = ResolutionRequest {
                    session: self.session,
                    track_id: track.id.clone(),
                    index: Some(self.current_index),
                };
                debug!(session = %self.session, track = %request.track_id, "Track URL needs resolving");
                self.pending_resolution = Some(request.clone());
                self.emit_state();
                LoadRequest::Resolve(request)
            }
        }
    }

    fn load_url(&mut self, url: &str, direction: Direction, resource: &mut PlaybackResource) -> LoadRequest {
        match resource.load_source(self.session, url) {
            Ok(ticket) => {
                self.emit_state();
                LoadRequest::Loading(ticket)
            }
            Err(ResourceError::NotOwner { .. }) => {
                self.mark_superseded();
                LoadRequest::Idle
            }
            Err(err) => {
                if let Some(track) = self.tracks.get(self.current_index) {
                    let track_id = track.id.clone();
                    self.report_media_error(track_id, err.to_string());
                }
                if self.try_skip(direction) {
                    self.load_current(resource, direction)
                } else {
                    self.emit_state();
                    LoadRequest::Idle
                }
            }
        }
    }

    fn restart(&mut self, resource: &mut PlaybackResource) {
        let outcome = resource
            .seek(self.session, Duration::ZERO)
            .and_then(|()| resource.play(self.session));
        match outcome {
            Ok(()) => {
                self.transport.position = Duration::ZERO;
                self.transport.playing = true;
                self.emit_state();
            }
            Err(ResourceError::NotOwner { .. }) => self.mark_superseded(),
            Err(err) => debug!(session = %self.session, %err, "Restart skipped"),
        }
    }

    fn try_skip(&mut self, direction: Direction) -> bool {
        let len = self.tracks.len();
        if !self.skip_unplayable || len <= 1 || self.consecutive_failures + 1 >= len {
            return false;
        }
        self.consecutive_failures += 1;
        self.current_index = direction.step(self.current_index, len);
        true
    }

    fn mark_superseded(&mut self) {
        if self.superseded {
            return;
        }
        debug!(session = %self.session, "Session superseded, standing down");
        self.superseded = true;
        self.transport.playing = false;
        self.play_when_loaded = false;
        self.pending_resolution = None;
        self.pending_events.push(EngineEvent::SessionEnded {
            session: self.session,
            reason: EndReason::Superseded,
        });
    }

    fn report_media_error(&mut self, track_id: TrackId, message: String) {
        warn!(session = %self.session, track = %track_id, %message, "Media error");
        self.pending_events.push(EngineEvent::MediaError {
            session: self.session,
            track_id,
            message,
        });
    }

    fn emit_state(&mut self) {
        if self.superseded {
            return;
        }
        self.pending_events.push(EngineEvent::PlaybackStateChanged {
            session: self.session,
            is_playing: self.transport.playing,
            track_index: self.current_index,
        });
    }
}

impl StatusSink for PlaybackController {
    fn session_id(&self) -> SessionId {
        self.session
    }

    fn apply_status(&mut self, status: &ChannelStatus, resource: &mut PlaybackResource) {
        if self.superseded {
            return;
        }

        if let Some(message) = &status.error {
            self.play_when_loaded |= self.transport.playing;
            self.transport = TransportState::default();
            if let Some(track) = self.tracks.get(self.current_index) {
                let track_id = track.id.clone();
                self.report_media_error(track_id, message.clone());
            }
            if self.try_skip(Direction::Forward) {
                self.load_current(resource, Direction::Forward);
            } else {
                self.emit_state();
            }
            return;
        }

        let was_loaded = self.transport.loaded;
        let was_playing = self.transport.playing;

        self.transport.loaded = status.is_loaded;
        self.transport.buffering = status.is_buffering;
        self.transport.position = status.position;
        self.transport.playing = status.is_playing;
        if status.duration.is_some() {
            self.transport.duration = status.duration;
        }

        let just_loaded = status.is_loaded && !was_loaded;
        if just_loaded {
            self.consecutive_failures = 0;
            debug!(session = %self.session, index = self.current_index, "Track loaded");
            if std::mem::take(&mut self.play_when_loaded) {
                match resource.play(self.session) {
                    Ok(()) => self.transport.playing = true,
                    Err(ResourceError::NotOwner { .. }) => {
                        self.mark_superseded();
                        return;
                    }
                    Err(err) => debug!(session = %self.session, %err, "Autoplay skipped"),
                }
            }
        }

        if status.did_just_finish {
            self.on_track_completion(resource);
            return;
        }

        if just_loaded || self.transport.playing != was_playing {
            self.emit_state();
        }
    }
}

fn clamp_finite(value: f64, max: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, max)
    }
}
