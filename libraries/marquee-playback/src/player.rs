//! Content player - one mounted player widget
//!
//! Composes the access gate with the surface that renders the content
//! once access is granted: a `PlaybackController` for playlists or a
//! `SlideshowCycler` for slideshows. The player is driven by elapsed
//! wall-clock time through `advance_clock`, which feeds the one-second
//! preview countdown and the slideshow interval.

use crate::channel::StatusUpdate;
use crate::controller::{LoadRequest, PlaybackController, ResolutionRequest, TransportState};
use crate::error::{AccessError, PlaybackError, Result};
use crate::events::EngineEvent;
use crate::gate::{AccessGate, AccessState, ValidationTicket};
use crate::resource::PlaybackResource;
use crate::session::{AccessSession, SessionId};
use crate::slideshow::SlideshowCycler;
use crate::status::{StatusSync, SyncOutcome};
use crate::timer::{PreviewState, TimerTick};
use crate::types::{Direction, EngineConfig, SeekTarget};
use marquee_core::{ActivationCodeValidator, CodeVerdict, ContentId, ContentItem, ContentKind, CoreError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const ONE_SECOND: Duration = Duration::from_secs(1);

/// What renders the content once access is granted
#[derive(Debug)]
pub enum Surface {
    /// Audio playlist
    Playlist(PlaybackController),
    /// Image slideshow
    Slideshow(SlideshowCycler),
}

impl Surface {
    /// Session the surface runs under
    pub fn session_id(&self) -> SessionId {
        match self {
            Surface::Playlist(controller) => controller.session_id(),
            Surface::Slideshow(cycler) => cycler.session_id(),
        }
    }

    fn holds_channel(&self) -> bool {
        match self {
            Surface::Playlist(controller) => controller.holds_channel(),
            Surface::Slideshow(cycler) => cycler.holds_channel(),
        }
    }

    fn teardown(&mut self, resource: &mut PlaybackResource) {
        match self {
            Surface::Playlist(controller) => controller.teardown(resource),
            Surface::Slideshow(cycler) => cycler.teardown(resource),
        }
    }

    fn drain_events(&mut self) -> Vec<EngineEvent> {
        match self {
            Surface::Playlist(controller) => controller.drain_events(),
            Surface::Slideshow(cycler) => cycler.drain_events(),
        }
    }
}

/// Point-in-time view of a player for UI rendering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    /// Content shown
    pub content_id: ContentId,
    /// Playlist or slideshow
    pub kind: ContentKind,
    /// Gate state
    pub access: AccessState,
    /// Code field text
    pub code_input: String,
    /// Reason of the last denial
    pub last_denial: Option<String>,
    /// Active session, if granted or previewing
    pub session: Option<SessionId>,
    /// Countdown, while previewing
    pub preview: Option<PreviewState>,
    /// Current track, for playlists
    pub track_index: Option<usize>,
    /// Transport flags, for playlists
    pub transport: Option<TransportState>,
    /// Visible slide, for slideshows
    pub slide_index: Option<usize>,
    /// Slideshow autoplay running
    pub autoplay: bool,
    /// Another session took the channel
    pub superseded: bool,
}

/// One mounted player view
#[derive(Debug)]
pub struct ContentPlayer {
    content: Arc<ContentItem>,
    config: EngineConfig,
    gate: AccessGate,
    surface: Option<Surface>,

    preview_seconds: Option<u32>,
    preview_clock: Duration,
    slide_clock: Duration,

    unmounted: bool,
    pending_events: Vec<EngineEvent>,
}

impl ContentPlayer {
    /// Mount a player for `content`
    pub fn new(content: Arc<ContentItem>, config: EngineConfig) -> Self {
        let gate = AccessGate::new(&content);
        Self {
            content,
            config,
            gate,
            surface: None,
            preview_seconds: None,
            preview_clock: Duration::ZERO,
            slide_clock: Duration::ZERO,
            unmounted: false,
            pending_events: Vec::new(),
        }
    }

    // ===== Access =====

    /// Resolve the initial access mode; opens the surface when granted
    pub fn evaluate(&mut self, resource: &mut PlaybackResource) -> AccessState {
        let state = self.gate.evaluate();
        if state == AccessState::Granted {
            self.open_surface(resource);
        }
        self.collect();
        state
    }

    /// Update the code field text
    pub fn set_code_input(&mut self, input: impl Into<String>) {
        self.gate.set_code_input(input);
    }

    /// Start validating `code`; see `AccessGate::begin_code_submission`
    pub fn begin_code_submission(
        &mut self,
        code: &str,
    ) -> std::result::Result<(ValidationTicket, String), AccessError> {
        let outcome = self.gate.begin_code_submission(code);
        self.collect();
        outcome
    }

    /// Apply a validation result; opens the surface on grant
    pub fn complete_code_submission(
        &mut self,
        ticket: ValidationTicket,
        outcome: std::result::Result<CodeVerdict, CoreError>,
        resource: &mut PlaybackResource,
    ) -> Option<AccessState> {
        let state = self.gate.complete_code_submission(ticket, outcome);
        if state == Some(AccessState::Granted) {
            self.open_surface(resource);
        }
        self.collect();
        state
    }

    /// Validate `code` inline and apply the result
    pub async fn submit_code(
        &mut self,
        code: &str,
        validator: &dyn ActivationCodeValidator,
        resource: &mut PlaybackResource,
    ) -> std::result::Result<AccessState, AccessError> {
        let (ticket, trimmed) = self.begin_code_submission(code)?;
        let outcome = validator.validate(&trimmed, &self.content.id).await;
        Ok(self
            .complete_code_submission(ticket, outcome, resource)
            .unwrap_or_else(|| self.gate.state()))
    }

    /// Return from `Denied` to `Locked`
    pub fn dismiss_denial(&mut self) {
        self.gate.dismiss_denial();
        self.collect();
    }

    /// Start a preview of `seconds`, or the configured length
    pub fn start_preview(
        &mut self,
        seconds: Option<u32>,
        resource: &mut PlaybackResource,
    ) -> std::result::Result<AccessSession, AccessError> {
        let seconds = seconds.unwrap_or(self.config.preview_seconds);
        let session = self.gate.start_preview(seconds);
        if session.is_ok() {
            self.preview_seconds = Some(seconds);
            self.preview_clock = Duration::ZERO;
            self.open_surface(resource);
        }
        self.collect();
        session
    }

    /// Cancel the running preview and return to the access prompt
    pub fn cancel_preview(
        &mut self,
        resource: &mut PlaybackResource,
    ) -> std::result::Result<(), AccessError> {
        self.gate.cancel_preview(resource)?;
        self.close_surface(resource);
        self.collect();
        Ok(())
    }

    // ===== Clock =====

    /// Feed elapsed wall-clock time
    ///
    /// Every full second of preview time ticks the countdown; every full
    /// slideshow interval advances one slide.
    pub fn advance_clock(&mut self, elapsed: Duration, resource: &mut PlaybackResource) {
        if self.gate.state() == AccessState::Previewing {
            self.preview_clock += elapsed;
            while self.preview_clock >= ONE_SECOND && self.gate.state() == AccessState::Previewing {
                self.preview_clock -= ONE_SECOND;
                self.tick_second(resource);
            }
        }

        if let Some(Surface::Slideshow(cycler)) = &mut self.surface {
            match cycler.interval() {
                Some(interval) => {
                    self.slide_clock += elapsed;
                    while self.slide_clock >= interval {
                        self.slide_clock -= interval;
                        if cycler.on_interval().is_none() {
                            break;
                        }
                    }
                }
                None => self.slide_clock = Duration::ZERO,
            }
        }
        self.collect();
    }

    /// One second of preview elapsed
    pub fn tick_second(&mut self, resource: &mut PlaybackResource) -> Option<TimerTick> {
        let tick = self.gate.tick(resource);
        if tick.is_some_and(|t| t.expired) {
            self.close_surface(resource);
        }
        self.collect();
        tick
    }

    // ===== Playback =====

    /// Toggle play/pause on the current track
    pub fn toggle_play_pause(&mut self, resource: &mut PlaybackResource) -> Result<bool> {
        let outcome = self.playlist_mut()?.toggle_play_pause(resource);
        self.collect();
        outcome
    }

    /// Next/previous track, or manual slide navigation
    ///
    /// Returns the new track or slide index.
    pub fn navigate(&mut self, direction: Direction, resource: &mut PlaybackResource) -> Result<usize> {
        let index = match self.surface_mut()? {
            Surface::Playlist(controller) => {
                controller.navigate(direction, resource);
                controller.current_index()
            }
            Surface::Slideshow(cycler) => cycler.manual_advance(direction),
        };
        self.slide_clock = Duration::ZERO;
        self.collect();
        Ok(index)
    }

    /// Jump to a track
    pub fn skip_to(&mut self, index: usize, resource: &mut PlaybackResource) -> Result<usize> {
        let controller = self.playlist_mut()?;
        controller.skip_to(index, resource);
        let current = controller.current_index();
        self.collect();
        Ok(current)
    }

    /// Seek within the current track
    pub fn seek(&mut self, target: SeekTarget, resource: &mut PlaybackResource) -> Result<Duration> {
        let outcome = self.playlist_mut()?.seek(target, resource);
        self.collect();
        outcome
    }

    /// Start or stop slideshow autoplay
    pub fn set_autoplay(&mut self, enabled: bool) -> Result<()> {
        let interval = self.config.slideshow_interval();
        let Surface::Slideshow(cycler) = self.surface_mut()? else {
            return Err(PlaybackError::NoContent);
        };
        if enabled {
            cycler.start(interval)?;
        } else {
            cycler.stop();
        }
        self.slide_clock = Duration::ZERO;
        Ok(())
    }

    // ===== Channel =====

    /// Route a status update to the surface if it belongs to this player
    ///
    /// Returns `None` when the update's session is not this player's.
    pub fn deliver_status(
        &mut self,
        update: &StatusUpdate,
        sync: &mut StatusSync,
        resource: &mut PlaybackResource,
    ) -> Option<SyncOutcome> {
        let surface = self.surface.as_mut()?;
        if surface.session_id() != update.ticket.session {
            return None;
        }
        let outcome = match surface {
            Surface::Playlist(controller) => sync.deliver(update, resource, controller),
            Surface::Slideshow(cycler) => sync.deliver(update, resource, cycler),
        };
        self.collect();
        Some(outcome)
    }

    /// Pending URL lookup for the runtime to perform
    pub fn take_pending_resolution(&mut self) -> Option<ResolutionRequest> {
        match self.surface.as_mut()? {
            Surface::Playlist(controller) => controller.take_pending_resolution(),
            Surface::Slideshow(cycler) => cycler.take_pending_resolution(),
        }
    }

    /// Apply a URL lookup result
    pub fn apply_resolution(
        &mut self,
        request: &ResolutionRequest,
        outcome: std::result::Result<String, CoreError>,
        resource: &mut PlaybackResource,
    ) -> LoadRequest {
        let load = match self.surface.as_mut() {
            Some(Surface::Playlist(controller)) => controller.load_resolved(request, outcome, resource),
            Some(Surface::Slideshow(cycler)) => cycler.load_resolved(request, outcome, resource),
            None => {
                debug!(content = %self.content.id, "Dropping resolution for closed player");
                LoadRequest::Unchanged
            }
        };
        self.collect();
        load
    }

    /// Whether the surface expects to own the channel
    pub fn holds_channel(&self) -> bool {
        self.surface.as_ref().is_some_and(Surface::holds_channel)
    }

    /// Session of the open surface
    pub fn active_session(&self) -> Option<SessionId> {
        self.surface.as_ref().map(Surface::session_id)
    }

    /// Another session took the channel
    pub fn notify_superseded(&mut self) {
        match self.surface.as_mut() {
            Some(Surface::Playlist(controller)) => controller.notify_superseded(),
            Some(Surface::Slideshow(cycler)) => cycler.notify_superseded(),
            None => {}
        }
        self.collect();
    }

    // ===== Lifecycle =====

    /// Tear the view down
    ///
    /// Stops the countdown, releases the channel and clears autoplay.
    /// Each step is idempotent, so repeated calls are harmless.
    pub fn unmount(&mut self, resource: &mut PlaybackResource) {
        self.gate.teardown(resource);
        self.close_surface(resource);
        self.unmounted = true;
        self.collect();
    }

    // ===== State Queries =====

    /// Content shown
    pub fn content(&self) -> &ContentItem {
        &self.content
    }

    /// Gate state
    pub fn access_state(&self) -> AccessState {
        self.gate.state()
    }

    /// Open surface, if access was granted
    pub fn surface(&self) -> Option<&Surface> {
        self.surface.as_ref()
    }

    /// Whether the view was unmounted
    pub fn is_unmounted(&self) -> bool {
        self.unmounted
    }

    /// Preview countdown, while previewing
    pub fn preview_state(&self) -> Option<PreviewState> {
        let index = match &self.surface {
            Some(Surface::Playlist(controller)) => controller.current_index(),
            Some(Surface::Slideshow(cycler)) => cycler.current_index(),
            None => 0,
        };
        self.gate.preview_state(index)
    }

    /// Snapshot for rendering
    pub fn snapshot(&self) -> PlayerSnapshot {
        let (track_index, transport, slide_index, autoplay, superseded) = match &self.surface {
            Some(Surface::Playlist(c)) => (
                Some(c.current_index()),
                Some(c.transport().clone()),
                None,
                false,
                c.is_superseded(),
            ),
            Some(Surface::Slideshow(c)) => (
                None,
                None,
                Some(c.current_index()),
                c.is_autoplaying(),
                c.is_superseded(),
            ),
            None => (None, None, None, false, false),
        };

        PlayerSnapshot {
            content_id: self.content.id.clone(),
            kind: self.content.kind(),
            access: self.gate.state(),
            code_input: self.gate.code_input().to_string(),
            last_denial: self.gate.last_denial().map(str::to_string),
            session: self.active_session(),
            preview: self.preview_state(),
            track_index,
            transport,
            slide_index,
            autoplay,
            superseded,
        }
    }

    /// Drain all pending events
    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        self.collect();
        std::mem::take(&mut self.pending_events)
    }

    fn open_surface(&mut self, resource: &mut PlaybackResource) {
        if self.unmounted || self.surface.is_some() {
            return;
        }
        let Some(session) = self.gate.session().cloned() else {
            return;
        };

        let surface = match self.content.kind() {
            ContentKind::Playlist => {
                let mut controller =
                    PlaybackController::new(&session, self.content.tracks().to_vec(), &self.config);
                if let Some(seconds) = self.preview_seconds.filter(|_| session.is_preview()) {
                    controller = controller.with_preview_window(Duration::from_secs(u64::from(seconds)));
                }
                controller.attach(resource);
                Surface::Playlist(controller)
            }
            ContentKind::Slideshow => {
                let mut cycler = SlideshowCycler::new(
                    &session,
                    self.content.slides_in_order(),
                    self.content.soundtrack().cloned(),
                );
                if self.config.slideshow_autoplay {
                    if let Err(err) = cycler.start(self.config.slideshow_interval()) {
                        debug!(content = %self.content.id, %err, "Autoplay not started");
                    }
                }
                cycler.attach_soundtrack(resource);
                self.slide_clock = Duration::ZERO;
                Surface::Slideshow(cycler)
            }
        };

        debug!(content = %self.content.id, session = %session.session_id, "Surface opened");
        self.surface = Some(surface);
    }

    fn close_surface(&mut self, resource: &mut PlaybackResource) {
        self.collect();
        if let Some(mut surface) = self.surface.take() {
            surface.teardown(resource);
            self.pending_events.extend(surface.drain_events());
        }
        self.preview_seconds = None;
        self.preview_clock = Duration::ZERO;
        self.slide_clock = Duration::ZERO;
    }

    fn surface_mut(&mut self) -> Result<&mut Surface> {
        if !self.gate.state().allows_playback() {
            return Err(PlaybackError::Locked);
        }
        self.surface.as_mut().ok_or(PlaybackError::Locked)
    }

    fn playlist_mut(&mut self) -> Result<&mut PlaybackController> {
        match self.surface_mut()? {
            Surface::Playlist(controller) => Ok(controller),
            Surface::Slideshow(_) => Err(PlaybackError::NoContent),
        }
    }

    fn collect(&mut self) {
        self.pending_events.extend(self.gate.drain_events());
        if let Some(surface) = self.surface.as_mut() {
            self.pending_events.extend(surface.drain_events());
        }
    }
}
