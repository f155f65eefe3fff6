//! Access gate - decides whether a visitor may render a content item
//!
//! ```text
//! Locked ──submit──▶ Validating ──▶ Granted (terminal)
//!   ▲  │                  │
//!   │  │                  └──▶ Denied ──submit/dismiss──▶ ...
//!   │  └──preview──▶ Previewing ──countdown──▶ Expired (terminal)
//!   └────cancel─────────┘
//! ```
//!
//! Unprotected content skips straight to `Granted` on `evaluate`.

use crate::error::AccessError;
use crate::events::{EndReason, EngineEvent};
use crate::resource::PlaybackResource;
use crate::session::{AccessMode, AccessSession};
use crate::timer::{PreviewState, PreviewTimer, TimerTick};
use marquee_core::{ActivationCodeValidator, CodeVerdict, ContentId, ContentItem, CoreError};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Access state for one content item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessState {
    /// Protected and not yet unlocked; code entry and preview offered
    Locked,
    /// Activation code submitted, awaiting the validator
    Validating,
    /// Full access
    Granted,
    /// Code rejected or validation failed; retryable
    Denied,
    /// Time-boxed preview running
    Previewing,
    /// Preview ran out
    Expired,
}

impl AccessState {
    /// Whether playback components may run in this state
    pub fn allows_playback(self) -> bool {
        matches!(self, AccessState::Granted | AccessState::Previewing)
    }

    /// Whether the visitor may enter a code or start a preview
    pub fn accepts_unlock(self) -> bool {
        matches!(self, AccessState::Locked | AccessState::Denied)
    }
}

/// Identifies one code submission
///
/// A validation result is only applied if its ticket is still the
/// pending one; results for superseded submissions are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValidationTicket {
    attempt: u64,
}

/// Access state machine for one content item
#[derive(Debug)]
pub struct AccessGate {
    content_id: ContentId,
    is_protected: bool,
    state: AccessState,

    // Raw text of the code field; cleared on denial so the visitor retypes
    code_input: String,

    session: Option<AccessSession>,
    timer: PreviewTimer,

    pending_validation: Option<ValidationTicket>,
    attempts: u64,
    last_denial: Option<String>,

    pending_events: Vec<EngineEvent>,
}

impl AccessGate {
    /// Create a gate for `content` in the `Locked` state
    pub fn new(content: &ContentItem) -> Self {
        Self {
            content_id: content.id.clone(),
            is_protected: content.is_protected,
            state: AccessState::Locked,
            code_input: String::new(),
            session: None,
            timer: PreviewTimer::new(),
            pending_validation: None,
            attempts: 0,
            last_denial: None,
            pending_events: Vec::new(),
        }
    }

    /// Resolve the initial mode
    ///
    /// Unprotected content is granted immediately with no network call.
    /// Protected content stays `Locked` and offers code entry and preview.
    pub fn evaluate(&mut self) -> AccessState {
        if self.state == AccessState::Locked && !self.is_protected {
            self.grant(AccessMode::Public);
        }
        self.state
    }

    // ===== Activation Code =====

    /// Update the code field text
    pub fn set_code_input(&mut self, input: impl Into<String>) {
        self.code_input = input.into();
    }

    /// Current code field text
    pub fn code_input(&self) -> &str {
        &self.code_input
    }

    /// Start validating `code`
    ///
    /// Returns the ticket identifying this submission and the trimmed
    /// code to send to the validator.
    pub fn begin_code_submission(
        &mut self,
        code: &str,
    ) -> Result<(ValidationTicket, String), AccessError> {
        if !self.state.accepts_unlock() {
            return Err(AccessError::InvalidTransition {
                operation: "submit a code",
                state: self.state,
            });
        }

        let trimmed = code.trim();
        if trimmed.is_empty() {
            return Err(AccessError::EmptyCode);
        }

        self.code_input = code.to_string();
        self.attempts += 1;
        let ticket = ValidationTicket {
            attempt: self.attempts,
        };
        self.pending_validation = Some(ticket);
        self.transition(AccessState::Validating, None);
        debug!(content = %self.content_id, attempt = ticket.attempt, "Validating activation code");

        Ok((ticket, trimmed.to_string()))
    }

    /// Apply the validator's answer for `ticket`
    ///
    /// Returns the new state, or `None` if the ticket is no longer
    /// pending (the gate was torn down or a newer submission exists).
    pub fn complete_code_submission(
        &mut self,
        ticket: ValidationTicket,
        outcome: Result<CodeVerdict, CoreError>,
    ) -> Option<AccessState> {
        if self.pending_validation != Some(ticket) || self.state != AccessState::Validating {
            debug!(
                content = %self.content_id,
                attempt = ticket.attempt,
                "Dropping stale validation result"
            );
            return None;
        }
        self.pending_validation = None;

        match outcome {
            Ok(CodeVerdict::Accepted) => self.grant(AccessMode::CodeGranted),
            Ok(CodeVerdict::Rejected) => self.deny("Invalid activation code".to_string()),
            Err(err) => self.deny(format!("Could not validate code: {err}")),
        }
        Some(self.state)
    }

    /// Validate `code` against `validator` and apply the result
    pub async fn submit_code(
        &mut self,
        code: &str,
        validator: &dyn ActivationCodeValidator,
    ) -> Result<AccessState, AccessError> {
        let (ticket, trimmed) = self.begin_code_submission(code)?;
        let outcome = validator.validate(&trimmed, &self.content_id).await;
        Ok(self
            .complete_code_submission(ticket, outcome)
            .unwrap_or(self.state))
    }

    /// Return from `Denied` to `Locked`
    pub fn dismiss_denial(&mut self) {
        if self.state == AccessState::Denied {
            self.transition(AccessState::Locked, None);
        }
    }

    // ===== Preview =====

    /// Start a time-boxed preview
    ///
    /// No network call is involved.
    pub fn start_preview(&mut self, duration_seconds: u32) -> Result<AccessSession, AccessError> {
        if duration_seconds == 0 {
            return Err(AccessError::InvalidPreviewDuration);
        }
        if !self.state.accepts_unlock() {
            return Err(AccessError::InvalidTransition {
                operation: "start a preview",
                state: self.state,
            });
        }

        let session = AccessSession::new(self.content_id.clone(), AccessMode::Preview);
        self.session = Some(session.clone());
        self.timer.start(duration_seconds);
        info!(
            content = %self.content_id,
            session = %session.session_id,
            seconds = duration_seconds,
            "Preview started"
        );
        self.transition(AccessState::Previewing, None);
        Ok(session)
    }

    /// Cancel a running preview and return to `Locked`
    ///
    /// Stops the countdown and releases the channel; no expiry is reported.
    pub fn cancel_preview(&mut self, resource: &mut PlaybackResource) -> Result<(), AccessError> {
        if self.state != AccessState::Previewing {
            return Err(AccessError::InvalidTransition {
                operation: "cancel a preview",
                state: self.state,
            });
        }

        self.timer.stop();
        self.end_session(resource, EndReason::Cancelled);
        self.transition(AccessState::Locked, None);
        Ok(())
    }

    /// Advance the preview countdown by one second
    ///
    /// On expiry the session ends, the channel is released and
    /// `PreviewExpired` is queued after the final tick.
    pub fn tick(&mut self, resource: &mut PlaybackResource) -> Option<TimerTick> {
        if self.state != AccessState::Previewing {
            return None;
        }

        let tick = self.timer.tick()?;
        self.pending_events.push(EngineEvent::PreviewTick {
            content_id: self.content_id.clone(),
            remaining_seconds: tick.remaining,
        });

        if tick.expired {
            info!(content = %self.content_id, "Preview expired");
            self.end_session(resource, EndReason::Expired);
            self.transition(AccessState::Expired, None);
            self.pending_events.push(EngineEvent::PreviewExpired {
                content_id: self.content_id.clone(),
            });
        }

        Some(tick)
    }

    /// Preview snapshot while previewing
    pub fn preview_state(&self, current_index: usize) -> Option<PreviewState> {
        if self.state != AccessState::Previewing || !self.timer.is_running() {
            return None;
        }
        Some(PreviewState {
            remaining_seconds: self.timer.remaining(),
            total_seconds: self.timer.total(),
            current_index,
        })
    }

    // ===== Teardown =====

    /// Stop the countdown, drop any pending validation and release the channel
    ///
    /// Idempotent; used when the owning view unmounts.
    pub fn teardown(&mut self, resource: &mut PlaybackResource) {
        self.timer.stop();
        self.pending_validation = None;
        self.end_session(resource, EndReason::Unmounted);
    }

    // ===== State Queries =====

    /// Current state
    pub fn state(&self) -> AccessState {
        self.state
    }

    /// Content this gate guards
    pub fn content_id(&self) -> &ContentId {
        &self.content_id
    }

    /// Active grant, if any
    pub fn session(&self) -> Option<&AccessSession> {
        self.session.as_ref()
    }

    /// Reason of the most recent denial
    pub fn last_denial(&self) -> Option<&str> {
        self.last_denial.as_deref()
    }

    /// Whether a code submission awaits its result
    pub fn is_validating(&self) -> bool {
        self.pending_validation.is_some()
    }

    // ===== Events =====

    /// Drain all pending events
    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.pending_events)
    }

    fn grant(&mut self, mode: AccessMode) {
        let session = AccessSession::new(self.content_id.clone(), mode);
        info!(
            content = %self.content_id,
            session = %session.session_id,
            ?mode,
            "Access granted"
        );
        self.session = Some(session);
        self.last_denial = None;
        self.transition(AccessState::Granted, None);
    }

    fn deny(&mut self, reason: String) {
        warn!(content = %self.content_id, %reason, "Access denied");
        self.code_input.clear();
        self.last_denial = Some(reason.clone());
        self.transition(AccessState::Denied, Some(reason));
    }

    fn end_session(&mut self, resource: &mut PlaybackResource, reason: EndReason) {
        if let Some(session) = self.session.take() {
            resource.release(session.session_id);
            self.pending_events.push(EngineEvent::SessionEnded {
                session: session.session_id,
                reason,
            });
        }
    }

    fn transition(&mut self, state: AccessState, reason: Option<String>) {
        if self.state == state {
            return;
        }
        self.state = state;
        self.pending_events.push(EngineEvent::AccessStateChanged {
            content_id: self.content_id.clone(),
            state,
            reason,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulated::SimulatedChannel;
    use marquee_core::{Slide, Track};

    fn resource() -> PlaybackResource {
        PlaybackResource::new(Box::new(SimulatedChannel::new()))
    }

    fn protected_show() -> ContentItem {
        ContentItem::slideshow("show", "Gallery", vec![Slide::new("s1", "one.png", 1)]).protected()
    }

    fn states(events: &[EngineEvent]) -> Vec<AccessState> {
        events
            .iter()
            .filter_map(|e| match e {
                EngineEvent::AccessStateChanged { state, .. } => Some(*state),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn unprotected_content_is_granted_on_evaluate() {
        let playlist = ContentItem::playlist("p", "Mix", vec![Track::new("t", "T", "t.mp3")]);
        let mut gate = AccessGate::new(&playlist);

        assert_eq!(gate.evaluate(), AccessState::Granted);
        assert_eq!(gate.session().unwrap().mode, AccessMode::Public);
    }

    #[test]
    fn protected_content_stays_locked() {
        let mut gate = AccessGate::new(&protected_show());

        assert_eq!(gate.evaluate(), AccessState::Locked);
        assert!(gate.session().is_none());
        assert!(gate.state().accepts_unlock());
    }

    #[test]
    fn repeated_evaluate_announces_nothing() {
        let mut gate = AccessGate::new(&protected_show());

        gate.evaluate();
        gate.evaluate();

        assert!(states(&gate.drain_events()).is_empty());
        assert_eq!(gate.state(), AccessState::Locked);
    }

    #[test]
    fn empty_code_is_rejected_locally() {
        let mut gate = AccessGate::new(&protected_show());
        gate.evaluate();

        assert!(matches!(
            gate.begin_code_submission("   "),
            Err(AccessError::EmptyCode)
        ));
        assert_eq!(gate.state(), AccessState::Locked);
    }

    #[test]
    fn accepted_code_grants_access() {
        let mut gate = AccessGate::new(&protected_show());
        gate.evaluate();
        gate.drain_events();

        let (ticket, code) = gate.begin_code_submission("  SLIDE123 ").unwrap();
        assert_eq!(code, "SLIDE123");
        assert_eq!(gate.state(), AccessState::Validating);

        let state = gate.complete_code_submission(ticket, Ok(CodeVerdict::Accepted));
        assert_eq!(state, Some(AccessState::Granted));
        assert_eq!(gate.session().unwrap().mode, AccessMode::CodeGranted);
        assert_eq!(
            states(&gate.drain_events()),
            vec![AccessState::Validating, AccessState::Granted]
        );
    }

    #[test]
    fn rejected_code_denies_and_clears_input() {
        let mut gate = AccessGate::new(&protected_show());
        gate.evaluate();
        gate.set_code_input("WRONG");

        let (ticket, _) = gate.begin_code_submission("WRONG").unwrap();
        gate.complete_code_submission(ticket, Ok(CodeVerdict::Rejected));

        assert_eq!(gate.state(), AccessState::Denied);
        assert_eq!(gate.code_input(), "");
        assert_eq!(gate.last_denial(), Some("Invalid activation code"));
    }

    #[test]
    fn transport_error_also_denies() {
        let mut gate = AccessGate::new(&protected_show());
        gate.evaluate();

        let (ticket, _) = gate.begin_code_submission("SLIDE123").unwrap();
        gate.complete_code_submission(ticket, Err(CoreError::network("timeout")));

        assert_eq!(gate.state(), AccessState::Denied);
        assert!(gate.last_denial().unwrap().contains("timeout"));
    }

    #[test]
    fn denied_gate_accepts_retry() {
        let mut gate = AccessGate::new(&protected_show());
        gate.evaluate();

        let (ticket, _) = gate.begin_code_submission("WRONG").unwrap();
        gate.complete_code_submission(ticket, Ok(CodeVerdict::Rejected));

        let (retry, _) = gate.begin_code_submission("SLIDE123").unwrap();
        gate.complete_code_submission(retry, Ok(CodeVerdict::Accepted));
        assert_eq!(gate.state(), AccessState::Granted);
    }

    #[test]
    fn dismiss_denial_returns_to_locked() {
        let mut gate = AccessGate::new(&protected_show());
        gate.evaluate();
        let (ticket, _) = gate.begin_code_submission("WRONG").unwrap();
        gate.complete_code_submission(ticket, Ok(CodeVerdict::Rejected));

        gate.dismiss_denial();
        assert_eq!(gate.state(), AccessState::Locked);
    }

    #[test]
    fn late_result_after_teardown_is_dropped() {
        let mut resource = resource();
        let mut gate = AccessGate::new(&protected_show());
        gate.evaluate();

        let (ticket, _) = gate.begin_code_submission("SLIDE123").unwrap();
        gate.teardown(&mut resource);

        assert_eq!(
            gate.complete_code_submission(ticket, Ok(CodeVerdict::Accepted)),
            None
        );
        assert!(gate.session().is_none());
    }

    #[test]
    fn granted_is_terminal() {
        let playlist = ContentItem::playlist("p", "Mix", vec![]);
        let mut gate = AccessGate::new(&playlist);
        gate.evaluate();

        assert!(matches!(
            gate.begin_code_submission("CODE"),
            Err(AccessError::InvalidTransition { .. })
        ));
        assert!(gate.start_preview(30).is_err());
    }

    #[test]
    fn preview_counts_down_and_expires_once() {
        let mut resource = resource();
        let mut gate = AccessGate::new(&protected_show());
        gate.evaluate();

        let session = gate.start_preview(30).unwrap();
        resource.acquire(session.session_id);
        gate.drain_events();

        for _ in 0..40 {
            gate.tick(&mut resource);
        }

        let events = gate.drain_events();
        let ticks = events
            .iter()
            .filter(|e| matches!(e, EngineEvent::PreviewTick { .. }))
            .count();
        let expiries = events
            .iter()
            .filter(|e| matches!(e, EngineEvent::PreviewExpired { .. }))
            .count();

        assert_eq!(ticks, 30);
        assert_eq!(expiries, 1);
        assert!(matches!(
            events.last(),
            Some(EngineEvent::PreviewExpired { .. })
        ));
        assert_eq!(gate.state(), AccessState::Expired);
        assert_eq!(resource.owner(), None);
    }

    #[test]
    fn cancel_preview_produces_no_expiry() {
        let mut resource = resource();
        let mut gate = AccessGate::new(&protected_show());
        gate.evaluate();

        let session = gate.start_preview(30).unwrap();
        resource.acquire(session.session_id);
        for _ in 0..10 {
            gate.tick(&mut resource);
        }

        gate.cancel_preview(&mut resource).unwrap();
        for _ in 0..30 {
            assert!(gate.tick(&mut resource).is_none());
        }

        let events = gate.drain_events();
        assert!(!events
            .iter()
            .any(|e| matches!(e, EngineEvent::PreviewExpired { .. })));
        assert_eq!(gate.state(), AccessState::Locked);
        assert_eq!(resource.owner(), None);
    }

    #[test]
    fn preview_state_tracks_countdown() {
        let mut resource = resource();
        let mut gate = AccessGate::new(&protected_show());
        gate.evaluate();
        gate.start_preview(5).unwrap();
        gate.tick(&mut resource);

        let state = gate.preview_state(2).unwrap();
        assert_eq!(state.remaining_seconds, 4);
        assert_eq!(state.total_seconds, 5);
        assert_eq!(state.current_index, 2);
    }

    #[test]
    fn zero_length_preview_is_rejected() {
        let mut gate = AccessGate::new(&protected_show());
        gate.evaluate();
        assert!(matches!(
            gate.start_preview(0),
            Err(AccessError::InvalidPreviewDuration)
        ));
        assert_eq!(gate.state(), AccessState::Locked);
    }
}
