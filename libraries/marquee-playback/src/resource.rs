//! Playback resource - single-owner arbitration of the audio channel
//!
//! Exactly one session may control the channel at a time. Acquisition
//! always force-releases the previous holder (unloading its source) before
//! the new session gets the channel, so two sources are never loaded onto
//! the platform primitive at once.

use crate::channel::{AudioChannel, StatusUpdate};
use crate::error::ResourceError;
use crate::session::{SessionId, SourceTicket};
use std::time::Duration;
use tracing::{debug, trace};

/// Owned-resource registry for the one audio channel
///
/// Passed by reference to every consumer; there is no ambient global.
pub struct PlaybackResource {
    channel: Box<dyn AudioChannel>,

    // Most recent surviving acquirer
    active: Option<SessionId>,

    // Source currently loaded on the channel
    current: Option<LoadedSource>,

    // Monotonic load counter, stamped into tickets
    generation: u64,
}

#[derive(Debug, Clone)]
struct LoadedSource {
    ticket: SourceTicket,
    url: String,
}

impl PlaybackResource {
    /// Wrap a platform channel
    pub fn new(channel: Box<dyn AudioChannel>) -> Self {
        Self {
            channel,
            active: None,
            current: None,
            generation: 0,
        }
    }

    /// Take ownership of the channel for `session`
    ///
    /// If another session holds the channel it is released first: its
    /// source is unloaded and its ticket invalidated. Returns the evicted
    /// session, if any. Re-acquiring by the current owner is a no-op.
    pub fn acquire(&mut self, session: SessionId) -> Option<SessionId> {
        if self.active == Some(session) {
            return None;
        }

        let evicted = self.active.take();
        if let Some(previous) = evicted {
            debug!(%previous, next = %session, "Force-releasing playback channel");
            self.unload_current();
        }

        self.active = Some(session);
        debug!(%session, "Playback channel acquired");
        evicted
    }

    /// Release the channel if `session` owns it
    ///
    /// Safe to call from any teardown path: returns `false` and does
    /// nothing when `session` is not the owner.
    pub fn release(&mut self, session: SessionId) -> bool {
        if self.active != Some(session) {
            trace!(%session, "Release ignored, not the owner");
            return false;
        }

        self.unload_current();
        self.active = None;
        debug!(%session, "Playback channel released");
        true
    }

    /// Replace the channel's source on behalf of `session`
    ///
    /// Any previous source (including one of the same session) is unloaded
    /// first. Returns the ticket the channel will stamp on status pushes.
    pub fn load_source(&mut self, session: SessionId, url: &str) -> Result<SourceTicket, ResourceError> {
        self.ensure_owner(session)?;
        self.unload_current();

        self.generation += 1;
        let ticket = SourceTicket {
            session,
            generation: self.generation,
        };

        self.channel.load(ticket, url)?;
        self.current = Some(LoadedSource {
            ticket,
            url: url.to_string(),
        });
        debug!(%session, generation = ticket.generation, url, "Source loaded");
        Ok(ticket)
    }

    /// Start output for the owner's source
    pub fn play(&mut self, session: SessionId) -> Result<(), ResourceError> {
        self.ensure_source(session)?;
        self.channel.play();
        Ok(())
    }

    /// Pause output for the owner's source
    pub fn pause(&mut self, session: SessionId) -> Result<(), ResourceError> {
        self.ensure_source(session)?;
        self.channel.pause();
        Ok(())
    }

    /// Seek the owner's source
    pub fn seek(&mut self, session: SessionId, position: Duration) -> Result<(), ResourceError> {
        self.ensure_source(session)?;
        self.channel.seek(position);
        Ok(())
    }

    /// Current owner, if any
    pub fn owner(&self) -> Option<SessionId> {
        self.active
    }

    /// Whether `session` owns the channel
    pub fn is_owner(&self, session: SessionId) -> bool {
        self.active == Some(session)
    }

    /// Whether `ticket` describes the source currently loaded
    pub fn is_current(&self, ticket: &SourceTicket) -> bool {
        self.active == Some(ticket.session)
            && self.current.as_ref().is_some_and(|c| c.ticket == *ticket)
    }

    /// Ticket of the loaded source
    pub fn current_ticket(&self) -> Option<SourceTicket> {
        self.current.as_ref().map(|c| c.ticket)
    }

    /// URL of the loaded source
    pub fn loaded_url(&self) -> Option<&str> {
        self.current.as_ref().map(|c| c.url.as_str())
    }

    /// Number of loads issued so far
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Collect status from the channel
    pub fn poll_status(&mut self, elapsed: Duration) -> Vec<StatusUpdate> {
        self.channel.poll_status(elapsed)
    }

    fn ensure_owner(&self, session: SessionId) -> Result<(), ResourceError> {
        if self.active == Some(session) {
            Ok(())
        } else {
            Err(ResourceError::NotOwner {
                session,
                owner: self.active,
            })
        }
    }

    fn ensure_source(&self, session: SessionId) -> Result<(), ResourceError> {
        self.ensure_owner(session)?;
        if self.current.is_none() {
            return Err(ResourceError::NoSource);
        }
        Ok(())
    }

    fn unload_current(&mut self) {
        if let Some(previous) = self.current.take() {
            trace!(generation = previous.ticket.generation, "Unloading source");
            self.channel.unload();
        }
    }
}

impl std::fmt::Debug for PlaybackResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackResource")
            .field("active", &self.active)
            .field("current", &self.current)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulated::SimulatedChannel;

    fn resource() -> (PlaybackResource, crate::simulated::ChannelLog) {
        let channel = SimulatedChannel::new();
        let log = channel.log();
        (PlaybackResource::new(Box::new(channel)), log)
    }

    #[test]
    fn acquire_evicts_previous_owner() {
        let (mut resource, log) = resource();
        let a = SessionId::generate();
        let b = SessionId::generate();

        assert_eq!(resource.acquire(a), None);
        resource.load_source(a, "a.mp3").unwrap();

        assert_eq!(resource.acquire(b), Some(a));
        assert_eq!(resource.owner(), Some(b));
        assert!(resource.loaded_url().is_none());
        assert_eq!(log.snapshot().overlapping_loads, 0);
    }

    #[test]
    fn reacquire_by_owner_keeps_source() {
        let (mut resource, _log) = resource();
        let a = SessionId::generate();

        resource.acquire(a);
        resource.load_source(a, "a.mp3").unwrap();
        assert_eq!(resource.acquire(a), None);
        assert_eq!(resource.loaded_url(), Some("a.mp3"));
    }

    #[test]
    fn release_by_non_owner_is_noop() {
        let (mut resource, _log) = resource();
        let a = SessionId::generate();
        let stranger = SessionId::generate();

        resource.acquire(a);
        assert!(!resource.release(stranger));
        assert_eq!(resource.owner(), Some(a));

        assert!(resource.release(a));
        assert!(!resource.release(a));
        assert_eq!(resource.owner(), None);
    }

    #[test]
    fn stale_session_cannot_mutate_channel() {
        let (mut resource, _log) = resource();
        let a = SessionId::generate();
        let b = SessionId::generate();

        resource.acquire(a);
        resource.acquire(b);

        let err = resource.load_source(a, "a.mp3").unwrap_err();
        assert_eq!(
            err,
            ResourceError::NotOwner {
                session: a,
                owner: Some(b)
            }
        );
        assert!(matches!(resource.play(a), Err(ResourceError::NotOwner { .. })));
        assert!(matches!(
            resource.seek(a, Duration::from_secs(1)),
            Err(ResourceError::NotOwner { .. })
        ));
    }

    #[test]
    fn transport_without_source_fails() {
        let (mut resource, _log) = resource();
        let a = SessionId::generate();
        resource.acquire(a);
        assert_eq!(resource.play(a), Err(ResourceError::NoSource));
    }

    #[test]
    fn new_load_invalidates_previous_ticket() {
        let (mut resource, log) = resource();
        let a = SessionId::generate();
        resource.acquire(a);

        let first = resource.load_source(a, "one.mp3").unwrap();
        let second = resource.load_source(a, "two.mp3").unwrap();

        assert!(!resource.is_current(&first));
        assert!(resource.is_current(&second));
        assert_eq!(resource.loaded_url(), Some("two.mp3"));
        assert_eq!(log.snapshot().loads, vec!["one.mp3", "two.mp3"]);
        assert_eq!(log.snapshot().overlapping_loads, 0);
    }

    #[test]
    fn refused_load_leaves_no_source() {
        let channel = SimulatedChannel::new().refusing("bad.mp3");
        let mut resource = PlaybackResource::new(Box::new(channel));
        let a = SessionId::generate();
        resource.acquire(a);

        assert!(matches!(
            resource.load_source(a, "bad.mp3"),
            Err(ResourceError::Channel(_))
        ));
        assert!(resource.current_ticket().is_none());
    }
}
