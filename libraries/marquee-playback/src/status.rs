//! Status synchronization
//!
//! Bridges raw channel status pushes into controller state. Every update
//! carries the `SourceTicket` of the load that produced it; updates whose
//! ticket is no longer the resource's current one are discarded before
//! they reach any component.

use crate::channel::{ChannelStatus, StatusUpdate};
use crate::resource::PlaybackResource;
use crate::session::SessionId;
use tracing::trace;

/// Component that consumes channel status for one session
pub trait StatusSink {
    /// Session the sink synchronizes
    fn session_id(&self) -> SessionId;

    /// Apply a status snapshot that is known to be current
    fn apply_status(&mut self, status: &ChannelStatus, resource: &mut PlaybackResource);
}

/// Result of delivering one status update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Update was applied to the sink
    Applied,
    /// Update belonged to a superseded session or an earlier source
    Stale,
}

/// Filters and forwards channel status
#[derive(Debug, Default)]
pub struct StatusSync {
    applied: u64,
    discarded: u64,
}

impl StatusSync {
    /// Create a new synchronizer
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `update` to `sink` if it describes the currently loaded source
    pub fn deliver(
        &mut self,
        update: &StatusUpdate,
        resource: &mut PlaybackResource,
        sink: &mut dyn StatusSink,
    ) -> SyncOutcome {
        if update.ticket.session != sink.session_id() || !resource.is_current(&update.ticket) {
            self.discard(update);
            return SyncOutcome::Stale;
        }

        sink.apply_status(&update.status, resource);
        self.applied += 1;
        SyncOutcome::Applied
    }

    /// Record an update that has no live recipient
    pub fn discard(&mut self, update: &StatusUpdate) {
        self.discarded += 1;
        trace!(
            session = %update.ticket.session,
            generation = update.ticket.generation,
            "Discarding stale status update"
        );
    }

    /// Number of updates applied so far
    pub fn applied(&self) -> u64 {
        self.applied
    }

    /// Number of updates discarded so far
    pub fn discarded(&self) -> u64 {
        self.discarded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulated::SimulatedChannel;
    use std::time::Duration;

    struct Recorder {
        session: SessionId,
        seen: Vec<ChannelStatus>,
    }

    impl StatusSink for Recorder {
        fn session_id(&self) -> SessionId {
            self.session
        }

        fn apply_status(&mut self, status: &ChannelStatus, _resource: &mut PlaybackResource) {
            self.seen.push(status.clone());
        }
    }

    #[test]
    fn applies_current_ticket() {
        let mut resource = PlaybackResource::new(Box::new(SimulatedChannel::new()));
        let session = SessionId::generate();
        resource.acquire(session);
        let ticket = resource.load_source(session, "a.mp3").unwrap();

        let mut sync = StatusSync::new();
        let mut sink = Recorder {
            session,
            seen: Vec::new(),
        };
        let update = StatusUpdate::new(ticket, ChannelStatus::loaded(Duration::from_secs(10)));

        assert_eq!(
            sync.deliver(&update, &mut resource, &mut sink),
            SyncOutcome::Applied
        );
        assert_eq!(sink.seen.len(), 1);
        assert_eq!(sync.applied(), 1);
    }

    #[test]
    fn drops_update_from_previous_source() {
        let mut resource = PlaybackResource::new(Box::new(SimulatedChannel::new()));
        let session = SessionId::generate();
        resource.acquire(session);
        let old = resource.load_source(session, "a.mp3").unwrap();
        resource.load_source(session, "b.mp3").unwrap();

        let mut sync = StatusSync::new();
        let mut sink = Recorder {
            session,
            seen: Vec::new(),
        };
        let update = StatusUpdate::new(old, ChannelStatus::finished(Duration::from_secs(10)));

        assert_eq!(
            sync.deliver(&update, &mut resource, &mut sink),
            SyncOutcome::Stale
        );
        assert!(sink.seen.is_empty());
        assert_eq!(sync.discarded(), 1);
    }

    #[test]
    fn drops_update_from_superseded_session() {
        let mut resource = PlaybackResource::new(Box::new(SimulatedChannel::new()));
        let a = SessionId::generate();
        let b = SessionId::generate();
        resource.acquire(a);
        let ticket = resource.load_source(a, "a.mp3").unwrap();
        resource.acquire(b);

        let mut sync = StatusSync::new();
        let mut sink = Recorder {
            session: a,
            seen: Vec::new(),
        };
        let update = StatusUpdate::new(ticket, ChannelStatus::playing(Duration::ZERO, Duration::from_secs(1)));

        assert_eq!(
            sync.deliver(&update, &mut resource, &mut sink),
            SyncOutcome::Stale
        );
        assert!(sink.seen.is_empty());
    }
}
