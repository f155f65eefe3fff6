//! In-memory audio channel
//!
//! Behaves like a platform player without producing sound: a load reports
//! `is_loaded` on the next poll, playback advances with wall-clock time,
//! and the end of the media is reported once via `did_just_finish`.
//! Used by the CLI and by tests.

use crate::channel::{AudioChannel, ChannelStatus, StatusUpdate};
use crate::error::ChannelError;
use crate::session::SourceTicket;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Default media length when no duration is registered for a URL
const DEFAULT_DURATION: Duration = Duration::from_secs(180);

/// Simulated platform audio channel
#[derive(Debug)]
pub struct SimulatedChannel {
    current: Option<SimulatedSource>,
    default_duration: Duration,
    durations: HashMap<String, Duration>,
    refused: HashSet<String>,
    failing: HashSet<String>,
    log: ChannelLog,
}

#[derive(Debug)]
struct SimulatedSource {
    ticket: SourceTicket,
    url: String,
    duration: Duration,
    position: Duration,
    playing: bool,
    load_reported: bool,
    finished: bool,
    failed: bool,
}

impl Default for SimulatedChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedChannel {
    /// Create a channel where every source lasts three minutes
    pub fn new() -> Self {
        Self {
            current: None,
            default_duration: DEFAULT_DURATION,
            durations: HashMap::new(),
            refused: HashSet::new(),
            failing: HashSet::new(),
            log: ChannelLog::default(),
        }
    }

    /// Set the length of sources without a registered duration
    #[must_use]
    pub fn with_default_duration(mut self, duration: Duration) -> Self {
        self.default_duration = duration;
        self
    }

    /// Register the length of one URL
    #[must_use]
    pub fn with_duration(mut self, url: impl Into<String>, duration: Duration) -> Self {
        self.durations.insert(url.into(), duration);
        self
    }

    /// Refuse `url` synchronously in `load`
    #[must_use]
    pub fn refusing(mut self, url: impl Into<String>) -> Self {
        self.refused.insert(url.into());
        self
    }

    /// Accept `url` but report a load error on the next poll
    #[must_use]
    pub fn failing(mut self, url: impl Into<String>) -> Self {
        self.failing.insert(url.into());
        self
    }

    /// Shared handle to the call log
    pub fn log(&self) -> ChannelLog {
        self.log.clone()
    }
}

impl AudioChannel for SimulatedChannel {
    fn load(&mut self, ticket: SourceTicket, url: &str) -> Result<(), ChannelError> {
        if self.refused.contains(url) {
            return Err(ChannelError::new(format!("unsupported source: {url}")));
        }

        self.log.record(|log| {
            if self.current.is_some() {
                log.overlapping_loads += 1;
            }
            log.loads.push(url.to_string());
        });

        let duration = self
            .durations
            .get(url)
            .copied()
            .unwrap_or(self.default_duration);

        self.current = Some(SimulatedSource {
            ticket,
            url: url.to_string(),
            duration,
            position: Duration::ZERO,
            playing: false,
            load_reported: false,
            finished: false,
            failed: false,
        });
        Ok(())
    }

    fn unload(&mut self) {
        if self.current.take().is_some() {
            self.log.record(|log| log.unloads += 1);
        }
    }

    fn play(&mut self) {
        if let Some(source) = self.current.as_mut() {
            if source.finished {
                source.position = Duration::ZERO;
                source.finished = false;
            }
            source.playing = true;
            self.log.record(|log| log.plays += 1);
        }
    }

    fn pause(&mut self) {
        if let Some(source) = self.current.as_mut() {
            source.playing = false;
        }
    }

    fn seek(&mut self, position: Duration) {
        if let Some(source) = self.current.as_mut() {
            source.position = position.min(source.duration);
            source.finished = false;
            self.log.record(|log| log.seeks.push(position));
        }
    }

    fn poll_status(&mut self, elapsed: Duration) -> Vec<StatusUpdate> {
        let Some(source) = self.current.as_mut() else {
            return Vec::new();
        };

        if source.failed {
            return Vec::new();
        }

        if self.failing.contains(&source.url) {
            source.failed = true;
            let status = ChannelStatus::failed(format!("could not decode {}", source.url));
            return vec![StatusUpdate::new(source.ticket, status)];
        }

        if !source.load_reported {
            source.load_reported = true;
            let status = ChannelStatus {
                is_playing: source.playing,
                position: source.position,
                ..ChannelStatus::loaded(source.duration)
            };
            return vec![StatusUpdate::new(source.ticket, status)];
        }

        if !source.playing {
            return Vec::new();
        }

        source.position += elapsed;
        if source.position >= source.duration {
            source.position = source.duration;
            source.playing = false;
            source.finished = true;
            return vec![StatusUpdate::new(
                source.ticket,
                ChannelStatus::finished(source.duration),
            )];
        }

        vec![StatusUpdate::new(
            source.ticket,
            ChannelStatus::playing(source.position, source.duration),
        )]
    }
}

/// Calls observed by a `SimulatedChannel`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelLogSnapshot {
    /// URLs loaded, in order
    pub loads: Vec<String>,
    /// Number of unloads
    pub unloads: usize,
    /// Loads issued while another source was still loaded
    pub overlapping_loads: usize,
    /// Number of play calls on a loaded source
    pub plays: usize,
    /// Seek targets, in order
    pub seeks: Vec<Duration>,
}

/// Shared, cloneable view of a simulated channel's call log
#[derive(Debug, Clone, Default)]
pub struct ChannelLog {
    inner: Arc<Mutex<ChannelLogSnapshot>>,
}

impl ChannelLog {
    /// Copy of the current log
    pub fn snapshot(&self) -> ChannelLogSnapshot {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self, f: impl FnOnce(&mut ChannelLogSnapshot)) {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard);
    }
}
