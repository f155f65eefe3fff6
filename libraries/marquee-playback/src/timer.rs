//! Preview countdown
//!
//! Wall-clock countdown owned by a preview session. The owner calls
//! `tick()` once per second; the timer is independent of media progress,
//! so a paused preview keeps counting down.

use serde::{Deserialize, Serialize};

/// Result of one countdown tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerTick {
    /// Seconds left after this tick
    pub remaining: u32,

    /// This tick exhausted the countdown; reported exactly once
    pub expired: bool,
}

/// Countdown with an exactly-once expiry
///
/// After expiry or `stop()` the timer is inert until started again.
#[derive(Debug, Clone, Default)]
pub struct PreviewTimer {
    total: u32,
    remaining: u32,
    running: bool,
}

impl PreviewTimer {
    /// Create an idle timer
    pub fn new() -> Self {
        Self::default()
    }

    /// Start counting down from `total_seconds`
    ///
    /// A timer that is already running is stopped first, so two
    /// countdowns can never overlap. A zero-length countdown expires on
    /// its first tick.
    pub fn start(&mut self, total_seconds: u32) {
        if self.running {
            self.stop();
        }
        self.total = total_seconds;
        self.remaining = total_seconds;
        self.running = true;
    }

    /// Cancel the countdown; expiry will not be reported
    ///
    /// Returns whether the timer was running.
    pub fn stop(&mut self) -> bool {
        let was_running = self.running;
        self.running = false;
        was_running
    }

    /// Advance the countdown by one second
    ///
    /// Returns `None` when the timer is not running.
    pub fn tick(&mut self) -> Option<TimerTick> {
        if !self.running {
            return None;
        }

        self.remaining = self.remaining.saturating_sub(1);
        let expired = self.remaining == 0;
        if expired {
            self.running = false;
        }

        Some(TimerTick {
            remaining: self.remaining,
            expired,
        })
    }

    /// Whether a countdown is in progress
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Seconds left
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Length of the current (or last) countdown
    pub fn total(&self) -> u32 {
        self.total
    }
}

/// Snapshot of a running preview
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewState {
    /// Seconds left
    pub remaining_seconds: u32,

    /// Preview length
    pub total_seconds: u32,

    /// Track or slide being shown
    pub current_index: usize,
}
