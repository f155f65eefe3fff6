//! Engine configuration and shared small types

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What happens when the last track of a playlist finishes naturally
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CompletionPolicy {
    /// Wrap to the first track and keep playing
    #[default]
    Loop,

    /// Stop on the last track
    Stop,
}

/// Navigation direction for manual slide / track changes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Towards the end, wrapping to the start
    Forward,

    /// Towards the start, wrapping to the end
    Backward,
}

impl Direction {
    /// Step `index` one place in this direction within `len` entries
    ///
    /// Returns `index` unchanged for empty or single-entry lists.
    pub fn step(self, index: usize, len: usize) -> usize {
        if len <= 1 {
            return index.min(len.saturating_sub(1));
        }
        match self {
            Direction::Forward => (index + 1) % len,
            Direction::Backward => (index + len - 1) % len,
        }
    }
}

/// Seek target, either absolute or relative to the track duration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SeekTarget {
    /// Absolute position in seconds
    Seconds(f64),

    /// Fraction of the duration, 0.0 to 1.0
    Fraction(f64),
}

/// Configuration for the playback engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Length of an anonymous preview in seconds (default: 30)
    pub preview_seconds: u32,

    /// Slideshow autoplay interval in milliseconds (default: 3000)
    pub slideshow_interval_ms: u64,

    /// Start slideshow autoplay on grant (default: true)
    pub slideshow_autoplay: bool,

    /// Start the first track as soon as it has loaded (default: false)
    pub playlist_autoplay: bool,

    /// Behavior at the end of a playlist (default: Loop)
    pub completion: CompletionPolicy,

    /// Skip tracks that cannot be played (default: true)
    pub skip_unplayable: bool,

    /// Runtime scheduler resolution in milliseconds (default: 100)
    pub tick_resolution_ms: u64,

    /// Capacity of the runtime event broadcast (default: 256)
    pub event_buffer: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            preview_seconds: 30,
            slideshow_interval_ms: 3000,
            slideshow_autoplay: true,
            playlist_autoplay: false,
            completion: CompletionPolicy::Loop,
            skip_unplayable: true,
            tick_resolution_ms: 100,
            event_buffer: 256,
        }
    }
}

impl EngineConfig {
    /// Slideshow interval as a `Duration`
    pub fn slideshow_interval(&self) -> Duration {
        Duration::from_millis(self.slideshow_interval_ms)
    }

    /// Scheduler resolution as a `Duration`
    pub fn tick_resolution(&self) -> Duration {
        Duration::from_millis(self.tick_resolution_ms)
    }

    /// Validate configuration values
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.preview_seconds == 0 {
            return Err("preview_seconds must be at least 1".to_string());
        }
        if self.slideshow_interval_ms == 0 {
            return Err("slideshow_interval_ms must be greater than 0".to_string());
        }
        if self.tick_resolution_ms == 0 || self.tick_resolution_ms > 1000 {
            return Err("tick_resolution_ms must be between 1 and 1000".to_string());
        }
        if self.event_buffer == 0 {
            return Err("event_buffer must be greater than 0".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.preview_seconds, 30);
        assert_eq!(config.slideshow_interval(), Duration::from_secs(3));
        assert_eq!(config.completion, CompletionPolicy::Loop);
        assert!(config.skip_unplayable);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_values() {
        let config = EngineConfig {
            preview_seconds: 0,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());

        let config = EngineConfig {
            slideshow_interval_ms: 0,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_config_uses_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"preview_seconds": 10, "completion": "stop"}"#).unwrap();
        assert_eq!(config.preview_seconds, 10);
        assert_eq!(config.completion, CompletionPolicy::Stop);
        assert_eq!(config.slideshow_interval_ms, 3000);
    }

    #[test]
    fn direction_wraps_both_ways() {
        assert_eq!(Direction::Forward.step(2, 3), 0);
        assert_eq!(Direction::Backward.step(0, 3), 2);
        assert_eq!(Direction::Forward.step(0, 1), 0);
        assert_eq!(Direction::Backward.step(0, 0), 0);
    }
}
