//! Marquee CLI Library
//!
//! Headless front end for the playback engine. The binary lives in
//! `main.rs`; configuration loading is exposed here for testing.

pub mod settings;

pub use settings::Settings;
