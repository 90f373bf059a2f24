//! Lyrics service APIs
//!
//! The service boundary consumed by the acquisition coordinator, and the
//! LRCLIB client implementing it over HTTP.

pub mod lrclib;
pub mod service;

pub use lrclib::LrclibClient;
pub use service::{CachePoll, LyricsPayload, LyricsService, ProgressReporter};
