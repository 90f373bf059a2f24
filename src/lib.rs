//! lyricsync - lyrics acquisition, synchronization and rendering state
//!
//! Given the playing track and its position, finds lyrics, keeps track of
//! the active line and tells a UI where to scroll.

pub mod api;
pub mod cache;
pub mod encoding;
pub mod error;
pub mod features;
pub mod utils;

pub use api::{LrclibClient, LyricsPayload, LyricsService};
pub use cache::{CachedLyricsService, LyricsCache};
pub use error::{EnrichmentError, ServiceError};
pub use features::lyrics::{
    AcquisitionResult, EngineState, LyricsCoordinator, LyricsLine, LyricsMode, TrackKey, TrackQuery,
};
