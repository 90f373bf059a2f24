//! Lyrics module - acquisition, synchronization and rendering state
//!
//! - `parser`: LRC parsing and serialization
//! - `coordinator`: acquisition pipeline and engine state
//! - `enrichment`: background romanization
//! - `resolver`, `positioner`, `surface`: per-tick active line and scrolling
//! - `mode`: original / romanized / both presentation

pub mod coordinator;
pub mod enrichment;
pub mod mode;
pub mod parser;
pub mod positioner;
pub mod resolver;
pub mod spring;
pub mod surface;
pub mod types;

// Re-export commonly used items
pub use coordinator::{AcquisitionConfig, AcquisitionStrategy, LyricsCoordinator};
pub use enrichment::{KanaRomanizer, Romanizer};
pub use mode::{LyricsMode, RenderedLine};
pub use parser::{parse_lrc, stringify_lrc};
pub use positioner::{
    LineGeometry, Positioner, PositionerMode, ScrollAction, ScrollConfig, stack_lines,
};
pub use resolver::resolve_active_index;
pub use surface::{LyricsSurface, PlaybackControl, SurfaceUpdate};
pub use types::*;
