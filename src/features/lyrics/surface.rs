//! Per-surface lyrics rendering state
//!
//! A surface (full-screen page, mini panel, ...) feeds position ticks and
//! user gestures in and gets the active line plus a scroll action back.
//! Nothing here is shared between surfaces.

use std::time::Instant;

use super::positioner::{LineGeometry, Positioner, PositionerMode, ScrollAction, ScrollConfig};
use super::resolver::resolve_active_index;
use super::types::LyricsLine;

/// Receives seek requests from a lyrics surface
pub trait PlaybackControl {
    fn seek(&self, position_secs: f64);
}

/// Outcome of a position tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceUpdate {
    pub active_index: Option<usize>,
    /// The active line differs from the previous tick
    pub changed: bool,
    pub action: ScrollAction,
}

#[derive(Debug, Clone)]
pub struct LyricsSurface {
    positioner: Positioner,
    active_index: Option<usize>,
}

impl LyricsSurface {
    pub fn new(mode: PositionerMode, config: ScrollConfig) -> Self {
        Self {
            positioner: Positioner::new(mode, config),
            active_index: None,
        }
    }

    pub fn active_index(&self) -> Option<usize> {
        self.active_index
    }

    pub fn positioner(&self) -> &Positioner {
        &self.positioner
    }

    /// Resolve the active line for `position` and reposition if needed
    pub fn on_position(
        &mut self,
        lines: &[LyricsLine],
        position: f64,
        geometry: &[LineGeometry],
        container_height: f32,
        now: Instant,
    ) -> SurfaceUpdate {
        let active_index = resolve_active_index(lines, position);
        let changed = active_index != self.active_index;
        self.active_index = active_index;

        let action = self
            .positioner
            .update(active_index, geometry, container_height, now);

        SurfaceUpdate {
            active_index,
            changed,
            action,
        }
    }

    pub fn on_user_scroll(&mut self, now: Instant) {
        self.positioner.user_scroll(now);
    }

    /// Seek playback to the start of line `index`. Returns false for a bad index.
    pub fn click_line(
        &self,
        lines: &[LyricsLine],
        index: usize,
        playback: &dyn PlaybackControl,
    ) -> bool {
        match lines.get(index) {
            Some(line) => {
                tracing::debug!("Seeking to lyric line {} at {:.2}s", index, line.time);
                playback.seek(line.time);
                true
            }
            None => false,
        }
    }

    /// Advance carousel animation; returns the offset to paint
    pub fn tick(&mut self, dt: f32) -> f32 {
        self.positioner.tick(dt)
    }

    /// Forget everything, e.g. on track change
    pub fn reset(&mut self) {
        self.active_index = None;
        self.positioner.reset();
    }
}
