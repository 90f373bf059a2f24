//! Auto-scroll positioning for lyric surfaces
//!
//! Two presentations are supported:
//! - Carousel: the line stack is translated so the active line's midpoint
//!   sits at the container's vertical center, eased with a spring.
//! - List: a scrollable viewport is asked to smooth-scroll the active line
//!   into its center.
//!
//! A user scroll gesture suspends automatic repositioning. Every gesture
//! restarts the suspension window; once it elapses without further input the
//! positioner catches up with the current active line.

use std::time::{Duration, Instant};

use super::spring::{Spring, SpringParams};

/// Default time automatic scrolling stays suspended after a user gesture
pub const MANUAL_SCROLL_TIMEOUT: Duration = Duration::from_secs(5);

/// Vertical placement of a rendered line inside its container
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LineGeometry {
    /// Distance from the top of the container (logical pixels)
    pub top: f32,
    pub height: f32,
}

impl LineGeometry {
    pub fn new(top: f32, height: f32) -> Self {
        Self { top, height }
    }

    pub fn midpoint(&self) -> f32 {
        self.top + self.height / 2.0
    }
}

/// Lay out lines of the given heights top to bottom with a fixed gap
pub fn stack_lines(heights: &[f32], spacing: f32) -> Vec<LineGeometry> {
    let mut top = 0.0;
    heights
        .iter()
        .map(|&height| {
            let geometry = LineGeometry::new(top, height);
            top += height + spacing;
            geometry
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollConfig {
    pub manual_scroll_timeout: Duration,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            manual_scroll_timeout: MANUAL_SCROLL_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionerMode {
    Carousel,
    List,
}

/// What the rendering surface should do after an update
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScrollAction {
    /// Leave the current offset alone
    None,
    /// Animate the carousel translation towards `target_offset`
    Carousel { target_offset: f32 },
    /// Smooth-scroll the viewport so `index` is centered
    ScrollIntoView { index: usize, scroll_top: f32 },
}

/// Per-surface scroll bookkeeping
#[derive(Debug, Clone, Default)]
pub struct ScrollState {
    /// Active line the surface was last positioned for
    pub active_index: Option<usize>,
    /// Last computed target offset
    pub offset: f32,
    user_scrolling: bool,
    manual_until: Option<Instant>,
}

impl ScrollState {
    /// Record a user gesture, (re)starting the suspension window
    pub fn begin_user_scroll(&mut self, now: Instant, timeout: Duration) {
        self.user_scrolling = true;
        self.manual_until = Some(now + timeout);
    }

    /// Whether automatic positioning is suspended, clearing an expired window
    pub fn is_user_scrolling(&mut self, now: Instant) -> bool {
        if let Some(until) = self.manual_until {
            if now >= until {
                self.user_scrolling = false;
                self.manual_until = None;
            }
        }
        self.user_scrolling
    }

    pub fn manual_until(&self) -> Option<Instant> {
        self.manual_until
    }
}

/// Keeps the active line in view for one rendering surface
#[derive(Debug, Clone)]
pub struct Positioner {
    mode: PositionerMode,
    config: ScrollConfig,
    state: ScrollState,
    spring: Spring,
    /// Line geometry and container height the current offset was computed for
    layout: Option<(Vec<LineGeometry>, f32)>,
    /// A reposition was skipped while the user was scrolling
    pending: bool,
}

impl Positioner {
    pub fn new(mode: PositionerMode, config: ScrollConfig) -> Self {
        Self {
            mode,
            config,
            state: ScrollState::default(),
            spring: Spring::from_params(0.0, SpringParams::POS_Y),
            layout: None,
            pending: false,
        }
    }

    pub fn carousel(config: ScrollConfig) -> Self {
        Self::new(PositionerMode::Carousel, config)
    }

    pub fn list(config: ScrollConfig) -> Self {
        Self::new(PositionerMode::List, config)
    }

    pub fn mode(&self) -> PositionerMode {
        self.mode
    }

    pub fn state(&self) -> &ScrollState {
        &self.state
    }

    /// Record a user scroll gesture
    pub fn user_scroll(&mut self, now: Instant) {
        tracing::debug!("Manual lyrics scroll, suspending auto-scroll");
        self.state
            .begin_user_scroll(now, self.config.manual_scroll_timeout);
    }

    pub fn is_user_scrolling(&mut self, now: Instant) -> bool {
        self.state.is_user_scrolling(now)
    }

    /// Recompute the target for the active line.
    ///
    /// Only repositions when the active index or the line set changed, or when
    /// a reposition was deferred by a manual scroll that has since expired.
    pub fn update(
        &mut self,
        active_index: Option<usize>,
        geometry: &[LineGeometry],
        container_height: f32,
        now: Instant,
    ) -> ScrollAction {
        let changed = active_index != self.state.active_index
            || !self.layout_matches(geometry, container_height);

        if !changed && !self.pending {
            return ScrollAction::None;
        }

        if self.state.is_user_scrolling(now) {
            self.pending = true;
            return ScrollAction::None;
        }
        self.pending = false;
        self.state.active_index = active_index;
        self.layout = Some((geometry.to_vec(), container_height));

        let Some((index, line)) = active_index.and_then(|i| geometry.get(i).map(|g| (i, *g)))
        else {
            return ScrollAction::None;
        };

        match self.mode {
            PositionerMode::Carousel => {
                let target_offset = container_height / 2.0 - line.midpoint();
                self.state.offset = target_offset;
                self.spring.set_target(target_offset as f64);
                ScrollAction::Carousel { target_offset }
            }
            PositionerMode::List => {
                let scroll_top = (line.midpoint() - container_height / 2.0).max(0.0);
                self.state.offset = scroll_top;
                ScrollAction::ScrollIntoView { index, scroll_top }
            }
        }
    }

    fn layout_matches(&self, geometry: &[LineGeometry], container_height: f32) -> bool {
        matches!(
            &self.layout,
            Some((laid_out, height)) if laid_out.as_slice() == geometry && *height == container_height
        )
    }

    /// Advance the carousel spring by `dt` seconds and return the offset to paint
    pub fn tick(&mut self, dt: f32) -> f32 {
        self.spring.update(dt as f64);
        self.current_offset()
    }

    /// Current (animated) carousel translation
    pub fn current_offset(&self) -> f32 {
        self.spring.position() as f32
    }

    /// Drop positioning history, e.g. when the track changes
    pub fn reset(&mut self) {
        self.state.active_index = None;
        self.layout = None;
        self.pending = false;
        self.spring.set_position(0.0);
        self.state.offset = 0.0;
    }
}
