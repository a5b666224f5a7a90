use super::window::{DayWindow, Extension};
use tracing::debug;

/// Scroll extents of the calendar container, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScrollMetrics {
    pub scroll_top: u32,
    pub scroll_height: u32,
    pub client_height: u32,
}

impl ScrollMetrics {
    pub fn distance_from_top(&self) -> u32 {
        self.scroll_top
    }

    pub fn distance_from_bottom(&self) -> u32 {
        self.scroll_height
            .saturating_sub(self.scroll_top.saturating_add(self.client_height))
    }
}

/// The scrollable surface the calendar is rendered into.
pub trait Viewport {
    fn metrics(&self) -> ScrollMetrics;
    fn set_scroll_top(&mut self, offset: u32);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingPrepend {
    previous_top: u32,
    previous_height: u32,
}

/// Turns scroll positions into window extensions and keeps the visible
/// content still while days are prepended.
///
/// Prepending is two-phase: [`ScrollCoordinator::on_scroll`] changes the
/// window and records the extents, and [`ScrollCoordinator::after_layout`]
/// runs once the new content height is known, shifts the offset by the
/// height delta and releases the window's guard.
#[derive(Debug, Clone)]
pub struct ScrollCoordinator {
    threshold: u32,
    pending: Option<PendingPrepend>,
}

impl ScrollCoordinator {
    pub fn new(threshold: u32) -> Self {
        ScrollCoordinator {
            threshold,
            pending: None,
        }
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn is_compensating(&self) -> bool {
        self.pending.is_some()
    }

    pub fn on_scroll<V: Viewport + ?Sized>(
        &mut self,
        window: &mut DayWindow,
        viewport: &V,
    ) -> Option<Extension> {
        if window.is_empty() {
            return None;
        }
        let metrics = viewport.metrics();
        if metrics.distance_from_top() <= self.threshold {
            if let Some(ext) = window.extend_past() {
                self.pending = Some(PendingPrepend {
                    previous_top: metrics.scroll_top,
                    previous_height: metrics.scroll_height,
                });
                return Some(ext);
            }
        }
        if metrics.distance_from_bottom() <= self.threshold {
            if let Some(ext) = window.extend_future() {
                window.finish_extension();
                return Some(ext);
            }
        }
        None
    }

    /// Applies the pending prepend compensation, if any. Returns whether the
    /// offset was changed.
    pub fn after_layout<V: Viewport + ?Sized>(
        &mut self,
        window: &mut DayWindow,
        viewport: &mut V,
    ) -> bool {
        let Some(pending) = self.pending.take() else {
            return false;
        };
        let new_height = viewport.metrics().scroll_height;
        let delta = new_height.saturating_sub(pending.previous_height);
        let target = pending.previous_top.saturating_add(delta);
        viewport.set_scroll_top(target);
        window.finish_extension();
        debug!(
            previous_top = pending.previous_top,
            delta,
            target,
            "compensated scroll after prepend"
        );
        true
    }
}
