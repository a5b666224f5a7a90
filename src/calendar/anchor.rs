use super::scroll::Viewport;
use super::window::DayWindow;
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AnchorState {
    Waiting,
    Armed { deadline: Instant },
    Done,
    Cancelled,
}

/// One-shot scroll that brings "today" to `offset` pixels below the top of
/// the viewport, `delay` after the first non-empty render.
#[derive(Debug, Clone)]
pub struct InitialAnchorScroller {
    delay: Duration,
    offset: u32,
    state: AnchorState,
}

impl InitialAnchorScroller {
    pub fn new(delay: Duration, offset: u32) -> Self {
        InitialAnchorScroller {
            delay,
            offset,
            state: AnchorState::Waiting,
        }
    }

    /// Arms the deferred scroll on the first render of a non-empty window.
    pub fn on_render(&mut self, window: &DayWindow, now: Instant) {
        if self.state == AnchorState::Waiting && !window.is_empty() {
            self.state = AnchorState::Armed {
                deadline: now + self.delay,
            };
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            AnchorState::Armed { deadline } => Some(deadline),
            _ => None,
        }
    }

    /// Fires once the deadline has passed. `today_top` is the measured
    /// offset of today's element within the content; when it is absent the
    /// scroll is skipped. Returns whether the viewport moved.
    pub fn poll<V: Viewport + ?Sized>(
        &mut self,
        now: Instant,
        today_top: Option<u32>,
        viewport: &mut V,
    ) -> bool {
        let AnchorState::Armed { deadline } = self.state else {
            return false;
        };
        if now < deadline {
            return false;
        }
        self.state = AnchorState::Done;
        match today_top {
            Some(top) => {
                let target = top.saturating_sub(self.offset);
                viewport.set_scroll_top(target);
                debug!(today_top = top, target, "scrolled to today");
                true
            }
            None => {
                debug!("today is outside the window, initial scroll skipped");
                false
            }
        }
    }

    /// Drops a pending scroll; called when the calendar is torn down.
    pub fn cancel(&mut self) {
        if matches!(self.state, AnchorState::Armed { .. } | AnchorState::Waiting) {
            self.state = AnchorState::Cancelled;
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, AnchorState::Done | AnchorState::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::scroll::ScrollMetrics;
    use crate::config::CalendarConfig;
    use chrono::NaiveDate;

    #[derive(Default)]
    struct Recorder {
        top: u32,
        sets: usize,
    }

    impl Viewport for Recorder {
        fn metrics(&self) -> ScrollMetrics {
            ScrollMetrics {
                scroll_top: self.top,
                scroll_height: 10_000,
                client_height: 500,
            }
        }

        fn set_scroll_top(&mut self, offset: u32) {
            self.top = offset;
            self.sets += 1;
        }
    }

    fn window() -> DayWindow {
        let today = NaiveDate::from_ymd_opt(2024, 3, 14).unwrap();
        DayWindow::initialize(today, &CalendarConfig::default())
    }

    #[test]
    fn waits_for_the_delay_then_scrolls_once() {
        let mut anchor = InitialAnchorScroller::new(Duration::from_millis(150), 80);
        let mut viewport = Recorder::default();
        let start = Instant::now();
        anchor.on_render(&window(), start);
        assert_eq!(anchor.deadline(), Some(start + Duration::from_millis(150)));

        assert!(!anchor.poll(start + Duration::from_millis(100), Some(1760), &mut viewport));
        assert_eq!(viewport.sets, 0);

        assert!(anchor.poll(start + Duration::from_millis(150), Some(1760), &mut viewport));
        assert_eq!(viewport.top, 1680);

        anchor.on_render(&window(), start + Duration::from_secs(1));
        assert!(!anchor.poll(start + Duration::from_secs(2), Some(1760), &mut viewport));
        assert_eq!(viewport.sets, 1);
        assert!(anchor.is_finished());
    }

    #[test]
    fn missing_today_is_skipped() {
        let mut anchor = InitialAnchorScroller::new(Duration::from_millis(150), 80);
        let mut viewport = Recorder::default();
        let start = Instant::now();
        anchor.on_render(&window(), start);
        assert!(!anchor.poll(start + Duration::from_millis(200), None, &mut viewport));
        assert_eq!(viewport.sets, 0);
        assert!(anchor.is_finished());
    }

    #[test]
    fn cancel_before_deadline_prevents_the_scroll() {
        let mut anchor = InitialAnchorScroller::new(Duration::from_millis(150), 80);
        let mut viewport = Recorder::default();
        let start = Instant::now();
        anchor.on_render(&window(), start);
        anchor.cancel();
        assert!(!anchor.poll(start + Duration::from_secs(1), Some(1760), &mut viewport));
        assert_eq!(viewport.sets, 0);
        assert_eq!(anchor.deadline(), None);
    }

    #[test]
    fn offset_larger_than_position_clamps_to_top() {
        let mut anchor = InitialAnchorScroller::new(Duration::ZERO, 80);
        let mut viewport = Recorder { top: 300, sets: 0 };
        let start = Instant::now();
        anchor.on_render(&window(), start);
        assert!(anchor.poll(start, Some(40), &mut viewport));
        assert_eq!(viewport.top, 0);
    }
}
