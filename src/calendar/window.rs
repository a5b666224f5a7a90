use crate::config::CalendarConfig;
use chrono::{Datelike, Days, NaiveDate};
use tracing::{debug, trace};

use super::weeks::DAYS_PER_WEEK;

/// In-flight extension guard. Only `Idle` accepts a new extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionState {
    Idle,
    ExtendingPast,
    ExtendingFuture,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Past,
    Future,
}

/// Dates added by one extension, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extension {
    pub direction: Direction,
    pub first: NaiveDate,
    pub last: NaiveDate,
    pub added: usize,
}

/// Contiguous run of materialized calendar days. Grows only at its ends.
#[derive(Debug, Clone)]
pub struct DayWindow {
    days: Vec<NaiveDate>,
    step: usize,
    state: ExtensionState,
}

impl DayWindow {
    /// Starts `weeks_back` whole weeks before the Monday of `today`'s week.
    pub fn initialize(today: NaiveDate, config: &CalendarConfig) -> Self {
        let back = u64::from(config.weeks_back) * DAYS_PER_WEEK as u64;
        let start = week_start(today)
            .checked_sub_days(Days::new(back))
            .unwrap_or(NaiveDate::MIN);
        let days: Vec<NaiveDate> = start.iter_days().take(config.initial_days).collect();
        debug!(
            %today,
            first = %start,
            len = days.len(),
            "initialized day window"
        );
        DayWindow {
            days,
            step: config.load_more_days,
            state: ExtensionState::Idle,
        }
    }

    pub fn days(&self) -> &[NaiveDate] {
        &self.days
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn first(&self) -> Option<NaiveDate> {
        self.days.first().copied()
    }

    pub fn last(&self) -> Option<NaiveDate> {
        self.days.last().copied()
    }

    pub fn state(&self) -> ExtensionState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == ExtensionState::Idle
    }

    /// Index of `date` within the window, computed from the first day.
    pub fn position(&self, date: NaiveDate) -> Option<usize> {
        let first = self.first()?;
        let offset = date.signed_duration_since(first).num_days();
        if offset < 0 || offset as usize >= self.days.len() {
            return None;
        }
        Some(offset as usize)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.position(date).is_some()
    }

    /// Prepends one step of days before the earliest date. Returns `None`
    /// and leaves the window untouched while another extension is in
    /// flight.
    pub fn extend_past(&mut self) -> Option<Extension> {
        if self.state != ExtensionState::Idle {
            trace!(state = ?self.state, "extend_past dropped");
            return None;
        }
        let first = self.first()?;
        let prefix: Vec<NaiveDate> = (1..=self.step as u64)
            .rev()
            .filter_map(|n| first.checked_sub_days(Days::new(n)))
            .collect();
        let (head, tail) = (prefix.first().copied()?, prefix.last().copied()?);
        let added = prefix.len();
        self.days.splice(0..0, prefix);
        self.state = ExtensionState::ExtendingPast;
        debug!(from = %head, to = %tail, len = self.days.len(), "extended window into the past");
        Some(Extension {
            direction: Direction::Past,
            first: head,
            last: tail,
            added,
        })
    }

    /// Appends one step of days after the latest date, under the same guard
    /// as [`DayWindow::extend_past`].
    pub fn extend_future(&mut self) -> Option<Extension> {
        if self.state != ExtensionState::Idle {
            trace!(state = ?self.state, "extend_future dropped");
            return None;
        }
        let last = self.last()?;
        let suffix: Vec<NaiveDate> = last.iter_days().skip(1).take(self.step).collect();
        let (head, tail) = (suffix.first().copied()?, suffix.last().copied()?);
        let added = suffix.len();
        self.days.extend(suffix);
        self.state = ExtensionState::ExtendingFuture;
        debug!(from = %head, to = %tail, len = self.days.len(), "extended window into the future");
        Some(Extension {
            direction: Direction::Future,
            first: head,
            last: tail,
            added,
        })
    }

    /// Returns the guard to `Idle`.
    pub fn finish_extension(&mut self) {
        self.state = ExtensionState::Idle;
    }
}

pub fn week_start(date: NaiveDate) -> NaiveDate {
    let back = u64::from(date.weekday().num_days_from_monday());
    date.checked_sub_days(Days::new(back)).unwrap_or(date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn assert_contiguous(window: &DayWindow) {
        for pair in window.days().windows(2) {
            assert_eq!(pair[0].succ_opt(), Some(pair[1]), "gap between {} and {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn initialize_places_current_monday_after_eight_weeks() {
        let today = date(2024, 3, 14); // Thursday
        let window = DayWindow::initialize(today, &CalendarConfig::default());
        assert_eq!(window.len(), 168);
        assert_eq!(window.days()[56], date(2024, 3, 11));
        assert_eq!(window.days()[56].weekday(), Weekday::Mon);
        assert_eq!(window.first().unwrap().weekday(), Weekday::Mon);
        assert!(window.contains(today));
        assert_eq!(window.position(today), Some(59));
        assert_contiguous(&window);
    }

    #[test]
    fn initialize_on_a_monday_and_a_sunday() {
        let monday = DayWindow::initialize(date(2024, 1, 1), &CalendarConfig::default());
        assert_eq!(monday.days()[56], date(2024, 1, 1));
        let sunday = DayWindow::initialize(date(2024, 1, 7), &CalendarConfig::default());
        assert_eq!(sunday.days()[56], date(2024, 1, 1));
        assert_eq!(sunday.position(date(2024, 1, 7)), Some(62));
    }

    #[test]
    fn repeated_past_requests_while_in_flight_prepend_once() {
        let mut window = DayWindow::initialize(date(2024, 3, 14), &CalendarConfig::default());
        let first = window.first().unwrap();
        let results: Vec<Option<Extension>> = (0..5).map(|_| window.extend_past()).collect();
        assert_eq!(results.iter().filter(|r| r.is_some()).count(), 1);
        assert_eq!(window.len(), 168 + 28);
        assert_eq!(window.state(), ExtensionState::ExtendingPast);
        let ext = results[0].unwrap();
        assert_eq!(ext.first, first - Days::new(28));
        assert_eq!(ext.last, first - Days::new(1));
        assert_contiguous(&window);
    }

    #[test]
    fn guard_is_shared_between_directions() {
        let mut window = DayWindow::initialize(date(2024, 3, 14), &CalendarConfig::default());
        assert!(window.extend_past().is_some());
        assert!(window.extend_future().is_none());
        window.finish_extension();
        assert!(window.extend_future().is_some());
        assert!(window.extend_past().is_none());
        assert_eq!(window.state(), ExtensionState::ExtendingFuture);
    }

    #[test]
    fn extension_keeps_existing_days_in_place() {
        let mut window = DayWindow::initialize(date(2024, 3, 14), &CalendarConfig::default());
        let before = window.days().to_vec();
        window.extend_future();
        window.finish_extension();
        assert_eq!(&window.days()[..before.len()], before.as_slice());
        window.extend_past();
        window.finish_extension();
        assert_eq!(&window.days()[28..28 + before.len()], before.as_slice());
    }

    #[test]
    fn many_alternating_extensions_stay_contiguous() {
        let mut window = DayWindow::initialize(date(2023, 12, 30), &CalendarConfig::default());
        for i in 0..20 {
            if i % 3 == 0 {
                window.extend_future();
            } else {
                window.extend_past();
            }
            window.finish_extension();
        }
        assert_eq!(window.len(), 168 + 20 * 28);
        assert_contiguous(&window);
    }

    #[test]
    fn position_outside_window_is_none() {
        let window = DayWindow::initialize(date(2024, 3, 14), &CalendarConfig::default());
        let first = window.first().unwrap();
        assert_eq!(window.position(first.pred_opt().unwrap()), None);
        assert_eq!(window.position(window.last().unwrap()), Some(167));
    }
}
