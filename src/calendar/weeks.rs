use chrono::NaiveDate;

pub const DAYS_PER_WEEK: usize = 7;

/// Splits the window into consecutive runs of seven days, in order.
pub fn group_weeks(days: &[NaiveDate]) -> Vec<&[NaiveDate]> {
    days.chunks(DAYS_PER_WEEK).collect()
}

/// Section header such as `4 Mar — 10 Mar`.
pub fn week_label(week: &[NaiveDate]) -> String {
    match (week.first(), week.last()) {
        (Some(first), Some(last)) => format!("{} — {}", first.format("%-d %b"), last.format("%-d %b")),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::DayWindow;
    use crate::config::CalendarConfig;

    #[test]
    fn full_window_splits_into_24_weeks() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 14).unwrap();
        let window = DayWindow::initialize(today, &CalendarConfig::default());
        let weeks = group_weeks(window.days());
        assert_eq!(weeks.len(), 24);
        assert!(weeks.iter().all(|w| w.len() == 7));
        for pair in weeks.windows(2) {
            assert_eq!(pair[0].last().unwrap().succ_opt(), pair[1].first().copied());
        }
    }

    #[test]
    fn ragged_tail_is_kept() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let days: Vec<NaiveDate> = start.iter_days().take(10).collect();
        let weeks = group_weeks(&days);
        assert_eq!(weeks.len(), 2);
        assert_eq!(weeks[1].len(), 3);
        assert!(group_weeks(&[]).is_empty());
    }

    #[test]
    fn label_spans_first_to_last_day() {
        let start = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let days: Vec<NaiveDate> = start.iter_days().take(7).collect();
        assert_eq!(week_label(&days), "4 Mar — 10 Mar");
    }
}
