use chrono::{Days, NaiveDate};

/// Inclusive date range around "today" in which events are eligible to be shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl ActiveWindow {
    /// `[current - days, current + days]`, clamped to the representable range.
    pub fn around(current: NaiveDate, days: u32) -> Self {
        let span = Days::new(u64::from(days));
        Self {
            start: current.checked_sub_days(span).unwrap_or(NaiveDate::MIN),
            end: current.checked_add_days(span).unwrap_or(NaiveDate::MAX),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_window_is_inclusive_three_days() {
        let w = ActiveWindow::around(d(2025, 5, 10), 3);
        assert!(w.contains(d(2025, 5, 7)));
        assert!(w.contains(d(2025, 5, 10)));
        assert!(w.contains(d(2025, 5, 13)));
        assert!(!w.contains(d(2025, 5, 6)));
        assert!(!w.contains(d(2025, 5, 14)));
    }

    #[test]
    fn test_window_crosses_year_boundary() {
        let w = ActiveWindow::around(d(2025, 1, 1), 3);
        assert_eq!(w.start, d(2024, 12, 29));
        assert_eq!(w.end, d(2025, 1, 4));
    }

    #[test]
    fn test_zero_width_window() {
        let w = ActiveWindow::around(d(2025, 5, 10), 0);
        assert!(w.contains(d(2025, 5, 10)));
        assert!(!w.contains(d(2025, 5, 11)));
    }
}
