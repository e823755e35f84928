use chrono::{Duration, NaiveDate, Utc};

/// Recent tier span, in days.
pub const RECENT_WINDOW_DAYS: i64 = 90;

/// Historical tier span, in days. Wide enough to cover any record the
/// warehouse services still hold.
pub const HISTORICAL_WINDOW_DAYS: i64 = 3650;

/// Inclusive calendar-date window for the search endpoints. Bounds are
/// formatted as 8-digit dates in the scheme's own convention; no timezone
/// conversion is applied to them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateWindow {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Self {
        Self { from, to }
    }

    pub fn last_days(days: i64) -> Self {
        let to = Utc::now().date_naive();
        Self {
            from: to - Duration::days(days),
            to,
        }
    }

    pub fn recent() -> Self {
        Self::last_days(RECENT_WINDOW_DAYS)
    }

    pub fn historical() -> Self {
        Self::last_days(HISTORICAL_WINDOW_DAYS)
    }

    pub fn start_param(&self) -> String {
        self.from.format("%Y%m%d").to_string()
    }

    pub fn end_param(&self) -> String {
        self.to.format("%Y%m%d").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_use_compact_dates() {
        let window = DateWindow::new(
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
        );
        assert_eq!(window.start_param(), "20240301");
        assert_eq!(window.end_param(), "20240315");
    }

    #[test]
    fn recent_window_spans_ninety_days() {
        let window = DateWindow::recent();
        assert_eq!(window.to - window.from, Duration::days(RECENT_WINDOW_DAYS));
    }
}
