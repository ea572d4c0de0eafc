// Search query construction for time-framed searches
use chrono::{Duration, Months, NaiveDate, Utc};

use crate::models::TimeFrame;

pub const SEARCH_DATE_FORMAT: &str = "%Y-%m-%d";

/// First day of the window ending at `today`
///
/// A month back from the 31st lands on the last day of the previous month.
pub fn window_start(frame: TimeFrame, today: NaiveDate) -> NaiveDate {
    match frame {
        TimeFrame::Day => today - Duration::days(1),
        TimeFrame::Week => today - Duration::weeks(1),
        TimeFrame::Month => today
            .checked_sub_months(Months::new(1))
            .unwrap_or(today),
    }
}

/// `created:<start>..<end>` qualifier for the window ending at `today`
pub fn time_frame_filter(frame: TimeFrame, today: NaiveDate) -> String {
    format!(
        "created:{}..{}",
        window_start(frame, today).format(SEARCH_DATE_FORMAT),
        today.format(SEARCH_DATE_FORMAT)
    )
}

/// Free text plus the time-frame qualifier
pub fn search_query(text: &str, frame: TimeFrame, today: NaiveDate) -> String {
    let filter = time_frame_filter(frame, today);
    let text = text.trim();
    if text.is_empty() {
        filter
    } else {
        format!("{} {}", text, filter)
    }
}

impl TimeFrame {
    /// Qualifier for the window ending today (UTC)
    pub fn query_filter(&self) -> String {
        time_frame_filter(*self, Utc::now().date_naive())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_day_window() {
        assert_eq!(
            time_frame_filter(TimeFrame::Day, date(2024, 3, 1)),
            "created:2024-02-29..2024-03-01"
        );
    }

    #[test]
    fn test_week_window() {
        assert_eq!(
            time_frame_filter(TimeFrame::Week, date(2024, 1, 3)),
            "created:2023-12-27..2024-01-03"
        );
    }

    #[test]
    fn test_month_window_clamps_to_month_end() {
        assert_eq!(
            time_frame_filter(TimeFrame::Month, date(2023, 3, 31)),
            "created:2023-02-28..2023-03-31"
        );
        assert_eq!(
            time_frame_filter(TimeFrame::Month, date(2024, 5, 15)),
            "created:2024-04-15..2024-05-15"
        );
    }

    #[test]
    fn test_search_query_joins_text_and_filter() {
        assert_eq!(
            search_query("  tokio ", TimeFrame::Day, date(2024, 5, 2)),
            "tokio created:2024-05-01..2024-05-02"
        );
        assert_eq!(
            search_query("", TimeFrame::Day, date(2024, 5, 2)),
            "created:2024-05-01..2024-05-02"
        );
    }

    #[test]
    fn test_query_filter_uses_today() {
        let today = Utc::now().date_naive().format(SEARCH_DATE_FORMAT).to_string();
        assert!(TimeFrame::Week.query_filter().ends_with(&today));
    }
}
