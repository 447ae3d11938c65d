//! Calendar date helpers used by seeding and backfill.

use chrono::{Days, NaiveDate};

/// Every date from `start` to `end`, both inclusive, in ascending order.
///
/// Yields nothing when `start` is after `end`.
pub fn date_range(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start
        .iter_days()
        .take_while(move |date| *date <= end)
}

/// The `count` days ending at (and including) `end`, oldest first.
pub fn days_back(end: NaiveDate, count: u64) -> impl Iterator<Item = NaiveDate> {
    let start = match count {
        0 => None,
        n => end.checked_sub_days(Days::new(n - 1)),
    };

    start
        .into_iter()
        .flat_map(move |start| date_range(start, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_range_is_inclusive() {
        let dates: Vec<_> = date_range(ymd(2024, 1, 30), ymd(2024, 2, 2)).collect();
        assert_eq!(
            dates,
            vec![ymd(2024, 1, 30), ymd(2024, 1, 31), ymd(2024, 2, 1), ymd(2024, 2, 2)]
        );
    }

    #[test]
    fn test_single_day_range() {
        let dates: Vec<_> = date_range(ymd(2024, 3, 5), ymd(2024, 3, 5)).collect();
        assert_eq!(dates, vec![ymd(2024, 3, 5)]);
    }

    #[test]
    fn test_reversed_range_is_empty() {
        assert_eq!(date_range(ymd(2024, 3, 5), ymd(2024, 3, 4)).count(), 0);
    }

    #[test]
    fn test_range_crosses_leap_day() {
        assert_eq!(date_range(ymd(2024, 2, 28), ymd(2024, 3, 1)).count(), 3);
        assert_eq!(date_range(ymd(2023, 2, 28), ymd(2023, 3, 1)).count(), 2);
    }

    #[test]
    fn test_days_back() {
        let dates: Vec<_> = days_back(ymd(2024, 1, 2), 3).collect();
        assert_eq!(dates, vec![ymd(2023, 12, 31), ymd(2024, 1, 1), ymd(2024, 1, 2)]);
        assert_eq!(days_back(ymd(2024, 1, 2), 0).count(), 0);
    }
}
