//! Academic year defaulting.
//!
//! Years are Bikram Sambat years. The backend approximates the current one
//! from the Gregorian date: the new year starts on 14 April.

use chrono::{Datelike, Local, NaiveDate};

/// Academic year in effect on `date`.
pub fn academic_year_on(date: NaiveDate) -> i32 {
    let before_new_year = date.month() < 4 || (date.month() == 4 && date.day() < 14);
    if before_new_year {
        date.year() + 56
    } else {
        date.year() + 57
    }
}

/// Academic year in effect today.
pub fn current_academic_year() -> i32 {
    academic_year_on(Local::now().date_naive())
}

/// Picks the year to show: the latest year that has schedules, or the current one.
pub fn default_year(available: &[i32]) -> i32 {
    available
        .iter()
        .copied()
        .max()
        .unwrap_or_else(current_academic_year)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_new_year_boundary() {
        assert_eq!(academic_year_on(ymd(2024, 4, 13)), 2080);
        assert_eq!(academic_year_on(ymd(2024, 4, 14)), 2081);
        assert_eq!(academic_year_on(ymd(2024, 1, 1)), 2080);
        assert_eq!(academic_year_on(ymd(2024, 12, 31)), 2081);
    }

    #[test]
    fn test_default_year_prefers_latest_available() {
        assert_eq!(default_year(&[2080, 2082, 2081]), 2082);
        assert_eq!(default_year(&[]), current_academic_year());
    }
}
