//! Deterministic holiday adapter.
//!
//! The reference implementation called a live public-holiday API. The
//! glossary here defines the adapter as a pure function `(start, end) ->
//! [{date, name}]`, so this computes the fixed US federal calendar plus
//! Easter Sunday and Mother's Day analytically instead of over the network.
//! A real external API call is intentionally out of scope (see SPEC_FULL.md).

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holiday {
    pub date: NaiveDate,
    pub name: String,
}

/// Returns every recognized holiday whose date falls within `[start, end]`.
pub fn holidays_in_range(start: NaiveDate, end: NaiveDate) -> Vec<Holiday> {
    let mut out = Vec::new();
    for year in start.year()..=end.year() {
        out.extend(federal_holidays(year));
        out.push(Holiday {
            date: easter_sunday(year),
            name: "Easter Sunday".into(),
        });
        out.push(Holiday {
            date: mothers_day(year),
            name: "Mother's Day".into(),
        });
    }
    out.retain(|h| h.date >= start && h.date <= end);
    out.sort_by_key(|h| h.date);
    out.dedup_by_key(|h| h.date);
    out
}

fn federal_holidays(year: i32) -> Vec<Holiday> {
    vec![
        Holiday { date: ymd(year, 1, 1), name: "New Year's Day".into() },
        Holiday { date: nth_weekday(year, 1, Weekday::Mon, 3), name: "Martin Luther King Jr. Day".into() },
        Holiday { date: nth_weekday(year, 2, Weekday::Mon, 3), name: "Presidents' Day".into() },
        Holiday { date: last_weekday(year, 5, Weekday::Mon), name: "Memorial Day".into() },
        Holiday { date: ymd(year, 6, 19), name: "Juneteenth".into() },
        Holiday { date: ymd(year, 7, 4), name: "Independence Day".into() },
        Holiday { date: nth_weekday(year, 9, Weekday::Mon, 1), name: "Labor Day".into() },
        Holiday { date: nth_weekday(year, 10, Weekday::Mon, 2), name: "Columbus Day".into() },
        Holiday { date: ymd(year, 11, 11), name: "Veterans Day".into() },
        Holiday { date: nth_weekday(year, 11, Weekday::Thu, 4), name: "Thanksgiving Day".into() },
        Holiday { date: ymd(year, 12, 25), name: "Christmas Day".into() },
    ]
}

fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid calendar date")
}

fn nth_weekday(year: i32, month: u32, weekday: Weekday, n: u32) -> NaiveDate {
    let first = ymd(year, month, 1);
    let offset = (7 + weekday.num_days_from_monday() as i64 - first.weekday().num_days_from_monday() as i64) % 7;
    first + Duration::days(offset + 7 * (n as i64 - 1))
}

fn last_weekday(year: i32, month: u32, weekday: Weekday) -> NaiveDate {
    let next_month_first = if month == 12 {
        ymd(year + 1, 1, 1)
    } else {
        ymd(year, month + 1, 1)
    };
    let last_of_month = next_month_first - Duration::days(1);
    let back = (7 + last_of_month.weekday().num_days_from_monday() as i64 - weekday.num_days_from_monday() as i64) % 7;
    last_of_month - Duration::days(back)
}

/// Anonymous Gregorian algorithm.
fn easter_sunday(year: i32) -> NaiveDate {
    let a = year % 19;
    let b = year / 100;
    let c = year % 100;
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = (h + l - 7 * m + 114) % 31 + 1;
    ymd(year, month as u32, day as u32)
}

fn mothers_day(year: i32) -> NaiveDate {
    nth_weekday(year, 5, Weekday::Sun, 2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_a_pure_function_of_its_inputs() {
        let start = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2026, 12, 31).unwrap();
        assert_eq!(holidays_in_range(start, end), holidays_in_range(start, end));
    }

    #[test]
    fn independence_day_is_fixed() {
        let holidays = holidays_in_range(
            NaiveDate::from_ymd_opt(2026, 7, 1).unwrap(),
            NaiveDate::from_ymd_opt(2026, 7, 31).unwrap(),
        );
        assert!(holidays.iter().any(|h| h.date == NaiveDate::from_ymd_opt(2026, 7, 4).unwrap()));
    }

    #[test]
    fn labor_day_is_first_monday_of_september() {
        let holidays = holidays_in_range(
            NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(),
            NaiveDate::from_ymd_opt(2026, 9, 30).unwrap(),
        );
        let labor_day = holidays.iter().find(|h| h.name == "Labor Day").unwrap();
        assert_eq!(labor_day.date.weekday(), Weekday::Mon);
        assert!(labor_day.date.day() <= 7);
    }

    #[test]
    fn thanksgiving_is_fourth_thursday_of_november() {
        let holidays = holidays_in_range(
            NaiveDate::from_ymd_opt(2026, 11, 1).unwrap(),
            NaiveDate::from_ymd_opt(2026, 11, 30).unwrap(),
        );
        let thanksgiving = holidays.iter().find(|h| h.name == "Thanksgiving Day").unwrap();
        assert_eq!(thanksgiving.date.weekday(), Weekday::Thu);
        assert!(thanksgiving.date.day() >= 22 && thanksgiving.date.day() <= 28);
    }
}
