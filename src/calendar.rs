//! Component A: calendar materializer.
//!
//! Turns a schedule's `[start_date, end_date]` window into persisted `Day`
//! rows, prefixed with a 3-day lookback window used only to preserve
//! fatigue/back-to-back continuity across the schedule boundary.

use chrono::{Datelike, Duration, NaiveDate, Weekday};

use crate::domain::{Day, DayId, ScheduleId};
use crate::holidays::Holiday;

pub const LOOKBACK_DAYS: i64 = 3;

/// Builds the full `Day` sequence (lookback + active window) for a schedule.
/// Every `Day` has `id = DayId(0)`; the store assigns real ids on insert.
pub fn materialize_days(schedule_id: ScheduleId, start: NaiveDate, end: NaiveDate, holidays: &[Holiday]) -> Vec<Day> {
    let lookback_start = start - Duration::days(LOOKBACK_DAYS);
    let mut days = Vec::new();

    let mut date = lookback_start;
    while date <= end {
        let is_lookback = date < start;
        let holiday = holidays.iter().find(|h| h.date == date);
        let is_holiday = holiday.is_some();

        let weight = if is_lookback {
            0.0
        } else {
            day_weight(date, is_holiday)
        };

        let name = holiday
            .map(|h| h.name.clone())
            .unwrap_or_else(|| weekday_name(date.weekday()).to_string());

        days.push(Day {
            id: DayId(0),
            schedule_id,
            date,
            name,
            weight,
            is_holiday,
            is_lookback,
        });

        date += Duration::days(1);
    }

    days
}

fn day_weight(date: NaiveDate, is_holiday: bool) -> f64 {
    if is_holiday {
        return 2.0;
    }
    match date.weekday() {
        Weekday::Mon | Weekday::Tue | Weekday::Wed | Weekday::Thu => 1.0,
        Weekday::Fri => 1.5,
        Weekday::Sat | Weekday::Sun => 2.0,
    }
}

fn weekday_name(w: Weekday) -> &'static str {
    match w {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookback_days_carry_zero_weight_even_on_holidays() {
        let start = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let holidays = vec![Holiday {
            date: NaiveDate::from_ymd_opt(2025, 12, 31).unwrap(),
            name: "New Year's Eve Observance".into(),
        }];
        let days = materialize_days(ScheduleId(1), start, end, &holidays);
        let lookback_holiday = days
            .iter()
            .find(|d| d.date == NaiveDate::from_ymd_opt(2025, 12, 31).unwrap())
            .unwrap();
        assert!(lookback_holiday.is_lookback);
        assert_eq!(lookback_holiday.weight, 0.0);
    }

    #[test]
    fn active_weekday_weights_follow_the_fri_sat_sun_escalation() {
        let start = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(); // Monday
        let end = NaiveDate::from_ymd_opt(2026, 1, 11).unwrap(); // Sunday
        let days = materialize_days(ScheduleId(1), start, end, &[]);
        let active: Vec<_> = days.iter().filter(|d| !d.is_lookback).collect();
        assert_eq!(active[0].weight, 1.0); // Mon
        assert_eq!(active[4].weight, 1.5); // Fri
        assert_eq!(active[5].weight, 2.0); // Sat
        assert_eq!(active[6].weight, 2.0); // Sun
    }

    #[test]
    fn materializes_exactly_lookback_plus_window_length() {
        let start = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();
        let days = materialize_days(ScheduleId(1), start, end, &[]);
        assert_eq!(days.len(), LOOKBACK_DAYS as usize + 14);
        assert_eq!(days.iter().filter(|d| d.is_lookback).count(), LOOKBACK_DAYS as usize);
    }
}
