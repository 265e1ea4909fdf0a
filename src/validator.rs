//! Component F: post-hoc schedule validator.
//!
//! Re-checks a materialized (or candidate-applied) schedule for
//! conflicts that the solver's hard constraints should already have
//! prevented, but that hand-edits or locked assignments can reintroduce.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{Assignment, Day, DayId, Exclusion, Leave, MembershipId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    LeaveConflict,
    ExclusionConflict,
    DoubleBooking,
    BackToBack,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationAlert {
    pub kind: AlertKind,
    pub day_id: DayId,
    pub membership_id: MembershipId,
    pub message: String,
}

pub fn validate_schedule(
    days: &[Day],
    assignments: &[Assignment],
    leaves: &HashMap<MembershipId, Vec<Leave>>,
    exclusions: &HashMap<MembershipId, Vec<Exclusion>>,
) -> Vec<ValidationAlert> {
    let mut alerts = Vec::new();
    let day_by_id: HashMap<DayId, &Day> = days.iter().map(|d| (d.id, d)).collect();

    for assignment in assignments {
        let Some(day) = day_by_id.get(&assignment.day_id) else {
            continue;
        };
        if day.is_lookback {
            continue;
        }
        let Some(member_id) = assignment.membership_id else {
            continue;
        };

        if let Some(member_leaves) = leaves.get(&member_id) {
            if member_leaves.iter().any(|l| l.covers(day.date)) {
                alerts.push(ValidationAlert {
                    kind: AlertKind::LeaveConflict,
                    day_id: day.id,
                    membership_id: member_id,
                    message: format!("assigned on {} while on leave", day.date),
                });
            }
        }

        if let Some(member_exclusions) = exclusions.get(&member_id) {
            if member_exclusions.iter().any(|e| e.day_id == day.id) {
                alerts.push(ValidationAlert {
                    kind: AlertKind::ExclusionConflict,
                    day_id: day.id,
                    membership_id: member_id,
                    message: format!("assigned on {} despite an exclusion", day.date),
                });
            }
        }
    }

    // Double booking: more than one active-slot assignment for the same
    // (day, member) pair.
    let mut daily_load: HashMap<(DayId, MembershipId), usize> = HashMap::new();
    for assignment in assignments {
        let Some(day) = day_by_id.get(&assignment.day_id) else {
            continue;
        };
        if day.is_lookback {
            continue;
        }
        if let Some(member_id) = assignment.membership_id {
            *daily_load.entry((assignment.day_id, member_id)).or_insert(0) += 1;
        }
    }
    for ((day_id, member_id), count) in &daily_load {
        if *count > 1 {
            let Some(date) = day_by_id.get(day_id).map(|d| d.date) else {
                continue;
            };
            alerts.push(ValidationAlert {
                kind: AlertKind::DoubleBooking,
                day_id: *day_id,
                membership_id: *member_id,
                message: format!("assigned to {} stations on {}", count, date),
            });
        }
    }

    // Back-to-back: per member, sort assigned days by date and flag any
    // adjacent pair unless both sides are lookback history.
    let mut member_days: HashMap<MembershipId, Vec<(NaiveDate, DayId, bool)>> = HashMap::new();
    for assignment in assignments {
        let Some(day) = day_by_id.get(&assignment.day_id) else {
            continue;
        };
        if let Some(member_id) = assignment.membership_id {
            member_days
                .entry(member_id)
                .or_default()
                .push((day.date, day.id, day.is_lookback));
        }
    }

    for (member_id, mut dates) in member_days {
        dates.sort_by_key(|(date, _, _)| *date);
        for window in dates.windows(2) {
            let (prev_date, _, prev_lookback) = window[0];
            let (next_date, next_day_id, next_lookback) = window[1];
            if (next_date - prev_date).num_days() != 1 {
                continue;
            }
            if prev_lookback && next_lookback {
                continue;
            }
            alerts.push(ValidationAlert {
                kind: AlertKind::BackToBack,
                day_id: next_day_id,
                membership_id: member_id,
                message: format!("worked {} immediately after {}", next_date, prev_date),
            });
        }
    }

    alerts
}

pub fn group_leaves_by_membership(leaves: Vec<Leave>) -> HashMap<MembershipId, Vec<Leave>> {
    let mut map: HashMap<MembershipId, Vec<Leave>> = HashMap::new();
    for leave in leaves {
        map.entry(leave.membership_id).or_default().push(leave);
    }
    map
}

pub fn group_exclusions_by_membership(exclusions: Vec<Exclusion>) -> HashMap<MembershipId, Vec<Exclusion>> {
    let mut map: HashMap<MembershipId, Vec<Exclusion>> = HashMap::new();
    for exclusion in exclusions {
        map.entry(exclusion.membership_id).or_default().push(exclusion);
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AssignmentId, DayId, LeaveId, ScheduleId, StationId};

    fn day(id: u64, date: NaiveDate, lookback: bool) -> Day {
        Day {
            id: DayId(id),
            schedule_id: ScheduleId(1),
            date,
            name: "Day".into(),
            weight: 1.0,
            is_holiday: false,
            is_lookback: lookback,
        }
    }

    fn assignment(id: u64, day_id: DayId, member: MembershipId) -> Assignment {
        Assignment {
            id: AssignmentId(id),
            schedule_id: ScheduleId(1),
            day_id,
            station_id: StationId(1),
            membership_id: Some(member),
            is_locked: false,
            availability_estimate: 1.0,
        }
    }

    #[test]
    fn flags_back_to_back_across_the_lookback_boundary() {
        let d1 = day(1, NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(), true);
        let d2 = day(2, NaiveDate::from_ymd_opt(2026, 1, 2).unwrap(), false);
        let member = MembershipId(1);
        let assignments = vec![assignment(1, d1.id, member), assignment(2, d2.id, member)];
        let alerts = validate_schedule(&[d1, d2], &assignments, &HashMap::new(), &HashMap::new());
        assert!(alerts.iter().any(|a| a.kind == AlertKind::BackToBack));
    }

    #[test]
    fn does_not_flag_two_lookback_days_in_a_row() {
        let d1 = day(1, NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(), true);
        let d2 = day(2, NaiveDate::from_ymd_opt(2026, 1, 2).unwrap(), true);
        let member = MembershipId(1);
        let assignments = vec![assignment(1, d1.id, member), assignment(2, d2.id, member)];
        let alerts = validate_schedule(&[d1, d2], &assignments, &HashMap::new(), &HashMap::new());
        assert!(!alerts.iter().any(|a| a.kind == AlertKind::BackToBack));
    }

    #[test]
    fn leave_conflicts_are_skipped_on_lookback_days() {
        let d1 = day(1, NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(), true);
        let member = MembershipId(1);
        let mut leaves = HashMap::new();
        leaves.insert(
            member,
            vec![Leave {
                id: LeaveId(1),
                membership_id: member,
                start_date: d1.date,
                end_date: d1.date,
                reason: None,
            }],
        );
        let assignments = vec![assignment(1, d1.id, member)];
        let alerts = validate_schedule(&[d1], &assignments, &leaves, &HashMap::new());
        assert!(alerts.is_empty());
    }
}
