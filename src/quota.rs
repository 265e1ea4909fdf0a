//! Component B: waterfall fair-share quota calculator.
//!
//! Ports the reference `calculate_schedule_quotas` algorithm: everyone's
//! raw weight (availability x seniority) claims a share of total demand
//! proportional to the group's total weight; anyone whose share would
//! exceed their personal cap is locked at the cap and the remaining
//! demand is re-distributed among whoever is left, repeating until no
//! one overflows.

use std::collections::HashMap;

use crate::domain::{Day, Group, Leave, Membership, MembershipId};

#[derive(Debug, Clone)]
pub struct QuotaResult {
    pub membership_id: MembershipId,
    pub assigned_quota: f64,
}

struct MemberFacts {
    membership_id: MembershipId,
    raw_weight: f64,
    point_cap: f64,
}

/// `slots_per_day` is the number of required-station slots open on every
/// active day (station count); it scales demand the way the reference's
/// `daily_slots_count` does.
pub fn calculate_schedule_quotas(
    days: &[Day],
    memberships: &[Membership],
    groups: &HashMap<crate::domain::GroupId, Group>,
    leaves: &HashMap<MembershipId, Vec<Leave>>,
    slots_per_day: usize,
) -> Vec<QuotaResult> {
    let active_days: Vec<&Day> = days.iter().filter(|d| !d.is_lookback).collect();
    if active_days.is_empty() || memberships.is_empty() {
        return memberships
            .iter()
            .map(|m| QuotaResult {
                membership_id: m.id,
                assigned_quota: 0.0,
            })
            .collect();
    }

    let max_day_weight = active_days.iter().map(|d| d.weight).fold(0.0_f64, f64::max);
    let total_schedule_points: f64 = active_days.iter().map(|d| d.weight).sum();
    let total_demand_points: f64 = active_days.iter().map(|d| d.weight).sum::<f64>() * slots_per_day as f64;

    let mut facts: Vec<MemberFacts> = memberships
        .iter()
        .map(|m| {
            let group = groups.get(&m.group_id);
            let empty = Vec::new();
            let member_leaves = leaves.get(&m.id).unwrap_or(&empty);

            let points_lost: f64 = active_days
                .iter()
                .filter(|d| member_leaves.iter().any(|l| l.covers(d.date)))
                .map(|d| d.weight)
                .sum();

            let availability_ratio = if total_schedule_points > 0.0 {
                ((total_schedule_points - points_lost) / total_schedule_points).max(0.0)
            } else {
                0.0
            };

            let seniority = m
                .override_seniority_factor
                .or_else(|| group.map(|g| g.seniority_factor))
                .unwrap_or(1.0);

            let shift_cap = m
                .override_max_assignments
                .or_else(|| group.map(|g| g.max_assignments))
                .unwrap_or(999) as f64;

            MemberFacts {
                membership_id: m.id,
                raw_weight: availability_ratio * seniority,
                point_cap: shift_cap * max_day_weight,
            }
        })
        .collect();

    let mut locked: HashMap<MembershipId, f64> = HashMap::new();
    let mut remaining_demand = total_demand_points;

    loop {
        let total_active_weight: f64 = facts.iter().map(|f| f.raw_weight).sum();
        if total_active_weight <= 0.0 || facts.is_empty() {
            break;
        }

        let offenders: Vec<usize> = facts
            .iter()
            .enumerate()
            .filter(|(_, f)| {
                let share = (f.raw_weight / total_active_weight) * remaining_demand;
                share > f.point_cap
            })
            .map(|(i, _)| i)
            .collect();

        if offenders.is_empty() {
            break;
        }

        for idx in offenders.into_iter().rev() {
            let f = facts.remove(idx);
            remaining_demand -= f.point_cap;
            locked.insert(f.membership_id, f.point_cap);
        }
    }

    let total_active_weight: f64 = facts.iter().map(|f| f.raw_weight).sum();
    let mut shares: HashMap<MembershipId, f64> = facts
        .iter()
        .map(|f| {
            let share = if total_active_weight > 0.0 {
                (f.raw_weight / total_active_weight) * remaining_demand
            } else {
                0.0
            };
            (f.membership_id, share)
        })
        .collect();
    shares.extend(locked);

    memberships
        .iter()
        .map(|m| QuotaResult {
            membership_id: m.id,
            assigned_quota: (shares.get(&m.id).copied().unwrap_or(0.0) * 100.0).round() / 100.0,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DayId, GroupId};
    use chrono::NaiveDate;

    fn day(weight: f64, lookback: bool) -> Day {
        Day {
            id: DayId(1),
            schedule_id: crate::domain::ScheduleId(1),
            date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            name: "Monday".into(),
            weight,
            is_holiday: false,
            is_lookback: lookback,
        }
    }

    fn membership(id: u64, group_id: GroupId) -> Membership {
        Membership {
            id: MembershipId(id),
            schedule_id: crate::domain::ScheduleId(1),
            person_id: crate::domain::PersonId(id),
            group_id,
            override_seniority_factor: None,
            override_min_assignments: None,
            override_max_assignments: None,
        }
    }

    #[test]
    fn equal_members_split_demand_evenly() {
        let days = vec![day(1.0, false); 10];
        let group_id = GroupId(1);
        let mut groups = HashMap::new();
        groups.insert(group_id, Group::new(group_id, "Core", 1));
        let memberships = vec![membership(1, group_id), membership(2, group_id)];
        let leaves = HashMap::new();

        let result = calculate_schedule_quotas(&days, &memberships, &groups, &leaves, 1);
        assert_eq!(result.len(), 2);
        assert!((result[0].assigned_quota - result[1].assigned_quota).abs() < 1e-9);
        assert!((result[0].assigned_quota - 5.0).abs() < 1e-6);
    }

    #[test]
    fn capped_members_free_up_demand_for_everyone_else() {
        let days = vec![day(1.0, false); 20];
        let group_id = GroupId(1);
        let mut groups = HashMap::new();
        let mut g = Group::new(group_id, "Core", 1);
        g.max_assignments = 3;
        groups.insert(group_id, g);
        let memberships = vec![membership(1, group_id), membership(2, group_id)];
        let leaves = HashMap::new();

        let result = calculate_schedule_quotas(&days, &memberships, &groups, &leaves, 1);
        let capped = result.iter().find(|r| r.membership_id == MembershipId(1)).unwrap();
        assert!(capped.assigned_quota <= 3.0 + 1e-6);
    }

    #[test]
    fn lookback_days_do_not_contribute_demand() {
        let mut days = vec![day(1.0, false); 5];
        days.extend(vec![day(1.0, true); 3]);
        let group_id = GroupId(1);
        let mut groups = HashMap::new();
        groups.insert(group_id, Group::new(group_id, "Core", 1));
        let memberships = vec![membership(1, group_id)];
        let leaves = HashMap::new();

        let result = calculate_schedule_quotas(&days, &memberships, &groups, &leaves, 1);
        assert!((result[0].assigned_quota - 5.0).abs() < 1e-6);
    }
}
