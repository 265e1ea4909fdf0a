//! Component C: constraint and objective builder.
//!
//! Translates a schedule's admissible-assignment universe into a
//! [`MilpModel`]: binary `X[member, day, station]` variables, hard
//! coverage/fatigue constraints, and a weighted soft objective mirroring
//! the reference optimizer's six penalty terms plus its per-member
//! minimax fairness term.

use std::collections::{HashMap, HashSet};

use chrono::Weekday;

use crate::domain::{
    active_qualified_stations, Day, DayId, Group, GroupId, Leave, Membership, MembershipId, Qualification,
    SoftWeights, StationId,
};
use crate::error::CoreError;
use crate::milp::{ConstraintOp, LinExpr, MilpModel, VarId, VarKind};

/// The six soft-penalty reasons tracked per member, matching the reference's
/// `pen_breakdown` keys.
pub const PENALTY_CATEGORIES: [&str; 6] = [
    "quota_deviation",
    "spacing_1_day",
    "spacing_2_day",
    "same_weekend",
    "consecutive_weekends",
    "goal_deviation",
];

pub struct ConstraintInput<'a> {
    pub days: &'a [Day],
    pub memberships: &'a [Membership],
    pub groups: &'a HashMap<GroupId, Group>,
    /// Schedule-level priority multiplier override, keyed by group id;
    /// absent groups default to `1.0`.
    pub group_weights: &'a HashMap<GroupId, f64>,
    pub required_stations: &'a [StationId],
    pub qualifications: &'a [Qualification],
    pub leaves: &'a HashMap<MembershipId, Vec<Leave>>,
    pub exclusions: &'a HashMap<MembershipId, HashSet<DayId>>,
    /// Fixed day/membership facts that are not decision variables: historical
    /// lookback shifts and already-locked active slots, keyed by (member, day).
    pub fixed_loads: &'a HashSet<(MembershipId, DayId)>,
    /// Pre-locked active slots, excluded from the decision variable universe.
    pub locks: &'a HashMap<(DayId, StationId), MembershipId>,
    pub station_weights: &'a HashMap<MembershipId, HashMap<StationId, f64>>,
    pub quotas: &'a HashMap<MembershipId, f64>,
    pub weights: SoftWeights,
}

impl ConstraintInput<'_> {
    fn priority(&self, member: &Membership) -> f64 {
        self.group_weights.get(&member.group_id).copied().unwrap_or(1.0)
    }
}

pub struct BuiltModel {
    pub model: MilpModel,
    pub assignment_vars: HashMap<(MembershipId, DayId, StationId), VarId>,
    /// Per-member, per-category penalty expressions (unweighted by the
    /// minimax term, but already carrying the base weight and `priority(m)`
    /// factor), keyed by one of [`PENALTY_CATEGORIES`].
    pub member_category_penalty: HashMap<MembershipId, HashMap<&'static str, LinExpr>>,
}

pub fn build(input: &ConstraintInput) -> Result<BuiltModel, CoreError> {
    let active_days: Vec<&Day> = input.days.iter().filter(|d| !d.is_lookback).collect();

    let mut model = MilpModel::new();
    let mut assignment_vars: HashMap<(MembershipId, DayId, StationId), VarId> = HashMap::new();

    let valid = |m: &Membership, d: &Day, s: StationId| -> bool {
        let quals = active_qualified_stations(input.qualifications, m.person_id);
        if !quals.contains(&s) {
            return false;
        }
        if input
            .leaves
            .get(&m.id)
            .is_some_and(|leaves| leaves.iter().any(|l| l.covers(d.date)))
        {
            return false;
        }
        if input.exclusions.get(&m.id).is_some_and(|days| days.contains(&d.id)) {
            return false;
        }
        true
    };

    for day in &active_days {
        for station in input.required_stations {
            if input.locks.contains_key(&(day.id, *station)) {
                continue;
            }
            let mut any_valid = false;
            for member in input.memberships {
                if valid(member, day, *station) {
                    any_valid = true;
                    let name = format!("x_{}_{}_{}", member.id, day.id, station);
                    let v = model.new_var(VarKind::Binary, name);
                    assignment_vars.insert((member.id, day.id, *station), v);
                }
            }
            if !any_valid {
                return Err(CoreError::Infeasible(format!(
                    "No one can work {} ({})",
                    day.date, station
                )));
            }
        }
    }

    // Coverage: exactly one person per (day, required station), skipping locked slots.
    for day in &active_days {
        for station in input.required_stations {
            if input.locks.contains_key(&(day.id, *station)) {
                continue;
            }
            let mut expr = LinExpr::new();
            for member in input.memberships {
                if let Some(&v) = assignment_vars.get(&(member.id, day.id, *station)) {
                    expr.add_term(v, 1.0);
                }
            }
            model.add_constraint(format!("coverage_{}_{}", day.id, station), expr, ConstraintOp::Eq, 1.0);
        }
    }

    // One slot per person per day.
    for day in &active_days {
        for member in input.memberships {
            let mut expr = LinExpr::new();
            for station in input.required_stations {
                if let Some(&v) = assignment_vars.get(&(member.id, day.id, *station)) {
                    expr.add_term(v, 1.0);
                }
            }
            if !expr.terms.is_empty() {
                model.add_constraint(format!("one_per_day_{}_{}", member.id, day.id), expr, ConstraintOp::Le, 1.0);
            }
        }
    }

    let worked_expr = |member_id: MembershipId, day_id: DayId| -> LinExpr {
        if let Some(expr) = sum_work_expr(&assignment_vars, input.required_stations, member_id, day_id) {
            expr
        } else if input.fixed_loads.contains(&(member_id, day_id)) {
            LinExpr::new().with_constant(1.0)
        } else {
            LinExpr::new()
        }
    };

    // No back-to-back: a member cannot work two adjacent calendar days,
    // including a bridge from a fixed (historical or locked) day.
    let ordered_days: Vec<&Day> = {
        let mut all: Vec<&Day> = input.days.iter().collect();
        all.sort_by_key(|d| d.date);
        all
    };
    for window in ordered_days.windows(2) {
        let (prev, next) = (window[0], window[1]);
        if (next.date - prev.date).num_days() != 1 {
            continue;
        }
        for member in input.memberships {
            let prev_expr = worked_expr(member.id, prev.id);
            let next_expr = worked_expr(member.id, next.id);
            if prev_expr.terms.is_empty() && prev_expr.constant == 0.0 {
                continue;
            }
            if next_expr.terms.is_empty() && next_expr.constant == 0.0 {
                continue;
            }
            let mut combined = LinExpr::new();
            combined.terms.extend(prev_expr.terms.iter().cloned());
            combined.terms.extend(next_expr.terms.iter().cloned());
            combined.constant = prev_expr.constant + next_expr.constant;
            if combined.terms.is_empty() {
                continue; // both days fixed; nothing for the solver to decide
            }
            model.add_constraint(
                format!("no_b2b_{}_{}_{}", member.id, prev.id, next.id),
                combined,
                ConstraintOp::Le,
                1.0,
            );
        }
    }

    // Per-membership min/max assignment limits.
    for member in input.memberships {
        let group = input.groups.get(&member.group_id);
        let min = member
            .override_min_assignments
            .or_else(|| group.map(|g| g.min_assignments))
            .unwrap_or(0);
        let max = member
            .override_max_assignments
            .or_else(|| group.map(|g| g.max_assignments))
            .unwrap_or(999);

        let mut expr = LinExpr::new();
        for day in &active_days {
            for station in input.required_stations {
                if let Some(&v) = assignment_vars.get(&(member.id, day.id, *station)) {
                    expr.add_term(v, 1.0);
                }
            }
        }
        if expr.terms.is_empty() {
            continue;
        }
        if min > 0 {
            model.add_constraint(format!("min_assign_{}", member.id), expr.clone(), ConstraintOp::Ge, min as f64);
        }
        model.add_constraint(format!("max_assign_{}", member.id), expr, ConstraintOp::Le, max as f64);
    }

    let mut member_category_penalty: HashMap<MembershipId, HashMap<&'static str, LinExpr>> = input
        .memberships
        .iter()
        .map(|m| (m.id, HashMap::new()))
        .collect();

    add_quota_deviation(&mut model, input, &assignment_vars, &active_days, &mut member_category_penalty);
    add_rest_spacing(&mut model, input, &worked_expr, &ordered_days, &mut member_category_penalty);
    let clusters = weekend_clusters(&active_days);
    add_weekend_terms(&mut model, input, &assignment_vars, &clusters, &mut member_category_penalty);
    add_goal_deviation(&mut model, input, &assignment_vars, &active_days, &mut member_category_penalty);

    // Minimax fairness: one shared variable bounded below every member's total penalty.
    let max_penalty = model.new_var(VarKind::Continuous { lower: 0.0, upper: 1.0e9 }, "max_penalty");
    for (member_id, categories) in &member_category_penalty {
        let mut total = LinExpr::new();
        for expr in categories.values() {
            total.terms.extend(expr.terms.iter().cloned());
            total.constant += expr.constant;
        }
        if total.terms.is_empty() {
            continue;
        }
        total.add_term(max_penalty, -1.0);
        model.add_constraint(format!("minimax_{}", member_id), total, ConstraintOp::Le, 0.0);
    }
    model.add_objective_term(LinExpr::from_var(max_penalty), 100.0);

    Ok(BuiltModel {
        model,
        assignment_vars,
        member_category_penalty,
    })
}

fn add_to_category(
    member_category_penalty: &mut HashMap<MembershipId, HashMap<&'static str, LinExpr>>,
    member_id: MembershipId,
    category: &'static str,
    term: LinExpr,
) {
    let entry = member_category_penalty
        .entry(member_id)
        .or_default()
        .entry(category)
        .or_insert_with(LinExpr::new);
    entry.terms.extend(term.terms);
    entry.constant += term.constant;
}

fn sum_work_expr(
    assignment_vars: &HashMap<(MembershipId, DayId, StationId), VarId>,
    stations: &[StationId],
    member_id: MembershipId,
    day_id: DayId,
) -> Option<LinExpr> {
    let mut expr = LinExpr::new();
    for station in stations {
        if let Some(&v) = assignment_vars.get(&(member_id, day_id, *station)) {
            expr.add_term(v, 1.0);
        }
    }
    if expr.terms.is_empty() {
        None
    } else {
        Some(expr)
    }
}

fn add_quota_deviation(
    model: &mut MilpModel,
    input: &ConstraintInput,
    assignment_vars: &HashMap<(MembershipId, DayId, StationId), VarId>,
    active_days: &[&Day],
    member_category_penalty: &mut HashMap<MembershipId, HashMap<&'static str, LinExpr>>,
) {
    if input.weights.quota_deviation == 0.0 {
        return;
    }
    for member in input.memberships {
        let mut total = LinExpr::new();
        for day in active_days {
            for station in input.required_stations {
                if let Some(&v) = assignment_vars.get(&(member.id, day.id, *station)) {
                    total.add_term(v, 1.0);
                }
            }
        }
        if total.terms.is_empty() {
            continue;
        }
        let quota = input.quotas.get(&member.id).copied().unwrap_or(0.0);
        let priority = input.priority(member);

        let excess = model.new_var(VarKind::Continuous { lower: 0.0, upper: 1.0e6 }, format!("excess_{}", member.id));
        let shortage =
            model.new_var(VarKind::Continuous { lower: 0.0, upper: 1.0e6 }, format!("shortage_{}", member.id));

        let mut excess_constraint = total.clone();
        excess_constraint.add_term(excess, -1.0);
        model.add_constraint(format!("excess_def_{}", member.id), excess_constraint, ConstraintOp::Le, quota);

        let mut shortage_constraint = total.clone();
        shortage_constraint.add_term(shortage, 1.0);
        model.add_constraint(format!("shortage_def_{}", member.id), shortage_constraint, ConstraintOp::Ge, quota);

        let mut penalty = LinExpr::new();
        penalty.add_term(excess, 2.0 * input.weights.quota_deviation * priority);
        penalty.add_term(shortage, input.weights.quota_deviation * priority);
        model.add_objective_term(penalty.clone(), 1.0);
        add_to_category(member_category_penalty, member.id, "quota_deviation", penalty);
    }
}

fn add_rest_spacing(
    model: &mut MilpModel,
    input: &ConstraintInput,
    worked_expr: &dyn Fn(MembershipId, DayId) -> LinExpr,
    ordered_days: &[&Day],
    member_category_penalty: &mut HashMap<MembershipId, HashMap<&'static str, LinExpr>>,
) {
    for (gap, weight, category) in [
        (2, input.weights.spacing_1_day, "spacing_1_day"),
        (3, input.weights.spacing_2_day, "spacing_2_day"),
    ] {
        if weight == 0.0 {
            continue;
        }
        for window in ordered_days.windows(gap + 1) {
            let first = window[0];
            let last = *window.last().unwrap();
            if (last.date - first.date).num_days() != gap as i64 {
                continue;
            }
            if first.is_lookback && last.is_lookback {
                continue;
            }
            for member in input.memberships {
                let a = worked_expr(member.id, first.id);
                let b = worked_expr(member.id, last.id);
                if a.terms.is_empty() && a.constant == 0.0 {
                    continue;
                }
                if b.terms.is_empty() && b.constant == 0.0 {
                    continue;
                }

                let is_gap = model.new_var(
                    VarKind::Binary,
                    format!("gap{}_{}_{}_{}", gap, member.id, first.id, last.id),
                );
                let mut constraint = LinExpr::new();
                constraint.terms.extend(a.terms.iter().cloned());
                constraint.terms.extend(b.terms.iter().cloned());
                constraint.add_term(is_gap, -1.0);
                constraint.constant = a.constant + b.constant;
                model.add_constraint(
                    format!("gap{}_def_{}_{}_{}", gap, member.id, first.id, last.id),
                    constraint,
                    ConstraintOp::Le,
                    1.0,
                );

                let priority = input.priority(member);
                let mut penalty = LinExpr::new();
                penalty.add_term(is_gap, weight * priority);
                model.add_objective_term(penalty.clone(), 1.0);
                add_to_category(member_category_penalty, member.id, category, penalty);
            }
        }
    }
}

struct Cluster {
    days: Vec<DayId>,
}

fn weekend_clusters(active_days: &[&Day]) -> Vec<Cluster> {
    let mut clusters: Vec<Vec<&Day>> = Vec::new();
    let mut current: Vec<&Day> = Vec::new();
    for day in active_days {
        if day.is_weekend_part() {
            if let Some(last) = current.last() {
                if (day.date - last.date).num_days() == 1 {
                    current.push(day);
                } else {
                    clusters.push(std::mem::take(&mut current));
                    current.push(day);
                }
            } else {
                current.push(day);
            }
        } else if !current.is_empty() {
            clusters.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        clusters.push(current);
    }

    clusters
        .into_iter()
        .filter(|c| c.iter().any(|d| matches!(d.date.weekday(), Weekday::Sat | Weekday::Sun)))
        .map(|c| Cluster { days: c.iter().map(|d| d.id).collect() })
        .collect()
}

fn add_weekend_terms(
    model: &mut MilpModel,
    input: &ConstraintInput,
    assignment_vars: &HashMap<(MembershipId, DayId, StationId), VarId>,
    clusters: &[Cluster],
    member_category_penalty: &mut HashMap<MembershipId, HashMap<&'static str, LinExpr>>,
) {
    let mut is_worked_vars: HashMap<(MembershipId, usize), VarId> = HashMap::new();

    for (idx, cluster) in clusters.iter().enumerate() {
        for member in input.memberships {
            let mut work_sum = LinExpr::new();
            for day_id in &cluster.days {
                for station in input.required_stations {
                    if let Some(&v) = assignment_vars.get(&(member.id, *day_id, *station)) {
                        work_sum.add_term(v, 1.0);
                    }
                }
            }
            if work_sum.terms.is_empty() {
                continue;
            }

            let priority = input.priority(member);

            if input.weights.same_weekend != 0.0 {
                let is_same = model.new_var(VarKind::Binary, format!("same_weekend_{}_{}", member.id, idx));
                let mut constraint = work_sum.clone();
                constraint.add_term(is_same, -1.0);
                model.add_constraint(format!("same_weekend_def_{}_{}", member.id, idx), constraint, ConstraintOp::Le, 1.0);

                let mut penalty = LinExpr::new();
                penalty.add_term(is_same, input.weights.same_weekend * priority);
                model.add_objective_term(penalty.clone(), 1.0);
                add_to_category(member_category_penalty, member.id, "same_weekend", penalty);
            }

            if input.weights.consecutive_weekends != 0.0 {
                let is_worked = model.new_var(VarKind::Binary, format!("is_worked_{}_{}", member.id, idx));
                let mut constraint = work_sum.clone();
                constraint.add_term(is_worked, -(cluster.days.len() as f64));
                model.add_constraint(
                    format!("is_worked_def_{}_{}", member.id, idx),
                    constraint,
                    ConstraintOp::Le,
                    0.0,
                );
                is_worked_vars.insert((member.id, idx), is_worked);
            }
        }
    }

    if input.weights.consecutive_weekends == 0.0 {
        return;
    }
    for idx in 0..clusters.len().saturating_sub(1) {
        for member in input.memberships {
            let (Some(&a), Some(&b)) = (
                is_worked_vars.get(&(member.id, idx)),
                is_worked_vars.get(&(member.id, idx + 1)),
            ) else {
                continue;
            };
            let is_cons = model.new_var(VarKind::Binary, format!("cons_weekend_{}_{}", member.id, idx));
            let mut constraint = LinExpr::new();
            constraint.add_term(a, 1.0);
            constraint.add_term(b, 1.0);
            constraint.add_term(is_cons, -1.0);
            model.add_constraint(format!("cons_weekend_def_{}_{}", member.id, idx), constraint, ConstraintOp::Le, 1.0);

            let priority = input.priority(member);
            let mut penalty = LinExpr::new();
            penalty.add_term(is_cons, input.weights.consecutive_weekends * priority);
            model.add_objective_term(penalty.clone(), 1.0);
            add_to_category(member_category_penalty, member.id, "consecutive_weekends", penalty);
        }
    }
}

fn add_goal_deviation(
    model: &mut MilpModel,
    input: &ConstraintInput,
    assignment_vars: &HashMap<(MembershipId, DayId, StationId), VarId>,
    active_days: &[&Day],
    member_category_penalty: &mut HashMap<MembershipId, HashMap<&'static str, LinExpr>>,
) {
    if input.weights.goal_deviation == 0.0 {
        return;
    }
    for member in input.memberships {
        let Some(prefs) = input.station_weights.get(&member.id) else {
            continue;
        };
        let total_weight: f64 = prefs.values().sum();
        if total_weight <= 0.0 {
            continue;
        }
        let priority = input.priority(member);

        let mut total = LinExpr::new();
        for day in active_days {
            for station in input.required_stations {
                if let Some(&v) = assignment_vars.get(&(member.id, day.id, *station)) {
                    total.add_term(v, 1.0);
                }
            }
        }
        if total.terms.is_empty() {
            continue;
        }

        for station in input.required_stations {
            let ratio = prefs.get(station).copied().unwrap_or(0.0) / total_weight;
            if ratio <= 0.0 {
                continue;
            }
            let mut assigned_to_station = LinExpr::new();
            for day in active_days {
                if let Some(&v) = assignment_vars.get(&(member.id, day.id, *station)) {
                    assigned_to_station.add_term(v, 1.0);
                }
            }

            let pos_dev = model.new_var(
                VarKind::Continuous { lower: 0.0, upper: 1.0e6 },
                format!("goal_dev_{}_{}", member.id, station),
            );

            let mut ge_diff = assigned_to_station.clone();
            for (v, c) in &total.terms {
                ge_diff.add_term(*v, -ratio * c);
            }
            ge_diff.add_term(pos_dev, -1.0);
            model.add_constraint(
                format!("goal_dev_pos_{}_{}", member.id, station),
                ge_diff,
                ConstraintOp::Le,
                0.0,
            );

            let mut le_diff = LinExpr::new();
            for (v, c) in &total.terms {
                le_diff.add_term(*v, ratio * c);
            }
            for (v, c) in &assigned_to_station.terms {
                le_diff.add_term(*v, -c);
            }
            le_diff.add_term(pos_dev, -1.0);
            model.add_constraint(
                format!("goal_dev_neg_{}_{}", member.id, station),
                le_diff,
                ConstraintOp::Le,
                0.0,
            );

            let mut penalty = LinExpr::new();
            penalty.add_term(pos_dev, input.weights.goal_deviation * priority);
            model.add_objective_term(penalty.clone(), 1.0);
            add_to_category(member_category_penalty, member.id, "goal_deviation", penalty);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Group, GroupId, MembershipId, PersonId, Qualification, QualificationId, ScheduleId, StationId};
    use chrono::NaiveDate;

    fn day(id: u64, date: NaiveDate, lookback: bool) -> Day {
        Day {
            id: DayId(id),
            schedule_id: ScheduleId(1),
            date,
            name: date.format("%a").to_string(),
            weight: 1.0,
            is_holiday: false,
            is_lookback: lookback,
        }
    }

    fn membership(id: u64, person: u64, group: u64) -> Membership {
        Membership {
            id: MembershipId(id),
            schedule_id: ScheduleId(1),
            person_id: PersonId(person),
            group_id: GroupId(group),
            override_seniority_factor: None,
            override_min_assignments: None,
            override_max_assignments: None,
        }
    }

    fn base_input<'a>(
        days: &'a [Day],
        memberships: &'a [Membership],
        groups: &'a HashMap<GroupId, Group>,
        group_weights: &'a HashMap<GroupId, f64>,
        qualifications: &'a [Qualification],
        leaves: &'a HashMap<MembershipId, Vec<Leave>>,
        exclusions: &'a HashMap<MembershipId, HashSet<DayId>>,
        fixed_loads: &'a HashSet<(MembershipId, DayId)>,
        locks: &'a HashMap<(DayId, StationId), MembershipId>,
        station_weights: &'a HashMap<MembershipId, HashMap<StationId, f64>>,
        quotas: &'a HashMap<MembershipId, f64>,
        required_stations: &'a [StationId],
    ) -> ConstraintInput<'a> {
        ConstraintInput {
            days,
            memberships,
            groups,
            group_weights,
            required_stations,
            qualifications,
            leaves,
            exclusions,
            fixed_loads,
            locks,
            station_weights,
            quotas,
            weights: SoftWeights::default(),
        }
    }

    // S3: the assignment universe never includes a (member, day, station)
    // triple the member isn't actively qualified for.
    #[test]
    fn unqualified_members_get_no_assignment_variable() {
        let days = vec![day(1, NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(), false)];
        let memberships = vec![membership(1, 1, 1), membership(2, 2, 1)];
        let mut groups = HashMap::new();
        groups.insert(GroupId(1), Group::new(GroupId(1), "Group", 1));
        let group_weights = HashMap::new();
        // Only membership 1's person is qualified for the station.
        let qualifications = vec![Qualification {
            id: QualificationId(1),
            person_id: PersonId(1),
            station_id: StationId(1),
            is_active: true,
            earned_date: None,
        }];
        let leaves = HashMap::new();
        let exclusions = HashMap::new();
        let fixed_loads = HashSet::new();
        let locks = HashMap::new();
        let station_weights = HashMap::new();
        let quotas = HashMap::new();
        let required_stations = vec![StationId(1)];

        let input = base_input(
            &days,
            &memberships,
            &groups,
            &group_weights,
            &qualifications,
            &leaves,
            &exclusions,
            &fixed_loads,
            &locks,
            &station_weights,
            &quotas,
            &required_stations,
        );
        let built = build(&input).expect("build should succeed: member 1 covers the slot");

        assert!(built.assignment_vars.contains_key(&(MembershipId(1), DayId(1), StationId(1))));
        assert!(!built.assignment_vars.contains_key(&(MembershipId(2), DayId(1), StationId(1))));
    }

    // S5: a required slot with zero qualified, available candidates reports
    // infeasibility instead of silently dropping the constraint.
    #[test]
    fn uncoverable_slot_reports_infeasible() {
        let days = vec![day(1, NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(), false)];
        let memberships = vec![membership(1, 1, 1)];
        let mut groups = HashMap::new();
        groups.insert(GroupId(1), Group::new(GroupId(1), "Group", 1));
        let group_weights = HashMap::new();
        let qualifications = Vec::new(); // nobody qualified for anything
        let leaves = HashMap::new();
        let exclusions = HashMap::new();
        let fixed_loads = HashSet::new();
        let locks = HashMap::new();
        let station_weights = HashMap::new();
        let quotas = HashMap::new();
        let required_stations = vec![StationId(1)];

        let input = base_input(
            &days,
            &memberships,
            &groups,
            &group_weights,
            &qualifications,
            &leaves,
            &exclusions,
            &fixed_loads,
            &locks,
            &station_weights,
            &quotas,
            &required_stations,
        );

        match build(&input) {
            Err(CoreError::Infeasible(_)) => {}
            Err(other) => panic!("expected Infeasible, got a different error: {other}"),
            Ok(_) => panic!("expected Infeasible, got Ok"),
        }
    }

    // S2: two adjacent active days for the same required station cannot both
    // be assigned to the same member.
    #[test]
    fn no_back_to_back_forbids_adjacent_assignment() {
        let d1 = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let d2 = d1.succ_opt().unwrap();
        let days = vec![day(1, d1, false), day(2, d2, false)];
        let memberships = vec![membership(1, 1, 1)];
        let mut groups = HashMap::new();
        groups.insert(GroupId(1), Group::new(GroupId(1), "Group", 1));
        let group_weights = HashMap::new();
        let qualifications = vec![Qualification {
            id: QualificationId(1),
            person_id: PersonId(1),
            station_id: StationId(1),
            is_active: true,
            earned_date: None,
        }];
        let leaves = HashMap::new();
        let exclusions = HashMap::new();
        let fixed_loads = HashSet::new();
        let locks = HashMap::new();
        let station_weights = HashMap::new();
        let quotas = HashMap::new();
        let required_stations = vec![StationId(1)];

        let input = base_input(
            &days,
            &memberships,
            &groups,
            &group_weights,
            &qualifications,
            &leaves,
            &exclusions,
            &fixed_loads,
            &locks,
            &station_weights,
            &quotas,
            &required_stations,
        );
        let built = build(&input).unwrap();

        let v1 = built.assignment_vars[&(MembershipId(1), DayId(1), StationId(1))];
        let v2 = built.assignment_vars[&(MembershipId(1), DayId(2), StationId(1))];
        let b2b = built
            .model
            .constraints
            .iter()
            .find(|c| c.name.starts_with("no_b2b_1_"))
            .expect("no-back-to-back constraint must exist for this adjacent pair");
        let coeffs: HashMap<_, _> = b2b.expr.terms.iter().cloned().collect();
        assert_eq!(coeffs.get(&v1).copied(), Some(1.0));
        assert_eq!(coeffs.get(&v2).copied(), Some(1.0));
        assert_eq!(b2b.rhs, 1.0);
    }

    #[test]
    fn quota_penalty_scales_by_group_priority() {
        let days = vec![day(1, NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(), false)];
        let memberships = vec![membership(1, 1, 1)];
        let mut groups = HashMap::new();
        groups.insert(GroupId(1), Group::new(GroupId(1), "Group", 1));
        let mut group_weights = HashMap::new();
        group_weights.insert(GroupId(1), 3.0);
        let qualifications = vec![Qualification {
            id: QualificationId(1),
            person_id: PersonId(1),
            station_id: StationId(1),
            is_active: true,
            earned_date: None,
        }];
        let leaves = HashMap::new();
        let exclusions = HashMap::new();
        let fixed_loads = HashSet::new();
        let locks = HashMap::new();
        let station_weights = HashMap::new();
        let mut quotas = HashMap::new();
        quotas.insert(MembershipId(1), 0.0);
        let required_stations = vec![StationId(1)];

        let input = base_input(
            &days,
            &memberships,
            &groups,
            &group_weights,
            &qualifications,
            &leaves,
            &exclusions,
            &fixed_loads,
            &locks,
            &station_weights,
            &quotas,
            &required_stations,
        );
        let built = build(&input).unwrap();

        let penalty = &built.member_category_penalty[&MembershipId(1)]["quota_deviation"];
        // shortage coefficient should be base weight (1.0) * priority (3.0) = 3.0
        let shortage_coeff = penalty.terms.iter().map(|(_, c)| *c).find(|c| *c == 3.0);
        assert_eq!(shortage_coeff, Some(3.0));
    }
}
