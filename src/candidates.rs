//! Component E: diversified candidate generator.
//!
//! Each iteration rescales the schedule's soft weights, rebuilds and
//! resolves the MILP, and streams a progress/candidate/error/complete
//! event sequence to the caller. Cancellation is cooperative: checked
//! between iterations, never mid-solve, mirroring the pattern the
//! vehicle-routing quickstart uses for its own background solves.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::mpsc::UnboundedSender;

use crate::constraints::{self, ConstraintInput};
use crate::domain::{
    Candidate, CandidateId, Day, DayId, GroupId, MemberMetrics, MembershipId, ScheduleId, StationId,
};
use crate::error::CoreError;
use crate::milp::{MilpBackend, SolveBudget, VarId};
use crate::solver::{is_acceptable, CbcBackend};
use crate::store::Store;

#[derive(Debug, Clone, serde::Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    Progress { iteration: usize, total: usize, message: String },
    Candidate { candidate: Candidate },
    Error { message: String },
    Complete { candidate_ids: Vec<CandidateId> },
}

/// Cooperative cancellation token shared between the HTTP handler and the
/// blocking solve task.
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Runs the full diversification loop synchronously. Intended to be invoked
/// from within `tokio::task::spawn_blocking`, never on the async executor.
pub fn run_candidate_generation(
    store: &Store,
    schedule_id: ScheduleId,
    num_candidates: usize,
    cancel: CancelToken,
    tx: UnboundedSender<ProgressEvent>,
) {
    let run_id = uuid::Uuid::new_v4().to_string();

    let schedule = match store.get_schedule(schedule_id) {
        Some(s) => s,
        None => {
            let _ = tx.send(ProgressEvent::Error {
                message: format!("schedule {schedule_id} not found"),
            });
            return;
        }
    };

    store.clear_candidates(schedule_id);

    let days = store.days_for_schedule(schedule_id);
    let memberships = store.memberships_for_schedule(schedule_id);
    let groups: HashMap<GroupId, crate::domain::Group> =
        store.list_groups().into_iter().map(|g| (g.id, g)).collect();
    let qualifications = store.all_qualifications();

    let mut leaves: HashMap<MembershipId, Vec<crate::domain::Leave>> = HashMap::new();
    let mut exclusions: HashMap<MembershipId, HashSet<DayId>> = HashMap::new();
    let mut station_weights: HashMap<MembershipId, HashMap<StationId, f64>> = HashMap::new();
    for m in &memberships {
        leaves.insert(m.id, store.leaves_for_membership(m.id));
        exclusions.insert(
            m.id,
            store.exclusions_for_membership(m.id).into_iter().map(|e| e.day_id).collect(),
        );
        let mut weights = HashMap::new();
        for sw in store.station_weights_for_membership(m.id) {
            weights.insert(sw.station_id, sw.weight);
        }
        station_weights.insert(m.id, weights);
    }

    let assignments = store.assignments_for_schedule(schedule_id);
    let locks: HashMap<(DayId, StationId), MembershipId> = assignments
        .iter()
        .filter(|a| a.is_locked)
        .filter_map(|a| a.membership_id.map(|m| ((a.day_id, a.station_id), m)))
        .collect();

    let fixed_loads: HashSet<(MembershipId, DayId)> = assignments
        .iter()
        .filter_map(|a| a.membership_id.map(|m| (m, a.day_id)))
        .collect();

    let slots_per_day = schedule.required_stations.len().max(1);
    let quota_results = crate::quota::calculate_schedule_quotas(&days, &memberships, &groups, &leaves, slots_per_day);
    let quotas: HashMap<MembershipId, f64> = quota_results.into_iter().map(|q| (q.membership_id, q.assigned_quota)).collect();

    let mut candidate_ids = Vec::new();

    for i in 0..num_candidates {
        if cancel.is_cancelled() {
            let _ = tx.send(ProgressEvent::Progress {
                iteration: i,
                total: num_candidates,
                message: "cancelled".into(),
            });
            break;
        }

        let var_factor = if i == 0 { 1.0 } else { rand::thread_rng().gen_range(0.85..=1.15) };
        let weights = schedule.weights.scaled(var_factor);

        let _ = tx.send(ProgressEvent::Progress {
            iteration: i,
            total: num_candidates,
            message: format!("building candidate {} of {}", i + 1, num_candidates),
        });

        let input = ConstraintInput {
            days: &days,
            memberships: &memberships,
            groups: &groups,
            group_weights: &schedule.group_weights,
            required_stations: &schedule.required_stations,
            qualifications: &qualifications,
            leaves: &leaves,
            exclusions: &exclusions,
            fixed_loads: &fixed_loads,
            locks: &locks,
            station_weights: &station_weights,
            quotas: &quotas,
            weights,
        };

        let built = match constraints::build(&input) {
            Ok(b) => b,
            Err(CoreError::Infeasible(message)) => {
                let _ = tx.send(ProgressEvent::Error { message });
                break;
            }
            Err(other) => {
                let _ = tx.send(ProgressEvent::Error { message: other.to_string() });
                break;
            }
        };

        let time_limit = Duration::from_secs((2.0 + 4.5 * i as f64) as u64);
        let relative_gap = (0.05 - (i as f64) * 0.012).max(0.0);
        let backend = CbcBackend::new();
        let outcome = backend.solve(&built.model, SolveBudget { time_limit, relative_gap });

        if !is_acceptable(&outcome) {
            let err = CoreError::SolverBudgetExhausted(format!(
                "iteration {i} found no feasible integer solution within its time/gap budget"
            ));
            tracing::warn!(error = %err, schedule_id = %schedule_id, iteration = i, "solver budget exhausted");
            let _ = tx.send(ProgressEvent::Progress {
                iteration: i,
                total: num_candidates,
                message: "no feasible solution this iteration".into(),
            });
            continue;
        }

        let candidate = extract_candidate(
            schedule_id,
            &run_id,
            &built.assignment_vars,
            &built.member_category_penalty,
            &outcome.values,
            &memberships,
            &schedule.group_weights,
            &quotas,
            &days,
        );
        let stored = store.insert_candidate(candidate);
        candidate_ids.push(stored.id);
        let _ = tx.send(ProgressEvent::Candidate { candidate: stored });
    }

    let _ = tx.send(ProgressEvent::Complete { candidate_ids });
}

#[allow(clippy::too_many_arguments)]
fn extract_candidate(
    schedule_id: ScheduleId,
    run_id: &str,
    assignment_vars: &HashMap<(MembershipId, DayId, StationId), VarId>,
    member_category_penalty: &HashMap<MembershipId, HashMap<&'static str, crate::milp::LinExpr>>,
    values: &HashMap<VarId, f64>,
    memberships: &[crate::domain::Membership],
    group_weights: &HashMap<GroupId, f64>,
    quotas: &HashMap<MembershipId, f64>,
    days: &[Day],
) -> Candidate {
    let day_weight: HashMap<DayId, f64> = days.iter().map(|d| (d.id, d.weight)).collect();

    let mut assignments: HashMap<String, MembershipId> = HashMap::new();
    let mut assigned_days: HashMap<MembershipId, Vec<DayId>> = HashMap::new();

    for (&(member_id, day_id, station_id), &var) in assignment_vars {
        if values.get(&var).copied().unwrap_or(0.0) > 0.5 {
            assignments.insert(crate::domain::Candidate::assignment_key(day_id, station_id), member_id);
            assigned_days.entry(member_id).or_default().push(day_id);
        }
    }

    let mut metrics = HashMap::new();
    let mut score = 0.0;
    for m in memberships {
        let days_worked = assigned_days.get(&m.id).cloned().unwrap_or_default();
        let points: f64 = days_worked.iter().map(|d| day_weight.get(d).copied().unwrap_or(0.0)).sum();
        let quota_target = quotas.get(&m.id).copied().unwrap_or(0.0);
        let group_priority = group_weights.get(&m.group_id).copied().unwrap_or(1.0);

        let mut breakdown: HashMap<String, f64> = HashMap::new();
        if let Some(categories) = member_category_penalty.get(&m.id) {
            for (category, expr) in categories {
                breakdown.insert(category.to_string(), expr.eval(values));
            }
        }
        let goat_points: f64 = breakdown.values().sum();
        score += goat_points;

        metrics.insert(
            m.id.to_string(),
            MemberMetrics {
                member_id: m.id,
                goat_points,
                breakdown,
                assigned: days_worked.len(),
                points,
                quota_target,
                group_priority,
            },
        );
    }

    Candidate {
        id: crate::domain::CandidateId(0),
        schedule_id,
        run_id: run_id.to_string(),
        score,
        assignments,
        metrics,
    }
}
