//! Component G: candidate application.
//!
//! Writes a chosen candidate's assignment map onto the schedule's actual
//! `Assignment` rows, or clears them back to unassigned. Locked slots are
//! left untouched either way.

use std::collections::HashMap;

use crate::domain::{CandidateId, ScheduleId};
use crate::error::CoreError;
use crate::store::Store;

pub fn apply_candidate(store: &Store, schedule_id: ScheduleId, candidate_id: CandidateId) -> Result<usize, CoreError> {
    let candidate = store
        .get_candidate(candidate_id)
        .ok_or_else(|| CoreError::NotFound(format!("candidate {candidate_id}")))?;
    if candidate.schedule_id != schedule_id {
        return Err(CoreError::Validation(format!(
            "candidate {candidate_id} does not belong to schedule {schedule_id}"
        )));
    }

    let assignments = store.assignments_for_schedule(schedule_id);
    let by_key: HashMap<String, crate::domain::Assignment> = assignments
        .into_iter()
        .map(|a| (crate::domain::Candidate::assignment_key(a.day_id, a.station_id), a))
        .collect();

    let mut applied = 0;
    for (key, membership_id) in &candidate.assignments {
        if let Some(a) = by_key.get(key) {
            if store.set_assignment_membership(a.id, Some(*membership_id)) {
                applied += 1;
            }
        }
    }
    tracing::info!(schedule_id = %schedule_id, candidate_id = %candidate_id, applied, "applied candidate");
    Ok(applied)
}

/// Clears every non-locked assignment in a schedule back to unassigned.
pub fn clear_schedule(store: &Store, schedule_id: ScheduleId) -> usize {
    let assignments = store.assignments_for_schedule(schedule_id);
    let mut cleared = 0;
    for a in assignments {
        if !a.is_locked && a.membership_id.is_some() && store.set_assignment_membership(a.id, None) {
            cleared += 1;
        }
    }
    cleared
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Assignment, AssignmentId, Candidate, DayId, Group, GroupId, Membership, PersonId, Schedule, ScheduleStatus, SoftWeights, StationId};
    use chrono::NaiveDate;
    use std::collections::HashMap;

    fn new_schedule(store: &Store) -> ScheduleId {
        let schedule = Schedule {
            id: ScheduleId(0),
            name: "test".into(),
            start_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 1, 7).unwrap(),
            status: ScheduleStatus::Draft,
            weights: SoftWeights::default(),
            group_weights: HashMap::new(),
            required_stations: vec![StationId(1)],
        };
        store.insert_schedule(schedule).id
    }

    /// S6: apply_candidate must not move a locked slot onto the candidate's
    /// choice of member, even when the candidate's assignment map disagrees
    /// with who already holds that slot.
    #[test]
    fn apply_candidate_skips_locked_assignment_rows() {
        let store = Store::new();
        let schedule_id = new_schedule(&store);
        let group = store.insert_group(Group::new(GroupId(0), "deck", 1));
        let locked_holder = store
            .insert_membership(Membership {
                id: MembershipId(0),
                schedule_id,
                person_id: PersonId(1),
                group_id: group.id,
                override_seniority_factor: None,
                override_min_assignments: None,
                override_max_assignments: None,
            })
            .unwrap();
        let candidate_pick = store
            .insert_membership(Membership {
                id: MembershipId(0),
                schedule_id,
                person_id: PersonId(2),
                group_id: group.id,
                override_seniority_factor: None,
                override_min_assignments: None,
                override_max_assignments: None,
            })
            .unwrap();

        let locked = store.insert_assignment(Assignment {
            id: AssignmentId(0),
            schedule_id,
            day_id: DayId(1),
            station_id: StationId(1),
            membership_id: Some(locked_holder.id),
            is_locked: true,
            availability_estimate: 1.0,
        });

        let mut assignments = HashMap::new();
        assignments.insert(Candidate::assignment_key(locked.day_id, locked.station_id), candidate_pick.id);
        let candidate = store.insert_candidate(Candidate {
            id: CandidateId(0),
            schedule_id,
            run_id: "run".into(),
            score: 0.0,
            assignments,
            metrics: HashMap::new(),
        });

        let applied = apply_candidate(&store, schedule_id, candidate.id).unwrap();
        assert_eq!(applied, 0, "apply_candidate must not touch a locked slot");

        let stored = store
            .assignments_for_schedule(schedule_id)
            .into_iter()
            .find(|a| a.id == locked.id)
            .unwrap();
        assert_eq!(stored.membership_id, Some(locked_holder.id), "locked slot must keep its original holder");
    }
}
