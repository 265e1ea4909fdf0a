//! In-memory persistence layer.
//!
//! The specification places the relational store out of scope for the
//! core and addresses it only through the interfaces of §6. This is the
//! minimal stand-in that satisfies those interfaces: one `RwLock`-guarded
//! table per entity, with cascade deletes performed synchronously under
//! the write lock (the in-process analogue of the FK-cascade requirement
//! in §5).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::domain::*;
use crate::error::CoreError;

#[derive(Default)]
struct IdGen {
    next: AtomicU64,
}

impl IdGen {
    fn next(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed) + 1
    }
}

/// The whole in-process database.
pub struct Store {
    ids: IdGen,

    people: RwLock<HashMap<PersonId, Person>>,
    groups: RwLock<HashMap<GroupId, Group>>,
    stations: RwLock<HashMap<StationId, Station>>,
    qualifications: RwLock<HashMap<QualificationId, Qualification>>,
    schedules: RwLock<HashMap<ScheduleId, Schedule>>,
    days: RwLock<HashMap<DayId, Day>>,
    memberships: RwLock<HashMap<MembershipId, Membership>>,
    station_weights: RwLock<HashMap<StationWeightId, StationWeight>>,
    leaves: RwLock<HashMap<LeaveId, Leave>>,
    exclusions: RwLock<HashMap<ExclusionId, Exclusion>>,
    assignments: RwLock<HashMap<AssignmentId, Assignment>>,
    candidates: RwLock<HashMap<CandidateId, Candidate>>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    pub fn new() -> Self {
        Self {
            ids: IdGen::default(),
            people: RwLock::new(HashMap::new()),
            groups: RwLock::new(HashMap::new()),
            stations: RwLock::new(HashMap::new()),
            qualifications: RwLock::new(HashMap::new()),
            schedules: RwLock::new(HashMap::new()),
            days: RwLock::new(HashMap::new()),
            memberships: RwLock::new(HashMap::new()),
            station_weights: RwLock::new(HashMap::new()),
            leaves: RwLock::new(HashMap::new()),
            exclusions: RwLock::new(HashMap::new()),
            assignments: RwLock::new(HashMap::new()),
            candidates: RwLock::new(HashMap::new()),
        }
    }

    // --- People / Groups / Stations / Qualifications ---

    pub fn insert_person(&self, mut person: Person) -> Person {
        person.id = PersonId(self.ids.next());
        self.people.write().insert(person.id, person.clone());
        person
    }

    pub fn get_person(&self, id: PersonId) -> Option<Person> {
        self.people.read().get(&id).cloned()
    }

    pub fn list_people(&self) -> Vec<Person> {
        let mut out: Vec<_> = self.people.read().values().cloned().collect();
        out.sort_by_key(|p| p.id);
        out
    }

    pub fn insert_group(&self, mut group: Group) -> Group {
        group.id = GroupId(self.ids.next());
        self.groups.write().insert(group.id, group.clone());
        self.reorder_groups();
        group
    }

    pub fn get_group(&self, id: GroupId) -> Option<Group> {
        self.groups.read().get(&id).cloned()
    }

    pub fn list_groups(&self) -> Vec<Group> {
        let mut out: Vec<_> = self.groups.read().values().cloned().collect();
        out.sort_by_key(|g| g.priority);
        out
    }

    /// Applies an explicit display order, then resequences to a dense
    /// 1..N ordering. Group ids not present in `order` keep their
    /// relative position after the ones that were given.
    pub fn reorder_groups_with_order(&self, order: &[GroupId]) {
        {
            let mut groups = self.groups.write();
            for (idx, id) in order.iter().enumerate() {
                if let Some(g) = groups.get_mut(id) {
                    g.priority = idx as i32;
                }
            }
        }
        self.reorder_groups();
    }

    /// Resequences every group's `priority` to a dense 1..N ordering,
    /// preserving relative order. Called after any insert/delete/move.
    pub fn reorder_groups(&self) {
        let mut groups = self.groups.write();
        let mut ordered: Vec<GroupId> = groups.values().collect::<Vec<_>>().iter().map(|g| g.id).collect();
        ordered.sort_by_key(|id| groups.get(id).map(|g| g.priority).unwrap_or(i32::MAX));
        for (idx, id) in ordered.into_iter().enumerate() {
            if let Some(g) = groups.get_mut(&id) {
                g.priority = (idx + 1) as i32;
            }
        }
    }

    pub fn delete_group(&self, id: GroupId) {
        self.groups.write().remove(&id);
        self.reorder_groups();
    }

    pub fn insert_station(&self, mut station: Station) -> Station {
        station.id = StationId(self.ids.next());
        self.stations.write().insert(station.id, station.clone());
        station
    }

    pub fn get_station(&self, id: StationId) -> Option<Station> {
        self.stations.read().get(&id).cloned()
    }

    pub fn list_stations(&self) -> Vec<Station> {
        let mut out: Vec<_> = self.stations.read().values().cloned().collect();
        out.sort_by_key(|s| s.id);
        out
    }

    pub fn insert_qualification(&self, mut q: Qualification) -> Result<Qualification, CoreError> {
        let dup = self
            .qualifications
            .read()
            .values()
            .any(|existing| existing.person_id == q.person_id && existing.station_id == q.station_id);
        if dup {
            return Err(CoreError::Conflict(format!(
                "person {} is already qualified for station {}",
                q.person_id, q.station_id
            )));
        }
        q.id = QualificationId(self.ids.next());
        self.qualifications.write().insert(q.id, q.clone());
        Ok(q)
    }

    pub fn qualifications_for_person(&self, person_id: PersonId) -> Vec<Qualification> {
        self.qualifications
            .read()
            .values()
            .filter(|q| q.person_id == person_id)
            .cloned()
            .collect()
    }

    pub fn all_qualifications(&self) -> Vec<Qualification> {
        self.qualifications.read().values().cloned().collect()
    }

    // --- Schedules ---

    pub fn insert_schedule(&self, mut schedule: Schedule) -> Schedule {
        schedule.id = ScheduleId(self.ids.next());
        self.schedules.write().insert(schedule.id, schedule.clone());
        schedule
    }

    pub fn get_schedule(&self, id: ScheduleId) -> Option<Schedule> {
        self.schedules.read().get(&id).cloned()
    }

    pub fn update_schedule<F: FnOnce(&mut Schedule)>(&self, id: ScheduleId, f: F) -> Result<Schedule, CoreError> {
        let mut schedules = self.schedules.write();
        let schedule = schedules
            .get_mut(&id)
            .ok_or_else(|| CoreError::NotFound(format!("schedule {id}")))?;
        f(schedule);
        Ok(schedule.clone())
    }

    pub fn list_schedules(&self) -> Vec<Schedule> {
        let mut out: Vec<_> = self.schedules.read().values().cloned().collect();
        out.sort_by_key(|s| s.id);
        out
    }

    /// Cascade-deletes a schedule and everything rooted under it.
    pub fn delete_schedule(&self, id: ScheduleId) -> Result<(), CoreError> {
        self.schedules.write().remove(&id);

        self.days.write().retain(|_, d| d.schedule_id != id);

        let membership_ids: Vec<MembershipId> = {
            let members = self.memberships.read();
            members.values().filter(|m| m.schedule_id == id).map(|m| m.id).collect()
        };
        for mid in &membership_ids {
            self.cascade_delete_membership_children(*mid);
        }
        self.memberships.write().retain(|_, m| m.schedule_id != id);

        self.assignments.write().retain(|_, a| a.schedule_id != id);
        self.candidates.write().retain(|_, c| c.schedule_id != id);

        let leftover = self.days.read().values().any(|d| d.schedule_id == id)
            || self.memberships.read().values().any(|m| m.schedule_id == id)
            || self.assignments.read().values().any(|a| a.schedule_id == id)
            || self.candidates.read().values().any(|c| c.schedule_id == id);
        if leftover {
            return Err(CoreError::DataIntegrity(format!(
                "schedule {id} cascade left dependent rows behind"
            )));
        }
        Ok(())
    }

    fn cascade_delete_membership_children(&self, membership_id: MembershipId) {
        self.station_weights.write().retain(|_, sw| sw.membership_id != membership_id);
        self.leaves.write().retain(|_, l| l.membership_id != membership_id);
        self.exclusions.write().retain(|_, e| e.membership_id != membership_id);
    }

    // --- Days ---

    /// Inserts a full day sequence atomically, rejecting if any (schedule, date)
    /// pair already exists.
    pub fn insert_days(&self, schedule_id: ScheduleId, new_days: Vec<Day>) -> Result<Vec<Day>, CoreError> {
        let mut days = self.days.write();
        let existing_dates: std::collections::HashSet<chrono::NaiveDate> = days
            .values()
            .filter(|d| d.schedule_id == schedule_id)
            .map(|d| d.date)
            .collect();
        for d in &new_days {
            if existing_dates.contains(&d.date) {
                return Err(CoreError::Conflict(format!(
                    "day {} already materialized for schedule {}",
                    d.date, schedule_id
                )));
            }
        }
        let mut inserted = Vec::with_capacity(new_days.len());
        for mut d in new_days {
            d.id = DayId(self.ids.next());
            days.insert(d.id, d.clone());
            inserted.push(d);
        }
        Ok(inserted)
    }

    pub fn days_for_schedule(&self, schedule_id: ScheduleId) -> Vec<Day> {
        let mut out: Vec<_> = self
            .days
            .read()
            .values()
            .filter(|d| d.schedule_id == schedule_id)
            .cloned()
            .collect();
        out.sort_by_key(|d| d.date);
        out
    }

    // --- Memberships ---

    pub fn insert_membership(&self, mut membership: Membership) -> Result<Membership, CoreError> {
        let dup = self.memberships.read().values().any(|m| {
            m.schedule_id == membership.schedule_id && m.person_id == membership.person_id
        });
        if dup {
            return Err(CoreError::Conflict(
                "this person is already a member of the schedule".into(),
            ));
        }
        membership.id = MembershipId(self.ids.next());
        self.memberships.write().insert(membership.id, membership.clone());
        Ok(membership)
    }

    pub fn get_membership(&self, id: MembershipId) -> Option<Membership> {
        self.memberships.read().get(&id).cloned()
    }

    pub fn memberships_for_schedule(&self, schedule_id: ScheduleId) -> Vec<Membership> {
        let mut out: Vec<_> = self
            .memberships
            .read()
            .values()
            .filter(|m| m.schedule_id == schedule_id)
            .cloned()
            .collect();
        out.sort_by_key(|m| m.id);
        out
    }

    /// Cascade-deletes a membership's station_weights/leaves/exclusions and
    /// frees (rather than deletes) any Assignment slot it held — the slot
    /// itself still needs to be staffed by someone else.
    pub fn delete_membership(&self, id: MembershipId) -> Result<(), CoreError> {
        self.cascade_delete_membership_children(id);
        self.memberships.write().remove(&id);
        for a in self.assignments.write().values_mut() {
            if a.membership_id == Some(id) {
                a.membership_id = None;
            }
        }

        let leftover = self.station_weights.read().values().any(|sw| sw.membership_id == id)
            || self.leaves.read().values().any(|l| l.membership_id == id)
            || self.exclusions.read().values().any(|e| e.membership_id == id);
        if leftover {
            return Err(CoreError::DataIntegrity(format!(
                "membership {id} cascade left dependent rows behind"
            )));
        }
        Ok(())
    }

    pub fn insert_station_weight(&self, mut sw: StationWeight) -> StationWeight {
        sw.id = StationWeightId(self.ids.next());
        self.station_weights.write().insert(sw.id, sw.clone());
        sw
    }

    pub fn station_weights_for_membership(&self, membership_id: MembershipId) -> Vec<StationWeight> {
        self.station_weights
            .read()
            .values()
            .filter(|sw| sw.membership_id == membership_id)
            .cloned()
            .collect()
    }

    pub fn insert_leave(&self, mut leave: Leave) -> Leave {
        leave.id = LeaveId(self.ids.next());
        self.leaves.write().insert(leave.id, leave.clone());
        leave
    }

    pub fn leaves_for_membership(&self, membership_id: MembershipId) -> Vec<Leave> {
        self.leaves
            .read()
            .values()
            .filter(|l| l.membership_id == membership_id)
            .cloned()
            .collect()
    }

    pub fn insert_exclusion(&self, mut exclusion: Exclusion) -> Exclusion {
        exclusion.id = ExclusionId(self.ids.next());
        self.exclusions.write().insert(exclusion.id, exclusion.clone());
        exclusion
    }

    pub fn exclusions_for_membership(&self, membership_id: MembershipId) -> Vec<Exclusion> {
        self.exclusions
            .read()
            .values()
            .filter(|e| e.membership_id == membership_id)
            .cloned()
            .collect()
    }

    // --- Assignments ---

    pub fn insert_assignment(&self, mut a: Assignment) -> Assignment {
        a.id = AssignmentId(self.ids.next());
        self.assignments.write().insert(a.id, a.clone());
        a
    }

    pub fn assignments_for_schedule(&self, schedule_id: ScheduleId) -> Vec<Assignment> {
        let mut out: Vec<_> = self
            .assignments
            .read()
            .values()
            .filter(|a| a.schedule_id == schedule_id)
            .cloned()
            .collect();
        out.sort_by_key(|a| a.id);
        out
    }

    pub fn delete_assignment(&self, id: AssignmentId) {
        self.assignments.write().remove(&id);
    }

    pub fn locked_assignments(&self, schedule_id: ScheduleId) -> Vec<Assignment> {
        self.assignments_for_schedule(schedule_id)
            .into_iter()
            .filter(|a| a.is_locked)
            .collect()
    }

    /// Sets the membership of a single non-locked slot; returns true if updated.
    pub fn set_assignment_membership(&self, id: AssignmentId, membership_id: Option<MembershipId>) -> bool {
        let mut assignments = self.assignments.write();
        match assignments.get_mut(&id) {
            Some(a) if !a.is_locked => {
                a.membership_id = membership_id;
                true
            }
            _ => false,
        }
    }

    // --- Candidates ---

    pub fn insert_candidate(&self, mut candidate: Candidate) -> Candidate {
        candidate.id = CandidateId(self.ids.next());
        self.candidates.write().insert(candidate.id, candidate.clone());
        candidate
    }

    pub fn get_candidate(&self, id: CandidateId) -> Option<Candidate> {
        self.candidates.read().get(&id).cloned()
    }

    /// Candidates sorted by score ascending, ties broken by candidate id
    /// (insertion order) per the open-question resolution in SPEC_FULL.md.
    pub fn candidates_for_schedule(&self, schedule_id: ScheduleId) -> Vec<Candidate> {
        let mut out: Vec<_> = self
            .candidates
            .read()
            .values()
            .filter(|c| c.schedule_id == schedule_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| {
            a.score
                .partial_cmp(&b.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.id.cmp(&b.id))
        });
        out
    }

    pub fn clear_candidates(&self, schedule_id: ScheduleId) {
        self.candidates.write().retain(|_, c| c.schedule_id != schedule_id);
    }
}
