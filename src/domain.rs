//! Domain model for the Watchbill Optimization Core.
//!
//! Entities mirror the relational shape described by the specification:
//! flat, id-keyed tables with cross-references resolved through the
//! [`crate::store::Store`] rather than owned/nested object graphs.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

macro_rules! id_type {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(PersonId);
id_type!(GroupId);
id_type!(StationId);
id_type!(QualificationId);
id_type!(ScheduleId);
id_type!(DayId);
id_type!(MembershipId);
id_type!(StationWeightId);
id_type!(LeaveId);
id_type!(ExclusionId);
id_type!(AssignmentId);
id_type!(CandidateId);

/// A person who can be rostered onto schedules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Person {
    pub id: PersonId,
    pub name: String,
    pub is_active: bool,
    pub group_id: Option<GroupId>,
}

/// An ordering/seniority bucket personnel belong to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    /// Dense 1..N display ordering, maintained by `Store::reorder_groups`.
    pub priority: i32,
    pub seniority_factor: f64,
    pub min_assignments: i32,
    pub max_assignments: i32,
}

impl Group {
    pub fn new(id: GroupId, name: impl Into<String>, priority: i32) -> Self {
        Self {
            id,
            name: name.into(),
            priority,
            seniority_factor: 1.0,
            min_assignments: 0,
            max_assignments: 10,
        }
    }
}

/// A watch role in the global station library.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Station {
    pub id: StationId,
    pub name: String,
    pub abbr: String,
}

/// A (person, station, active) permission triple.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Qualification {
    pub id: QualificationId,
    pub person_id: PersonId,
    pub station_id: StationId,
    pub is_active: bool,
    pub earned_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleStatus {
    Draft,
    Published,
    Archived,
}

/// The six soft-constraint base weights carried by a schedule.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SoftWeights {
    pub quota_deviation: f64,
    pub spacing_1_day: f64,
    pub spacing_2_day: f64,
    pub same_weekend: f64,
    pub consecutive_weekends: f64,
    pub goal_deviation: f64,
}

impl Default for SoftWeights {
    fn default() -> Self {
        Self {
            quota_deviation: 1.0,
            spacing_1_day: 1.5,
            spacing_2_day: 1.0,
            same_weekend: 1.0,
            consecutive_weekends: 1.5,
            goal_deviation: 0.5,
        }
    }
}

impl SoftWeights {
    /// Scale every weight by the same diversification factor (§4.E).
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            quota_deviation: self.quota_deviation * factor,
            spacing_1_day: self.spacing_1_day * factor,
            spacing_2_day: self.spacing_2_day * factor,
            same_weekend: self.same_weekend * factor,
            consecutive_weekends: self.consecutive_weekends * factor,
            goal_deviation: self.goal_deviation * factor,
        }
    }
}

/// A planning window plus its solver tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schedule {
    pub id: ScheduleId,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: ScheduleStatus,
    pub weights: SoftWeights,
    /// group_id -> priority multiplier override for this schedule.
    pub group_weights: HashMap<GroupId, f64>,
    /// Stations required to be staffed every active day.
    pub required_stations: Vec<StationId>,
}

/// One calendar date materialized for a schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Day {
    pub id: DayId,
    pub schedule_id: ScheduleId,
    pub date: NaiveDate,
    pub name: String,
    pub weight: f64,
    pub is_holiday: bool,
    pub is_lookback: bool,
}

impl Day {
    pub fn is_weekend_part(&self) -> bool {
        use chrono::Weekday;
        matches!(self.date.weekday(), Weekday::Sat | Weekday::Sun) || self.is_holiday
    }
}

/// A person's participation in one schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Membership {
    pub id: MembershipId,
    pub schedule_id: ScheduleId,
    pub person_id: PersonId,
    pub group_id: GroupId,
    pub override_seniority_factor: Option<f64>,
    pub override_min_assignments: Option<i32>,
    pub override_max_assignments: Option<i32>,
}

/// A membership's preference weight for a station, used by the goal-deviation penalty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationWeight {
    pub id: StationWeightId,
    pub membership_id: MembershipId,
    pub station_id: StationId,
    pub weight: f64,
}

/// A closed interval of unavailability for a membership.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Leave {
    pub id: LeaveId,
    pub membership_id: MembershipId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: Option<String>,
}

impl Leave {
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }
}

/// A hard "do not assign" marker for a single day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exclusion {
    pub id: ExclusionId,
    pub membership_id: MembershipId,
    pub day_id: DayId,
    pub reason: Option<String>,
}

/// One (day, station) slot, exactly one per required station per active day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub id: AssignmentId,
    pub schedule_id: ScheduleId,
    pub day_id: DayId,
    pub station_id: StationId,
    pub membership_id: Option<MembershipId>,
    pub is_locked: bool,
    pub availability_estimate: f64,
}

/// Per-member cost breakdown produced by the solver driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberMetrics {
    pub member_id: MembershipId,
    pub goat_points: f64,
    pub breakdown: HashMap<String, f64>,
    pub assigned: usize,
    pub points: f64,
    pub quota_target: f64,
    pub group_priority: f64,
}

/// One optimizer output: a complete admissible schedule with its cost breakdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub id: CandidateId,
    pub schedule_id: ScheduleId,
    pub run_id: String,
    pub score: f64,
    /// "{day_id}_{station_id}" -> membership_id, matching the reference's assignment_map shape.
    pub assignments: HashMap<String, MembershipId>,
    /// keyed by membership id (as a string), matching the reference
    /// `metrics_data` shape but resolved against this store's ids rather
    /// than person names.
    pub metrics: HashMap<String, MemberMetrics>,
}

impl Candidate {
    pub fn assignment_key(day_id: DayId, station_id: StationId) -> String {
        format!("{}_{}", day_id.0, station_id.0)
    }
}

/// Qualified station ids for a person, restricted to active qualifications.
pub fn active_qualified_stations(quals: &[Qualification], person_id: PersonId) -> HashSet<StationId> {
    quals
        .iter()
        .filter(|q| q.person_id == person_id && q.is_active)
        .map(|q| q.station_id)
        .collect()
}
