//! HTTP request/response projections of the domain model.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{GroupId, PersonId, SoftWeights, StationId};

#[derive(Debug, Deserialize)]
pub struct CreatePersonRequest {
    pub name: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub group_id: Option<GroupId>,
}

#[derive(Debug, Deserialize)]
pub struct CreateGroupRequest {
    pub name: String,
    #[serde(default)]
    pub seniority_factor: Option<f64>,
    #[serde(default)]
    pub min_assignments: Option<i32>,
    #[serde(default)]
    pub max_assignments: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct ReorderGroupsRequest {
    pub ordered_group_ids: Vec<GroupId>,
}

#[derive(Debug, Deserialize)]
pub struct CreateStationRequest {
    pub name: String,
    pub abbr: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateQualificationRequest {
    pub station_id: StationId,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub earned_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct CreateScheduleRequest {
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub weights: Option<SoftWeights>,
    #[serde(default)]
    pub required_stations: Vec<StationId>,
}

#[derive(Debug, Deserialize)]
pub struct PatchScheduleRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<crate::domain::ScheduleStatus>,
    #[serde(default)]
    pub weights: Option<SoftWeights>,
    /// Keyed by group id as a string, per the external JSON contract.
    #[serde(default)]
    pub group_weights: Option<std::collections::HashMap<String, f64>>,
}

#[derive(Debug, Deserialize)]
pub struct LinkStationRequest {
    pub station_id: StationId,
}

#[derive(Debug, Serialize)]
pub struct ScheduleSummary {
    pub total_calendar_load: f64,
    pub station_load: Vec<StationLoad>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct StationLoad {
    pub station_id: StationId,
    pub demand: f64,
    pub supply: usize,
    pub load_factor: f64,
}

#[derive(Debug, Deserialize)]
pub struct AddMembershipRequest {
    pub person_id: PersonId,
    /// Defaults to the person's own group when omitted.
    pub group_id: Option<GroupId>,
    #[serde(default)]
    pub override_seniority_factor: Option<f64>,
    #[serde(default)]
    pub override_min_assignments: Option<i32>,
    #[serde(default)]
    pub override_max_assignments: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct CreateLeaveRequest {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateExclusionRequest {
    pub day_id: crate::domain::DayId,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetStationWeightRequest {
    pub station_id: StationId,
    pub weight: f64,
}

#[derive(Debug, Deserialize)]
pub struct GenerateCandidatesRequest {
    #[serde(default = "default_num_candidates")]
    pub num_candidates: usize,
}

#[derive(Debug, Deserialize)]
pub struct ApplyCandidateRequest {
    pub candidate_id: crate::domain::CandidateId,
}

#[derive(Debug, Serialize)]
pub struct AppliedResponse {
    pub assignments_updated: usize,
}

fn default_true() -> bool {
    true
}

fn default_num_candidates() -> usize {
    5
}
