//! REST API surface for the watchbill optimization core.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use chrono::Duration;
use serde::Serialize;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::StreamExt;

use crate::applier;
use crate::calendar;
use crate::candidates::{self, CancelToken, ProgressEvent};
use crate::demo_data::{self, DemoSize};
use crate::domain::*;
use crate::dto::*;
use crate::error::CoreError;
use crate::holidays;
use crate::store::Store;
use crate::validator;

/// Application state shared across handlers.
pub struct AppState {
    pub store: Store,
    solve_jobs: parking_lot::RwLock<HashMap<ScheduleId, CancelToken>>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            store: Store::new(),
            solve_jobs: parking_lot::RwLock::new(HashMap::new()),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/health", get(health))
        .route("/info", get(info))
        .route("/demo-data", get(list_demo_data))
        .route("/demo-data/{size}", post(seed_demo_data))
        .route("/personnel", get(list_people).post(create_person))
        .route("/personnel/{id}/qualifications", post(create_qualification))
        .route("/groups", get(list_groups).post(create_group))
        .route("/groups/reorder", put(reorder_groups))
        .route("/stations", get(list_stations).post(create_station))
        .route("/schedules", get(list_schedules).post(create_schedule))
        .route("/schedules/{id}", get(get_schedule).patch(update_schedule).delete(delete_schedule))
        .route("/schedules/{id}/days", get(list_days))
        .route("/schedules/{id}/stations", post(link_station))
        .route("/schedules/{id}/stations/{station_id}", delete(unlink_station))
        .route("/schedules/{id}/memberships", get(list_memberships).post(add_membership))
        .route("/schedules/{id}/memberships/{mid}", delete(remove_membership))
        .route("/schedules/{id}/memberships/{mid}/leaves", post(add_leave))
        .route("/schedules/{id}/memberships/{mid}/exclusions", post(add_exclusion))
        .route("/schedules/{id}/memberships/{mid}/station-weights", post(set_station_weight))
        .route("/schedules/{id}/assignments", get(list_assignments))
        .route("/schedules/{id}/candidates", get(list_candidates))
        .route("/schedules/{id}/generate", post(generate_candidates))
        .route("/schedules/{id}/generate/stop", post(stop_generation))
        .route("/schedules/{id}/apply", post(apply_candidate))
        .route("/schedules/{id}/clear", post(clear_schedule))
        .route("/schedules/{id}/quotas", get(get_quotas))
        .route("/schedules/{id}/summary", get(get_summary))
        .route("/schedules/{id}/alerts", get(list_alerts));

    Router::new().nest("/api", api).with_state(state)
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "UP" })
}

#[derive(Debug, Serialize)]
pub struct InfoResponse {
    pub name: &'static str,
    pub version: &'static str,
    pub solver_engine: &'static str,
}

async fn info() -> Json<InfoResponse> {
    Json(InfoResponse {
        name: "watchbill-core",
        version: env!("CARGO_PKG_VERSION"),
        solver_engine: "CBC via good_lp",
    })
}

async fn list_demo_data() -> Json<Vec<&'static str>> {
    Json(demo_data::list_demo_data())
}

async fn seed_demo_data(
    State(state): State<Arc<AppState>>,
    Path(size): Path<String>,
) -> Result<Json<Schedule>, CoreError> {
    let size: DemoSize = size
        .parse()
        .map_err(|_| CoreError::Validation(format!("unknown demo data set {size}")))?;
    let schedule_id = demo_data::generate(&state.store, size);
    let schedule = state
        .store
        .get_schedule(schedule_id)
        .ok_or_else(|| CoreError::Internal(anyhow::anyhow!("demo data did not persist a schedule")))?;
    Ok(Json(schedule))
}

async fn list_people(State(state): State<Arc<AppState>>) -> Json<Vec<Person>> {
    Json(state.store.list_people())
}

async fn create_person(State(state): State<Arc<AppState>>, Json(body): Json<CreatePersonRequest>) -> Json<Person> {
    Json(state.store.insert_person(Person {
        id: PersonId(0),
        name: body.name,
        is_active: body.is_active,
        group_id: body.group_id,
    }))
}

async fn list_groups(State(state): State<Arc<AppState>>) -> Json<Vec<Group>> {
    Json(state.store.list_groups())
}

async fn create_group(State(state): State<Arc<AppState>>, Json(body): Json<CreateGroupRequest>) -> Json<Group> {
    let mut group = Group::new(GroupId(0), body.name, 0);
    if let Some(v) = body.seniority_factor {
        group.seniority_factor = v;
    }
    if let Some(v) = body.min_assignments {
        group.min_assignments = v;
    }
    if let Some(v) = body.max_assignments {
        group.max_assignments = v;
    }
    Json(state.store.insert_group(group))
}

async fn reorder_groups(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ReorderGroupsRequest>,
) -> Result<Json<Vec<Group>>, CoreError> {
    for group_id in &body.ordered_group_ids {
        state
            .store
            .get_group(*group_id)
            .ok_or_else(|| CoreError::NotFound(format!("group {group_id}")))?;
    }
    state.store.reorder_groups_with_order(&body.ordered_group_ids);
    Ok(Json(state.store.list_groups()))
}

async fn list_stations(State(state): State<Arc<AppState>>) -> Json<Vec<Station>> {
    Json(state.store.list_stations())
}

async fn create_station(State(state): State<Arc<AppState>>, Json(body): Json<CreateStationRequest>) -> Json<Station> {
    Json(state.store.insert_station(Station {
        id: StationId(0),
        name: body.name,
        abbr: body.abbr,
    }))
}

async fn create_qualification(
    State(state): State<Arc<AppState>>,
    Path(person_id): Path<u64>,
    Json(body): Json<CreateQualificationRequest>,
) -> Result<Json<Qualification>, CoreError> {
    state
        .store
        .get_person(PersonId(person_id))
        .ok_or_else(|| CoreError::NotFound(format!("person {person_id}")))?;
    let q = state.store.insert_qualification(Qualification {
        id: QualificationId(0),
        person_id: PersonId(person_id),
        station_id: body.station_id,
        is_active: body.is_active,
        earned_date: body.earned_date,
    })?;
    Ok(Json(q))
}

async fn list_schedules(State(state): State<Arc<AppState>>) -> Json<Vec<Schedule>> {
    Json(state.store.list_schedules())
}

async fn create_schedule(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateScheduleRequest>,
) -> Result<Json<Schedule>, CoreError> {
    if body.end_date < body.start_date {
        return Err(CoreError::Validation("end_date precedes start_date".into()));
    }
    let schedule = state.store.insert_schedule(Schedule {
        id: ScheduleId(0),
        name: body.name,
        start_date: body.start_date,
        end_date: body.end_date,
        status: ScheduleStatus::Draft,
        weights: body.weights.unwrap_or_default(),
        group_weights: HashMap::new(),
        required_stations: body.required_stations,
    });

    let holiday_list = holidays::holidays_in_range(
        schedule.start_date - Duration::days(calendar::LOOKBACK_DAYS),
        schedule.end_date,
    );
    let days = calendar::materialize_days(schedule.id, schedule.start_date, schedule.end_date, &holiday_list);
    state.store.insert_days(schedule.id, days)?;

    for station in &schedule.required_stations {
        for day in state.store.days_for_schedule(schedule.id) {
            if day.is_lookback {
                continue;
            }
            state.store.insert_assignment(Assignment {
                id: AssignmentId(0),
                schedule_id: schedule.id,
                day_id: day.id,
                station_id: *station,
                membership_id: None,
                is_locked: false,
                availability_estimate: 1.0,
            });
        }
    }

    tracing::info!(schedule_id = %schedule.id, "created schedule");
    Ok(Json(schedule))
}

async fn get_schedule(State(state): State<Arc<AppState>>, Path(id): Path<u64>) -> Result<Json<Schedule>, CoreError> {
    state
        .store
        .get_schedule(ScheduleId(id))
        .map(Json)
        .ok_or_else(|| CoreError::NotFound(format!("schedule {id}")))
}

async fn delete_schedule(State(state): State<Arc<AppState>>, Path(id): Path<u64>) -> Result<StatusCode, CoreError> {
    state.store.delete_schedule(ScheduleId(id))?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_days(State(state): State<Arc<AppState>>, Path(id): Path<u64>) -> Json<Vec<Day>> {
    Json(state.store.days_for_schedule(ScheduleId(id)))
}

async fn list_memberships(State(state): State<Arc<AppState>>, Path(id): Path<u64>) -> Json<Vec<Membership>> {
    Json(state.store.memberships_for_schedule(ScheduleId(id)))
}

async fn add_membership(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    Json(body): Json<AddMembershipRequest>,
) -> Result<Json<Membership>, CoreError> {
    let person = state
        .store
        .get_person(body.person_id)
        .ok_or_else(|| CoreError::NotFound(format!("person {}", body.person_id)))?;
    let group_id = body
        .group_id
        .or(person.group_id)
        .ok_or_else(|| CoreError::Validation("person has no group; group_id is required".into()))?;

    let membership = state.store.insert_membership(Membership {
        id: MembershipId(0),
        schedule_id: ScheduleId(id),
        person_id: person.id,
        group_id,
        override_seniority_factor: body.override_seniority_factor,
        override_min_assignments: body.override_min_assignments,
        override_max_assignments: body.override_max_assignments,
    })?;

    // Auto-weight: a person with exactly one active qualification gets a
    // full preference weight toward it.
    let quals: Vec<_> = state
        .store
        .qualifications_for_person(person.id)
        .into_iter()
        .filter(|q| q.is_active)
        .collect();
    if quals.len() == 1 {
        state.store.insert_station_weight(StationWeight {
            id: StationWeightId(0),
            membership_id: membership.id,
            station_id: quals[0].station_id,
            weight: 1.0,
        });
    }

    Ok(Json(membership))
}

async fn remove_membership(
    State(state): State<Arc<AppState>>,
    Path((_, mid)): Path<(u64, u64)>,
) -> Result<StatusCode, CoreError> {
    state.store.delete_membership(MembershipId(mid))?;
    Ok(StatusCode::NO_CONTENT)
}

async fn add_leave(
    State(state): State<Arc<AppState>>,
    Path((_, mid)): Path<(u64, u64)>,
    Json(body): Json<CreateLeaveRequest>,
) -> Result<Json<Leave>, CoreError> {
    if body.end_date < body.start_date {
        return Err(CoreError::Validation("end_date precedes start_date".into()));
    }
    state
        .store
        .get_membership(MembershipId(mid))
        .ok_or_else(|| CoreError::NotFound(format!("membership {mid}")))?;
    Ok(Json(state.store.insert_leave(Leave {
        id: LeaveId(0),
        membership_id: MembershipId(mid),
        start_date: body.start_date,
        end_date: body.end_date,
        reason: body.reason,
    })))
}

async fn add_exclusion(
    State(state): State<Arc<AppState>>,
    Path((_, mid)): Path<(u64, u64)>,
    Json(body): Json<CreateExclusionRequest>,
) -> Result<Json<Exclusion>, CoreError> {
    state
        .store
        .get_membership(MembershipId(mid))
        .ok_or_else(|| CoreError::NotFound(format!("membership {mid}")))?;
    Ok(Json(state.store.insert_exclusion(Exclusion {
        id: ExclusionId(0),
        membership_id: MembershipId(mid),
        day_id: body.day_id,
        reason: body.reason,
    })))
}

async fn set_station_weight(
    State(state): State<Arc<AppState>>,
    Path((_, mid)): Path<(u64, u64)>,
    Json(body): Json<SetStationWeightRequest>,
) -> Result<Json<StationWeight>, CoreError> {
    state
        .store
        .get_membership(MembershipId(mid))
        .ok_or_else(|| CoreError::NotFound(format!("membership {mid}")))?;
    Ok(Json(state.store.insert_station_weight(StationWeight {
        id: StationWeightId(0),
        membership_id: MembershipId(mid),
        station_id: body.station_id,
        weight: body.weight,
    })))
}

async fn list_assignments(State(state): State<Arc<AppState>>, Path(id): Path<u64>) -> Json<Vec<Assignment>> {
    Json(state.store.assignments_for_schedule(ScheduleId(id)))
}

async fn list_candidates(State(state): State<Arc<AppState>>, Path(id): Path<u64>) -> Json<Vec<Candidate>> {
    Json(state.store.candidates_for_schedule(ScheduleId(id)))
}

/// POST /schedules/{id}/candidates - streams progress/candidate/error/complete
/// events as newline-delimited JSON while the diversification loop runs in
/// the background.
async fn generate_candidates(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    Json(body): Json<GenerateCandidatesRequest>,
) -> Response {
    let schedule_id = ScheduleId(id);
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    let cancel = CancelToken::new();
    state.solve_jobs.write().insert(schedule_id, cancel.clone());

    let store_state = state.clone();
    tokio::task::spawn_blocking(move || {
        candidates::run_candidate_generation(&store_state.store, schedule_id, body.num_candidates, cancel, tx);
    });

    let lines = UnboundedReceiverStream::new(rx).map(|event: ProgressEvent| {
        let mut line = serde_json::to_vec(&event).unwrap_or_default();
        line.push(b'\n');
        Ok::<_, std::io::Error>(Bytes::from(line))
    });

    Response::builder()
        .header(header::CONTENT_TYPE, "application/x-ndjson")
        .body(Body::from_stream(lines))
        .unwrap()
        .into_response()
}

async fn stop_generation(State(state): State<Arc<AppState>>, Path(id): Path<u64>) -> StatusCode {
    if let Some(cancel) = state.solve_jobs.read().get(&ScheduleId(id)) {
        cancel.cancel();
        StatusCode::ACCEPTED
    } else {
        StatusCode::NOT_FOUND
    }
}

async fn apply_candidate(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    Json(body): Json<ApplyCandidateRequest>,
) -> Result<Json<AppliedResponse>, CoreError> {
    let applied = applier::apply_candidate(&state.store, ScheduleId(id), body.candidate_id)?;
    Ok(Json(AppliedResponse { assignments_updated: applied }))
}

async fn clear_schedule(State(state): State<Arc<AppState>>, Path(id): Path<u64>) -> Json<AppliedResponse> {
    let cleared = applier::clear_schedule(&state.store, ScheduleId(id));
    Json(AppliedResponse { assignments_updated: cleared })
}

async fn update_schedule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    Json(body): Json<PatchScheduleRequest>,
) -> Result<Json<Schedule>, CoreError> {
    let group_weight_updates = body.group_weights.map(|map| {
        map.into_iter()
            .filter_map(|(k, v)| k.parse::<u64>().ok().map(|id| (GroupId(id), v)))
            .collect::<HashMap<_, _>>()
    });

    let updated = state.store.update_schedule(ScheduleId(id), |schedule| {
        if let Some(name) = body.name {
            schedule.name = name;
        }
        if let Some(status) = body.status {
            schedule.status = status;
        }
        if let Some(weights) = body.weights {
            schedule.weights = weights;
        }
        if let Some(group_weights) = group_weight_updates {
            schedule.group_weights.extend(group_weights);
        }
    })?;
    Ok(Json(updated))
}

async fn link_station(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    Json(body): Json<LinkStationRequest>,
) -> Result<Json<Schedule>, CoreError> {
    let schedule_id = ScheduleId(id);
    let already_linked = state
        .store
        .get_schedule(schedule_id)
        .ok_or_else(|| CoreError::NotFound(format!("schedule {schedule_id}")))?
        .required_stations
        .contains(&body.station_id);
    if already_linked {
        return Err(CoreError::Conflict(format!(
            "station {} is already assigned to schedule {}",
            body.station_id, schedule_id
        )));
    }

    let updated = state.store.update_schedule(schedule_id, |schedule| {
        schedule.required_stations.push(body.station_id);
    })?;

    for day in state.store.days_for_schedule(schedule_id) {
        if day.is_lookback {
            continue;
        }
        state.store.insert_assignment(Assignment {
            id: AssignmentId(0),
            schedule_id,
            day_id: day.id,
            station_id: body.station_id,
            membership_id: None,
            is_locked: false,
            availability_estimate: 1.0,
        });
    }

    Ok(Json(updated))
}

async fn unlink_station(
    State(state): State<Arc<AppState>>,
    Path((id, station_id)): Path<(u64, u64)>,
) -> Result<Json<Schedule>, CoreError> {
    let schedule_id = ScheduleId(id);
    let station_id = StationId(station_id);
    let updated = state.store.update_schedule(schedule_id, |schedule| {
        schedule.required_stations.retain(|s| *s != station_id);
    })?;

    for assignment in state.store.assignments_for_schedule(schedule_id) {
        if assignment.station_id == station_id {
            state.store.delete_assignment(assignment.id);
        }
    }

    Ok(Json(updated))
}

async fn get_quotas(State(state): State<Arc<AppState>>, Path(id): Path<u64>) -> Json<HashMap<String, f64>> {
    let schedule_id = ScheduleId(id);
    let Some(schedule) = state.store.get_schedule(schedule_id) else {
        return Json(HashMap::new());
    };
    let days = state.store.days_for_schedule(schedule_id);
    let memberships = state.store.memberships_for_schedule(schedule_id);
    let groups: HashMap<GroupId, Group> = state.store.list_groups().into_iter().map(|g| (g.id, g)).collect();
    let mut leaves = HashMap::new();
    for m in &memberships {
        leaves.insert(m.id, state.store.leaves_for_membership(m.id));
    }
    let slots_per_day = schedule.required_stations.len().max(1);
    let quotas = crate::quota::calculate_schedule_quotas(&days, &memberships, &groups, &leaves, slots_per_day);
    Json(
        quotas
            .into_iter()
            .map(|q| (q.membership_id.to_string(), q.assigned_quota))
            .collect(),
    )
}

async fn get_summary(State(state): State<Arc<AppState>>, Path(id): Path<u64>) -> Result<Json<ScheduleSummary>, CoreError> {
    let schedule_id = ScheduleId(id);
    let schedule = state
        .store
        .get_schedule(schedule_id)
        .ok_or_else(|| CoreError::NotFound(format!("schedule {schedule_id}")))?;
    let days = state.store.days_for_schedule(schedule_id);
    let active_days: Vec<_> = days.iter().filter(|d| !d.is_lookback).collect();
    let total_calendar_load: f64 = active_days.iter().map(|d| d.weight).sum();

    let memberships = state.store.memberships_for_schedule(schedule_id);
    let qualifications = state.store.all_qualifications();

    let mut warnings = Vec::new();
    let mut station_load = Vec::new();
    for station_id in &schedule.required_stations {
        let demand = active_days.len() as f64;
        let supply = memberships
            .iter()
            .filter(|m| {
                crate::domain::active_qualified_stations(&qualifications, m.person_id).contains(station_id)
            })
            .count();
        let load_factor = if supply > 0 { demand / supply as f64 } else { f64::INFINITY };
        if !load_factor.is_finite() || load_factor > 1.0 {
            warnings.push(format!("station {station_id} is overloaded (load factor {load_factor:.2})"));
        }
        station_load.push(StationLoad {
            station_id: *station_id,
            demand,
            supply,
            load_factor,
        });
    }

    Ok(Json(ScheduleSummary {
        total_calendar_load,
        station_load,
        warnings,
    }))
}

async fn list_alerts(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Json<Vec<validator::ValidationAlert>> {
    let schedule_id = ScheduleId(id);
    let days = state.store.days_for_schedule(schedule_id);
    let assignments = state.store.assignments_for_schedule(schedule_id);
    let memberships = state.store.memberships_for_schedule(schedule_id);

    let mut leaves = Vec::new();
    let mut exclusions = Vec::new();
    for m in &memberships {
        leaves.extend(state.store.leaves_for_membership(m.id));
        exclusions.extend(state.store.exclusions_for_membership(m.id));
    }

    let alerts = validator::validate_schedule(
        &days,
        &assignments,
        &validator::group_leaves_by_membership(leaves),
        &validator::group_exclusions_by_membership(exclusions),
    );
    Json(alerts)
}
