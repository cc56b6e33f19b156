//! HTTP surface for the command interface: trigger syncs, manage study
//! plans, mark completions, and read the weekly state. Reminder flags are
//! never mutated here; only the scheduler and completion tracker flip them.

use axum::Json;
use axum::extract::{Path, Query};
use axum::routing::{post, put};
use axum::{Router, extract::State, http::StatusCode, routing::get};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::{AssignmentKey, Course, PlanDetail, PlanKey, StudyPlan, WeekAssignmentStatus};
use crate::services::{CompletionTracker, SyncService, SyncStats};
use crate::state::AppState;
use crate::store;
use crate::week::{week_bounds, week_key_of};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/courses", get(list_courses))
        .route("/assignments/week", get(week_assignments))
        .route("/plans", put(upsert_plan))
        .route("/plans/week", get(week_plans))
        .route("/plans/reschedule", post(reschedule_plan))
        .route("/assignments/{course_id}/{assignment_id}/complete", post(mark_complete))
        .route("/sync", post(sync_now))
        .with_state(state)
}

#[derive(Deserialize)]
struct UserQuery {
    user_id: String,
}

#[derive(Deserialize)]
struct UpsertPlanRequest {
    user_id: String,
    course_id: i64,
    assignment_id: i64,
    planned_at: DateTime<Utc>,
    notes: Option<String>,
}

#[derive(Deserialize)]
struct ReschedulePlanRequest {
    user_id: String,
    course_id: i64,
    assignment_id: i64,
    planned_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct CompleteRequest {
    user_id: String,
    #[serde(default = "default_completed")]
    completed: bool,
}

fn default_completed() -> bool {
    true
}

#[derive(Serialize)]
struct CompleteResponse {
    celebrated: bool,
}

async fn health(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    sqlx::query("select 1").execute(&state.db).await?;
    Ok(StatusCode::OK)
}

async fn list_courses(State(state): State<AppState>) -> Result<Json<Vec<Course>>, AppError> {
    let courses = store::fetch_courses(&state.db).await?;
    Ok(Json(courses))
}

async fn week_assignments(
    State(state): State<AppState>,
    Query(params): Query<UserQuery>,
) -> Result<Json<Vec<WeekAssignmentStatus>>, AppError> {
    let week = week_key_of(Utc::now());
    let rows = store::week_assignments_with_status(&state.db, &params.user_id, week).await?;
    Ok(Json(rows))
}

async fn upsert_plan(
    State(state): State<AppState>,
    Json(req): Json<UpsertPlanRequest>,
) -> Result<Json<StudyPlan>, AppError> {
    let key = PlanKey {
        user_id: req.user_id,
        course_id: req.course_id,
        assignment_id: req.assignment_id,
    };
    let assignment_key = AssignmentKey {
        course_id: key.course_id,
        assignment_id: key.assignment_id,
    };
    if store::find_assignment(&state.db, assignment_key).await?.is_none() {
        return Err(AppError::BadRequest("unknown assignment".to_string()));
    }

    store::upsert_study_plan(&state.db, &key, req.planned_at, req.notes.as_deref()).await?;
    let plan = store::find_plan(&state.db, &key)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(plan))
}

async fn week_plans(
    State(state): State<AppState>,
    Query(params): Query<UserQuery>,
) -> Result<Json<Vec<PlanDetail>>, AppError> {
    let week = week_key_of(Utc::now());
    let (from, to) = week_bounds(week)
        .ok_or_else(|| AppError::BadRequest(format!("invalid week {week}")))?;
    let rows = store::user_plans_between(&state.db, &params.user_id, from, to).await?;
    Ok(Json(rows))
}

async fn reschedule_plan(
    State(state): State<AppState>,
    Json(req): Json<ReschedulePlanRequest>,
) -> Result<Json<StudyPlan>, AppError> {
    let key = PlanKey {
        user_id: req.user_id,
        course_id: req.course_id,
        assignment_id: req.assignment_id,
    };
    if !store::reschedule_plan(&state.db, &key, req.planned_at).await? {
        return Err(AppError::NotFound);
    }
    let plan = store::find_plan(&state.db, &key)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(plan))
}

async fn mark_complete(
    State(state): State<AppState>,
    Path((course_id, assignment_id)): Path<(i64, i64)>,
    Json(req): Json<CompleteRequest>,
) -> Result<Json<CompleteResponse>, AppError> {
    let tracker = CompletionTracker::new(
        state.db.clone(),
        state.notifier.clone(),
        state.config.display_tz,
    );
    let key = AssignmentKey { course_id, assignment_id };
    let celebrated = tracker
        .mark_complete(&req.user_id, key, req.completed, Utc::now())
        .await?;
    Ok(Json(CompleteResponse { celebrated }))
}

async fn sync_now(State(state): State<AppState>) -> Result<Json<SyncStats>, AppError> {
    let service = SyncService::new(state.db.clone(), state.canvas.clone());
    let stats = service.sync_all().await?;
    Ok(Json(stats))
}
