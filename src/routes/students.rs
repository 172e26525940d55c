use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    middleware::tenant::TenantSlug,
    models::{
        life_event::UpsertLifeEventRequest,
        student::{UpsertNotesRequest, UpsertStudentRequest},
        user::AuthenticatedUser,
    },
    services::roster::RosterService,
    AppState,
};

use super::{internal_error, require_counselor};

#[derive(Debug, Deserialize)]
pub struct RosterQuery {
    pub campus: Option<String>,
}

pub async fn list_students(
    State(state): State<AppState>,
    TenantSlug(tenant): TenantSlug,
    user: AuthenticatedUser,
    Query(query): Query<RosterQuery>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    require_counselor(&state, &tenant, &user).await?;

    RosterService::list_students(&state.db, &tenant, query.campus.as_deref())
        .await
        .map(|s| Json(serde_json::to_value(s).unwrap_or_default()))
        .map_err(internal_error)
}

pub async fn create_student(
    State(state): State<AppState>,
    TenantSlug(tenant): TenantSlug,
    user: AuthenticatedUser,
    Json(body): Json<UpsertStudentRequest>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    require_counselor(&state, &tenant, &user).await?;

    RosterService::upsert_student(&state.db, &tenant, &body)
        .await
        .map(|s| (StatusCode::CREATED, Json(serde_json::to_value(s).unwrap_or_default())))
        .map_err(internal_error)
}

pub async fn update_student(
    State(state): State<AppState>,
    TenantSlug(tenant): TenantSlug,
    user: AuthenticatedUser,
    Path(student_id): Path<String>,
    Json(mut body): Json<UpsertStudentRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    require_counselor(&state, &tenant, &user).await?;
    body.student_id = student_id;

    RosterService::upsert_student(&state.db, &tenant, &body)
        .await
        .map(|s| Json(serde_json::to_value(s).unwrap_or_default()))
        .map_err(internal_error)
}

pub async fn delete_student(
    State(state): State<AppState>,
    TenantSlug(tenant): TenantSlug,
    user: AuthenticatedUser,
    Path(student_id): Path<String>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    require_counselor(&state, &tenant, &user).await?;

    RosterService::delete_student(&state.db, &tenant, &student_id)
        .await
        .map(|_| Json(json!({ "message": "Student deleted" })))
        .map_err(internal_error)
}

pub async fn list_counselors(
    State(state): State<AppState>,
    TenantSlug(tenant): TenantSlug,
    user: AuthenticatedUser,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    require_counselor(&state, &tenant, &user).await?;

    RosterService::list_counselors(&state.db, &tenant)
        .await
        .map(|c| Json(serde_json::to_value(c).unwrap_or_default()))
        .map_err(internal_error)
}

pub async fn get_notes(
    State(state): State<AppState>,
    TenantSlug(tenant): TenantSlug,
    user: AuthenticatedUser,
    Path(student_id): Path<String>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    require_counselor(&state, &tenant, &user).await?;

    let notes = RosterService::get_notes(&state.db, &tenant, &student_id)
        .await
        .map_err(internal_error)?;
    match notes {
        Some(notes) => Ok(Json(serde_json::to_value(notes).unwrap_or_default())),
        None => Ok(Json(json!({ "student_id": student_id, "content": "" }))),
    }
}

pub async fn upsert_notes(
    State(state): State<AppState>,
    TenantSlug(tenant): TenantSlug,
    user: AuthenticatedUser,
    Path(student_id): Path<String>,
    Json(body): Json<UpsertNotesRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    require_counselor(&state, &tenant, &user).await?;

    RosterService::upsert_notes(&state.db, &tenant, &student_id, &body.content)
        .await
        .map(|n| Json(serde_json::to_value(n).unwrap_or_default()))
        .map_err(internal_error)
}

pub async fn list_life_events(
    State(state): State<AppState>,
    TenantSlug(tenant): TenantSlug,
    user: AuthenticatedUser,
    Path(student_id): Path<String>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    require_counselor(&state, &tenant, &user).await?;

    RosterService::list_life_events(&state.db, &tenant, &student_id)
        .await
        .map(|e| Json(serde_json::to_value(e).unwrap_or_default()))
        .map_err(internal_error)
}

pub async fn create_life_event(
    State(state): State<AppState>,
    TenantSlug(tenant): TenantSlug,
    user: AuthenticatedUser,
    Path(student_id): Path<String>,
    Json(body): Json<UpsertLifeEventRequest>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    require_counselor(&state, &tenant, &user).await?;

    RosterService::create_life_event(&state.db, &tenant, &student_id, &body)
        .await
        .map(|e| (StatusCode::CREATED, Json(serde_json::to_value(e).unwrap_or_default())))
        .map_err(internal_error)
}

pub async fn update_life_event(
    State(state): State<AppState>,
    TenantSlug(tenant): TenantSlug,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpsertLifeEventRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    require_counselor(&state, &tenant, &user).await?;

    RosterService::update_life_event(&state.db, &tenant, id, &body)
        .await
        .map(|e| Json(serde_json::to_value(e).unwrap_or_default()))
        .map_err(internal_error)
}

pub async fn delete_life_event(
    State(state): State<AppState>,
    TenantSlug(tenant): TenantSlug,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    require_counselor(&state, &tenant, &user).await?;

    RosterService::delete_life_event(&state.db, &tenant, id)
        .await
        .map(|_| Json(json!({ "message": "Life event deleted" })))
        .map_err(internal_error)
}
