pub mod auth;
pub mod campuses;
pub mod health;
pub mod moods;
pub mod roster_io;
pub mod school;
pub mod students;

use axum::{http::StatusCode, Json};
use serde_json::{json, Value};

use crate::{models::user::AuthenticatedUser, services::roles::RoleService, AppState};

/// Only counselors (or admin identities) may use roster-facing operations.
pub async fn require_counselor(
    state: &AppState,
    tenant: &str,
    user: &AuthenticatedUser,
) -> Result<(), (StatusCode, Json<Value>)> {
    match RoleService::is_counselor(&state.db, tenant, user).await {
        Ok(true) => Ok(()),
        Ok(false) => Err((StatusCode::FORBIDDEN, Json(json!({ "error": "Access denied" })))),
        Err(e) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        )),
    }
}

/// Maps a service error into the standard error-body response.
pub fn internal_error(e: anyhow::Error) -> (StatusCode, Json<Value>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": e.to_string() })),
    )
}
