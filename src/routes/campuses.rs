use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    middleware::tenant::TenantSlug,
    models::user::AuthenticatedUser,
    services::roster::RosterService,
    AppState,
};

use super::{internal_error, require_counselor};

#[derive(Debug, Deserialize)]
pub struct AddCampusRequest {
    pub name: String,
}

pub async fn list_campuses(
    State(state): State<AppState>,
    TenantSlug(tenant): TenantSlug,
    user: AuthenticatedUser,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    require_counselor(&state, &tenant, &user).await?;

    RosterService::list_campuses(&state.db, &tenant)
        .await
        .map(|c| Json(serde_json::to_value(c).unwrap_or_default()))
        .map_err(internal_error)
}

pub async fn add_campus(
    State(state): State<AppState>,
    TenantSlug(tenant): TenantSlug,
    user: AuthenticatedUser,
    Json(body): Json<AddCampusRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    require_counselor(&state, &tenant, &user).await?;

    RosterService::add_campus(&state.db, &tenant, &body.name)
        .await
        .map(|_| Json(json!({ "message": "Campus added" })))
        .map_err(internal_error)
}
