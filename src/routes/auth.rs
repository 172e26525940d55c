use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::{
    middleware::tenant::TenantSlug,
    models::user::{AuthenticatedUser, SetRoleRequest},
    services::roles::RoleService,
    AppState,
};

/// First-sign-in entry point: runs role resolution for the presented
/// identity, creating the school and the User/Student record as needed.
/// Safe to call on every sign-in — repeat calls are no-ops.
pub async fn resolve(
    State(state): State<AppState>,
    TenantSlug(tenant): TenantSlug,
    user: AuthenticatedUser,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    match RoleService::resolve_sign_in(&state.db, &tenant, &user).await {
        Ok(profile) => Ok(Json(serde_json::to_value(profile).unwrap_or_default())),
        Err(e) => {
            // The identity session itself is not rolled back — the caller is
            // authenticated but unrouted, and must retry.
            tracing::error!("Role resolution failed for {}: {e}", tenant);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Sign-in failed" })),
            ))
        }
    }
}

/// Profile for the presented identity token, resolved against this school.
pub async fn me(
    State(state): State<AppState>,
    TenantSlug(tenant): TenantSlug,
    user: AuthenticatedUser,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let is_counselor = RoleService::is_counselor(&state.db, &tenant, &user)
        .await
        .map_err(super::internal_error)?;
    Ok(Json(json!({
        "subject": user.subject,
        "name": user.name,
        "email": user.email,
        "school": tenant,
        "role": if is_counselor { "counselor" } else { "student" },
    })))
}

/// Privileged role assignment. Requires the caller's admin claim; without
/// it the call fails permission-denied with no partial effect.
pub async fn set_user_role(
    State(state): State<AppState>,
    TenantSlug(tenant): TenantSlug,
    user: AuthenticatedUser,
    Json(body): Json<SetRoleRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if !user.admin {
        return Err((
            StatusCode::FORBIDDEN,
            Json(json!({ "error": "permission-denied" })),
        ));
    }

    let updated = RoleService::set_role(&state.db, &tenant, &body.subject, body.role)
        .await
        .map_err(super::internal_error)?;
    if !updated {
        return Err((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("Unknown subject: {}", body.subject) })),
        ));
    }

    Ok(Json(json!({
        "message": format!("Role for {} set to {}", body.subject, body.role)
    })))
}
