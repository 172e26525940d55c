use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, StatusCode},
    response::Response,
    Json,
};
use chrono::Local;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    middleware::tenant::TenantSlug,
    models::user::AuthenticatedUser,
    services::{
        csv::{export_csv, export_filename, CsvBridge, ExportRow},
        mood::{average_mood, MoodService},
        roles::school_display_name,
        roster::{RosterService, DEFAULT_CAMPUS},
    },
    AppState,
};

use super::{internal_error, require_counselor};

const EXPORT_MOOD_COUNT: usize = 5;
const EXPORT_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Deserialize)]
pub struct ImportQuery {
    /// The caller's currently-selected campus; imported rows land here.
    pub campus: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    pub campus: Option<String>,
    pub window: Option<i64>,
}

/// Bulk roster import from CSV text. Rows are written one at a time; a
/// failure partway leaves the earlier rows in place (not transactional).
/// The response reports only aggregate counts — there is no per-row error
/// detail.
pub async fn import_students(
    State(state): State<AppState>,
    TenantSlug(tenant): TenantSlug,
    user: AuthenticatedUser,
    Query(query): Query<ImportQuery>,
    body: String,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    require_counselor(&state, &tenant, &user).await?;

    let campus = query.campus.unwrap_or_else(|| DEFAULT_CAMPUS.to_string());
    match CsvBridge::import_students(&state.db, &tenant, &body, &campus).await {
        Ok(outcome) => Ok(Json(json!({
            "imported": outcome.imported,
            "skipped": outcome.skipped,
        }))),
        Err(e) => Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": e.to_string() })),
        )),
    }
}

/// Roster + mood export as a CSV download with a templated filename.
pub async fn export_students(
    State(state): State<AppState>,
    TenantSlug(tenant): TenantSlug,
    user: AuthenticatedUser,
    Query(query): Query<ExportQuery>,
) -> Result<Response, (StatusCode, Json<Value>)> {
    require_counselor(&state, &tenant, &user).await?;

    let students = RosterService::list_students(&state.db, &tenant, query.campus.as_deref())
        .await
        .map_err(internal_error)?;

    let today = Local::now().date_naive();
    let window = query.window.unwrap_or(EXPORT_WINDOW_DAYS);

    let mut rows = Vec::with_capacity(students.len());
    for student in &students {
        let moods = MoodService::list_for_student(&state.db, &tenant, &student.student_id)
            .await
            .map_err(internal_error)?;
        rows.push(ExportRow {
            name: student.name.clone(),
            student_id: student.student_id.clone(),
            grade: student.grade.clone(),
            birthday: student
                .birthday
                .map(|d| d.to_string())
                .unwrap_or_default(),
            email: student.email.clone(),
            last_moods: moods
                .iter()
                .take(EXPORT_MOOD_COUNT)
                .map(|m| m.emoji.clone())
                .collect(),
            average_mood: average_mood(&moods, window, today),
            campus: student.campus.clone(),
        });
    }

    let csv_text = export_csv(&rows).map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        )
    })?;

    let stored_name: Option<String> =
        sqlx::query_scalar::<_, Option<String>>("SELECT display_name FROM schools WHERE slug = $1")
            .bind(&tenant)
            .fetch_optional(&state.db)
            .await
            .ok()
            .flatten()
            .flatten();
    let school_name = school_display_name(stored_name, &tenant);
    let filename = export_filename(&school_name, query.campus.as_deref());

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/csv; charset=utf-8")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        )
        .body(Body::from(csv_text))
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        })
}
