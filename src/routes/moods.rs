use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Local;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    middleware::tenant::TenantSlug,
    models::{
        mood::{RecordMoodRequest, SENTINEL_EMOJI, SENTINEL_LABEL, SENTINEL_SCORE},
        user::AuthenticatedUser,
    },
    services::{
        mood::{average_mood, todays_mood, MoodService},
        roles::RoleService,
        roster::RosterService,
    },
    AppState,
};

use super::internal_error;

const DEFAULT_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    /// Rolling-average window in days. Counselor-configurable; the UI
    /// clamps its input to [1, 30] but the API accepts any value.
    pub window: Option<i64>,
}

/// May the caller touch this student's mood data? Counselors always;
/// students only their own record. Returns whether the caller is a
/// counselor, which gates the backdating path.
async fn authorize_student_access(
    state: &AppState,
    tenant: &str,
    user: &AuthenticatedUser,
    student_id: &str,
) -> Result<bool, (StatusCode, Json<Value>)> {
    let is_counselor = RoleService::is_counselor(&state.db, tenant, user)
        .await
        .map_err(internal_error)?;
    if is_counselor {
        return Ok(true);
    }

    let student = RosterService::get_student(&state.db, tenant, student_id)
        .await
        .map_err(internal_error)?;
    match student {
        Some(s) if s.subject_id.as_deref() == Some(user.subject.as_str()) => Ok(false),
        _ => Err((StatusCode::FORBIDDEN, Json(json!({ "error": "Access denied" })))),
    }
}

/// Only counselors may record for a day other than today; a student's
/// selection always lands on today, so past days stay fixed once over.
fn can_record_for_date(is_counselor: bool, date: chrono::NaiveDate, today: chrono::NaiveDate) -> bool {
    is_counselor || date == today
}

/// The student's daily selection: a date-keyed upsert, so re-selecting on
/// the same day replaces the record rather than duplicating it.
pub async fn record_mood(
    State(state): State<AppState>,
    TenantSlug(tenant): TenantSlug,
    user: AuthenticatedUser,
    Json(body): Json<RecordMoodRequest>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    let is_counselor = authorize_student_access(&state, &tenant, &user, &body.student_id).await?;

    let today = Local::now().date_naive();
    let date = body.date.unwrap_or(today);
    if !can_record_for_date(is_counselor, date, today) {
        return Err((
            StatusCode::FORBIDDEN,
            Json(json!({ "error": "Moods can only be recorded for today" })),
        ));
    }
    MoodService::record(&state.db, &tenant, &body.student_id, date, body.score)
        .await
        .map(|r| (StatusCode::CREATED, Json(serde_json::to_value(r).unwrap_or_default())))
        .map_err(internal_error)
}

pub async fn list_moods(
    State(state): State<AppState>,
    TenantSlug(tenant): TenantSlug,
    user: AuthenticatedUser,
    Path(student_id): Path<String>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    authorize_student_access(&state, &tenant, &user, &student_id).await?;

    MoodService::list_for_student(&state.db, &tenant, &student_id)
        .await
        .map(|m| Json(serde_json::to_value(m).unwrap_or_default()))
        .map_err(internal_error)
}

/// Dashboard summary: today's mood (or the sentinel) plus the rolling
/// average over the requested window.
pub async fn mood_summary(
    State(state): State<AppState>,
    TenantSlug(tenant): TenantSlug,
    user: AuthenticatedUser,
    Path(student_id): Path<String>,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    authorize_student_access(&state, &tenant, &user, &student_id).await?;

    let records = MoodService::list_for_student(&state.db, &tenant, &student_id)
        .await
        .map_err(internal_error)?;

    let today = Local::now().date_naive();
    let window = query.window.unwrap_or(DEFAULT_WINDOW_DAYS);

    let today_json = match todays_mood(&records, today) {
        Some(r) => json!({ "emoji": r.emoji, "label": r.label, "score": r.score }),
        None => json!({
            "emoji": SENTINEL_EMOJI,
            "label": SENTINEL_LABEL,
            "score": SENTINEL_SCORE,
        }),
    };
    let average_json = match average_mood(&records, window, today) {
        Some(avg) => json!(avg),
        None => json!("N/A"),
    };

    Ok(Json(json!({
        "student_id": student_id,
        "today": today_json,
        "average": average_json,
        "window_days": window,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_students_may_only_record_today() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let yesterday = today.pred_opt().unwrap();
        let tomorrow = today.succ_opt().unwrap();

        assert!(can_record_for_date(false, today, today));
        assert!(!can_record_for_date(false, yesterday, today));
        assert!(!can_record_for_date(false, tomorrow, today));
    }

    #[test]
    fn test_counselors_may_backfill() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let last_week = today - chrono::Duration::days(7);

        assert!(can_record_for_date(true, last_week, today));
        assert!(can_record_for_date(true, today, today));
    }
}
