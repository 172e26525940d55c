use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Fixed taxonomy of life-event types surfaced to counselors.
pub const LIFE_EVENT_TYPES: &[&str] = &[
    "Family Change",
    "Bereavement",
    "Relocation",
    "Health",
    "Academic",
    "Social",
    "Other",
];

/// Life-event notes are capped at this many characters.
pub const MAX_NOTES_LEN: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LifeEvent {
    pub id: Uuid,
    pub student_id: String,
    pub event_type: String,
    pub date: NaiveDate,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct UpsertLifeEventRequest {
    pub event_type: String,
    pub date: NaiveDate,
    pub notes: Option<String>,
}
