use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// The fixed mood scale: (score, emoji, label).
pub const MOOD_SCALE: &[(i16, &str, &str)] = &[
    (1, "😢", "Sad"),
    (2, "😕", "Down"),
    (3, "😐", "Okay"),
    (4, "🙂", "Good"),
    (5, "😄", "Great"),
];

/// Placeholder shown when no mood record exists for the requested day.
pub const SENTINEL_EMOJI: &str = "❓";
pub const SENTINEL_LABEL: &str = "N/A";
pub const SENTINEL_SCORE: i16 = 0;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MoodRecord {
    pub student_id: String,
    pub date: NaiveDate,
    pub score: i16,
    pub emoji: String,
    pub label: String,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct RecordMoodRequest {
    pub student_id: String,
    pub score: i16,
    /// Defaults to the current calendar day when omitted.
    pub date: Option<NaiveDate>,
}
