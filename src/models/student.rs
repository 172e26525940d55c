use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Student {
    pub student_id: String,
    /// Identity-provider subject; null until the student first signs in.
    pub subject_id: Option<String>,
    pub name: String,
    pub grade: String,
    pub birthday: Option<NaiveDate>,
    pub campus: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpsertStudentRequest {
    pub student_id: String,
    pub name: String,
    pub grade: Option<String>,
    pub birthday: Option<NaiveDate>,
    pub campus: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StudentNotes {
    pub student_id: String,
    pub content: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct UpsertNotesRequest {
    pub content: String,
}
