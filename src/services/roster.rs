use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    db::tenant::schema_name,
    models::{
        life_event::{LifeEvent, UpsertLifeEventRequest, LIFE_EVENT_TYPES, MAX_NOTES_LEN},
        student::{Student, StudentNotes, UpsertStudentRequest},
        user::Counselor,
    },
};

/// Placeholder campus returned when a school has not defined any yet.
pub const DEFAULT_CAMPUS: &str = "Main Campus";

pub struct RosterService;

impl RosterService {
    pub async fn list_students(
        pool: &PgPool,
        tenant: &str,
        campus: Option<&str>,
    ) -> anyhow::Result<Vec<Student>> {
        let schema = schema_name(tenant);
        let students = match campus {
            Some(campus) => {
                sqlx::query_as::<_, Student>(&format!(
                    r#"SELECT * FROM "{schema}".students WHERE campus = $1 ORDER BY name"#
                ))
                .bind(campus)
                .fetch_all(pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Student>(&format!(
                    r#"SELECT * FROM "{schema}".students ORDER BY name"#
                ))
                .fetch_all(pool)
                .await?
            }
        };
        Ok(students)
    }

    pub async fn get_student(
        pool: &PgPool,
        tenant: &str,
        student_id: &str,
    ) -> anyhow::Result<Option<Student>> {
        let schema = schema_name(tenant);
        let student = sqlx::query_as::<_, Student>(&format!(
            r#"SELECT * FROM "{schema}".students WHERE student_id = $1"#
        ))
        .bind(student_id)
        .fetch_optional(pool)
        .await?;
        Ok(student)
    }

    /// Single-document write keyed by student_id. Missing optional fields
    /// default to empty strings on insert and are preserved on update.
    pub async fn upsert_student(
        pool: &PgPool,
        tenant: &str,
        req: &UpsertStudentRequest,
    ) -> anyhow::Result<Student> {
        let schema = schema_name(tenant);
        let student = sqlx::query_as::<_, Student>(&format!(
            r#"INSERT INTO "{schema}".students (student_id, name, grade, birthday, campus, email)
               VALUES ($1, $2, COALESCE($3, ''), $4, COALESCE($5, ''), COALESCE($6, ''))
               ON CONFLICT (student_id) DO UPDATE SET
                   name     = EXCLUDED.name,
                   grade    = COALESCE($3, students.grade),
                   birthday = COALESCE($4, students.birthday),
                   campus   = COALESCE($5, students.campus),
                   email    = COALESCE($6, students.email)
               RETURNING *"#
        ))
        .bind(&req.student_id)
        .bind(&req.name)
        .bind(&req.grade)
        .bind(req.birthday)
        .bind(&req.campus)
        .bind(&req.email)
        .fetch_one(pool)
        .await?;
        Ok(student)
    }

    /// Hard delete. Mood, life-event and notes rows go with the student via
    /// FK cascade.
    pub async fn delete_student(pool: &PgPool, tenant: &str, student_id: &str) -> anyhow::Result<()> {
        let schema = schema_name(tenant);
        sqlx::query(&format!(
            r#"DELETE FROM "{schema}".students WHERE student_id = $1"#
        ))
        .bind(student_id)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn list_counselors(pool: &PgPool, tenant: &str) -> anyhow::Result<Vec<Counselor>> {
        let schema = schema_name(tenant);
        let counselors = sqlx::query_as::<_, Counselor>(&format!(
            r#"SELECT * FROM "{schema}".users ORDER BY name"#
        ))
        .fetch_all(pool)
        .await?;
        Ok(counselors)
    }

    /// Ordered campus list; never empty (falls back to a single placeholder).
    pub async fn list_campuses(pool: &PgPool, tenant: &str) -> anyhow::Result<Vec<String>> {
        let schema = schema_name(tenant);
        let campuses: Vec<String> = sqlx::query_scalar(&format!(
            r#"SELECT name FROM "{schema}".campuses ORDER BY position"#
        ))
        .fetch_all(pool)
        .await?;
        if campuses.is_empty() {
            return Ok(vec![DEFAULT_CAMPUS.to_string()]);
        }
        Ok(campuses)
    }

    /// Idempotent append: a name already in the list is a no-op. Concurrent
    /// adds from two counselors are not coordinated.
    pub async fn add_campus(pool: &PgPool, tenant: &str, name: &str) -> anyhow::Result<()> {
        let name = name.trim();
        anyhow::ensure!(!name.is_empty(), "Campus name cannot be empty");

        let schema = schema_name(tenant);
        sqlx::query(&format!(
            r#"INSERT INTO "{schema}".campuses (position, name)
               SELECT COALESCE(MAX(position), 0) + 1, $1 FROM "{schema}".campuses
               ON CONFLICT (name) DO NOTHING"#
        ))
        .bind(name)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn get_notes(
        pool: &PgPool,
        tenant: &str,
        student_id: &str,
    ) -> anyhow::Result<Option<StudentNotes>> {
        let schema = schema_name(tenant);
        let notes = sqlx::query_as::<_, StudentNotes>(&format!(
            r#"SELECT student_id, content, updated_at FROM "{schema}".notes WHERE student_id = $1"#
        ))
        .bind(student_id)
        .fetch_optional(pool)
        .await?;
        Ok(notes)
    }

    /// Wholesale upsert of the single notes blob for a student.
    pub async fn upsert_notes(
        pool: &PgPool,
        tenant: &str,
        student_id: &str,
        content: &str,
    ) -> anyhow::Result<StudentNotes> {
        let schema = schema_name(tenant);
        let notes = sqlx::query_as::<_, StudentNotes>(&format!(
            r#"INSERT INTO "{schema}".notes (student_id, content)
               VALUES ($1, $2)
               ON CONFLICT (student_id) DO UPDATE SET
                   content = EXCLUDED.content, updated_at = NOW()
               RETURNING student_id, content, updated_at"#
        ))
        .bind(student_id)
        .bind(content)
        .fetch_one(pool)
        .await?;
        Ok(notes)
    }

    pub async fn list_life_events(
        pool: &PgPool,
        tenant: &str,
        student_id: &str,
    ) -> anyhow::Result<Vec<LifeEvent>> {
        let schema = schema_name(tenant);
        let events = sqlx::query_as::<_, LifeEvent>(&format!(
            r#"SELECT * FROM "{schema}".life_events WHERE student_id = $1 ORDER BY date DESC"#
        ))
        .bind(student_id)
        .fetch_all(pool)
        .await?;
        Ok(events)
    }

    pub async fn create_life_event(
        pool: &PgPool,
        tenant: &str,
        student_id: &str,
        req: &UpsertLifeEventRequest,
    ) -> anyhow::Result<LifeEvent> {
        validate_life_event(req)?;
        let schema = schema_name(tenant);
        let event = sqlx::query_as::<_, LifeEvent>(&format!(
            r#"INSERT INTO "{schema}".life_events (student_id, event_type, date, notes)
               VALUES ($1, $2, $3, $4)
               RETURNING *"#
        ))
        .bind(student_id)
        .bind(&req.event_type)
        .bind(req.date)
        .bind(&req.notes)
        .fetch_one(pool)
        .await?;
        Ok(event)
    }

    pub async fn update_life_event(
        pool: &PgPool,
        tenant: &str,
        id: Uuid,
        req: &UpsertLifeEventRequest,
    ) -> anyhow::Result<LifeEvent> {
        validate_life_event(req)?;
        let schema = schema_name(tenant);
        let event = sqlx::query_as::<_, LifeEvent>(&format!(
            r#"UPDATE "{schema}".life_events
               SET event_type = $1, date = $2, notes = $3
               WHERE id = $4
               RETURNING *"#
        ))
        .bind(&req.event_type)
        .bind(req.date)
        .bind(&req.notes)
        .bind(id)
        .fetch_one(pool)
        .await?;
        Ok(event)
    }

    pub async fn delete_life_event(pool: &PgPool, tenant: &str, id: Uuid) -> anyhow::Result<()> {
        let schema = schema_name(tenant);
        sqlx::query(&format!(r#"DELETE FROM "{schema}".life_events WHERE id = $1"#))
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }
}

fn validate_life_event(req: &UpsertLifeEventRequest) -> anyhow::Result<()> {
    anyhow::ensure!(
        LIFE_EVENT_TYPES.contains(&req.event_type.as_str()),
        "Unknown life-event type: {}",
        req.event_type
    );
    if let Some(ref notes) = req.notes {
        anyhow::ensure!(
            notes.chars().count() <= MAX_NOTES_LEN,
            "Life-event notes must be at most {MAX_NOTES_LEN} characters"
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn event(event_type: &str, notes: Option<&str>) -> UpsertLifeEventRequest {
        UpsertLifeEventRequest {
            event_type: event_type.to_string(),
            date: NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
            notes: notes.map(str::to_string),
        }
    }

    #[test]
    fn test_life_event_type_must_be_known() {
        assert!(validate_life_event(&event("Relocation", None)).is_ok());
        assert!(validate_life_event(&event("Vacation", None)).is_err());
    }

    #[test]
    fn test_life_event_notes_length_cap() {
        let at_cap = "x".repeat(MAX_NOTES_LEN);
        assert!(validate_life_event(&event("Other", Some(&at_cap))).is_ok());

        let over_cap = "x".repeat(MAX_NOTES_LEN + 1);
        assert!(validate_life_event(&event("Other", Some(&over_cap))).is_err());
    }
}
