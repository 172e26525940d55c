use chrono::NaiveDate;
use sqlx::PgPool;

use crate::{
    db::tenant::schema_name,
    models::mood::{MoodRecord, MOOD_SCALE},
};

/// Looks up the emoji and label for a score on the fixed 1–5 scale.
pub fn scale_entry(score: i16) -> Option<(&'static str, &'static str)> {
    MOOD_SCALE
        .iter()
        .find(|(s, _, _)| *s == score)
        .map(|(_, emoji, label)| (*emoji, *label))
}

/// Returns the record for the given calendar day, if any. When duplicates
/// exist (a data anomaly — the upsert keys on date) the first match in
/// iteration order wins.
pub fn todays_mood(records: &[MoodRecord], today: NaiveDate) -> Option<&MoodRecord> {
    records.iter().find(|r| r.date == today)
}

/// Arithmetic mean of scores over the last `window_days` calendar days
/// (inclusive lower bound `today - window_days`), rounded to one decimal.
/// None when no record falls inside the window.
pub fn average_mood(records: &[MoodRecord], window_days: i64, today: NaiveDate) -> Option<f64> {
    let cutoff = today - chrono::Duration::days(window_days);
    let scores: Vec<i16> = records
        .iter()
        .filter(|r| r.date >= cutoff)
        .map(|r| r.score)
        .collect();
    if scores.is_empty() {
        return None;
    }
    let mean = scores.iter().map(|s| *s as f64).sum::<f64>() / scores.len() as f64;
    Some((mean * 10.0).round() / 10.0)
}

pub struct MoodService;

impl MoodService {
    /// Insert or replace the record for (student_id, date). One record per
    /// student per day; re-selecting on the same day overwrites.
    pub async fn record(
        pool: &PgPool,
        tenant: &str,
        student_id: &str,
        date: NaiveDate,
        score: i16,
    ) -> anyhow::Result<MoodRecord> {
        let (emoji, label) =
            scale_entry(score).ok_or_else(|| anyhow::anyhow!("Mood score must be between 1 and 5"))?;

        let schema = schema_name(tenant);
        let record = sqlx::query_as::<_, MoodRecord>(&format!(
            r#"INSERT INTO "{schema}".moods (student_id, date, score, emoji, label)
               VALUES ($1, $2, $3, $4, $5)
               ON CONFLICT (student_id, date) DO UPDATE SET
                   score       = EXCLUDED.score,
                   emoji       = EXCLUDED.emoji,
                   label       = EXCLUDED.label,
                   recorded_at = NOW()
               RETURNING student_id, date, score, emoji, label, recorded_at"#
        ))
        .bind(student_id)
        .bind(date)
        .bind(score)
        .bind(emoji)
        .bind(label)
        .fetch_one(pool)
        .await?;
        Ok(record)
    }

    /// All mood records for one student, most recent first.
    pub async fn list_for_student(
        pool: &PgPool,
        tenant: &str,
        student_id: &str,
    ) -> anyhow::Result<Vec<MoodRecord>> {
        let schema = schema_name(tenant);
        let records = sqlx::query_as::<_, MoodRecord>(&format!(
            r#"SELECT student_id, date, score, emoji, label, recorded_at
               FROM "{schema}".moods
               WHERE student_id = $1
               ORDER BY date DESC"#
        ))
        .bind(student_id)
        .fetch_all(pool)
        .await?;
        Ok(records)
    }

    /// All mood records across the school, most recent first.
    pub async fn list_for_school(pool: &PgPool, tenant: &str) -> anyhow::Result<Vec<MoodRecord>> {
        let schema = schema_name(tenant);
        let records = sqlx::query_as::<_, MoodRecord>(&format!(
            r#"SELECT student_id, date, score, emoji, label, recorded_at
               FROM "{schema}".moods
               ORDER BY date DESC"#
        ))
        .fetch_all(pool)
        .await?;
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(student_id: &str, date: NaiveDate, score: i16) -> MoodRecord {
        let (emoji, label) = scale_entry(score).unwrap();
        MoodRecord {
            student_id: student_id.to_string(),
            date,
            score,
            emoji: emoji.to_string(),
            label: label.to_string(),
            recorded_at: Utc::now(),
        }
    }

    fn day(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_average_empty_is_na_for_any_window() {
        let today = day("2024-03-15");
        for n in [1, 7, 30, 365] {
            assert_eq!(average_mood(&[], n, today), None);
        }
    }

    #[test]
    fn test_average_rounds_to_one_decimal() {
        let today = day("2024-03-15");
        let records = vec![
            record("S001", day("2024-03-15"), 4),
            record("S001", day("2024-03-14"), 3),
            record("S001", day("2024-03-13"), 3),
        ];
        // mean 10/3 = 3.333… → 3.3
        assert_eq!(average_mood(&records, 7, today), Some(3.3));
    }

    #[test]
    fn test_average_window_lower_bound_inclusive() {
        let today = day("2024-03-15");
        let records = vec![
            record("S001", day("2024-03-08"), 5), // exactly today - 7
            record("S001", day("2024-03-07"), 1), // outside
        ];
        assert_eq!(average_mood(&records, 7, today), Some(5.0));
    }

    #[test]
    fn test_average_monotonic_under_added_extremes() {
        let today = day("2024-03-15");
        let mut records = vec![
            record("S001", day("2024-03-14"), 3),
            record("S001", day("2024-03-13"), 2),
        ];
        let base = average_mood(&records, 7, today).unwrap();

        records.push(record("S001", day("2024-03-12"), 5));
        let with_high = average_mood(&records, 7, today).unwrap();
        assert!(with_high >= base);

        records.push(record("S001", day("2024-03-11"), 1));
        let with_low = average_mood(&records, 7, today).unwrap();
        assert!(with_low <= with_high);
    }

    #[test]
    fn test_todays_mood_sentinel_condition() {
        let today = day("2024-03-15");
        let records = vec![record("S001", day("2024-03-14"), 4)];
        assert!(todays_mood(&records, today).is_none());

        let records = vec![
            record("S001", day("2024-03-14"), 4),
            record("S001", day("2024-03-15"), 2),
        ];
        let found = todays_mood(&records, today).unwrap();
        assert_eq!(found.score, 2);
        assert_eq!(found.emoji, "😕");
    }

    #[test]
    fn test_todays_mood_first_match_wins_on_duplicates() {
        let today = day("2024-03-15");
        let records = vec![
            record("S001", today, 5),
            record("S001", today, 1),
        ];
        assert_eq!(todays_mood(&records, today).unwrap().score, 5);
    }

    #[test]
    fn test_scale_entry_bounds() {
        assert!(scale_entry(0).is_none());
        assert!(scale_entry(6).is_none());
        assert_eq!(scale_entry(5), Some(("😄", "Great")));
    }
}
