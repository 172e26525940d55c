use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::PgPool;

use crate::{models::student::UpsertStudentRequest, services::roster::RosterService};

/// Import header columns: name, studentId, grade, birthday, email.
/// Export header casing differs deliberately (see EXPORT_HEADERS).
#[derive(Debug, Deserialize)]
struct ImportRow {
    #[serde(default)]
    name: String,
    #[serde(rename = "studentId", default)]
    student_id: String,
    #[serde(default)]
    grade: Option<String>,
    #[serde(default)]
    birthday: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

pub const EXPORT_HEADERS: [&str; 8] = [
    "Name",
    "Student ID",
    "Grade",
    "Birthday",
    "Email",
    "Last 5 Moods",
    "Average Mood",
    "Campus",
];

/// One line of the export: the caller assembles these from an
/// already-filtered roster plus each student's mood records.
#[derive(Debug, Clone)]
pub struct ExportRow {
    pub name: String,
    pub student_id: String,
    pub grade: String,
    pub birthday: String,
    pub email: String,
    /// Up to 5 most recent mood emojis, most recent first.
    pub last_moods: Vec<String>,
    /// Pre-computed rolling average; None renders as "N/A".
    pub average_mood: Option<f64>,
    pub campus: String,
}

#[derive(Debug, thiserror::Error)]
pub enum CsvBridgeError {
    #[error("Invalid CSV: {0}")]
    Parse(#[from] csv::Error),
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct ImportOutcome {
    pub imported: usize,
    pub skipped: usize,
}

/// Parsed roster rows plus the count of rows silently dropped for missing
/// name/studentId (per-row errors are not reported back).
pub fn parse_import(csv_text: &str) -> Result<(Vec<UpsertStudentRequest>, usize), csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(csv_text.as_bytes());

    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for result in reader.deserialize::<ImportRow>() {
        let row = match result {
            Ok(row) => row,
            Err(_) => {
                skipped += 1;
                continue;
            }
        };
        let name = row.name.trim().to_string();
        let student_id = row.student_id.trim().to_string();
        if name.is_empty() || student_id.is_empty() {
            skipped += 1;
            continue;
        }
        rows.push(UpsertStudentRequest {
            student_id,
            name,
            grade: row.grade.map(|g| g.trim().to_string()),
            birthday: row.birthday.as_deref().and_then(parse_birthday),
            campus: None,
            email: row.email.map(|e| e.trim().to_string()),
        });
    }
    Ok((rows, skipped))
}

fn parse_birthday(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%m/%d/%Y"))
        .ok()
}

pub struct CsvBridge;

impl CsvBridge {
    /// Bulk import: one upsert per valid row, written sequentially and
    /// awaited one at a time. Not transactional — a failure partway leaves
    /// the rows already written in place.
    pub async fn import_students(
        pool: &PgPool,
        tenant: &str,
        csv_text: &str,
        default_campus: &str,
    ) -> Result<ImportOutcome, CsvBridgeError> {
        let (rows, skipped) = parse_import(csv_text)?;

        let mut imported = 0usize;
        for mut row in rows {
            row.campus = Some(default_campus.to_string());
            RosterService::upsert_student(pool, tenant, &row).await?;
            imported += 1;
        }
        Ok(ImportOutcome { imported, skipped })
    }
}

/// Serialize export rows with the fixed column order. Average mood renders
/// with two decimals here, independent of the aggregator's one-decimal
/// rounding.
pub fn export_csv(rows: &[ExportRow]) -> Result<String, CsvBridgeError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(EXPORT_HEADERS)?;
    for row in rows {
        let average = match row.average_mood {
            Some(avg) => format!("{avg:.2}"),
            None => "N/A".to_string(),
        };
        let moods = row.last_moods.join(" ");
        writer.write_record([
            row.name.as_str(),
            row.student_id.as_str(),
            row.grade.as_str(),
            row.birthday.as_str(),
            row.email.as_str(),
            moods.as_str(),
            average.as_str(),
            row.campus.as_str(),
        ])?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| CsvBridgeError::Store(anyhow::anyhow!("CSV buffer error: {e}")))?;
    String::from_utf8(bytes).map_err(|e| CsvBridgeError::Store(e.into()))
}

/// `Moodie_{school}_{campus|AllCampuses}_Students.csv`, with runs of
/// non-alphanumeric characters in the names collapsed to underscores.
pub fn export_filename(school_name: &str, campus: Option<&str>) -> String {
    let campus_part = match campus {
        Some(c) => sanitize(c),
        None => "AllCampuses".to_string(),
    };
    format!("Moodie_{}_{}_Students.csv", sanitize(school_name), campus_part)
}

fn sanitize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_was_sep = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c);
            last_was_sep = false;
        } else if !last_was_sep {
            out.push('_');
            last_was_sep = true;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_skips_rows_missing_required_fields() {
        let csv_text = "name,studentId,grade,birthday,email\n\
                        Ana,S001,5,2014-02-01,ana@school.org\n\
                        ,S002,5,,\n\
                        Ben,,4,,\n\
                        Cleo , S003 ,3,,cleo@school.org\n";
        let (rows, skipped) = parse_import(csv_text).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(skipped, 2);
        assert_eq!(rows[0].student_id, "S001");
        // Fields arrive trimmed.
        assert_eq!(rows[1].name, "Cleo");
        assert_eq!(rows[1].student_id, "S003");
    }

    #[test]
    fn test_import_parses_birthday_formats() {
        let csv_text = "name,studentId,grade,birthday,email\n\
                        Ana,S001,,2014-02-01,\n\
                        Ben,S002,,02/01/2014,\n\
                        Cleo,S003,,not-a-date,\n";
        let (rows, _) = parse_import(csv_text).unwrap();
        let expected = chrono::NaiveDate::from_ymd_opt(2014, 2, 1).unwrap();
        assert_eq!(rows[0].birthday, Some(expected));
        assert_eq!(rows[1].birthday, Some(expected));
        assert_eq!(rows[2].birthday, None);
    }

    #[test]
    fn test_export_renders_two_decimal_average() {
        let rows = vec![ExportRow {
            name: "Ana".into(),
            student_id: "S001".into(),
            grade: "5".into(),
            birthday: "2014-02-01".into(),
            email: "ana@school.org".into(),
            last_moods: vec!["😄".into()],
            average_mood: Some(4.25),
            campus: "North".into(),
        }];
        let out = export_csv(&rows).unwrap();
        let mut lines = out.lines();
        assert_eq!(
            lines.next().unwrap(),
            "Name,Student ID,Grade,Birthday,Email,Last 5 Moods,Average Mood,Campus"
        );
        let data = lines.next().unwrap();
        assert!(data.contains("4.25"), "expected two-decimal average in {data}");
    }

    #[test]
    fn test_export_na_for_missing_average() {
        let rows = vec![ExportRow {
            name: "Ben".into(),
            student_id: "S002".into(),
            grade: String::new(),
            birthday: String::new(),
            email: String::new(),
            last_moods: vec![],
            average_mood: None,
            campus: String::new(),
        }];
        let out = export_csv(&rows).unwrap();
        assert!(out.lines().nth(1).unwrap().contains("N/A"));
    }

    #[test]
    fn test_export_filename_sanitizes_school_name() {
        assert_eq!(
            export_filename("Cedar Grove (West)", None),
            "Moodie_Cedar_Grove_West__AllCampuses_Students.csv"
        );
        assert_eq!(
            export_filename("Lincoln", Some("North Campus")),
            "Moodie_Lincoln_North_Campus_Students.csv"
        );
    }
}
