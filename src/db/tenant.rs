use sqlx::PgPool;

/// Provision a per-school PostgreSQL schema with all required tables.
/// Called when a fresh slug is first routed through role resolution.
/// Every statement is idempotent — safe to re-run on startup.
pub async fn provision_school_schema(pool: &PgPool, slug: &str) -> anyhow::Result<()> {
    let schema = schema_name(slug);

    // --- Create schema ---
    sqlx::raw_sql(&format!("CREATE SCHEMA IF NOT EXISTS \"{schema}\""))
        .execute(pool)
        .await?;

    // --- Students ---
    // student_id is the school-assigned identifier, unique within the school.
    // subject_id is the identity-provider subject, set once the student signs in.
    sqlx::raw_sql(&format!(
        r#"CREATE TABLE IF NOT EXISTS "{schema}".students (
            student_id  VARCHAR(64) PRIMARY KEY,
            subject_id  VARCHAR(128) UNIQUE,
            name        VARCHAR(255) NOT NULL,
            grade       VARCHAR(16) NOT NULL DEFAULT '',
            birthday    DATE,
            campus      VARCHAR(128) NOT NULL DEFAULT '',
            email       VARCHAR(255) NOT NULL DEFAULT '',
            created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )"#
    ))
    .execute(pool)
    .await?;

    // --- Counselors ---
    sqlx::raw_sql(&format!(
        r#"CREATE TABLE IF NOT EXISTS "{schema}".users (
            id          VARCHAR(128) PRIMARY KEY,
            name        VARCHAR(255) NOT NULL,
            email       VARCHAR(255) NOT NULL,
            role        VARCHAR(16) NOT NULL DEFAULT 'counselor',
            created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )"#
    ))
    .execute(pool)
    .await?;

    // --- Counselor-email allowlist (pre-provisioned role assignment) ---
    sqlx::raw_sql(&format!(
        r#"CREATE TABLE IF NOT EXISTS "{schema}".counselor_emails (
            email       VARCHAR(255) PRIMARY KEY,
            role        VARCHAR(16) NOT NULL DEFAULT 'counselor',
            created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )"#
    ))
    .execute(pool)
    .await?;

    // --- Campuses (ordered set of unique names) ---
    sqlx::raw_sql(&format!(
        r#"CREATE TABLE IF NOT EXISTS "{schema}".campuses (
            position    INT NOT NULL,
            name        VARCHAR(128) PRIMARY KEY
        )"#
    ))
    .execute(pool)
    .await?;

    // --- Moods (one record per student per day, date-keyed upsert) ---
    sqlx::raw_sql(&format!(
        r#"CREATE TABLE IF NOT EXISTS "{schema}".moods (
            student_id  VARCHAR(64) NOT NULL REFERENCES "{schema}".students(student_id) ON DELETE CASCADE,
            date        DATE NOT NULL,
            score       SMALLINT NOT NULL CHECK (score >= 1 AND score <= 5),
            emoji       VARCHAR(16) NOT NULL,
            label       VARCHAR(32) NOT NULL,
            recorded_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            PRIMARY KEY (student_id, date)
        )"#
    ))
    .execute(pool)
    .await?;

    sqlx::raw_sql(&format!(
        r#"CREATE INDEX IF NOT EXISTS moods_date_idx ON "{schema}".moods(date DESC)"#
    ))
    .execute(pool)
    .await?;

    // --- Life events ---
    sqlx::raw_sql(&format!(
        r#"CREATE TABLE IF NOT EXISTS "{schema}".life_events (
            id          UUID PRIMARY KEY DEFAULT public.uuid_generate_v4(),
            student_id  VARCHAR(64) NOT NULL REFERENCES "{schema}".students(student_id) ON DELETE CASCADE,
            event_type  VARCHAR(64) NOT NULL,
            date        DATE NOT NULL,
            notes       VARCHAR(100),
            created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )"#
    ))
    .execute(pool)
    .await?;

    sqlx::raw_sql(&format!(
        r#"CREATE INDEX IF NOT EXISTS life_events_student_idx ON "{schema}".life_events(student_id)"#
    ))
    .execute(pool)
    .await?;

    // --- Notes (single free-text blob per student, upserted wholesale) ---
    sqlx::raw_sql(&format!(
        r#"CREATE TABLE IF NOT EXISTS "{schema}".notes (
            student_id  VARCHAR(64) PRIMARY KEY REFERENCES "{schema}".students(student_id) ON DELETE CASCADE,
            content     TEXT NOT NULL DEFAULT '',
            updated_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )"#
    ))
    .execute(pool)
    .await?;

    // --- updated_at trigger function ---
    sqlx::raw_sql(&format!(
        r#"CREATE OR REPLACE FUNCTION "{schema}".update_updated_at()
           RETURNS TRIGGER AS $fn$
           BEGIN NEW.updated_at = NOW(); RETURN NEW; END;
           $fn$ LANGUAGE plpgsql"#
    ))
    .execute(pool)
    .await?;

    // --- Triggers (one per table, idempotent via DROP IF EXISTS + CREATE) ---
    for table in &["students", "users", "notes"] {
        let trigger = format!("{table}_updated_at");
        sqlx::raw_sql(&format!(
            r#"DROP TRIGGER IF EXISTS "{trigger}" ON "{schema}"."{table}";
               CREATE TRIGGER "{trigger}"
               BEFORE UPDATE ON "{schema}"."{table}"
               FOR EACH ROW EXECUTE FUNCTION "{schema}".update_updated_at()"#
        ))
        .execute(pool)
        .await?;
    }

    tracing::info!("Provisioned school schema: {schema}");
    Ok(())
}

/// Returns the PostgreSQL schema name for a given school slug.
pub fn schema_name(slug: &str) -> String {
    format!("school_{}", slug.to_lowercase().replace('-', "_"))
}
