use sqlx::PgPool;

use crate::{
    db::tenant::{provision_school_schema, schema_name},
    middleware::tenant::format_display_name,
    models::user::{AuthenticatedUser, ResolvedProfile, UserRole},
};

/// Outcome of the role-precedence rules for one sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleDecision {
    /// A counselor record already exists for this identity — no-op.
    ExistingCounselor,
    /// A student record already exists for this identity — no-op.
    ExistingStudent,
    /// A new counselor record must be written. `bootstrap` marks the
    /// first-user-of-a-fresh-school path, which also latches has_counselor.
    NewCounselor { bootstrap: bool },
    /// A new student record must be written.
    NewStudent,
}

/// The precedence rules, evaluated in order: existing user, existing
/// student, counselor-email allowlist, then the has_counselor bootstrap
/// gate. Pure — the caller supplies the lookups.
pub fn decide_role(
    has_user_record: bool,
    has_student_record: bool,
    email_allowlisted: bool,
    school_has_counselor: bool,
) -> RoleDecision {
    if has_user_record {
        RoleDecision::ExistingCounselor
    } else if has_student_record {
        RoleDecision::ExistingStudent
    } else if email_allowlisted {
        RoleDecision::NewCounselor { bootstrap: false }
    } else if !school_has_counselor {
        RoleDecision::NewCounselor { bootstrap: true }
    } else {
        RoleDecision::NewStudent
    }
}

/// School-assigned id for a self-registered student: a fixed prefix plus
/// the first characters of the identity subject, upper-cased.
pub fn derive_student_id(subject: &str) -> String {
    let head: String = subject.chars().take(6).collect();
    format!("S{}", head.to_uppercase())
}

pub struct RoleService;

impl RoleService {
    /// First-sign-in role resolution for one identity in one school.
    /// Idempotent: a second call for the same identity is a no-op.
    ///
    /// A fresh slug implicitly creates the school (registry row + schema)
    /// before the precedence rules run.
    pub async fn resolve_sign_in(
        pool: &PgPool,
        tenant: &str,
        identity: &AuthenticatedUser,
    ) -> anyhow::Result<ResolvedProfile> {
        Self::ensure_school(pool, tenant).await?;
        let schema = schema_name(tenant);

        let has_user: bool = sqlx::query_scalar(&format!(
            r#"SELECT EXISTS(SELECT 1 FROM "{schema}".users WHERE id = $1)"#
        ))
        .bind(&identity.subject)
        .fetch_one(pool)
        .await?;

        // Covers both a student who already signed in (subject match) and a
        // counselor-entered roster row claimed by email on first sign-in.
        let pre_provisioned: Option<String> = sqlx::query_scalar(&format!(
            r#"SELECT student_id FROM "{schema}".students
               WHERE subject_id = $1 OR (subject_id IS NULL AND email = $2 AND email <> '')
               LIMIT 1"#
        ))
        .bind(&identity.subject)
        .bind(&identity.email)
        .fetch_optional(pool)
        .await?;

        let allowlisted: bool = sqlx::query_scalar(&format!(
            r#"SELECT EXISTS(SELECT 1 FROM "{schema}".counselor_emails
                WHERE email = $1 AND role = 'counselor')"#
        ))
        .bind(&identity.email)
        .fetch_one(pool)
        .await?;

        let has_counselor: bool =
            sqlx::query_scalar("SELECT has_counselor FROM schools WHERE slug = $1")
                .bind(tenant)
                .fetch_one(pool)
                .await?;

        let decision = decide_role(has_user, pre_provisioned.is_some(), allowlisted, has_counselor);

        match decision {
            RoleDecision::ExistingCounselor => {
                Ok(Self::profile(tenant, identity, UserRole::Counselor, None))
            }
            RoleDecision::ExistingStudent => {
                let student_id = pre_provisioned
                    .ok_or_else(|| anyhow::anyhow!("Student record vanished during resolution"))?;
                // Claim the roster row on first sign-in.
                sqlx::query(&format!(
                    r#"UPDATE "{schema}".students SET subject_id = $1
                       WHERE student_id = $2 AND subject_id IS NULL"#
                ))
                .bind(&identity.subject)
                .bind(&student_id)
                .execute(pool)
                .await?;
                Ok(Self::profile(tenant, identity, UserRole::Student, Some(student_id)))
            }
            RoleDecision::NewCounselor { bootstrap } => {
                sqlx::query(&format!(
                    r#"INSERT INTO "{schema}".users (id, name, email, role)
                       VALUES ($1, $2, $3, 'counselor')
                       ON CONFLICT (id) DO NOTHING"#
                ))
                .bind(&identity.subject)
                .bind(&identity.name)
                .bind(&identity.email)
                .execute(pool)
                .await?;

                if bootstrap {
                    // One-way latch: false → true, never back.
                    sqlx::query(
                        "UPDATE schools SET has_counselor = TRUE, updated_at = NOW() WHERE slug = $1",
                    )
                    .bind(tenant)
                    .execute(pool)
                    .await?;
                }
                Ok(Self::profile(tenant, identity, UserRole::Counselor, None))
            }
            RoleDecision::NewStudent => {
                let student_id = derive_student_id(&identity.subject);
                sqlx::query(&format!(
                    r#"INSERT INTO "{schema}".students (student_id, subject_id, name, email)
                       VALUES ($1, $2, $3, $4)
                       ON CONFLICT (student_id) DO NOTHING"#
                ))
                .bind(&student_id)
                .bind(&identity.subject)
                .bind(&identity.name)
                .bind(&identity.email)
                .execute(pool)
                .await?;
                Ok(Self::profile(tenant, identity, UserRole::Student, Some(student_id)))
            }
        }
    }

    /// Create the registry row and per-school schema for a fresh slug.
    /// Existing schools are untouched.
    pub async fn ensure_school(pool: &PgPool, tenant: &str) -> anyhow::Result<()> {
        let inserted = sqlx::query("INSERT INTO schools (slug) VALUES ($1) ON CONFLICT (slug) DO NOTHING")
            .bind(tenant)
            .execute(pool)
            .await?;
        if inserted.rows_affected() > 0 {
            provision_school_schema(pool, tenant).await?;
        }
        Ok(())
    }

    /// True when the caller may use counselor operations: admin claim, a
    /// counselor role claim, or a counselor record in this school.
    pub async fn is_counselor(
        pool: &PgPool,
        tenant: &str,
        user: &AuthenticatedUser,
    ) -> anyhow::Result<bool> {
        if user.admin || user.role == Some(UserRole::Counselor) {
            return Ok(true);
        }
        let schema = schema_name(tenant);
        let exists: bool = sqlx::query_scalar(&format!(
            r#"SELECT EXISTS(SELECT 1 FROM "{schema}".users WHERE id = $1 AND role = 'counselor')"#
        ))
        .bind(&user.subject)
        .fetch_one(pool)
        .await?;
        Ok(exists)
    }

    /// Privileged role assignment (requires the caller's admin claim,
    /// checked at the route). Returns false when no record exists for the
    /// subject, so the caller can report it instead of claiming success.
    pub async fn set_role(
        pool: &PgPool,
        tenant: &str,
        subject: &str,
        role: UserRole,
    ) -> anyhow::Result<bool> {
        let schema = schema_name(tenant);
        let updated = sqlx::query(&format!(r#"UPDATE "{schema}".users SET role = $2 WHERE id = $1"#))
            .bind(subject)
            .bind(role.to_string())
            .execute(pool)
            .await?;
        Ok(updated.rows_affected() > 0)
    }

    fn profile(
        tenant: &str,
        identity: &AuthenticatedUser,
        role: UserRole,
        student_id: Option<String>,
    ) -> ResolvedProfile {
        ResolvedProfile {
            role,
            school: tenant.to_string(),
            student_id,
            name: identity.name.clone(),
            email: identity.email.clone(),
        }
    }
}

/// Convenience for routes: display name with formatting fallback.
pub fn school_display_name(stored: Option<String>, slug: &str) -> String {
    stored
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| format_display_name(slug))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_existing_records_short_circuit() {
        assert_eq!(decide_role(true, false, true, true), RoleDecision::ExistingCounselor);
        assert_eq!(decide_role(false, true, true, false), RoleDecision::ExistingStudent);
        // User record wins over everything.
        assert_eq!(decide_role(true, true, true, false), RoleDecision::ExistingCounselor);
    }

    #[test]
    fn test_allowlist_beats_bootstrap() {
        assert_eq!(
            decide_role(false, false, true, false),
            RoleDecision::NewCounselor { bootstrap: false }
        );
    }

    #[test]
    fn test_bootstrap_then_student() {
        // Fresh school, no allowlist entry: first identity becomes counselor…
        assert_eq!(
            decide_role(false, false, false, false),
            RoleDecision::NewCounselor { bootstrap: true }
        );
        // …and once has_counselor is latched, the next one is a student.
        assert_eq!(decide_role(false, false, false, true), RoleDecision::NewStudent);
    }

    #[test]
    fn test_idempotence_of_decision() {
        // After the bootstrap write, the same identity resolves as existing.
        assert_eq!(decide_role(true, false, false, true), RoleDecision::ExistingCounselor);
        // After the student write, ditto.
        assert_eq!(decide_role(false, true, false, true), RoleDecision::ExistingStudent);
    }

    #[test]
    fn test_derive_student_id() {
        assert_eq!(derive_student_id("abc123xyz"), "SABC123");
        assert_eq!(derive_student_id("xy"), "SXY");
    }

    #[test]
    fn test_school_display_name_fallback() {
        assert_eq!(
            school_display_name(Some("Lincoln High".into()), "lincoln"),
            "Lincoln High"
        );
        assert_eq!(school_display_name(None, "cedar-grove"), "Cedar Grove");
        assert_eq!(school_display_name(Some("  ".into()), "lakeisd"), "Lake ISD");
    }
}
