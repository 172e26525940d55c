use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Counselor,
    Student,
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            UserRole::Counselor => "counselor",
            UserRole::Student => "student",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for UserRole {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "counselor" => Ok(UserRole::Counselor),
            "student" => Ok(UserRole::Student),
            _ => Err(anyhow::anyhow!("Unknown role: {s}")),
        }
    }
}

/// Counselor row in a school schema. Students live in their own table
/// (see models::student) — counselors are the only `users` rows.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Counselor {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Claims in an identity-provider token. The provider owns sign-in and
/// token issuance; this API only verifies the signature and reads these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Stable subject id assigned by the identity provider.
    pub sub: String,
    #[serde(default)]
    pub name: String,
    pub email: String,
    /// Privileged claim gating the role-assignment operation.
    #[serde(default)]
    pub admin: bool,
    /// Custom role claim, present once set via the role-assignment call.
    #[serde(default)]
    pub role: Option<UserRole>,
    pub exp: usize,
    pub iat: usize,
}

/// Extracted from the validated identity token — available via Axum extractors.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub subject: String,
    pub name: String,
    pub email: String,
    pub admin: bool,
    pub role: Option<UserRole>,
}

#[derive(Debug, Deserialize)]
pub struct SetRoleRequest {
    pub subject: String,
    pub role: UserRole,
}

/// Outcome of first-sign-in role resolution, returned to the client so it
/// can route to the right dashboard.
#[derive(Debug, Serialize)]
pub struct ResolvedProfile {
    pub role: UserRole,
    pub school: String,
    /// Set on the student path only.
    pub student_id: Option<String>,
    pub name: String,
    pub email: String,
}
