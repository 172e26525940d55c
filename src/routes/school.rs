use axum::{extract::State, Json};

use crate::{
    middleware::tenant::TenantSlug,
    models::school::SchoolInfo,
    services::roles::school_display_name,
    AppState,
};

/// School info for the resolved tenant. Unknown slugs are not an error:
/// they report the formatted fallback name and no counselor yet, matching
/// the fresh-school sign-in path.
pub async fn get_school_info(
    State(state): State<AppState>,
    TenantSlug(tenant): TenantSlug,
) -> Json<SchoolInfo> {
    let row: Option<(Option<String>, bool)> = sqlx::query_as(
        "SELECT display_name, has_counselor FROM schools WHERE slug = $1",
    )
    .bind(&tenant)
    .fetch_optional(&state.db)
    .await
    .ok()
    .flatten();

    let (display_name, has_counselor) = row.unwrap_or((None, false));
    Json(SchoolInfo {
        name: school_display_name(display_name, &tenant),
        slug: tenant,
        has_counselor,
    })
}
