use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    Json,
};
use serde_json::{json, Value};

use crate::AppState;

/// Slug used when the host does not select a real school: localhost,
/// 127.0.0.1, and the bare `www` subdomain all land here.
pub const DEFAULT_SLUG: &str = "test";

/// Validates that a slug only contains lowercase ASCII letters, digits and
/// hyphens, does not start or end with a hyphen, and is between 2 and 63
/// characters. This prevents SQL injection via the slug used in format!()
/// schema queries.
fn is_valid_slug(s: &str) -> bool {
    let len = s.len();
    len >= 2
        && len <= 63
        && s.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && !s.starts_with('-')
        && !s.ends_with('-')
}

/// Derive the school slug from a request host name.
///
/// Localhost and 127.0.0.1 (with or without port) fall back to the default
/// slug, as does a leading `www` label. Otherwise the first dot-delimited
/// label is the slug. Host names are case-insensitive, so the label is
/// lowercased — the slug must identify the same school as the schema name
/// derived from it. No existence check happens here: an unknown slug routes
/// the caller through role resolution as a fresh school.
pub fn resolve_host(host: &str) -> String {
    let domain = host.split(':').next().unwrap_or(host);
    if domain == "localhost" || domain.contains("127.0.0.1") {
        return DEFAULT_SLUG.to_string();
    }
    let label = domain.split('.').next().unwrap_or(domain);
    if label == "www" {
        return DEFAULT_SLUG.to_string();
    }
    label.to_lowercase()
}

/// Fallback display name for a school without a stored one: `lakeisd`
/// becomes "Lake ISD", `cedar-grove` becomes "Cedar Grove".
pub fn format_display_name(slug: &str) -> String {
    let lower = slug.to_lowercase();
    if let Some(stem) = lower.strip_suffix("isd") {
        if !stem.is_empty() {
            return format!("{} ISD", capitalize(stem));
        }
    }
    slug.split(['-', '_'])
        .filter(|t| !t.is_empty())
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(token: &str) -> String {
    let mut chars = token.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Extracts the school slug from the request's Host header.
#[derive(Debug, Clone)]
pub struct TenantSlug(pub String);

impl FromRequestParts<AppState> for TenantSlug {
    type Rejection = (StatusCode, Json<Value>);

    async fn from_request_parts(parts: &mut Parts, _state: &AppState) -> Result<Self, Self::Rejection> {
        let host = parts
            .headers
            .get("Host")
            .and_then(|v| v.to_str().ok())
            .ok_or((StatusCode::BAD_REQUEST, Json(json!({ "error": "Missing Host header" }))))?;

        let slug = resolve_host(host);
        if !is_valid_slug(&slug) {
            return Err((StatusCode::BAD_REQUEST, Json(json!({ "error": "Invalid school identifier" }))));
        }
        Ok(TenantSlug(slug))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subdomain_resolves_to_slug() {
        assert_eq!(resolve_host("lincoln.moodie.app"), "lincoln");
        assert_eq!(resolve_host("cedar-grove.moodie.app:443"), "cedar-grove");
    }

    #[test]
    fn test_localhost_and_www_fall_back() {
        assert_eq!(resolve_host("localhost:3000"), DEFAULT_SLUG);
        assert_eq!(resolve_host("localhost"), DEFAULT_SLUG);
        assert_eq!(resolve_host("127.0.0.1:8080"), DEFAULT_SLUG);
        assert_eq!(resolve_host("www.moodie.app"), DEFAULT_SLUG);
    }

    #[test]
    fn test_case_variant_hosts_resolve_to_one_school() {
        // Host names are case-insensitive: every spelling must map to the
        // same slug, and that slug must name the same schema.
        use crate::db::tenant::schema_name;

        let canonical = resolve_host("lincoln.moodie.app");
        assert_eq!(resolve_host("Lincoln.moodie.app"), canonical);
        assert_eq!(resolve_host("LINCOLN.moodie.app:443"), canonical);
        assert_eq!(schema_name(&canonical), "school_lincoln");
    }

    #[test]
    fn test_display_name_isd_suffix() {
        assert_eq!(format_display_name("lakeisd"), "Lake ISD");
        assert_eq!(format_display_name("northsideisd"), "Northside ISD");
    }

    #[test]
    fn test_display_name_tokenized() {
        assert_eq!(format_display_name("cedar-grove"), "Cedar Grove");
        assert_eq!(format_display_name("cedar_grove"), "Cedar Grove");
        assert_eq!(format_display_name("lincoln"), "Lincoln");
    }

    #[test]
    fn test_slug_validation() {
        assert!(is_valid_slug("lincoln"));
        assert!(is_valid_slug("cedar-grove"));
        assert!(!is_valid_slug("Lincoln"));
        assert!(!is_valid_slug("a"));
        assert!(!is_valid_slug("-lincoln"));
        assert!(!is_valid_slug("lin coln"));
        assert!(!is_valid_slug("x\"; DROP SCHEMA public"));
    }
}
