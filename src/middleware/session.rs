use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
    Json,
};
use serde_json::{json, Value};

use crate::{middleware::auth::decode_identity_token, AppState};

/// Inactivity window after which a session is forced out.
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Tracks the last-seen instant per identity subject. Any authenticated
/// request counts as activity and resets the window.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    last_seen: Arc<Mutex<HashMap<String, Instant>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records activity for a subject. Returns false when the previous
    /// activity is older than the idle window — the caller must treat the
    /// session as expired. The entry is reset either way, so the subject's
    /// next request starts a fresh window. Entries of other subjects that
    /// have gone idle are dropped, keeping the registry bounded by the
    /// number of active sessions.
    pub fn touch(&self, subject: &str) -> bool {
        self.touch_at(subject, Instant::now())
    }

    fn touch_at(&self, subject: &str, now: Instant) -> bool {
        let mut map = self.last_seen.lock().unwrap_or_else(|e| e.into_inner());
        let expired = map
            .get(subject)
            .is_some_and(|last| now.duration_since(*last) > IDLE_TIMEOUT);
        map.retain(|_, last| now.duration_since(*last) <= IDLE_TIMEOUT);
        map.insert(subject.to_string(), now);
        !expired
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.last_seen.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

/// Middleware enforcing the idle-timeout sign-out on authenticated requests.
/// Requests without a decodable token pass through untouched — the auth
/// extractor rejects them where authentication is actually required.
pub async fn enforce_idle_timeout(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, (StatusCode, Json<Value>)> {
    let subject = request
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .and_then(|token| decode_identity_token(token, &state.config.identity_jwt_secret).ok())
        .map(|user| user.subject);

    if let Some(subject) = subject {
        if !state.sessions.touch(&subject) {
            return Err((
                StatusCode::UNAUTHORIZED,
                Json(json!({
                    "error": "Session expired after inactivity — please sign in again",
                    "code": "session_expired"
                })),
            ));
        }
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_subject_is_active() {
        let registry = SessionRegistry::new();
        assert!(registry.touch("uid-1"));
        assert!(registry.touch("uid-1"));
    }

    #[test]
    fn test_subjects_are_independent() {
        let registry = SessionRegistry::new();
        assert!(registry.touch("uid-1"));
        assert!(registry.touch("uid-2"));
    }

    #[test]
    fn test_idle_subject_expires_and_resets() {
        let registry = SessionRegistry::new();
        let t0 = Instant::now();
        assert!(registry.touch_at("uid-1", t0));

        let later = t0 + IDLE_TIMEOUT + Duration::from_secs(1);
        assert!(!registry.touch_at("uid-1", later));
        // The failed touch reset the window; the next request is fresh.
        assert!(registry.touch_at("uid-1", later + Duration::from_secs(1)));
    }

    #[test]
    fn test_idle_entries_are_evicted() {
        let registry = SessionRegistry::new();
        let t0 = Instant::now();
        registry.touch_at("uid-1", t0);
        registry.touch_at("uid-2", t0);
        assert_eq!(registry.tracked(), 2);

        // uid-3's activity past the window sweeps out the idle entries.
        let later = t0 + IDLE_TIMEOUT + Duration::from_secs(1);
        registry.touch_at("uid-3", later);
        assert_eq!(registry.tracked(), 1);
    }
}
