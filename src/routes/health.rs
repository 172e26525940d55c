use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::AppState;

const SERVICE: &str = "moodie-api";

pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let db = sqlx::query("SELECT 1")
        .execute(&state.db)
        .await
        .map(|_| ())
        .map_err(|e| e.to_string());
    let (status, payload) = health_payload(db);
    (status, Json(payload))
}

fn health_payload(db: Result<(), String>) -> (StatusCode, Value) {
    match db {
        Ok(()) => (
            StatusCode::OK,
            json!({ "status": "ok", "service": SERVICE, "db": "connected" }),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            json!({ "status": "error", "service": SERVICE, "db": e }),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_healthy_payload_names_the_service() {
        let (status, payload) = health_payload(Ok(()));
        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload["service"], "moodie-api");
        assert_eq!(payload["db"], "connected");
    }

    #[test]
    fn test_unhealthy_payload_carries_the_error() {
        let (status, payload) = health_payload(Err("pool timed out".into()));
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["db"], "pool timed out");
    }
}
