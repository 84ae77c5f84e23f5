use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::api_state::ApiState;

/// Readiness probe: returns 200 if the store answers within its deadline, else 503.
pub async fn ready(State(state): State<ApiState>) -> impl IntoResponse {
    let probe = tokio::time::timeout(
        state.config.store_timeout(),
        state.db.client.query("RETURN true"),
    )
    .await;

    let failure = match probe {
        Ok(Ok(_)) => None,
        Ok(Err(e)) => Some(e.to_string()),
        Err(_) => Some("store did not answer before its deadline".to_string()),
    };

    match failure {
        None => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "checks": { "store": "ok" }
            })),
        ),
        Some(reason) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "error",
                "checks": { "store": "fail" },
                "reason": reason
            })),
        ),
    }
}
