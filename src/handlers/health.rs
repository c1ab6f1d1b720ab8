// Health check

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use std::time::Instant;

use crate::app::AppState;

#[utoipa::path(
    get,
    path = "/v1/health",
    tag = "Health",
    operation_id = "healthCheck",
    responses(
        (status = 200, description = "Service and store are healthy"),
        (status = 503, description = "Store unreachable")
    )
)]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let timestamp = chrono::Utc::now().to_rfc3339();
    let started = Instant::now();

    let (healthy, store_health) = match state.store.ping().await {
        Ok(()) => (
            true,
            serde_json::json!({
                "status": "healthy",
                "backend": state.config.database.backend.as_str(),
                "latency_ms": started.elapsed().as_millis() as u64,
                "error": null
            }),
        ),
        Err(e) => (
            false,
            serde_json::json!({
                "status": "unhealthy",
                "backend": state.config.database.backend.as_str(),
                "error": format!("Store check failed: {}", e)
            }),
        ),
    };

    let response = serde_json::json!({
        "status": if healthy { "healthy" } else { "degraded" },
        "service": "scholarship-portal",
        "environment": state.config.environment.to_string(),
        "timestamp": timestamp,
        "components": {
            "store": store_health
        }
    });

    if healthy {
        (StatusCode::OK, Json(response))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(response))
    }
}
