// Payment gateway webhook endpoint

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::json;

use crate::{app::AppState, services::webhook::SIGNATURE_HEADER};

/// Paystack charge notifications
///
/// The body is taken raw so the signature is checked over the exact bytes sent.
#[utoipa::path(
    post,
    path = "/v1/webhooks/paystack",
    tag = "Webhooks",
    operation_id = "paystackWebhook",
    params(("x-paystack-signature" = String, Header, description = "Hex HMAC-SHA512 of the body")),
    request_body(content = String, description = "Paystack event JSON", content_type = "application/json"),
    responses(
        (status = 200, description = "`{message}`; also returned for ignored events"),
        (status = 401, description = "`{error}`; missing or invalid signature"),
        (status = 500, description = "`{error}`; the gateway should retry")
    )
)]
pub async fn paystack_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    match state.webhook_service.process(signature, &body).await {
        Ok(outcome) => (StatusCode::OK, Json(json!({ "message": outcome.message() }))).into_response(),
        Err(e) => e.into_response(),
    }
}
