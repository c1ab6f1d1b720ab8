// Payment portal endpoints

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::{
    app::AppState,
    services::payments::{CheckoutRequest, ConfirmCheckoutRequest},
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct VerifyApplicantRequest {
    pub email: String,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct EmailQuery {
    /// Email the applicant applied with
    #[serde(default)]
    pub email: String,
}

/// Re-identify an applicant by email
#[utoipa::path(
    post,
    path = "/v1/payments/verify-applicant",
    tag = "Payments",
    operation_id = "verifyApplicant",
    request_body = VerifyApplicantRequest,
    responses(
        (status = 200, description = "Lookup result; `exists` is false for unknown emails", body = VerifyApplicantResponse),
        (status = 400, description = "Email missing")
    )
)]
pub async fn verify_applicant(
    State(state): State<AppState>,
    Json(request): Json<VerifyApplicantRequest>,
) -> impl IntoResponse {
    match state.payment_service.verify_applicant(&request.email).await {
        Ok(response) => Json(response).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Bundles the applicant can pay for next
#[utoipa::path(
    get,
    path = "/v1/payments/options",
    tag = "Payments",
    operation_id = "paymentOptions",
    params(EmailQuery),
    responses(
        (status = 200, description = "Offered bundles", body = ApplicantPaymentOptions),
        (status = 404, description = "No application for this email")
    )
)]
pub async fn payment_options(
    State(state): State<AppState>,
    Query(query): Query<EmailQuery>,
) -> impl IntoResponse {
    match state.payment_service.options(&query.email).await {
        Ok(options) => Json(options).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Create a pending payment and return the widget configuration
#[utoipa::path(
    post,
    path = "/v1/payments/checkout",
    tag = "Payments",
    operation_id = "startCheckout",
    request_body = CheckoutRequest,
    responses(
        (status = 201, description = "Pending payment created", body = CheckoutSession),
        (status = 400, description = "Bundle not offered"),
        (status = 404, description = "No application for this email"),
        (status = 409, description = "Plan already paid in full")
    )
)]
pub async fn start_checkout(
    State(state): State<AppState>,
    Json(request): Json<CheckoutRequest>,
) -> impl IntoResponse {
    match state.payment_service.start_checkout(request).await {
        Ok(session) => (StatusCode::CREATED, Json(session)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Widget success callback; records the gateway reference only
#[utoipa::path(
    post,
    path = "/v1/payments/{reference}/confirm",
    tag = "Payments",
    operation_id = "confirmCheckout",
    params(("reference" = String, Path, description = "Payment reference")),
    request_body = ConfirmCheckoutRequest,
    responses(
        (status = 200, description = "Gateway reference recorded", body = CheckoutConfirmation),
        (status = 404, description = "Unknown reference")
    )
)]
pub async fn confirm_checkout(
    State(state): State<AppState>,
    Path(reference): Path<String>,
    Json(request): Json<ConfirmCheckoutRequest>,
) -> impl IntoResponse {
    match state
        .payment_service
        .confirm_checkout(&reference, &request.gateway_reference)
        .await
    {
        Ok(confirmation) => Json(confirmation).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Widget closed without paying
#[utoipa::path(
    post,
    path = "/v1/payments/{reference}/cancel",
    tag = "Payments",
    operation_id = "cancelCheckout",
    params(("reference" = String, Path, description = "Payment reference")),
    responses(
        (status = 200, description = "Payment after cancellation", body = Payment),
        (status = 404, description = "Unknown reference")
    )
)]
pub async fn cancel_checkout(
    State(state): State<AppState>,
    Path(reference): Path<String>,
) -> impl IntoResponse {
    match state.payment_service.cancel_checkout(&reference).await {
        Ok(payment) => Json(payment).into_response(),
        Err(e) => e.into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/v1/payments/{reference}/receipt",
    tag = "Payments",
    operation_id = "paymentReceipt",
    params(("reference" = String, Path, description = "Payment reference")),
    responses(
        (status = 200, description = "Plain-text receipt", content_type = "text/plain", body = String),
        (status = 404, description = "Unknown reference")
    )
)]
pub async fn receipt(
    State(state): State<AppState>,
    Path(reference): Path<String>,
) -> impl IntoResponse {
    match state.payment_service.receipt(&reference).await {
        Ok(text) => {
            let disposition = format!("attachment; filename=\"receipt_{}.txt\"", reference);
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                text,
            )
                .into_response()
        },
        Err(e) => e.into_response(),
    }
}

/// Months paid, balance and payment history
#[utoipa::path(
    get,
    path = "/v1/payments/dashboard",
    tag = "Payments",
    operation_id = "paymentDashboard",
    params(EmailQuery),
    responses(
        (status = 200, description = "Reconciliation view", body = PaymentDashboard),
        (status = 404, description = "No application for this email")
    )
)]
pub async fn dashboard(
    State(state): State<AppState>,
    Query(query): Query<EmailQuery>,
) -> impl IntoResponse {
    match state.payment_service.dashboard(&query.email).await {
        Ok(dashboard) => Json(dashboard).into_response(),
        Err(e) => e.into_response(),
    }
}
