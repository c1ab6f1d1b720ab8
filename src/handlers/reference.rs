// Read-only reference data for the wizard's dropdowns

use axum::{extract::State, response::IntoResponse, Json};

use crate::{app::AppState, utils::service_error::ServiceError};

#[utoipa::path(
    get,
    path = "/v1/reference/programs",
    tag = "Reference",
    operation_id = "listPrograms",
    responses((status = 200, description = "Active programs", body = [Program]))
)]
pub async fn list_programs(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.list_programs().await {
        Ok(programs) => Json(programs).into_response(),
        Err(e) => ServiceError::from(e).into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/v1/reference/countries",
    tag = "Reference",
    operation_id = "listCountries",
    responses((status = 200, description = "Countries by name", body = [Country]))
)]
pub async fn list_countries(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.list_countries().await {
        Ok(countries) => Json(countries).into_response(),
        Err(e) => ServiceError::from(e).into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/v1/reference/payment-plans",
    tag = "Reference",
    operation_id = "listPaymentPlans",
    responses((status = 200, description = "Active payment plans", body = [PaymentPlan]))
)]
pub async fn list_payment_plans(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.list_payment_plans().await {
        Ok(plans) => Json(plans).into_response(),
        Err(e) => ServiceError::from(e).into_response(),
    }
}
