// Application intake wizard endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::{
    app::AppState,
    models::{EmploymentInfo, PersonalInfo},
    utils::service_error::ServiceError,
};

/// Start a new application
#[utoipa::path(
    post,
    path = "/v1/applications/drafts",
    tag = "Applications",
    operation_id = "createDraft",
    responses(
        (status = 201, description = "Empty draft at the personal info step", body = WizardDraft),
        (status = 500, description = "Store failure")
    )
)]
pub async fn create_draft(State(state): State<AppState>) -> impl IntoResponse {
    match state.intake_service.create_draft().await {
        Ok(draft) => (StatusCode::CREATED, Json(draft)).into_response(),
        Err(e) => ServiceError::from(e).into_response(),
    }
}

/// Reload a draft, e.g. after a page refresh
#[utoipa::path(
    get,
    path = "/v1/applications/drafts/{id}",
    tag = "Applications",
    operation_id = "getDraft",
    params(("id" = Uuid, Path, description = "Draft id")),
    responses(
        (status = 200, description = "Current draft", body = WizardDraft),
        (status = 404, description = "Unknown draft")
    )
)]
pub async fn get_draft(State(state): State<AppState>, Path(id): Path<Uuid>) -> impl IntoResponse {
    match state.intake_service.load_draft(id).await {
        Ok(draft) => Json(draft).into_response(),
        Err(e) => ServiceError::from(e).into_response(),
    }
}

#[utoipa::path(
    delete,
    path = "/v1/applications/drafts/{id}",
    tag = "Applications",
    operation_id = "discardDraft",
    params(("id" = Uuid, Path, description = "Draft id")),
    responses(
        (status = 204, description = "Draft discarded"),
        (status = 404, description = "Unknown draft")
    )
)]
pub async fn discard_draft(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    match state.intake_service.discard_draft(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => ServiceError::from(e).into_response(),
    }
}

/// Save the personal info page without validating it
#[utoipa::path(
    put,
    path = "/v1/applications/drafts/{id}/personal-info",
    tag = "Applications",
    operation_id = "savePersonalInfo",
    params(("id" = Uuid, Path, description = "Draft id")),
    request_body = PersonalInfo,
    responses(
        (status = 200, description = "Draft saved", body = WizardDraft),
        (status = 404, description = "Unknown draft"),
        (status = 409, description = "Draft already submitted")
    )
)]
pub async fn save_personal_info(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<PersonalInfo>,
) -> impl IntoResponse {
    match state.intake_service.save_personal_info(id, payload).await {
        Ok(draft) => Json(draft).into_response(),
        Err(e) => ServiceError::from(e).into_response(),
    }
}

/// Save the employment info page without validating it
#[utoipa::path(
    put,
    path = "/v1/applications/drafts/{id}/employment-info",
    tag = "Applications",
    operation_id = "saveEmploymentInfo",
    params(("id" = Uuid, Path, description = "Draft id")),
    request_body = EmploymentInfo,
    responses(
        (status = 200, description = "Draft saved", body = WizardDraft),
        (status = 404, description = "Unknown draft"),
        (status = 409, description = "Personal info step not completed, or draft already submitted")
    )
)]
pub async fn save_employment_info(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<EmploymentInfo>,
) -> impl IntoResponse {
    match state.intake_service.save_employment_info(id, payload).await {
        Ok(draft) => Json(draft).into_response(),
        Err(e) => ServiceError::from(e).into_response(),
    }
}

/// Validate the current step and move to the next one
#[utoipa::path(
    post,
    path = "/v1/applications/drafts/{id}/advance",
    tag = "Applications",
    operation_id = "advanceDraft",
    params(("id" = Uuid, Path, description = "Draft id")),
    responses(
        (status = 200, description = "Draft moved to the next step", body = WizardDraft),
        (status = 404, description = "Unknown draft"),
        (status = 409, description = "Nothing to advance"),
        (status = 422, description = "Per-field validation errors")
    )
)]
pub async fn advance(State(state): State<AppState>, Path(id): Path<Uuid>) -> impl IntoResponse {
    match state.intake_service.advance(id).await {
        Ok(draft) => Json(draft).into_response(),
        Err(e) => ServiceError::from(e).into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/v1/applications/drafts/{id}/back",
    tag = "Applications",
    operation_id = "draftBack",
    params(("id" = Uuid, Path, description = "Draft id")),
    responses(
        (status = 200, description = "Draft moved to the previous step", body = WizardDraft),
        (status = 404, description = "Unknown draft"),
        (status = 409, description = "Draft already submitted")
    )
)]
pub async fn back(State(state): State<AppState>, Path(id): Path<Uuid>) -> impl IntoResponse {
    match state.intake_service.back(id).await {
        Ok(draft) => Json(draft).into_response(),
        Err(e) => ServiceError::from(e).into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/v1/applications/drafts/{id}/review",
    tag = "Applications",
    operation_id = "reviewDraft",
    params(("id" = Uuid, Path, description = "Draft id")),
    responses(
        (status = 200, description = "Both pages, validated", body = ApplicationReview),
        (status = 409, description = "Draft is not at the review step"),
        (status = 422, description = "Per-field validation errors")
    )
)]
pub async fn review(State(state): State<AppState>, Path(id): Path<Uuid>) -> impl IntoResponse {
    match state.intake_service.review(id).await {
        Ok(review) => Json(review).into_response(),
        Err(e) => ServiceError::from(e).into_response(),
    }
}

/// Create the application record
#[utoipa::path(
    post,
    path = "/v1/applications/drafts/{id}/submit",
    tag = "Applications",
    operation_id = "submitApplication",
    params(("id" = Uuid, Path, description = "Draft id")),
    responses(
        (status = 201, description = "Application stored", body = SubmittedApplication),
        (status = 409, description = "Draft is not at the review step"),
        (status = 422, description = "Per-field validation errors"),
        (status = 500, description = "Store failure; the draft is kept for a retry")
    )
)]
pub async fn submit(State(state): State<AppState>, Path(id): Path<Uuid>) -> impl IntoResponse {
    match state.intake_service.submit(id).await {
        Ok(submitted) => (StatusCode::CREATED, Json(submitted)).into_response(),
        Err(e) => ServiceError::from(e).into_response(),
    }
}
