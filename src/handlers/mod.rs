// HTTP handlers, grouped by the part of the portal they serve

pub mod applications;
pub mod docs;
pub mod health;
pub mod payments;
pub mod reference;
pub mod webhooks;

use crate::app::AppState;
use axum::{
    routing::{get, post, put},
    Router,
};

// Application wizard routes
pub fn application_routes() -> Router<AppState> {
    Router::new()
        .route("/drafts", post(applications::create_draft))
        .route(
            "/drafts/{id}",
            get(applications::get_draft).delete(applications::discard_draft),
        )
        .route("/drafts/{id}/personal-info", put(applications::save_personal_info))
        .route(
            "/drafts/{id}/employment-info",
            put(applications::save_employment_info),
        )
        .route("/drafts/{id}/advance", post(applications::advance))
        .route("/drafts/{id}/back", post(applications::back))
        .route("/drafts/{id}/review", get(applications::review))
        .route("/drafts/{id}/submit", post(applications::submit))
}

// Payment portal routes
pub fn payment_routes() -> Router<AppState> {
    Router::new()
        .route("/verify-applicant", post(payments::verify_applicant))
        .route("/options", get(payments::payment_options))
        .route("/checkout", post(payments::start_checkout))
        .route("/dashboard", get(payments::dashboard))
        .route("/{reference}/confirm", post(payments::confirm_checkout))
        .route("/{reference}/cancel", post(payments::cancel_checkout))
        .route("/{reference}/receipt", get(payments::receipt))
}

pub fn webhook_routes() -> Router<AppState> {
    Router::new().route("/paystack", post(webhooks::paystack_webhook))
}

pub fn reference_routes() -> Router<AppState> {
    Router::new()
        .route("/programs", get(reference::list_programs))
        .route("/countries", get(reference::list_countries))
        .route("/payment-plans", get(reference::list_payment_plans))
}
