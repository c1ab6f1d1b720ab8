// OpenAPI document for the portal API

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use utoipa::openapi::server::Server;
use utoipa::OpenApi;

use crate::{
    app::AppState,
    app_config::{AppConfig, Environment},
    handlers::{applications, health, payments, reference, webhooks},
    models::{
        ApplicationSummary, Country, EmploymentInfo, Payment, PaymentPlan, PersonalInfo,
        PlanTerms, Program, SubmittedApplication, SummaryStatus, WizardDraft, WizardStep,
    },
    services::{
        intake::ApplicationReview,
        payment_options::{BundleKind, PaymentBundle, PaymentOptions},
        payments::{
            ApplicantPaymentOptions, CheckoutConfirmation, CheckoutMetadata, CheckoutRequest,
            CheckoutSession, ConfirmCheckoutRequest, MonthTile, PaymentDashboard,
            VerifyApplicantResponse, WidgetConfig,
        },
    },
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Scholarship Portal API",
        description = "Application intake wizard, payment portal and Paystack webhook",
        version = "1.0.0"
    ),
    paths(
        applications::create_draft,
        applications::get_draft,
        applications::discard_draft,
        applications::save_personal_info,
        applications::save_employment_info,
        applications::advance,
        applications::back,
        applications::review,
        applications::submit,
        payments::verify_applicant,
        payments::payment_options,
        payments::start_checkout,
        payments::confirm_checkout,
        payments::cancel_checkout,
        payments::receipt,
        payments::dashboard,
        webhooks::paystack_webhook,
        reference::list_programs,
        reference::list_countries,
        reference::list_payment_plans,
        health::health_check,
    ),
    components(schemas(
        WizardDraft,
        WizardStep,
        PersonalInfo,
        EmploymentInfo,
        SubmittedApplication,
        ApplicationReview,
        ApplicationSummary,
        SummaryStatus,
        Payment,
        Program,
        Country,
        PaymentPlan,
        PlanTerms,
        PaymentOptions,
        PaymentBundle,
        BundleKind,
        payments::VerifyApplicantRequest,
        VerifyApplicantResponse,
        ApplicantPaymentOptions,
        CheckoutRequest,
        CheckoutSession,
        WidgetConfig,
        CheckoutMetadata,
        ConfirmCheckoutRequest,
        CheckoutConfirmation,
        PaymentDashboard,
        MonthTile,
    )),
    tags(
        (name = "Applications", description = "Multi-step application wizard"),
        (name = "Payments", description = "Installment payments through the hosted gateway widget"),
        (name = "Webhooks", description = "Gateway callbacks"),
        (name = "Reference", description = "Programs, countries and payment plans"),
        (name = "Health", description = "Service health checks")
    )
)]
pub struct ApiDoc;

/// Build the OpenAPI document with the server list for this environment
pub fn build_openapi_spec(config: &AppConfig) -> utoipa::openapi::OpenApi {
    let mut spec = ApiDoc::openapi();

    let mut current = Server::new(match config.environment {
        Environment::Production => config.email.portal_url.trim_end_matches('/').to_string(),
        _ => format!("http://localhost:{}", config.server.port),
    });
    current.description = Some(format!("Current server ({})", config.environment));
    spec.servers = Some(vec![current]);

    spec
}

/// Serve the OpenAPI document at /v1/docs/openapi.json
pub async fn serve_openapi_spec(State(state): State<AppState>) -> Response {
    let spec = build_openapi_spec(state.config.as_ref());

    match serde_json::to_string(&spec) {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to serialize OpenAPI document: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        },
    }
}
