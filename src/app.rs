// Application state and router
use std::sync::Arc;

use axum::{middleware::from_fn_with_state, routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::{
    app_config::AppConfig,
    db::PortalStore,
    handlers::{self, docs, health},
    middleware::dynamic_cors_middleware,
    services::{EmailService, IntakeService, NotificationOutbox, PaymentService, WebhookService},
};

// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn PortalStore>,
    pub email_service: Arc<EmailService>,
    pub outbox: NotificationOutbox,
    pub intake_service: Arc<IntakeService>,
    pub payment_service: Arc<PaymentService>,
    pub webhook_service: Arc<WebhookService>,
}

impl AppState {
    /// Wire every service over one store and one email service
    pub fn new(
        config: AppConfig,
        store: Arc<dyn PortalStore>,
        email_service: Arc<EmailService>,
    ) -> Self {
        let outbox = NotificationOutbox::new(store.clone(), email_service.clone());

        Self {
            intake_service: Arc::new(IntakeService::new(store.clone(), outbox.clone())),
            payment_service: Arc::new(PaymentService::new(store.clone(), config.payment.clone())),
            webhook_service: Arc::new(WebhookService::new(
                store.clone(),
                outbox.clone(),
                config.payment.clone(),
            )),
            config: Arc::new(config),
            store,
            email_service,
            outbox,
        }
    }
}

/// All routes under `/v1`, with CORS and request tracing
pub fn build_router(state: AppState) -> Router {
    let mut v1 = Router::new()
        .nest("/applications", handlers::application_routes())
        .nest("/payments", handlers::payment_routes())
        .nest("/webhooks", handlers::webhook_routes())
        .nest("/reference", handlers::reference_routes())
        .route("/health", get(health::health_check));

    if state.config.features.enable_api_docs {
        v1 = v1.route("/docs/openapi.json", get(docs::serve_openapi_spec));
    }

    Router::new()
        .nest("/v1", v1)
        .layer(from_fn_with_state(state.clone(), dynamic_cors_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
