// Library exports for the scholarship portal
// This file exposes modules and functions for the binary and the integration tests

pub mod app;
pub mod app_config;
pub mod db;
pub mod handlers;
pub mod middleware;
pub mod migrations;
pub mod models;
pub mod schema;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use app::{build_router, AppState};
pub use app_config::AppConfig;
pub use db::{DieselPool, DieselStore, MemoryStore, PortalStore, StoreError};
pub use services::{
    EmailService, IntakeService, NotificationOutbox, PaymentService, WebhookService,
};

use std::sync::Arc;
use tracing::info;

use app_config::StoreBackend;

/// Store selected by configuration; migrations run first when the backend is Postgres
pub async fn initialize_store(
    config: &AppConfig,
) -> Result<Arc<dyn PortalStore>, Box<dyn std::error::Error + Send + Sync>> {
    match config.database.backend {
        StoreBackend::Memory => {
            info!("Using in-memory store; data is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        },
        StoreBackend::Postgres => {
            info!(
                "Initializing database pool for {}",
                db::mask_connection_string(&config.database.url)
            );
            let pool = db::create_diesel_pool(db::DieselDatabaseConfig::from(&config.database)).await?;

            if migrations::should_run_migrations(config) {
                info!("Running embedded migrations...");
                migrations::run_all_migrations(config).await?;
            }

            Ok(Arc::new(DieselStore::new(pool)))
        },
    }
}

/// Build the full application state from configuration
pub async fn initialize_app_state(
    config: &AppConfig,
) -> Result<AppState, Box<dyn std::error::Error + Send + Sync>> {
    let store = initialize_store(config).await?;
    let email_service = Arc::new(EmailService::new(config.email.clone())?);
    let state = AppState::new(config.clone(), store, email_service);

    if config.features.redeliver_outbox_on_startup {
        let report = state.outbox.redeliver_pending(100).await;
        info!(
            "Startup outbox pass: {} sent, {} failed",
            report.sent, report.failed
        );
    }

    Ok(state)
}
