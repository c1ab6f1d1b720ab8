// Migration orchestrator
// Migrations are embedded in the binary and run at startup unless disabled

pub mod diesel;

use crate::app_config::{AppConfig, StoreBackend};
use std::error::Error;
use tracing::{error, info};

/// Whether startup should apply the embedded migrations
pub fn should_run_migrations(config: &AppConfig) -> bool {
    config.database.backend == StoreBackend::Postgres
        && !config.features.disable_embedded_migrations
}

pub async fn run_all_migrations(config: &AppConfig) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!(
        "[MIGRATIONS] Starting migration process for environment: {}",
        config.environment
    );

    match diesel::run_migrations(&config.database.url).await {
        Ok(0) => info!("[MIGRATIONS] ✓ Diesel migrations up to date"),
        Ok(applied_count) => {
            info!("[MIGRATIONS] ✓ Applied {} Diesel migrations", applied_count)
        },
        Err(e) => {
            error!("[MIGRATIONS] ✗ Diesel migration failed: {}", e);
            return Err(format!("Diesel migration failed: {}", e).into());
        },
    }

    Ok(())
}
