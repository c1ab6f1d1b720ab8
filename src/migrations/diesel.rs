// Diesel migration runner for PostgreSQL
// diesel_migrations needs a sync connection, so this runs on the blocking pool

use diesel::Connection;
use diesel::PgConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use std::error::Error;
use tracing::{debug, info};

// Schema, payment summary trigger and reference data seed
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations/diesel");

/// Run all pending Diesel migrations
/// Returns the number of migrations applied
pub async fn run_migrations(database_url: &str) -> Result<usize, Box<dyn Error + Send + Sync>> {
    info!("[DIESEL] Starting Diesel migration process...");

    let database_url = database_url.to_string();

    let applied_migrations =
        tokio::task::spawn_blocking(move || -> Result<usize, Box<dyn Error + Send + Sync>> {
            debug!("[DIESEL] Establishing sync connection for migrations...");

            let mut conn = PgConnection::establish(&database_url)
                .map_err(|e| format!("Failed to establish sync connection: {}", e))?;

            let pending_count = conn
                .pending_migrations(MIGRATIONS)
                .map_err(|e| format!("Failed to check pending migrations: {}", e))?
                .len();

            if pending_count == 0 {
                debug!("[DIESEL] No pending migrations found");
                return Ok(0);
            }

            info!("[DIESEL] Found {} pending migrations", pending_count);

            let applied = conn
                .run_pending_migrations(MIGRATIONS)
                .map_err(|e| format!("Failed to run migrations: {}", e))?;

            for migration in &applied {
                debug!("[DIESEL] Applied migration: {}", migration);
            }

            Ok(applied.len())
        })
        .await
        .map_err(|e| format!("Migration task panicked: {}", e))??;

    info!("[DIESEL] Diesel migration process completed successfully");
    Ok(applied_migrations)
}
