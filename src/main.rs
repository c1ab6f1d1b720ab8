use anyhow::Context;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scholarship_portal::{app_config, build_router, initialize_app_state};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables before anything reads them
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scholarship_portal=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = app_config::AppConfig::from_env().context("invalid configuration")?;
    info!(
        "Starting scholarship portal ({}) with {} store",
        config.environment,
        config.database.backend.as_str()
    );

    let state = initialize_app_state(&config)
        .await
        .map_err(|e| anyhow::anyhow!("startup failed: {}", e))?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind_address)
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind_address))?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
