//! Main entry point for the Image Generation Relay

use imagegen_relay::{
    api,
    backend::{FusionBrainClient, GenerationClient},
    config::{LoggingConfig, Settings},
    AppState,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Load configuration
    let settings = Settings::load()?;
    init_logging(&settings.logging);
    settings.validate()?;

    info!(
        "Loaded configuration: server={}:{}",
        settings.server.host, settings.server.port
    );

    let client: Arc<dyn GenerationClient> = Arc::new(FusionBrainClient::new(&settings.remote)?);
    let addr = format!("{}:{}", settings.server.host, settings.server.port);

    let state = Arc::new(AppState::new(settings, client)?);
    let app = api::create_router(state.clone());

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server running on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.scheduler.shutdown();
    info!(
        pending_jobs = state.registry.len(),
        "Server stopped; in-memory jobs discarded"
    );

    Ok(())
}

fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let registry = tracing_subscriber::registry().with(filter);
    if logging.format == "pretty" {
        registry.with(fmt::layer().pretty()).init();
    } else {
        registry.with(fmt::layer().json()).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
