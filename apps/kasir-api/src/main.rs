//! # Kasir API Server
//!
//! HTTP server for settlement, reporting and checkout capture.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Kasir API Server                               │
//! │                                                                         │
//! │  Web UI ───► HTTP (8080) ───► Engine ───► PosStore                     │
//! │                                              │                          │
//! │                            ┌─────────────────┼─────────────────┐        │
//! │                            ▼                 ▼                 ▼        │
//! │                         SQLite             Redis          Local file    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use kasir_api::{app, AppConfig, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,kasir=debug"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!("Starting Kasir API server...");

    // Load configuration
    let config = AppConfig::load()?;
    let calendar = config.store.calendar()?;
    info!(
        addr = %config.server.bind_address(),
        backend = %config.backend.resolved_choice(),
        cutoff_policy = %config.store.cutoff_policy,
        utc_offset_minutes = config.store.utc_offset_minutes,
        "Configuration loaded"
    );

    // Connect the data store. Never fails: an unusable backend becomes a
    // store that reads empty and rejects writes.
    let store = kasir_db::connect(&config.backend).await;
    if !store.health_check().await {
        warn!(backend = %store.backend(), "Data store is not healthy; writes will fail");
    }

    let state = AppState::new(store, calendar, config.store.cutoff_policy);
    let router = app(state);

    let listener = TcpListener::bind(config.server.bind_address()).await?;
    info!(addr = %listener.local_addr()?, "Listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
