//! Application builder and server loop.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;

use wardgate_core::config::AppConfig;
use wardgate_core::error::AppError;
use wardgate_core::result::AppResult;
use wardgate_core::traits::SystemClock;
use wardgate_database::Stores;
use wardgate_service::Services;

use crate::router::build_router;
use crate::state::AppState;

/// Builds the complete Axum application.
pub fn build_app(state: AppState) -> Router {
    build_router(state)
}

/// Open the stores, wire the services, start the session sweeper, and
/// serve until shutdown.
pub async fn run_server(config: AppConfig) -> AppResult<()> {
    tracing::info!("Starting Wardgate v{}", env!("CARGO_PKG_VERSION"));

    let stores = Stores::open(&config.database).await?;
    let services = Services::build(stores, &config, Arc::new(SystemClock));
    services.ensure_core_permissions().await?;

    let sweeper = spawn_sweeper(services.clone(), config.session.sweep_interval);
    let result = serve(AppState::new(services)).await;
    sweeper.abort();
    result
}

/// End idle sessions every `interval`.
fn spawn_sweeper(services: Services, interval: std::time::Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match services.sweep().await {
                Ok(0) => {}
                Ok(ended) => tracing::info!(ended, "Expired sessions swept"),
                Err(e) => tracing::warn!(error = %e, "Session sweep failed"),
            }
        }
    })
}

/// Bind `server.host:server.port` and serve until Ctrl+C or SIGTERM.
pub async fn serve(state: AppState) -> AppResult<()> {
    let addr = format!("{}:{}", state.config.server.host, state.config.server.port);
    let app = build_app(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;
    tracing::info!("Wardgate listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        shutdown_signal().await;
        tracing::info!("Shutdown signal received, starting graceful shutdown...");
    })
    .await
    .map_err(|e| AppError::internal(format!("Server error: {e}")))?;

    tracing::info!("Wardgate server shut down gracefully");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
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
                tracing::error!("Failed to install SIGTERM handler: {}", e);
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
}
