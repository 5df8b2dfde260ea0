//! Ticketing HTTP server.
//!
//! Loads configuration, migrates the database, starts the metrics exporter
//! and serves the API until SIGINT/SIGTERM.

use std::sync::Arc;
use ticketing_core::TicketingEngine;
use ticketing_core::environment::SystemClock;
use ticketing_postgres::PostgresBackend;
use ticketing_server::Config;
use ticketing_server::metrics::install_exporter;
use ticketing_web::{AppState, router};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file (if present)
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ticketing=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting ticketing server");

    let config = Config::from_env()?;
    info!(
        max_connections = config.database.max_connections,
        max_attempts = config.transactions.max_attempts,
        cancellation_policy = ?config.tickets.cancellation_policy,
        "Configuration loaded"
    );

    install_exporter(config.metrics_addr().parse()?)?;

    info!("Connecting to database...");
    let backend = PostgresBackend::connect(&config.database.url, &config.pool_config()).await?;
    backend.migrate().await?;

    let engine = TicketingEngine::new(
        Arc::new(backend),
        Arc::new(SystemClock),
        config.engine_config(),
    );
    let app = router(AppState::new(Arc::new(engine)));

    let addr = config.http_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(address = %addr, "Server listening");

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = stop_rx.await;
            })
            .await
    });

    tokio::select! {
        joined = &mut server => {
            joined??;
            warn!("Server exited before a shutdown signal");
            return Ok(());
        }
        () = shutdown_signal() => {}
    }

    let _ = stop_tx.send(());
    match tokio::time::timeout(config.server.shutdown_timeout, server).await {
        Ok(joined) => joined??,
        Err(_) => warn!(
            timeout_secs = config.server.shutdown_timeout.as_secs(),
            "In-flight requests did not finish before the shutdown timeout"
        ),
    }

    info!("Server stopped");
    Ok(())
}

/// Graceful shutdown signal handler.
///
/// Waits for:
/// - Ctrl+C (SIGINT)
/// - SIGTERM (in production environments)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
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
        () = ctrl_c => {
            info!("Received Ctrl+C signal, shutting down gracefully...");
        },
        () = terminate => {
            info!("Received SIGTERM signal, shutting down gracefully...");
        },
    }
}
