//! GMC Server - Main entry point

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use gmc_common::logging::{init_logging, LogConfig};
use sqlx::PgPool;
use tokio::{signal, sync::oneshot};
use tracing::{info, warn};

use gmc_server::{api, config::Config, db};

#[tokio::main]
async fn main() -> Result<()> {
    // Environment variables override these defaults
    let log_config = LogConfig::builder()
        .log_file_prefix("gmc-server")
        .filter_directives("gmc_server=debug,tower_http=debug,sqlx=warn")
        .build()
        .merge_env()?;
    init_logging(&log_config)?;

    let config = Config::load()?;
    info!(
        host = %config.server.host,
        port = config.server.port,
        allow_unreleased = config.visibility.allow_unreleased,
        site_id = config.visibility.current_site_id,
        "Starting catalog server"
    );

    let pool = connect(&config).await?;
    let app = api::create_router(pool, config.visibility, &config.cors);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("GMC_HOST and GMC_PORT do not form a socket address")?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Listening");

    let drain = Duration::from_secs(config.server.shutdown_timeout_secs);
    let (signalled_tx, signalled_rx) = oneshot::channel::<()>();

    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        let name = shutdown_signal().await;
        info!(signal = name, "Draining open connections");
        let _ = signalled_tx.send(());
    });

    // In-flight requests get `drain` to finish once a signal arrives
    let drain_deadline = async move {
        match signalled_rx.await {
            Ok(()) => tokio::time::sleep(drain).await,
            Err(_) => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        result = server.into_future() => result?,
        _ = drain_deadline => {
            warn!(seconds = drain.as_secs(), "Drain deadline passed, dropping remaining connections");
        },
    }

    info!("Server stopped");
    Ok(())
}

/// Create the pool and bring the schema up to date.
async fn connect(config: &Config) -> Result<PgPool> {
    let pool = db::create_pool(&config.database.pool_config()).await?;

    sqlx::migrate!("../../migrations")
        .run(&pool)
        .await
        .context("Failed to run catalog migrations")?;
    info!("Catalog schema is current");

    Ok(pool)
}

/// Resolves with the name of the first termination signal received.
async fn shutdown_signal() -> &'static str {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            },
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => "SIGINT",
        _ = terminate => "SIGTERM",
    }
}
