use anyhow::Context;
use cardstream_core::Catalog;
use cardstream_server::server::{
    config::{CliArgs, ServerConfig},
    service::{STREAM_PATH, handler::AppState, router},
    telemetry::init_tracing,
};
use clap::Parser;
use std::sync::Arc;
use tokio::{net::TcpListener, signal};
use tokio_util::sync::CancellationToken;

// Using mimalloc for better performance under contention, especially in musl
// environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = ServerConfig::try_from(args)?;

    init_tracing()?;

    let catalog = Catalog::from_path(&config.catalog_path).with_context(|| {
        format!(
            "failed to load catalog from {}",
            config.catalog_path.display()
        )
    })?;
    let catalog_size = catalog.size();

    let shutdown = CancellationToken::new();
    let state = AppState::from_config(Arc::new(catalog), &config, shutdown.clone());
    let active = state.active_streams();
    let app = router(state, &config.allowed_origins);

    let listener = TcpListener::bind(&config.server_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.server_addr))?;
    log_startup_info(&config, catalog_size);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    if active.drain(config.shutdown_timeout).await {
        tracing::info!("Service shut down successfully");
    } else {
        tracing::warn!(
            open = active.count(),
            "Streams still open after {:?}, exiting anyway",
            config.shutdown_timeout
        );
    }
    Ok(())
}

fn log_startup_info(config: &ServerConfig, catalog_size: usize) {
    if cfg!(debug_assertions) {
        tracing::info!(
            "Serving {} on {} with full config: {:#?}",
            STREAM_PATH,
            config.server_addr,
            config
        );
    } else {
        tracing::info!(
            catalog_size,
            total = config.session.pool.total(),
            concurrency = config.session.pool.concurrency(),
            "Serving {} on {}",
            STREAM_PATH,
            config.server_addr
        );
    }
}

/// Resolves on Ctrl+C or SIGTERM after cancelling every open stream.
async fn shutdown_signal(shutdown: CancellationToken) {
    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                core::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = core::future::pending::<()>();

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            core::future::pending::<()>().await;
        }
    };

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl+C signal"),
        () = terminate => tracing::info!("Received SIGTERM signal"),
    }

    tracing::info!("Shutdown signal received, terminating gracefully...");
    shutdown.cancel();
}
