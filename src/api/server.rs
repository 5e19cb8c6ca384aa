use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::info;

use super::state::AppState;
use crate::config::Config;
use crate::downloader::{scheduler, EngineContext};
use crate::notify::NotificationGateway;
use crate::store::TaskStore;

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub async fn run(address: Option<SocketAddr>) -> Result<(), AnyError> {
    info!("Loading configuration");
    let config = Config::load()?;
    let address = address.unwrap_or(config.server.bind_addr);

    info!(path = %config.server.store_path.display(), "Opening task store");
    let store = TaskStore::open(&config.server.store_path)?;

    let gateway = NotificationGateway::new(config.notify.retry_attempts);
    let engine = EngineContext::new(
        store.clone(),
        Arc::new(gateway.clone()),
        config.downloader.clone(),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (metadata_loop, download_loop) = scheduler::spawn(engine.clone(), shutdown_rx);

    let state = AppState::new(config, store.clone(), gateway, engine);
    let app = super::router(state);

    let listener = TcpListener::bind(address).await?;
    info!(%address, "VidBox API listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down schedulers");
    let _ = shutdown_tx.send(true);
    let _ = metadata_loop.await;
    let _ = download_loop.await;

    store.persist()?;
    info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to install signal handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
