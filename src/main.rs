use museum_portal::{
    AppState, Config, JsonFileStore, MemoryStore, RecordStore, StoreBackend, router,
};
use std::net::SocketAddr;
use tokio::fs;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let config = Config::from_env()?;

    match config.store {
        StoreBackend::File => {
            if let Some(parent) = config.data_path.parent() {
                fs::create_dir_all(parent).await?;
            }
            let store = JsonFileStore::open(config.data_path.clone()).await;
            info!(path = %store.path().display(), "using JSON file store");
            serve(store, &config).await
        }
        StoreBackend::Memory => {
            info!("using in-memory store");
            serve(MemoryStore::new(), &config).await
        }
    }
}

async fn serve<S: RecordStore>(
    store: S,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let state = AppState::new(store, config)?;
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    info!("listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
