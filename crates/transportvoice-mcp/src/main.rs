mod config;
mod error;
mod server;

use rmcp::{ServiceExt, transport::stdio};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use config::Config;
use error::AppError;
use server::PlanningServer;
use transportvoice_common::lifecycle::LifecycleManager;
use transportvoice_common::retry::connect_with_retry;
use transportvoice_common::store::StoreBackend;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout is reserved for MCP JSON-RPC
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    info!("starting transportvoice MCP server");

    let config = Config::from_env()?;
    info!(
        store = %config.store.redacted_uri(),
        require_tls = config.store.require_tls,
        connect_timeout_ms = config.store.connect_timeout.as_millis(),
        max_retries = config.store.retry.max_retries,
        "configuration loaded"
    );

    let backend = StoreBackend::for_config(&config.store)?;
    info!(backend = ?backend.kind(), "store backend selected");
    let store = LifecycleManager::new(backend, &config.store);
    if let Err(e) = connect_store(&store, &config).await {
        warn!(error = %e, "planning store unavailable at startup, store_status will retry");
    }

    let server = PlanningServer::new(store.clone());

    let served = match config.tcp_listen_addr.as_deref() {
        Some(addr) => serve_tcp(server, addr).await,
        None => serve_stdio(server).await,
    };

    if let Err(e) = store.close().await {
        warn!(error = %e, "planning store did not close cleanly");
    }
    info!("MCP server shut down");
    served
}

async fn connect_store(
    store: &LifecycleManager<StoreBackend>,
    config: &Config,
) -> Result<(), AppError> {
    connect_with_retry(store, &config.store.retry).await?;
    info!(store = %store.redacted_uri(), "planning store connected");
    Ok(())
}

async fn serve_stdio(server: PlanningServer) -> anyhow::Result<()> {
    info!("MCP server ready, serving on stdio");
    let service = server.serve(stdio()).await.inspect_err(|e| {
        tracing::error!(error = %e, "MCP server error");
    })?;

    tokio::select! {
        quit = service.waiting() => {
            quit?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("interrupt received, shutting down");
        }
    }
    Ok(())
}

async fn serve_tcp(server: PlanningServer, addr: &str) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(listen_addr = %addr, "MCP server ready, serving on TCP");
    loop {
        let (stream, peer) = tokio::select! {
            accepted = listener.accept() => accepted?,
            _ = tokio::signal::ctrl_c() => {
                info!("interrupt received, shutting down");
                return Ok(());
            }
        };
        let server = server.clone();
        tokio::spawn(async move {
            tracing::info!(peer = %peer, "MCP client connected");
            let service = server.serve(stream).await.inspect_err(|e| {
                tracing::error!(error = %e, "MCP server error");
            })?;
            service.waiting().await?;
            tracing::info!(peer = %peer, "MCP client disconnected");
            Ok::<(), anyhow::Error>(())
        });
    }
}
