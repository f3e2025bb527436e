//! HTTP server for liveness/readiness probes.
//!
//! Out of the attendance core entirely; this exists so uptime monitors can
//! keep the bot process alive and orchestrators can gate on readiness.

pub mod health;
pub mod http;

use std::net::SocketAddr;
use std::path::PathBuf;

use tracing::info;

/// Bind the probe server on `0.0.0.0:port` and serve until shutdown.
pub async fn serve(
    port: u16,
    state_dir: PathBuf,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
) -> Result<(), std::io::Error> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Liveness server listening on {}", addr);

    axum::serve(listener, http::create_router(state_dir))
        .with_graceful_shutdown(async move {
            while shutdown.changed().await.is_ok() {
                if *shutdown.borrow() {
                    break;
                }
            }
        })
        .await
}
