use std::net::SocketAddr;
use std::sync::Arc;

use log::{error, info};
use tokio::net::TcpListener;

use super::routes::routes;
use crate::tracker::Tracker;

/// Binds and serves the read-only JSON API until ctrl-c.
///
/// A failure to bind the listen socket is fatal: the process exits with a
/// non-zero code after logging the cause.
pub async fn start(socket_addr: SocketAddr, tracker: Arc<Tracker>) {
    let listener = match TcpListener::bind(socket_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Could not bind API server to {}: {}", socket_addr, e);
            std::process::exit(1);
        }
    };

    info!("Starting API server on: {}", socket_addr);

    if let Err(e) = axum::serve(listener, routes(tracker))
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("API server error: {}", e);
    }
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to listen to shutdown signal");
}
