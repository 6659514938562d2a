use std::net::SocketAddr;
use std::sync::Arc;

use log::{error, info};
use tokio::net::TcpListener;

use super::routes::routes;
use crate::tracker::Tracker;

/// Binds and serves the HTTP tracker until ctrl-c.
///
/// A failure to bind the listen socket is fatal: the process exits with a
/// non-zero code after logging the cause.
pub async fn start(socket_addr: SocketAddr, tracker: Arc<Tracker>) {
    let listener = match TcpListener::bind(socket_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Could not bind HTTP tracker to {}: {}", socket_addr, e);
            std::process::exit(1);
        }
    };

    info!("Starting HTTP tracker server on: {}", socket_addr);

    let app = routes(tracker).into_make_service_with_connect_info::<SocketAddr>();

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("HTTP tracker server error: {}", e);
    }
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to listen to shutdown signal");
}
