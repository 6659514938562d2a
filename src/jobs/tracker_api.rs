use std::net::SocketAddr;
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::api::server;
use crate::config::Configuration;
use crate::tracker::Tracker;

/// # Panics
///
/// Will panic if the configured bind address is not a valid socket address.
pub fn start_job(config: &Configuration, tracker: Arc<Tracker>) -> JoinHandle<()> {
    let bind_addr = config
        .http_api
        .bind_address
        .parse::<SocketAddr>()
        .expect("invalid API bind address");

    tokio::spawn(async move {
        server::start(bind_addr, tracker).await;
    })
}
