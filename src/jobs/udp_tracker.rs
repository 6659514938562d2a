use std::sync::Arc;

use log::{error, info};
use tokio::task::JoinHandle;

use crate::config::Configuration;
use crate::tracker::Tracker;
use crate::udp::server::UdpServer;

pub fn start_job(config: &Configuration, tracker: Arc<Tracker>) -> JoinHandle<()> {
    let bind_address = config.udp_tracker.bind_address.clone();

    tokio::spawn(async move {
        match UdpServer::new(tracker, &bind_address).await {
            Ok(udp_server) => {
                info!("Starting UDP server on: {}", bind_address);
                udp_server.start().await;
            }
            Err(e) => {
                error!("Could not start UDP tracker on: {}: {}", bind_address, e);
                std::process::exit(1);
            }
        }
    })
}
