use std::sync::Arc;

use log::{error, info};
use ratio_tracker::api::resource::status::Status;
use ratio_tracker::config::Configuration;
use ratio_tracker::tracker::Tracker;
use ratio_tracker::{app, logging};

const CONFIG_PATH: &str = "tracker.toml";

#[tokio::main]
async fn main() {
    let config = match Configuration::load_from_file(CONFIG_PATH) {
        Ok(config) => Arc::new(config),
        Err(e) => {
            eprintln!("ratio-tracker: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = logging::setup(&config) {
        eprintln!("ratio-tracker: {e}");
        std::process::exit(1);
    }

    let tracker = match Tracker::new(&config) {
        Ok(tracker) => Arc::new(tracker),
        Err(e) => {
            error!("Could not connect to the swarm store: {}", e);
            std::process::exit(1);
        }
    };

    let status = Status::collect(&tracker);
    info!(
        "{} - {}_{} ({} CPU) [pid: {}]",
        status.hostname, status.platform, status.architecture, status.num_cpu, status.pid
    );

    let _jobs = app::start(&config, &tracker);

    tokio::signal::ctrl_c().await.expect("failed to listen to shutdown signal");

    info!("shutting down...");
}
