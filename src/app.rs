//! The job launcher.
//!
//! The application is a container for the services the configuration
//! enables: the UDP tracker, the HTTP tracker, the read-only JSON API and
//! the statistics logging job. Each runs as its own task; the returned
//! handles live until ctrl-c.

use std::sync::Arc;

use log::warn;
use tokio::task::JoinHandle;

use crate::config::Configuration;
use crate::jobs;
use crate::tracker::Tracker;

pub fn start(config: &Arc<Configuration>, tracker: &Arc<Tracker>) -> Vec<JoinHandle<()>> {
    let mut jobs: Vec<JoinHandle<()>> = Vec::new();

    if config.udp_tracker.enabled {
        jobs.push(jobs::udp_tracker::start_job(config, tracker.clone()));
    }

    if config.http_tracker.enabled {
        jobs.push(jobs::http_tracker::start_job(config, tracker.clone()));
    }

    if config.http_api.enabled {
        jobs.push(jobs::tracker_api::start_job(config, tracker.clone()));
    }

    if jobs.is_empty() {
        warn!("No services enabled in configuration");
    }

    jobs.push(jobs::log_statistics::start_job(config, tracker));

    jobs
}
