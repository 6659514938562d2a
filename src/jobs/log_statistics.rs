use std::sync::Arc;

use log::info;
use tokio::task::JoinHandle;

use crate::api::resource::status::Status;
use crate::config::Configuration;
use crate::tracker::Tracker;

/// Logs the status document on a timer and resets the per-tick counters.
pub fn start_job(config: &Configuration, tracker: &Arc<Tracker>) -> JoinHandle<()> {
    let interval = config.stats_log_interval;
    let tracker = tracker.clone();

    tokio::spawn(async move {
        let interval = std::time::Duration::from_secs(interval);
        let mut interval = tokio::time::interval(interval);
        interval.tick().await; // first tick is immediate

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("Stopping statistics logging job..");
                    break;
                }
                _ = interval.tick() => {
                    let status = Status::collect(&tracker);

                    info!("status - [workers: {}] [memory: {:.3} MB]", status.workers, status.memory_mb);
                    info!("  http - [current: {}] [total: {}]", status.http.current, status.http.total);
                    info!("   udp - [current: {}] [total: {}]", status.udp.current, status.udp.total);

                    tracker.stats.reset_current();
                }
            }
        }
    })
}
