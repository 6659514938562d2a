//! Background eviction of stale peers.
//!
//! A pass marks `files_users` rows inactive when their last announce is
//! older than twice the announce interval. Passes are triggered after an
//! announce or scrape verified the file and never block the response; the
//! fingerprint set guarantees at most one in-flight pass per file.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use log::{info, warn};
use tokio::time::timeout;

use crate::databases::Database;
use crate::protocol::common::MAINTENANCE_TIMEOUT;
use crate::tracker::swarm::FileId;

#[derive(Debug, Default)]
pub struct PeerReaper {
    in_flight: Arc<Mutex<HashSet<FileId>>>,
}

impl PeerReaper {
    /// Spawns a reaper pass for the file unless one is already running.
    pub fn schedule(&self, database: Arc<dyn Database>, file_id: FileId, threshold: u64) {
        {
            let mut in_flight = self.in_flight.lock().expect("reaper fingerprint lock poisoned");
            if !in_flight.insert(file_id) {
                return;
            }
        }

        let in_flight = self.in_flight.clone();

        tokio::spawn(async move {
            match timeout(MAINTENANCE_TIMEOUT, database.reap_peers(file_id, threshold)).await {
                Ok(Ok(reaped)) if reaped > 0 => {
                    info!("reaper: marked {} peers inactive [file id: {}]", reaped, file_id);
                }
                Ok(Ok(_)) => {}
                Ok(Err(e)) => warn!("reaper: pass failed [file id: {}]: {}", file_id, e),
                Err(_) => warn!("reaper: pass timed out [file id: {}]", file_id),
            }

            in_flight
                .lock()
                .expect("reaper fingerprint lock poisoned")
                .remove(&file_id);
        });
    }
}
