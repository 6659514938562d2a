use serde::{Deserialize, Serialize};

/// A tracked file with its current swarm counts.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct File {
    pub id: i64,
    pub info_hash: String,
    pub verified: bool,
    pub seeders: u32,
    pub leechers: u32,
    pub completed: u32,
    pub created_at: u64,
}
