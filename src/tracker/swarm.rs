//! The relational swarm records: users, files (torrents), and the
//! file/user membership rows the announce engine maintains.

use std::net::IpAddr;

use serde::Serialize;

use crate::protocol::clock::current_time;
use crate::protocol::info_hash::InfoHash;
use crate::tracker::auth::Passkey;
use crate::tracker::request::{Announce, Event};

pub type UserId = i64;
pub type FileId = i64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub passkey: Passkey,
    pub torrent_limit: i64,
    pub uploaded: i64,
    pub downloaded: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct File {
    pub id: FileId,
    pub info_hash: InfoHash,
    pub verified: bool,
    pub created_at: u64,
}

impl File {
    /// A file row auto-created on first contact. It stays invisible to the
    /// tracker until an administrator flips `verified`.
    #[must_use]
    pub fn new_unverified(info_hash: InfoHash) -> Self {
        Self {
            id: 0,
            info_hash,
            verified: false,
            created_at: current_time(),
        }
    }
}

/// One participation of a user in a swarm from a given IP. Identity is the
/// `(file_id, user_id, ip)` triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUser {
    pub file_id: FileId,
    pub user_id: UserId,
    pub ip: IpAddr,
    pub active: bool,
    pub completed: bool,
    pub announced: i64,
    pub uploaded: i64,
    pub downloaded: i64,
    pub left: i64,
    pub last_announce: u64,
}

impl FileUser {
    /// A fresh membership row. A client reporting nothing left to download
    /// on first contact is the initial seeder.
    #[must_use]
    pub fn new(file_id: FileId, user_id: UserId, announce: &Announce) -> Self {
        Self {
            file_id,
            user_id,
            ip: announce.ip,
            active: announce.event != Event::Stopped,
            completed: announce.left == 0,
            announced: 1,
            uploaded: announce.uploaded,
            downloaded: announce.downloaded,
            left: announce.left,
            last_announce: current_time(),
        }
    }

    /// Folds a new announce into the record.
    ///
    /// Clients report absolute counters and may restart from scratch, so the
    /// merge is one-directional: `uploaded`/`downloaded` never decrease,
    /// `left` never increases, and `completed` never reverts. Deltas are
    /// never computed from these values.
    pub fn merge(&mut self, announce: &Announce) {
        self.active = announce.event != Event::Stopped;
        self.completed = self.completed || announce.event == Event::Completed || announce.left == 0;
        self.announced += 1;

        if announce.uploaded > self.uploaded {
            self.uploaded = announce.uploaded;
        }
        if announce.downloaded > self.downloaded {
            self.downloaded = announce.downloaded;
        }
        if announce.left < self.left {
            self.left = announce.left;
        }

        self.last_announce = current_time();
    }
}
