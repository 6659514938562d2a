//! A ratio-enforcing BitTorrent tracker.
//!
//! Peers discover each other through the HTTP tracker protocol or the UDP
//! tracker protocol (BEP 15); per-user, per-torrent transfer accounting is
//! persisted through a relational store so share ratios can be enforced.
//! Only torrents an administrator has verified are tracked, and HTTP
//! clients authenticate with a passkey embedded in the announce URL.

pub mod api;
pub mod app;
pub mod config;
pub mod databases;
pub mod http;
pub mod jobs;
pub mod logging;
pub mod protocol;
pub mod tracker;
pub mod udp;
