//! Serialization of the BEP 15 response packets.

use std::io::{self, Write};
use std::net::IpAddr;

use byteorder::{NetworkEndian, WriteBytesExt};

use super::request::{ConnectionId, TransactionId};
use crate::tracker::peer::Peer;

#[derive(PartialEq, Eq, Clone, Debug)]
pub enum Response {
    Connect(ConnectResponse),
    Announce(AnnounceResponse),
    Scrape(ScrapeResponse),
    Error(ErrorResponse),
}

#[derive(PartialEq, Eq, Clone, Debug)]
pub struct ConnectResponse {
    pub transaction_id: TransactionId,
    pub connection_id: ConnectionId,
}

#[derive(PartialEq, Eq, Clone, Debug)]
pub struct AnnounceResponse {
    pub transaction_id: TransactionId,
    pub interval: u32,
    pub leechers: u32,
    pub seeders: u32,
    pub peers: Vec<Peer>,
}

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct ScrapeEntry {
    pub seeders: u32,
    pub completed: u32,
    pub leechers: u32,
}

#[derive(PartialEq, Eq, Clone, Debug)]
pub struct ScrapeResponse {
    pub transaction_id: TransactionId,
    pub entries: Vec<ScrapeEntry>,
}

#[derive(PartialEq, Eq, Clone, Debug)]
pub struct ErrorResponse {
    pub transaction_id: TransactionId,
    pub message: String,
}

impl From<ConnectResponse> for Response {
    fn from(r: ConnectResponse) -> Self {
        Self::Connect(r)
    }
}

impl From<AnnounceResponse> for Response {
    fn from(r: AnnounceResponse) -> Self {
        Self::Announce(r)
    }
}

impl From<ScrapeResponse> for Response {
    fn from(r: ScrapeResponse) -> Self {
        Self::Scrape(r)
    }
}

impl From<ErrorResponse> for Response {
    fn from(r: ErrorResponse) -> Self {
        Self::Error(r)
    }
}

impl Response {
    /// # Errors
    ///
    /// Will return an `io::Error` if the sink refuses the bytes.
    pub fn write_to_bytes(&self, bytes: &mut impl Write) -> Result<(), io::Error> {
        match self {
            Response::Connect(r) => {
                bytes.write_u32::<NetworkEndian>(0)?;
                bytes.write_i32::<NetworkEndian>(r.transaction_id.0)?;
                bytes.write_u64::<NetworkEndian>(r.connection_id.0)?;
            }
            Response::Announce(r) => {
                bytes.write_u32::<NetworkEndian>(1)?;
                bytes.write_i32::<NetworkEndian>(r.transaction_id.0)?;
                bytes.write_u32::<NetworkEndian>(r.interval)?;
                bytes.write_u32::<NetworkEndian>(r.leechers)?;
                bytes.write_u32::<NetworkEndian>(r.seeders)?;

                // Only IPv4 peers have a compact slot.
                for peer in &r.peers {
                    if let IpAddr::V4(ip) = peer.ip {
                        bytes.write_all(&ip.octets())?;
                        bytes.write_u16::<NetworkEndian>(peer.port)?;
                    }
                }
            }
            Response::Scrape(r) => {
                bytes.write_u32::<NetworkEndian>(2)?;
                bytes.write_i32::<NetworkEndian>(r.transaction_id.0)?;

                for entry in &r.entries {
                    bytes.write_u32::<NetworkEndian>(entry.seeders)?;
                    bytes.write_u32::<NetworkEndian>(entry.completed)?;
                    bytes.write_u32::<NetworkEndian>(entry.leechers)?;
                }
            }
            Response::Error(r) => {
                bytes.write_u32::<NetworkEndian>(3)?;
                bytes.write_i32::<NetworkEndian>(r.transaction_id.0)?;
                bytes.write_all(r.message.as_bytes())?;
            }
        }

        Ok(())
    }
}
