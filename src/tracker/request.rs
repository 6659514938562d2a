//! The canonical announce and scrape requests both transports normalize
//! into before the engines run.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use serde::Serialize;

use crate::protocol::info_hash::InfoHash;
use crate::tracker::peer;

/// The event a client reports with its announce. An absent or empty `event`
/// param is a regular interval update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Event {
    None,
    Started,
    Completed,
    Stopped,
}

#[derive(Debug, PartialEq, Eq)]
pub struct ParseEventError;

impl FromStr for Event {
    type Err = ParseEventError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "" => Ok(Self::None),
            "started" => Ok(Self::Started),
            "completed" => Ok(Self::Completed),
            "stopped" => Ok(Self::Stopped),
            _ => Err(ParseEventError),
        }
    }
}

impl Event {
    /// Maps the UDP announce event field (BEP 15: 0 none, 1 completed,
    /// 2 started, 3 stopped) onto the canonical event.
    #[must_use]
    pub fn from_udp_code(code: u32) -> Option<Event> {
        match code {
            0 => Some(Self::None),
            1 => Some(Self::Completed),
            2 => Some(Self::Started),
            3 => Some(Self::Stopped),
            _ => None,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::None => write!(f, ""),
            Event::Started => write!(f, "started"),
            Event::Completed => write!(f, "completed"),
            Event::Stopped => write!(f, "stopped"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Http,
    Udp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Http => write!(f, "http"),
            Protocol::Udp => write!(f, "udp"),
        }
    }
}

/// A normalized announce request. Byte counters are the absolute values the
/// client reported; the engine applies the monotone merge.
#[derive(Debug, Clone)]
pub struct Announce {
    pub info_hash: InfoHash,
    pub peer_id: peer::Id,
    pub ip: IpAddr,
    pub port: u16,
    pub uploaded: i64,
    pub downloaded: i64,
    pub left: i64,
    pub event: Event,
    pub numwant: u32,
    pub key: Option<String>,
    pub protocol: Protocol,
}

/// A normalized scrape request.
#[derive(Debug, Clone)]
pub struct Scrape {
    pub info_hashes: Vec<InfoHash>,
    pub ip: IpAddr,
    pub protocol: Protocol,
}
