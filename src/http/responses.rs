//! The bencoded response documents of the HTTP tracker.
//!
//! Errors are HTTP 200 with an in-body `failure reason`; transport-level
//! status codes are not part of the tracker protocol.

use std::collections::BTreeMap;

use crate::protocol::bencode::Value;
use crate::protocol::info_hash::InfoHash;
use crate::tracker::peer::{self, Peer};
use crate::tracker::{AnnounceData, ScrapeData};

pub struct Announce {
    pub complete: u32,
    pub incomplete: u32,
    pub interval: u32,
    pub min_interval: u32,
    pub peers: Vec<Peer>,
}

impl From<AnnounceData> for Announce {
    fn from(data: AnnounceData) -> Self {
        Self {
            complete: data.complete,
            incomplete: data.incomplete,
            interval: data.interval,
            min_interval: data.min_interval,
            peers: data.peers,
        }
    }
}

impl Announce {
    #[must_use]
    pub fn body(&self) -> Vec<u8> {
        let mut dict = BTreeMap::new();
        dict.insert(b"complete".to_vec(), Value::Integer(i64::from(self.complete)));
        dict.insert(b"incomplete".to_vec(), Value::Integer(i64::from(self.incomplete)));
        dict.insert(b"interval".to_vec(), Value::Integer(i64::from(self.interval)));
        dict.insert(b"min interval".to_vec(), Value::Integer(i64::from(self.min_interval)));
        dict.insert(b"peers".to_vec(), Value::Bytes(peer::compact(&self.peers)));

        Value::Dict(dict).encode()
    }
}

pub struct Scrape {
    pub info_hash: InfoHash,
    pub complete: u32,
    pub downloaded: u32,
    pub incomplete: u32,
}

impl From<ScrapeData> for Scrape {
    fn from(data: ScrapeData) -> Self {
        Self {
            info_hash: data.info_hash,
            complete: data.complete,
            downloaded: data.downloaded,
            incomplete: data.incomplete,
        }
    }
}

impl Scrape {
    #[must_use]
    pub fn body(&self) -> Vec<u8> {
        let mut dict = BTreeMap::new();
        dict.insert(b"complete".to_vec(), Value::Integer(i64::from(self.complete)));
        dict.insert(b"downloaded".to_vec(), Value::Integer(i64::from(self.downloaded)));
        dict.insert(b"files".to_vec(), Value::Bytes(self.info_hash.0.to_vec()));
        dict.insert(b"incomplete".to_vec(), Value::Integer(i64::from(self.incomplete)));

        Value::Dict(dict).encode()
    }
}

pub struct Error {
    pub failure_reason: String,
    pub interval: u32,
    pub min_interval: u32,
}

impl Error {
    #[must_use]
    pub fn body(&self) -> Vec<u8> {
        let mut dict = BTreeMap::new();
        dict.insert(
            b"failure reason".to_vec(),
            Value::Bytes(self.failure_reason.as_bytes().to_vec()),
        );
        dict.insert(b"interval".to_vec(), Value::Integer(i64::from(self.interval)));
        dict.insert(b"min interval".to_vec(), Value::Integer(i64::from(self.min_interval)));

        Value::Dict(dict).encode()
    }
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};
    use std::str::FromStr;

    use super::{Announce, Error, Scrape};
    use crate::protocol::info_hash::InfoHash;
    use crate::tracker::peer::Peer;

    #[test]
    fn an_announce_document_has_its_keys_in_lexicographic_order() {
        let response = Announce {
            complete: 1,
            incomplete: 0,
            interval: 1800,
            min_interval: 900,
            peers: vec![Peer::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)), 6881)],
        };

        let mut expected = b"d8:completei1e10:incompletei0e8:intervali1800e12:min intervali900e5:peers6:".to_vec();
        expected.extend_from_slice(&[10, 0, 0, 1, 0x1a, 0xe1]);
        expected.push(b'e');

        assert_eq!(response.body(), expected);
    }

    #[test]
    fn an_announce_document_with_no_peers_has_an_empty_peers_string() {
        let response = Announce {
            complete: 0,
            incomplete: 0,
            interval: 300,
            min_interval: 300,
            peers: vec![],
        };

        assert_eq!(
            response.body(),
            b"d8:completei0e10:incompletei0e8:intervali300e12:min intervali300e5:peers0:e".to_vec()
        );
    }

    #[test]
    fn a_scrape_document_carries_the_raw_info_hash_bytes() {
        let response = Scrape {
            info_hash: InfoHash::from_str("3b245504cf5f11bbdbe1201cea6a6bf45aee1bc0").unwrap(),
            complete: 5,
            downloaded: 3,
            incomplete: 2,
        };

        let mut expected = b"d8:completei5e10:downloadedi3e5:files20:".to_vec();
        expected.extend_from_slice(&response.info_hash.0);
        expected.extend_from_slice(b"10:incompletei2ee");

        assert_eq!(response.body(), expected);
    }

    #[test]
    fn an_error_document_carries_the_failure_reason_and_interval_fields() {
        let response = Error {
            failure_reason: "Unregistered torrent".to_string(),
            interval: 3000,
            min_interval: 1800,
        };

        assert_eq!(
            response.body(),
            b"d14:failure reason20:Unregistered torrent8:intervali3000e12:min intervali1800ee".to_vec()
        );
    }
}
