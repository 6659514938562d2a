//! Building the canonical tracker requests from parsed query strings.

use std::net::IpAddr;
use std::str::FromStr;

use thiserror::Error;

use super::percent_encoding::{percent_decode_info_hash, percent_decode_peer_id};
use super::query::Query;
use crate::protocol::common::{DEFAULT_NUMWANT, MAX_SCRAPE_TORRENTS};
use crate::protocol::info_hash::InfoHash;
use crate::tracker::peer;
use crate::tracker::request::{Announce, Event, Protocol, Scrape};

// Query param names.
const INFO_HASH: &str = "info_hash";
const PEER_ID: &str = "peer_id";
const IP: &str = "ip";
const PORT: &str = "port";
const UPLOADED: &str = "uploaded";
const DOWNLOADED: &str = "downloaded";
const LEFT: &str = "left";
const EVENT: &str = "event";
const NUMWANT: &str = "numwant";
const KEY: &str = "key";

#[derive(Error, Debug)]
pub enum ParseRequestError {
    #[error("missing param {param_name}")]
    MissingParam { param_name: &'static str },

    #[error("invalid param {param_name}={param_value}")]
    InvalidParam {
        param_name: &'static str,
        param_value: String,
    },
}

/// Builds an announce request. `info_hash`, `peer_id`, `port`, `uploaded`,
/// `downloaded` and `left` are mandatory; the peer IP falls back to the
/// socket address when the `ip` param is absent.
///
/// # Errors
///
/// Will return a `ParseRequestError` describing the offending param.
pub fn announce_from_query(query: &Query, source_ip: IpAddr) -> Result<Announce, ParseRequestError> {
    let info_hash = extract_info_hash(query)?;
    let peer_id = extract_peer_id(query)?;
    let port = extract_port(query)?;
    let uploaded = extract_bytes(query, UPLOADED)?;
    let downloaded = extract_bytes(query, DOWNLOADED)?;
    let left = extract_bytes(query, LEFT)?;
    let event = extract_event(query)?;
    let ip = extract_ip(query, source_ip)?;
    let numwant = extract_numwant(query)?;
    let key = query.get_param(KEY);

    Ok(Announce {
        info_hash,
        peer_id,
        ip,
        port,
        uploaded,
        downloaded,
        left,
        event,
        numwant,
        key,
        protocol: Protocol::Http,
    })
}

/// Builds a scrape request from the repeated `info_hash` params, keeping at
/// most the first 70.
///
/// # Errors
///
/// Will return a `ParseRequestError` if no valid `info_hash` param is given.
pub fn scrape_from_query(query: &Query, source_ip: IpAddr) -> Result<Scrape, ParseRequestError> {
    let raw_hashes = query
        .get_param_vec(INFO_HASH)
        .ok_or(ParseRequestError::MissingParam { param_name: INFO_HASH })?;

    let mut info_hashes = Vec::new();

    for raw_hash in raw_hashes.iter().take(MAX_SCRAPE_TORRENTS) {
        let info_hash = percent_decode_info_hash(raw_hash).map_err(|_| ParseRequestError::InvalidParam {
            param_name: INFO_HASH,
            param_value: raw_hash.clone(),
        })?;
        info_hashes.push(info_hash);
    }

    Ok(Scrape {
        info_hashes,
        ip: source_ip,
        protocol: Protocol::Http,
    })
}

fn extract_info_hash(query: &Query) -> Result<InfoHash, ParseRequestError> {
    let raw_param = query
        .get_param(INFO_HASH)
        .ok_or(ParseRequestError::MissingParam { param_name: INFO_HASH })?;

    percent_decode_info_hash(&raw_param).map_err(|_| ParseRequestError::InvalidParam {
        param_name: INFO_HASH,
        param_value: raw_param,
    })
}

fn extract_peer_id(query: &Query) -> Result<peer::Id, ParseRequestError> {
    let raw_param = query
        .get_param(PEER_ID)
        .ok_or(ParseRequestError::MissingParam { param_name: PEER_ID })?;

    percent_decode_peer_id(&raw_param).map_err(|_| ParseRequestError::InvalidParam {
        param_name: PEER_ID,
        param_value: raw_param,
    })
}

fn extract_port(query: &Query) -> Result<u16, ParseRequestError> {
    let raw_param = query
        .get_param(PORT)
        .ok_or(ParseRequestError::MissingParam { param_name: PORT })?;

    u16::from_str(&raw_param).map_err(|_| ParseRequestError::InvalidParam {
        param_name: PORT,
        param_value: raw_param,
    })
}

fn extract_bytes(query: &Query, param_name: &'static str) -> Result<i64, ParseRequestError> {
    let raw_param = query
        .get_param(param_name)
        .ok_or(ParseRequestError::MissingParam { param_name })?;

    // Clients report unsigned counters; reject values an i64 cannot carry.
    u64::from_str(&raw_param)
        .ok()
        .and_then(|value| i64::try_from(value).ok())
        .ok_or(ParseRequestError::InvalidParam {
            param_name,
            param_value: raw_param,
        })
}

fn extract_event(query: &Query) -> Result<Event, ParseRequestError> {
    match query.get_param(EVENT) {
        Some(raw_param) => Event::from_str(&raw_param).map_err(|_| ParseRequestError::InvalidParam {
            param_name: EVENT,
            param_value: raw_param,
        }),
        None => Ok(Event::None),
    }
}

fn extract_ip(query: &Query, source_ip: IpAddr) -> Result<IpAddr, ParseRequestError> {
    match query.get_param(IP) {
        Some(raw_param) => IpAddr::from_str(&raw_param).map_err(|_| ParseRequestError::InvalidParam {
            param_name: IP,
            param_value: raw_param,
        }),
        None => Ok(source_ip),
    }
}

fn extract_numwant(query: &Query) -> Result<u32, ParseRequestError> {
    match query.get_param(NUMWANT) {
        Some(raw_param) => u32::from_str(&raw_param).map_err(|_| ParseRequestError::InvalidParam {
            param_name: NUMWANT,
            param_value: raw_param,
        }),
        None => Ok(DEFAULT_NUMWANT),
    }
}
