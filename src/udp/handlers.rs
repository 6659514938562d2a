use std::net::{IpAddr, SocketAddr};

use log::debug;
use tokio::time::timeout;

use super::connection::ConnectionTable;
use super::request::{AnnounceRequest, ConnectRequest, Request, ScrapeRequest, TransactionId};
use super::response::{AnnounceResponse, ConnectResponse, ErrorResponse, Response, ScrapeEntry, ScrapeResponse};
use crate::protocol::common::{DEFAULT_NUMWANT, REQUEST_TIMEOUT};
use crate::tracker::request::{Announce, Protocol, Scrape};
use crate::tracker::Tracker;

/// Turns one datagram into the response datagram to send back. Every
/// failure path yields an action=3 error packet; a packet too mangled to
/// carry a transaction id gets id 0.
pub async fn handle_packet(
    remote_addr: SocketAddr,
    payload: &[u8],
    tracker: &Tracker,
    connections: &ConnectionTable,
) -> Response {
    match Request::from_bytes(payload) {
        Ok(request) => handle_request(request, remote_addr, tracker, connections).await,
        Err(e) => {
            debug!("udp: could not parse packet from {}: {:?}", remote_addr, e);
            handle_error(
                &e.message.unwrap_or_else(|| "Malformed packet".to_string()),
                e.transaction_id.unwrap_or(TransactionId(0)),
            )
        }
    }
}

pub async fn handle_request(
    request: Request,
    remote_addr: SocketAddr,
    tracker: &Tracker,
    connections: &ConnectionTable,
) -> Response {
    match request {
        Request::Connect(connect_request) => handle_connect(remote_addr, &connect_request, connections),
        Request::Announce(announce_request) => {
            handle_announce(remote_addr, &announce_request, tracker, connections).await
        }
        Request::Scrape(scrape_request) => handle_scrape(remote_addr, &scrape_request, tracker, connections).await,
    }
}

pub fn handle_connect(remote_addr: SocketAddr, request: &ConnectRequest, connections: &ConnectionTable) -> Response {
    let connection_id = connections.issue(remote_addr);

    debug!("udp: issued connection id {:?} to {}", connection_id, remote_addr);

    Response::from(ConnectResponse {
        transaction_id: request.transaction_id,
        connection_id,
    })
}

pub async fn handle_announce(
    remote_addr: SocketAddr,
    request: &AnnounceRequest,
    tracker: &Tracker,
    connections: &ConnectionTable,
) -> Response {
    if let Err(e) = connections.verify(request.connection_id, &remote_addr) {
        return handle_error(&e.to_string(), request.transaction_id);
    }

    let announce = normalize_announce(request, &remote_addr);

    match timeout(REQUEST_TIMEOUT, tracker.announce(&announce, None)).await {
        Ok(Ok(data)) => Response::from(AnnounceResponse {
            transaction_id: request.transaction_id,
            interval: data.interval,
            leechers: data.incomplete,
            seeders: data.complete,
            peers: data.peers,
        }),
        Ok(Err(e)) => handle_error(&e.to_string(), request.transaction_id),
        Err(_) => handle_error("Could not create UDP announce response", request.transaction_id),
    }
}

pub async fn handle_scrape(
    remote_addr: SocketAddr,
    request: &ScrapeRequest,
    tracker: &Tracker,
    connections: &ConnectionTable,
) -> Response {
    if let Err(e) = connections.verify(request.connection_id, &remote_addr) {
        return handle_error(&e.to_string(), request.transaction_id);
    }

    let scrape = Scrape {
        info_hashes: request.info_hashes.clone(),
        ip: remote_addr.ip(),
        protocol: Protocol::Udp,
    };

    match timeout(REQUEST_TIMEOUT, tracker.scrape(&scrape)).await {
        Ok(Ok(files)) => Response::from(ScrapeResponse {
            transaction_id: request.transaction_id,
            entries: files
                .iter()
                .map(|file| ScrapeEntry {
                    seeders: file.complete,
                    completed: file.downloaded,
                    leechers: file.incomplete,
                })
                .collect(),
        }),
        Ok(Err(e)) => handle_error(&e.to_string(), request.transaction_id),
        Err(_) => handle_error("Could not create UDP scrape response", request.transaction_id),
    }
}

fn handle_error(message: &str, transaction_id: TransactionId) -> Response {
    Response::from(ErrorResponse {
        transaction_id,
        message: message.to_string(),
    })
}

/// Maps the packet onto the canonical announce. The packet's own `ip` field
/// wins when present, otherwise the datagram's source address is the peer
/// address; the numwant sentinel falls back to the protocol default.
fn normalize_announce(request: &AnnounceRequest, remote_addr: &SocketAddr) -> Announce {
    let ip = match request.ip_address {
        Some(ip) => IpAddr::V4(ip),
        None => remote_addr.ip(),
    };

    let numwant = if request.peers_wanted == u32::MAX {
        DEFAULT_NUMWANT
    } else {
        request.peers_wanted
    };

    Announce {
        info_hash: request.info_hash,
        peer_id: request.peer_id,
        ip,
        port: request.port,
        uploaded: request.bytes_uploaded.max(0),
        downloaded: request.bytes_downloaded.max(0),
        left: request.bytes_left.max(0),
        event: request.event,
        numwant,
        key: Some(format!("{:08x}", request.key)),
        protocol: Protocol::Udp,
    }
}
