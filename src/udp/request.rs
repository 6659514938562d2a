//! Parsing of the fixed-layout BEP 15 request packets.
//!
//! Every read is bounds-checked through the cursor; a truncated packet
//! surfaces as a `RequestParseError` carrying the transaction id when one
//! could be read, so the caller can still address the error packet.

use std::io::{self, Cursor, Read};
use std::net::Ipv4Addr;

use byteorder::{NetworkEndian, ReadBytesExt};

use crate::protocol::common::MAX_SCRAPE_TORRENTS;
use crate::protocol::info_hash::InfoHash;
use crate::tracker::peer;
use crate::tracker::request::Event;

/// The magic connection id expected on connect requests.
pub const PROTOCOL_ID: u64 = 0x0417_2710_1980;

#[derive(PartialEq, Eq, Clone, Copy, Debug, Hash)]
pub struct ConnectionId(pub u64);

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct TransactionId(pub i32);

#[derive(PartialEq, Eq, Clone, Debug)]
pub enum Request {
    Connect(ConnectRequest),
    Announce(AnnounceRequest),
    Scrape(ScrapeRequest),
}

impl From<ConnectRequest> for Request {
    fn from(r: ConnectRequest) -> Self {
        Self::Connect(r)
    }
}

impl From<AnnounceRequest> for Request {
    fn from(r: AnnounceRequest) -> Self {
        Self::Announce(r)
    }
}

impl From<ScrapeRequest> for Request {
    fn from(r: ScrapeRequest) -> Self {
        Self::Scrape(r)
    }
}

#[derive(PartialEq, Eq, Clone, Debug)]
pub struct ConnectRequest {
    pub transaction_id: TransactionId,
}

#[derive(PartialEq, Eq, Clone, Debug)]
pub struct AnnounceRequest {
    pub connection_id: ConnectionId,
    pub transaction_id: TransactionId,
    pub info_hash: InfoHash,
    pub peer_id: peer::Id,
    pub bytes_downloaded: i64,
    pub bytes_left: i64,
    pub bytes_uploaded: i64,
    pub event: Event,
    pub ip_address: Option<Ipv4Addr>,
    pub key: u32,
    pub peers_wanted: u32,
    pub port: u16,
}

#[derive(PartialEq, Eq, Clone, Debug)]
pub struct ScrapeRequest {
    pub connection_id: ConnectionId,
    pub transaction_id: TransactionId,
    pub info_hashes: Vec<InfoHash>,
}

#[derive(Debug)]
pub struct RequestParseError {
    pub transaction_id: Option<TransactionId>,
    pub message: Option<String>,
    pub error: Option<io::Error>,
}

impl RequestParseError {
    fn new(err: io::Error, transaction_id: i32) -> Self {
        Self {
            transaction_id: Some(TransactionId(transaction_id)),
            message: None,
            error: Some(err),
        }
    }

    fn io(err: io::Error) -> Self {
        Self {
            transaction_id: None,
            message: None,
            error: Some(err),
        }
    }

    fn text(transaction_id: i32, message: &str) -> Self {
        Self {
            transaction_id: Some(TransactionId(transaction_id)),
            message: Some(message.to_string()),
            error: None,
        }
    }
}

impl Request {
    /// Parses one request datagram.
    ///
    /// # Errors
    ///
    /// Will return a `RequestParseError` for truncated packets, an unknown
    /// action, a connect without the protocol magic, an out-of-range event
    /// code, or a scrape without a single info-hash.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RequestParseError> {
        let mut cursor = Cursor::new(bytes);

        let connection_id = cursor.read_u64::<NetworkEndian>().map_err(RequestParseError::io)?;
        let action = cursor.read_u32::<NetworkEndian>().map_err(RequestParseError::io)?;
        let transaction_id = cursor.read_i32::<NetworkEndian>().map_err(RequestParseError::io)?;

        match action {
            // Connect
            0 => {
                if connection_id == PROTOCOL_ID {
                    Ok((ConnectRequest {
                        transaction_id: TransactionId(transaction_id),
                    })
                    .into())
                } else {
                    Err(RequestParseError::text(transaction_id, "Protocol identifier missing"))
                }
            }

            // Announce
            1 => {
                let mut info_hash = [0; 20];
                let mut peer_id = [0; 20];
                let mut ip = [0; 4];

                cursor
                    .read_exact(&mut info_hash)
                    .map_err(|err| RequestParseError::new(err, transaction_id))?;
                cursor
                    .read_exact(&mut peer_id)
                    .map_err(|err| RequestParseError::new(err, transaction_id))?;

                let bytes_downloaded = cursor
                    .read_i64::<NetworkEndian>()
                    .map_err(|err| RequestParseError::new(err, transaction_id))?;
                let bytes_left = cursor
                    .read_i64::<NetworkEndian>()
                    .map_err(|err| RequestParseError::new(err, transaction_id))?;
                let bytes_uploaded = cursor
                    .read_i64::<NetworkEndian>()
                    .map_err(|err| RequestParseError::new(err, transaction_id))?;

                let event_code = cursor
                    .read_u32::<NetworkEndian>()
                    .map_err(|err| RequestParseError::new(err, transaction_id))?;
                let event = Event::from_udp_code(event_code)
                    .ok_or_else(|| RequestParseError::text(transaction_id, "Invalid announce event"))?;

                cursor
                    .read_exact(&mut ip)
                    .map_err(|err| RequestParseError::new(err, transaction_id))?;

                let key = cursor
                    .read_u32::<NetworkEndian>()
                    .map_err(|err| RequestParseError::new(err, transaction_id))?;
                let peers_wanted = cursor
                    .read_u32::<NetworkEndian>()
                    .map_err(|err| RequestParseError::new(err, transaction_id))?;
                let port = cursor
                    .read_u16::<NetworkEndian>()
                    .map_err(|err| RequestParseError::new(err, transaction_id))?;

                let opt_ip = if ip == [0; 4] { None } else { Some(Ipv4Addr::from(ip)) };

                Ok((AnnounceRequest {
                    connection_id: ConnectionId(connection_id),
                    transaction_id: TransactionId(transaction_id),
                    info_hash: InfoHash(info_hash),
                    peer_id: peer::Id(peer_id),
                    bytes_downloaded,
                    bytes_left,
                    bytes_uploaded,
                    event,
                    ip_address: opt_ip,
                    key,
                    peers_wanted,
                    port,
                })
                .into())
            }

            // Scrape
            2 => {
                let position = cursor.position() as usize;
                let inner = cursor.into_inner();

                let info_hashes: Vec<InfoHash> = inner[position..]
                    .chunks_exact(20)
                    .take(MAX_SCRAPE_TORRENTS)
                    .map(|chunk| InfoHash::try_from(chunk).expect("chunks_exact yields 20 bytes"))
                    .collect();

                if info_hashes.is_empty() {
                    return Err(RequestParseError::text(transaction_id, "Scrape without info-hashes"));
                }

                Ok((ScrapeRequest {
                    connection_id: ConnectionId(connection_id),
                    transaction_id: TransactionId(transaction_id),
                    info_hashes,
                })
                .into())
            }

            _ => Err(RequestParseError::text(transaction_id, "Invalid action")),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use byteorder::{NetworkEndian, WriteBytesExt};

    use super::{AnnounceRequest, ConnectRequest, ConnectionId, Request, ScrapeRequest, TransactionId, PROTOCOL_ID};
    use crate::protocol::info_hash::InfoHash;
    use crate::tracker::peer;
    use crate::tracker::request::Event;

    fn connect_bytes(connection_id: u64, transaction_id: i32) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.write_u64::<NetworkEndian>(connection_id).unwrap();
        bytes.write_u32::<NetworkEndian>(0).unwrap();
        bytes.write_i32::<NetworkEndian>(transaction_id).unwrap();
        bytes
    }

    fn announce_bytes(request: &AnnounceRequest) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.write_u64::<NetworkEndian>(request.connection_id.0).unwrap();
        bytes.write_u32::<NetworkEndian>(1).unwrap();
        bytes.write_i32::<NetworkEndian>(request.transaction_id.0).unwrap();
        bytes.write_all(&request.info_hash.0).unwrap();
        bytes.write_all(&request.peer_id.0).unwrap();
        bytes.write_i64::<NetworkEndian>(request.bytes_downloaded).unwrap();
        bytes.write_i64::<NetworkEndian>(request.bytes_left).unwrap();
        bytes.write_i64::<NetworkEndian>(request.bytes_uploaded).unwrap();
        let event_code = match request.event {
            Event::None => 0,
            Event::Completed => 1,
            Event::Started => 2,
            Event::Stopped => 3,
        };
        bytes.write_u32::<NetworkEndian>(event_code).unwrap();
        match request.ip_address {
            Some(ip) => bytes.write_all(&ip.octets()).unwrap(),
            None => bytes.write_all(&[0; 4]).unwrap(),
        }
        bytes.write_u32::<NetworkEndian>(request.key).unwrap();
        bytes.write_u32::<NetworkEndian>(request.peers_wanted).unwrap();
        bytes.write_u16::<NetworkEndian>(request.port).unwrap();
        bytes
    }

    fn sample_announce() -> AnnounceRequest {
        AnnounceRequest {
            connection_id: ConnectionId(0xdead_beef_cafe_f00d),
            transaction_id: TransactionId(77),
            info_hash: InfoHash([0xaa; 20]),
            peer_id: peer::Id(*b"-qB00000000000000000"),
            bytes_downloaded: 1000,
            bytes_left: 2000,
            bytes_uploaded: 500,
            event: Event::Started,
            ip_address: Some("126.0.0.1".parse().unwrap()),
            key: 0xcafe,
            peers_wanted: 50,
            port: 6881,
        }
    }

    #[test]
    fn a_connect_request_round_trips() {
        let parsed = Request::from_bytes(&connect_bytes(PROTOCOL_ID, 42)).unwrap();

        assert_eq!(
            parsed,
            Request::Connect(ConnectRequest {
                transaction_id: TransactionId(42)
            })
        );
    }

    #[test]
    fn a_connect_request_without_the_magic_is_rejected() {
        let err = Request::from_bytes(&connect_bytes(0x1234, 42)).unwrap_err();

        assert_eq!(err.transaction_id, Some(TransactionId(42)));
        assert_eq!(err.message.as_deref(), Some("Protocol identifier missing"));
    }

    #[test]
    fn an_announce_request_round_trips() {
        let request = sample_announce();

        let parsed = Request::from_bytes(&announce_bytes(&request)).unwrap();

        assert_eq!(parsed, Request::Announce(request));
    }

    #[test]
    fn an_announce_request_is_98_bytes() {
        assert_eq!(announce_bytes(&sample_announce()).len(), 98);
    }

    #[test]
    fn an_announce_with_a_zero_ip_field_has_no_explicit_address() {
        let mut request = sample_announce();
        request.ip_address = None;

        let parsed = Request::from_bytes(&announce_bytes(&request)).unwrap();

        assert_eq!(parsed, Request::Announce(request));
    }

    #[test]
    fn a_truncated_announce_fails_with_the_transaction_id() {
        let bytes = announce_bytes(&sample_announce());

        let err = Request::from_bytes(&bytes[..50]).unwrap_err();

        assert_eq!(err.transaction_id, Some(TransactionId(77)));
        assert!(err.error.is_some());
    }

    #[test]
    fn a_packet_shorter_than_the_header_fails_without_a_transaction_id() {
        let err = Request::from_bytes(&[0u8; 10]).unwrap_err();

        assert_eq!(err.transaction_id, None);
    }

    #[test]
    fn an_out_of_range_event_code_is_rejected() {
        let mut bytes = announce_bytes(&sample_announce());
        // The event field starts after 16 header + 40 hash/peer + 24 counters.
        bytes[80..84].copy_from_slice(&9u32.to_be_bytes());

        let err = Request::from_bytes(&bytes).unwrap_err();

        assert_eq!(err.transaction_id, Some(TransactionId(77)));
        assert_eq!(err.message.as_deref(), Some("Invalid announce event"));
    }

    fn scrape_bytes(connection_id: u64, transaction_id: i32, hashes: &[InfoHash]) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.write_u64::<NetworkEndian>(connection_id).unwrap();
        bytes.write_u32::<NetworkEndian>(2).unwrap();
        bytes.write_i32::<NetworkEndian>(transaction_id).unwrap();
        for hash in hashes {
            bytes.write_all(&hash.0).unwrap();
        }
        bytes
    }

    #[test]
    fn a_scrape_request_round_trips() {
        let hashes = vec![InfoHash([1; 20]), InfoHash([2; 20])];

        let parsed = Request::from_bytes(&scrape_bytes(7, 9, &hashes)).unwrap();

        assert_eq!(
            parsed,
            Request::Scrape(ScrapeRequest {
                connection_id: ConnectionId(7),
                transaction_id: TransactionId(9),
                info_hashes: hashes,
            })
        );
    }

    #[test]
    fn a_scrape_request_is_capped_at_70_info_hashes() {
        let hashes: Vec<InfoHash> = (0..75).map(|i| InfoHash([i as u8; 20])).collect();

        let parsed = Request::from_bytes(&scrape_bytes(7, 9, &hashes)).unwrap();

        match parsed {
            Request::Scrape(scrape) => assert_eq!(scrape.info_hashes.len(), 70),
            other => panic!("expected a scrape request, got {other:?}"),
        }
    }

    #[test]
    fn a_scrape_request_without_hashes_is_rejected() {
        let err = Request::from_bytes(&scrape_bytes(7, 9, &[])).unwrap_err();

        assert_eq!(err.transaction_id, Some(TransactionId(9)));
    }

    #[test]
    fn an_unknown_action_is_rejected() {
        let mut bytes = Vec::new();
        bytes.write_u64::<NetworkEndian>(0).unwrap();
        bytes.write_u32::<NetworkEndian>(9).unwrap();
        bytes.write_i32::<NetworkEndian>(3).unwrap();

        let err = Request::from_bytes(&bytes).unwrap_err();

        assert_eq!(err.transaction_id, Some(TransactionId(3)));
        assert_eq!(err.message.as_deref(), Some("Invalid action"));
    }
}
