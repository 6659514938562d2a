use std::net::IpAddr;

use serde::Serialize;
use thiserror::Error;

/// The 20-byte identifier a client chooses for itself.
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug, PartialOrd, Ord)]
pub struct Id(pub [u8; 20]);

#[derive(Error, Debug)]
pub enum IdConversionError {
    #[error("not enough bytes for a peer id: {0}, expected 20")]
    NotEnoughBytes(usize),
    #[error("too many bytes for a peer id: {0}, expected 20")]
    TooManyBytes(usize),
}

impl TryFrom<&[u8]> for Id {
    type Error = IdConversionError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        if bytes.len() < 20 {
            return Err(IdConversionError::NotEnoughBytes(bytes.len()));
        }
        if bytes.len() > 20 {
            return Err(IdConversionError::TooManyBytes(bytes.len()));
        }
        let mut id = Id([0u8; 20]);
        id.0.clone_from_slice(bytes);
        Ok(id)
    }
}

impl TryFrom<Vec<u8>> for Id {
    type Error = IdConversionError;

    fn try_from(bytes: Vec<u8>) -> Result<Self, Self::Error> {
        Id::try_from(bytes.as_slice())
    }
}

impl std::fmt::Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

impl serde::ser::Serialize for Id {
    fn serialize<S: serde::ser::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// A peer as handed back to announcing clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Peer {
    pub ip: IpAddr,
    pub port: u16,
}

impl Peer {
    #[must_use]
    pub fn new(ip: IpAddr, port: u16) -> Self {
        Self { ip, port }
    }
}

/// Packs peers into the compact form: 4 bytes IPv4 + 2 bytes port, big
/// endian, concatenated. IPv6 peers have no compact slot and are skipped.
#[must_use]
pub fn compact(peers: &[Peer]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(peers.len() * 6);
    for peer in peers {
        if let IpAddr::V4(ip) = peer.ip {
            bytes.extend_from_slice(&ip.octets());
            bytes.extend_from_slice(&peer.port.to_be_bytes());
        }
    }
    bytes
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

    use super::{compact, Id, Peer};

    #[test]
    fn peer_id_can_be_created_from_a_20_byte_slice() {
        let id = Id::try_from(&b"-qB00000000000000000"[..]).unwrap();
        assert_eq!(id, Id(*b"-qB00000000000000000"));
    }

    #[test]
    fn peer_id_rejects_slices_of_the_wrong_length() {
        assert!(Id::try_from(&b"-qB0"[..]).is_err());
        assert!(Id::try_from(&b"-qB000000000000000000"[..]).is_err());
    }

    #[test]
    fn compact_form_packs_ipv4_address_and_port_big_endian() {
        let peers = vec![Peer::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)), 6881)];
        assert_eq!(compact(&peers), vec![10, 0, 0, 1, 0x1a, 0xe1]);
    }

    #[test]
    fn compact_form_skips_ipv6_peers() {
        let peers = vec![
            Peer::new(IpAddr::V6(Ipv6Addr::LOCALHOST), 6881),
            Peer::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2)), 51413),
        ];
        assert_eq!(compact(&peers), vec![10, 0, 0, 2, 0xc8, 0xd5]);
    }
}
