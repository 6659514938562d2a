//! Short-lived connection ids for the connect → announce/scrape handshake.
//!
//! An id is only usable from the address it was issued to and within the
//! validity window. The table is shared by every datagram task; the lock is
//! held for O(1) work only.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use rand::{thread_rng, Rng};

use super::error::ServerError;
use super::request::ConnectionId;

/// How long an issued connection id stays valid.
pub const CONNECTION_ID_LIFETIME: Duration = Duration::from_secs(120);

#[derive(Debug)]
pub struct ConnectionTable {
    entries: Mutex<HashMap<ConnectionId, (SocketAddr, Instant)>>,
    lifetime: Duration,
}

impl Default for ConnectionTable {
    fn default() -> Self {
        Self::with_lifetime(CONNECTION_ID_LIFETIME)
    }
}

impl ConnectionTable {
    #[must_use]
    pub fn with_lifetime(lifetime: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            lifetime,
        }
    }

    /// Issues a fresh id for the remote address. Ids must be unpredictable,
    /// or an off-path attacker could spoof announces for arbitrary peers.
    pub fn issue(&self, remote_addr: SocketAddr) -> ConnectionId {
        let connection_id = ConnectionId(thread_rng().gen());
        let now = Instant::now();

        let mut entries = self.entries.lock().expect("connection table lock poisoned");
        entries.retain(|_, (_, issued_at)| now.duration_since(*issued_at) <= self.lifetime);
        entries.insert(connection_id, (remote_addr, now));

        connection_id
    }

    /// Checks that the id was issued, to this address, within the window.
    ///
    /// # Errors
    ///
    /// Will return `ServerError::InvalidConnectionId` otherwise.
    pub fn verify(&self, connection_id: ConnectionId, remote_addr: &SocketAddr) -> Result<(), ServerError> {
        let entries = self.entries.lock().expect("connection table lock poisoned");

        match entries.get(&connection_id) {
            Some((issued_to, issued_at))
                if issued_to == remote_addr && issued_at.elapsed() <= self.lifetime =>
            {
                Ok(())
            }
            _ => Err(ServerError::InvalidConnectionId),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::time::Duration;

    use super::ConnectionTable;
    use crate::udp::error::ServerError;
    use crate::udp::request::ConnectionId;

    fn remote_addr() -> SocketAddr {
        "126.0.0.1:6881".parse().unwrap()
    }

    #[test]
    fn an_issued_id_verifies_from_the_same_address() {
        let table = ConnectionTable::default();

        let connection_id = table.issue(remote_addr());

        assert!(table.verify(connection_id, &remote_addr()).is_ok());
    }

    #[test]
    fn an_id_that_was_never_issued_is_rejected() {
        let table = ConnectionTable::default();

        assert_eq!(
            table.verify(ConnectionId(42), &remote_addr()),
            Err(ServerError::InvalidConnectionId)
        );
    }

    #[test]
    fn an_id_is_rejected_from_a_different_address() {
        let table = ConnectionTable::default();

        let connection_id = table.issue(remote_addr());
        let other_addr: SocketAddr = "126.0.0.2:6881".parse().unwrap();

        assert_eq!(
            table.verify(connection_id, &other_addr),
            Err(ServerError::InvalidConnectionId)
        );
    }

    #[test]
    fn an_expired_id_is_rejected() {
        let table = ConnectionTable::with_lifetime(Duration::from_millis(5));

        let connection_id = table.issue(remote_addr());
        std::thread::sleep(Duration::from_millis(10));

        assert_eq!(
            table.verify(connection_id, &remote_addr()),
            Err(ServerError::InvalidConnectionId)
        );
    }

    #[test]
    fn expired_entries_are_evicted_when_new_ids_are_issued() {
        let table = ConnectionTable::with_lifetime(Duration::from_millis(5));

        let stale = table.issue(remote_addr());
        std::thread::sleep(Duration::from_millis(10));
        let fresh = table.issue(remote_addr());

        assert!(table.verify(fresh, &remote_addr()).is_ok());
        assert_eq!(table.verify(stale, &remote_addr()), Err(ServerError::InvalidConnectionId));
    }

    #[test]
    fn issued_ids_differ() {
        let table = ConnectionTable::default();

        assert_ne!(table.issue(remote_addr()), table.issue(remote_addr()));
    }
}
