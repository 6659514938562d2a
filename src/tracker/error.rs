use thiserror::Error;

use crate::databases;

/// Engine errors. The `Display` form is the wire-level failure reason sent
/// back to clients, both in bencoded error documents and UDP error packets.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Unregistered torrent")]
    UnregisteredTorrent,

    #[error("Unverified torrent")]
    UnverifiedTorrent,

    #[error("internal error")]
    Database {
        #[from]
        source: databases::error::Error,
    },
}
