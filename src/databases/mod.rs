//! The swarm store facade. The engines only ever see this trait; the
//! relational backends live behind it.

pub mod driver;
pub mod error;
pub mod mysql;
pub mod sqlite;

use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;

use self::driver::Driver;
use self::error::Error;
use self::mysql::Mysql;
use self::sqlite::Sqlite;
use crate::protocol::info_hash::InfoHash;
use crate::tracker::auth::Passkey;
use crate::tracker::peer::Peer;
use crate::tracker::request::{Announce, Protocol};
use crate::tracker::swarm::{File, FileId, FileUser, User, UserId};

/// Builds the configured driver.
///
/// # Errors
///
/// Will return an `Error` if the connection pool cannot be created. That is
/// fatal at startup.
pub fn connect(db_driver: &Driver, db_path: &str) -> Result<Arc<dyn Database>, Error> {
    let database: Arc<dyn Database> = match db_driver {
        Driver::Sqlite3 => Arc::new(Sqlite::new(db_path)?),
        Driver::MySQL => Arc::new(Mysql::new(db_path)?),
    };

    Ok(database)
}

#[async_trait]
pub trait Database: Send + Sync {
    /// # Errors
    ///
    /// Will return an `Error` if unable to create the tables.
    fn create_database_tables(&self) -> Result<(), Error>;

    /// # Errors
    ///
    /// Will return an `Error` if unable to drop the tables.
    fn drop_database_tables(&self) -> Result<(), Error>;

    async fn load_user_by_passkey(&self, passkey: &Passkey) -> Result<Option<User>, Error>;

    async fn load_user(&self, user_id: UserId) -> Result<Option<User>, Error>;

    async fn load_users(&self) -> Result<Vec<User>, Error>;

    async fn save_user(&self, user: &User) -> Result<(), Error>;

    async fn load_file(&self, info_hash: &InfoHash) -> Result<Option<File>, Error>;

    async fn load_file_by_id(&self, file_id: FileId) -> Result<Option<File>, Error>;

    async fn load_files(&self) -> Result<Vec<File>, Error>;

    /// Inserts the file row if no row with its info-hash exists yet. The
    /// unique constraint makes concurrent first-contact announces converge
    /// on a single row.
    async fn save_file(&self, file: &File) -> Result<(), Error>;

    async fn load_file_user(&self, file_id: FileId, user_id: UserId, ip: &IpAddr) -> Result<Option<FileUser>, Error>;

    /// Upserts the membership row keyed by `(file_id, user_id, ip)`.
    async fn save_file_user(&self, record: &FileUser) -> Result<(), Error>;

    /// Distinct `(ip, port)` pairs that announced the file within the last
    /// `window` seconds, excluding `exclude_ip`, capped at `numwant`.
    async fn peer_list(&self, file_id: FileId, exclude_ip: &IpAddr, numwant: u32, window: u64)
        -> Result<Vec<Peer>, Error>;

    /// Active peers with nothing left to download.
    async fn seeders(&self, file_id: FileId) -> Result<u32, Error>;

    /// Active peers still downloading.
    async fn leechers(&self, file_id: FileId) -> Result<u32, Error>;

    /// Peers that ever completed the file.
    async fn completed(&self, file_id: FileId) -> Result<u32, Error>;

    /// Marks active rows inactive when their last announce is older than
    /// `threshold` seconds. Returns how many rows were deactivated.
    async fn reap_peers(&self, file_id: FileId, threshold: u64) -> Result<usize, Error>;

    async fn save_announce_log(&self, announce: &Announce) -> Result<(), Error>;

    async fn save_scrape_log(&self, info_hash: &InfoHash, ip: &IpAddr, protocol: Protocol) -> Result<(), Error>;
}
