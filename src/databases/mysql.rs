use std::net::IpAddr;
use std::str::FromStr;

use async_trait::async_trait;
use r2d2::Pool;
use r2d2_mysql::mysql::prelude::Queryable;
use r2d2_mysql::mysql::{params, Opts, OptsBuilder};
use r2d2_mysql::MySqlConnectionManager;

use crate::databases::error::Error;
use crate::databases::Database;
use crate::protocol::clock::current_time;
use crate::protocol::info_hash::InfoHash;
use crate::tracker::auth::Passkey;
use crate::tracker::peer::Peer;
use crate::tracker::request::{Announce, Protocol};
use crate::tracker::swarm::{File, FileId, FileUser, User, UserId};

pub struct Mysql {
    pool: Pool<MySqlConnectionManager>,
}

impl Mysql {
    /// # Errors
    ///
    /// Will return an `r2d2::Error` if the connection pool cannot be built.
    ///
    /// # Panics
    ///
    /// Will panic if `db_path` is not a valid MySQL connection URL. That is
    /// fatal at startup.
    pub fn new(db_path: &str) -> Result<Mysql, r2d2::Error> {
        let opts = Opts::from_url(db_path).expect("invalid MySQL connection URL");
        let builder = OptsBuilder::from_opts(opts);
        let manager = MySqlConnectionManager::new(builder);
        let pool = Pool::builder().build(manager)?;

        Ok(Mysql { pool })
    }
}

type UserRow = (UserId, String, String, i64, i64, i64);
type FileRow = (FileId, String, u8, u64);
type FileUserRow = (FileId, UserId, String, u8, u8, i64, i64, i64, i64, u64);

// Stored hex hashes, passkeys and IP strings were written by us; parsing
// them back cannot fail unless the database was edited by hand.
fn user_from_row((id, username, passkey, torrent_limit, uploaded, downloaded): UserRow) -> User {
    User {
        id,
        username,
        passkey: Passkey::from_str(&passkey).expect("stored passkey is invalid"),
        torrent_limit,
        uploaded,
        downloaded,
    }
}

fn file_from_row((id, info_hash, verified, created_at): FileRow) -> File {
    File {
        id,
        info_hash: InfoHash::from_str(&info_hash).expect("stored info-hash is invalid"),
        verified: verified != 0,
        created_at,
    }
}

#[async_trait]
impl Database for Mysql {
    fn create_database_tables(&self) -> Result<(), Error> {
        let create_users_table = "
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTO_INCREMENT,
            username VARCHAR(255) NOT NULL UNIQUE,
            passkey CHAR(40) NOT NULL UNIQUE,
            torrent_limit BIGINT DEFAULT 0 NOT NULL,
            uploaded BIGINT DEFAULT 0 NOT NULL,
            downloaded BIGINT DEFAULT 0 NOT NULL
        );";

        let create_files_table = "
        CREATE TABLE IF NOT EXISTS files (
            id INTEGER PRIMARY KEY AUTO_INCREMENT,
            info_hash CHAR(40) NOT NULL UNIQUE,
            verified TINYINT(1) DEFAULT 0 NOT NULL,
            created_at BIGINT UNSIGNED NOT NULL
        );";

        let create_files_users_table = "
        CREATE TABLE IF NOT EXISTS files_users (
            id INTEGER PRIMARY KEY AUTO_INCREMENT,
            file_id INTEGER NOT NULL,
            user_id INTEGER NOT NULL,
            ip VARCHAR(45) NOT NULL,
            active TINYINT(1) NOT NULL,
            completed TINYINT(1) NOT NULL,
            announced BIGINT NOT NULL,
            uploaded BIGINT NOT NULL,
            downloaded BIGINT NOT NULL,
            `left` BIGINT NOT NULL,
            last_announce BIGINT UNSIGNED NOT NULL,
            UNIQUE KEY file_user_ip (file_id, user_id, ip)
        );";

        let create_announce_log_table = "
        CREATE TABLE IF NOT EXISTS announce_log (
            id INTEGER PRIMARY KEY AUTO_INCREMENT,
            info_hash CHAR(40) NOT NULL,
            peer_id VARCHAR(40) NOT NULL,
            ip VARCHAR(45) NOT NULL,
            port INTEGER NOT NULL,
            udp TINYINT(1) NOT NULL,
            uploaded BIGINT NOT NULL,
            downloaded BIGINT NOT NULL,
            `left` BIGINT NOT NULL,
            event VARCHAR(10) NOT NULL,
            `key` VARCHAR(40),
            time BIGINT UNSIGNED NOT NULL
        );";

        let create_scrape_log_table = "
        CREATE TABLE IF NOT EXISTS scrape_log (
            id INTEGER PRIMARY KEY AUTO_INCREMENT,
            info_hash CHAR(40) NOT NULL,
            ip VARCHAR(45) NOT NULL,
            udp TINYINT(1) NOT NULL,
            time BIGINT UNSIGNED NOT NULL
        );";

        let mut conn = self.pool.get()?;

        conn.query_drop(create_users_table)?;
        conn.query_drop(create_files_table)?;
        conn.query_drop(create_files_users_table)?;
        conn.query_drop(create_announce_log_table)?;
        conn.query_drop(create_scrape_log_table)?;

        Ok(())
    }

    fn drop_database_tables(&self) -> Result<(), Error> {
        let mut conn = self.pool.get()?;

        for table in ["users", "files", "files_users", "announce_log", "scrape_log"] {
            conn.query_drop(format!("DROP TABLE IF EXISTS {table}"))?;
        }

        Ok(())
    }

    async fn load_user_by_passkey(&self, passkey: &Passkey) -> Result<Option<User>, Error> {
        let mut conn = self.pool.get()?;

        let passkey = passkey.as_str().to_string();

        let row: Option<UserRow> = conn.exec_first(
            "SELECT id, username, passkey, torrent_limit, uploaded, downloaded FROM users WHERE passkey = :passkey",
            params! { passkey },
        )?;

        Ok(row.map(user_from_row))
    }

    async fn load_user(&self, user_id: UserId) -> Result<Option<User>, Error> {
        let mut conn = self.pool.get()?;

        let row: Option<UserRow> = conn.exec_first(
            "SELECT id, username, passkey, torrent_limit, uploaded, downloaded FROM users WHERE id = :user_id",
            params! { user_id },
        )?;

        Ok(row.map(user_from_row))
    }

    async fn load_users(&self) -> Result<Vec<User>, Error> {
        let mut conn = self.pool.get()?;

        let users = conn.query_map(
            "SELECT id, username, passkey, torrent_limit, uploaded, downloaded FROM users",
            user_from_row,
        )?;

        Ok(users)
    }

    async fn save_user(&self, user: &User) -> Result<(), Error> {
        let mut conn = self.pool.get()?;

        let username = user.username.clone();
        let passkey = user.passkey.as_str().to_string();
        let torrent_limit = user.torrent_limit;
        let uploaded = user.uploaded;
        let downloaded = user.downloaded;

        conn.exec_drop(
            "INSERT INTO users (username, passkey, torrent_limit, uploaded, downloaded)
             VALUES (:username, :passkey, :torrent_limit, :uploaded, :downloaded)",
            params! { username, passkey, torrent_limit, uploaded, downloaded },
        )?;

        Ok(())
    }

    async fn load_file(&self, info_hash: &InfoHash) -> Result<Option<File>, Error> {
        let mut conn = self.pool.get()?;

        let info_hash = info_hash.to_string();

        let row: Option<FileRow> = conn.exec_first(
            "SELECT id, info_hash, verified, created_at FROM files WHERE info_hash = :info_hash",
            params! { info_hash },
        )?;

        Ok(row.map(file_from_row))
    }

    async fn load_file_by_id(&self, file_id: FileId) -> Result<Option<File>, Error> {
        let mut conn = self.pool.get()?;

        let row: Option<FileRow> = conn.exec_first(
            "SELECT id, info_hash, verified, created_at FROM files WHERE id = :file_id",
            params! { file_id },
        )?;

        Ok(row.map(file_from_row))
    }

    async fn load_files(&self) -> Result<Vec<File>, Error> {
        let mut conn = self.pool.get()?;

        let files = conn.query_map("SELECT id, info_hash, verified, created_at FROM files", file_from_row)?;

        Ok(files)
    }

    async fn save_file(&self, file: &File) -> Result<(), Error> {
        let mut conn = self.pool.get()?;

        let info_hash = file.info_hash.to_string();
        let verified = file.verified;
        let created_at = file.created_at;

        conn.exec_drop(
            "INSERT IGNORE INTO files (info_hash, verified, created_at) VALUES (:info_hash, :verified, :created_at)",
            params! { info_hash, verified, created_at },
        )?;

        Ok(())
    }

    async fn load_file_user(&self, file_id: FileId, user_id: UserId, ip: &IpAddr) -> Result<Option<FileUser>, Error> {
        let mut conn = self.pool.get()?;

        let ip = ip.to_string();

        let row: Option<FileUserRow> = conn.exec_first(
            "SELECT file_id, user_id, ip, active, completed, announced, uploaded, downloaded, `left`, last_announce
             FROM files_users WHERE file_id = :file_id AND user_id = :user_id AND ip = :ip",
            params! { file_id, user_id, ip },
        )?;

        Ok(row.map(
            |(file_id, user_id, ip, active, completed, announced, uploaded, downloaded, left, last_announce)| FileUser {
                file_id,
                user_id,
                ip: ip.parse().expect("stored ip is invalid"),
                active: active != 0,
                completed: completed != 0,
                announced,
                uploaded,
                downloaded,
                left,
                last_announce,
            },
        ))
    }

    async fn save_file_user(&self, record: &FileUser) -> Result<(), Error> {
        let mut conn = self.pool.get()?;

        let file_id = record.file_id;
        let user_id = record.user_id;
        let ip = record.ip.to_string();
        let active = record.active;
        let completed = record.completed;
        let announced = record.announced;
        let uploaded = record.uploaded;
        let downloaded = record.downloaded;
        let left = record.left;
        let last_announce = record.last_announce;

        conn.exec_drop(
            "INSERT INTO files_users (file_id, user_id, ip, active, completed, announced, uploaded, downloaded, `left`, last_announce)
             VALUES (:file_id, :user_id, :ip, :active, :completed, :announced, :uploaded, :downloaded, :left, :last_announce)
             ON DUPLICATE KEY UPDATE
                 active = VALUES(active),
                 completed = VALUES(completed),
                 announced = VALUES(announced),
                 uploaded = VALUES(uploaded),
                 downloaded = VALUES(downloaded),
                 `left` = VALUES(`left`),
                 last_announce = VALUES(last_announce)",
            params! { file_id, user_id, ip, active, completed, announced, uploaded, downloaded, left, last_announce },
        )?;

        Ok(())
    }

    async fn peer_list(
        &self,
        file_id: FileId,
        exclude_ip: &IpAddr,
        numwant: u32,
        window: u64,
    ) -> Result<Vec<Peer>, Error> {
        let mut conn = self.pool.get()?;

        let exclude_ip = exclude_ip.to_string();
        let cutoff = current_time().saturating_sub(window);
        let numwant = u64::from(numwant);

        let rows: Vec<(String, u16)> = conn.exec(
            "SELECT DISTINCT announce_log.ip, announce_log.port FROM announce_log
             INNER JOIN files ON files.info_hash = announce_log.info_hash
             WHERE files.id = :file_id AND announce_log.ip != :exclude_ip AND announce_log.time >= :cutoff
             LIMIT :numwant",
            params! { file_id, exclude_ip, cutoff, numwant },
        )?;

        let peers = rows
            .into_iter()
            .filter_map(|(ip, port)| ip.parse::<IpAddr>().ok().map(|ip| Peer::new(ip, port)))
            .collect();

        Ok(peers)
    }

    async fn seeders(&self, file_id: FileId) -> Result<u32, Error> {
        let mut conn = self.pool.get()?;

        let count: Option<i64> = conn.exec_first(
            "SELECT COUNT(*) FROM files_users WHERE file_id = :file_id AND active = 1 AND `left` = 0",
            params! { file_id },
        )?;

        Ok(u32::try_from(count.unwrap_or(0)).unwrap_or(u32::MAX))
    }

    async fn leechers(&self, file_id: FileId) -> Result<u32, Error> {
        let mut conn = self.pool.get()?;

        let count: Option<i64> = conn.exec_first(
            "SELECT COUNT(*) FROM files_users WHERE file_id = :file_id AND active = 1 AND `left` > 0",
            params! { file_id },
        )?;

        Ok(u32::try_from(count.unwrap_or(0)).unwrap_or(u32::MAX))
    }

    async fn completed(&self, file_id: FileId) -> Result<u32, Error> {
        let mut conn = self.pool.get()?;

        let count: Option<i64> = conn.exec_first(
            "SELECT COUNT(*) FROM files_users WHERE file_id = :file_id AND completed = 1",
            params! { file_id },
        )?;

        Ok(u32::try_from(count.unwrap_or(0)).unwrap_or(u32::MAX))
    }

    async fn reap_peers(&self, file_id: FileId, threshold: u64) -> Result<usize, Error> {
        let mut conn = self.pool.get()?;

        let cutoff = current_time().saturating_sub(threshold);

        conn.exec_drop(
            "UPDATE files_users SET active = 0 WHERE file_id = :file_id AND active = 1 AND last_announce < :cutoff",
            params! { file_id, cutoff },
        )?;

        Ok(usize::try_from(conn.affected_rows()).unwrap_or(0))
    }

    async fn save_announce_log(&self, announce: &Announce) -> Result<(), Error> {
        let mut conn = self.pool.get()?;

        let info_hash = announce.info_hash.to_string();
        let peer_id = announce.peer_id.to_string();
        let ip = announce.ip.to_string();
        let port = announce.port;
        let udp = announce.protocol == Protocol::Udp;
        let uploaded = announce.uploaded;
        let downloaded = announce.downloaded;
        let left = announce.left;
        let event = announce.event.to_string();
        let key = announce.key.clone();
        let time = current_time();

        conn.exec_drop(
            "INSERT INTO announce_log (info_hash, peer_id, ip, port, udp, uploaded, downloaded, `left`, event, `key`, time)
             VALUES (:info_hash, :peer_id, :ip, :port, :udp, :uploaded, :downloaded, :left, :event, :key, :time)",
            params! { info_hash, peer_id, ip, port, udp, uploaded, downloaded, left, event, key, time },
        )?;

        Ok(())
    }

    async fn save_scrape_log(&self, info_hash: &InfoHash, ip: &IpAddr, protocol: Protocol) -> Result<(), Error> {
        let mut conn = self.pool.get()?;

        let info_hash = info_hash.to_string();
        let ip = ip.to_string();
        let udp = protocol == Protocol::Udp;
        let time = current_time();

        conn.exec_drop(
            "INSERT INTO scrape_log (info_hash, ip, udp, time) VALUES (:info_hash, :ip, :udp, :time)",
            params! { info_hash, ip, udp, time },
        )?;

        Ok(())
    }
}
