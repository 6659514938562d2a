use std::net::IpAddr;
use std::str::FromStr;

use async_trait::async_trait;
use r2d2::Pool;
use r2d2_sqlite::rusqlite::{params, OptionalExtension, Row};
use r2d2_sqlite::SqliteConnectionManager;

use crate::databases::error::Error;
use crate::databases::Database;
use crate::protocol::clock::current_time;
use crate::protocol::info_hash::InfoHash;
use crate::tracker::auth::Passkey;
use crate::tracker::peer::Peer;
use crate::tracker::request::{Announce, Protocol};
use crate::tracker::swarm::{File, FileId, FileUser, User, UserId};

pub struct Sqlite {
    pool: Pool<SqliteConnectionManager>,
}

impl Sqlite {
    /// # Errors
    ///
    /// Will return an `r2d2::Error` if the connection pool cannot be built.
    pub fn new(db_path: &str) -> Result<Sqlite, r2d2::Error> {
        let manager = SqliteConnectionManager::file(db_path);
        let pool = Pool::new(manager)?;
        Ok(Sqlite { pool })
    }
}

// Stored hex hashes, passkeys and IP strings were written by us; parsing
// them back cannot fail unless the database was edited by hand.
fn user_from_row(row: &Row) -> r2d2_sqlite::rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        passkey: Passkey::from_str(&row.get::<_, String>(2)?).expect("stored passkey is invalid"),
        torrent_limit: row.get(3)?,
        uploaded: row.get(4)?,
        downloaded: row.get(5)?,
    })
}

fn file_from_row(row: &Row) -> r2d2_sqlite::rusqlite::Result<File> {
    Ok(File {
        id: row.get(0)?,
        info_hash: InfoHash::from_str(&row.get::<_, String>(1)?).expect("stored info-hash is invalid"),
        verified: row.get(2)?,
        created_at: row.get::<_, i64>(3)? as u64,
    })
}

#[async_trait]
impl Database for Sqlite {
    fn create_database_tables(&self) -> Result<(), Error> {
        let create_users_table = "
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE,
            passkey TEXT NOT NULL UNIQUE,
            torrent_limit INTEGER DEFAULT 0 NOT NULL,
            uploaded INTEGER DEFAULT 0 NOT NULL,
            downloaded INTEGER DEFAULT 0 NOT NULL
        );";

        let create_files_table = "
        CREATE TABLE IF NOT EXISTS files (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            info_hash TEXT NOT NULL UNIQUE,
            verified INTEGER DEFAULT 0 NOT NULL,
            created_at INTEGER NOT NULL
        );";

        let create_files_users_table = "
        CREATE TABLE IF NOT EXISTS files_users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            file_id INTEGER NOT NULL,
            user_id INTEGER NOT NULL,
            ip TEXT NOT NULL,
            active INTEGER NOT NULL,
            completed INTEGER NOT NULL,
            announced INTEGER NOT NULL,
            uploaded INTEGER NOT NULL,
            downloaded INTEGER NOT NULL,
            `left` INTEGER NOT NULL,
            last_announce INTEGER NOT NULL,
            UNIQUE (file_id, user_id, ip)
        );";

        let create_announce_log_table = "
        CREATE TABLE IF NOT EXISTS announce_log (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            info_hash TEXT NOT NULL,
            peer_id TEXT NOT NULL,
            ip TEXT NOT NULL,
            port INTEGER NOT NULL,
            udp INTEGER NOT NULL,
            uploaded INTEGER NOT NULL,
            downloaded INTEGER NOT NULL,
            `left` INTEGER NOT NULL,
            event TEXT NOT NULL,
            `key` TEXT,
            time INTEGER NOT NULL
        );";

        let create_scrape_log_table = "
        CREATE TABLE IF NOT EXISTS scrape_log (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            info_hash TEXT NOT NULL,
            ip TEXT NOT NULL,
            udp INTEGER NOT NULL,
            time INTEGER NOT NULL
        );";

        let conn = self.pool.get()?;

        conn.execute(create_users_table, [])?;
        conn.execute(create_files_table, [])?;
        conn.execute(create_files_users_table, [])?;
        conn.execute(create_announce_log_table, [])?;
        conn.execute(create_scrape_log_table, [])?;

        Ok(())
    }

    fn drop_database_tables(&self) -> Result<(), Error> {
        let conn = self.pool.get()?;

        for table in ["users", "files", "files_users", "announce_log", "scrape_log"] {
            conn.execute(&format!("DROP TABLE IF EXISTS {table}"), [])?;
        }

        Ok(())
    }

    async fn load_user_by_passkey(&self, passkey: &Passkey) -> Result<Option<User>, Error> {
        let conn = self.pool.get()?;

        let user = conn
            .query_row(
                "SELECT id, username, passkey, torrent_limit, uploaded, downloaded FROM users WHERE passkey = ?1",
                [passkey.as_str()],
                user_from_row,
            )
            .optional()?;

        Ok(user)
    }

    async fn load_user(&self, user_id: UserId) -> Result<Option<User>, Error> {
        let conn = self.pool.get()?;

        let user = conn
            .query_row(
                "SELECT id, username, passkey, torrent_limit, uploaded, downloaded FROM users WHERE id = ?1",
                [user_id],
                user_from_row,
            )
            .optional()?;

        Ok(user)
    }

    async fn load_users(&self) -> Result<Vec<User>, Error> {
        let conn = self.pool.get()?;

        let mut stmt = conn.prepare("SELECT id, username, passkey, torrent_limit, uploaded, downloaded FROM users")?;
        let users = stmt.query_map([], user_from_row)?.filter_map(Result::ok).collect();

        Ok(users)
    }

    async fn save_user(&self, user: &User) -> Result<(), Error> {
        let conn = self.pool.get()?;

        conn.execute(
            "INSERT INTO users (username, passkey, torrent_limit, uploaded, downloaded) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                user.username,
                user.passkey.as_str(),
                user.torrent_limit,
                user.uploaded,
                user.downloaded
            ],
        )?;

        Ok(())
    }

    async fn load_file(&self, info_hash: &InfoHash) -> Result<Option<File>, Error> {
        let conn = self.pool.get()?;

        let file = conn
            .query_row(
                "SELECT id, info_hash, verified, created_at FROM files WHERE info_hash = ?1",
                [info_hash.to_string()],
                file_from_row,
            )
            .optional()?;

        Ok(file)
    }

    async fn load_file_by_id(&self, file_id: FileId) -> Result<Option<File>, Error> {
        let conn = self.pool.get()?;

        let file = conn
            .query_row(
                "SELECT id, info_hash, verified, created_at FROM files WHERE id = ?1",
                [file_id],
                file_from_row,
            )
            .optional()?;

        Ok(file)
    }

    async fn load_files(&self) -> Result<Vec<File>, Error> {
        let conn = self.pool.get()?;

        let mut stmt = conn.prepare("SELECT id, info_hash, verified, created_at FROM files")?;
        let files = stmt.query_map([], file_from_row)?.filter_map(Result::ok).collect();

        Ok(files)
    }

    async fn save_file(&self, file: &File) -> Result<(), Error> {
        let conn = self.pool.get()?;

        conn.execute(
            "INSERT OR IGNORE INTO files (info_hash, verified, created_at) VALUES (?1, ?2, ?3)",
            params![file.info_hash.to_string(), file.verified, file.created_at as i64],
        )?;

        Ok(())
    }

    async fn load_file_user(&self, file_id: FileId, user_id: UserId, ip: &IpAddr) -> Result<Option<FileUser>, Error> {
        let conn = self.pool.get()?;

        let record = conn
            .query_row(
                "SELECT file_id, user_id, ip, active, completed, announced, uploaded, downloaded, `left`, last_announce
                 FROM files_users WHERE file_id = ?1 AND user_id = ?2 AND ip = ?3",
                params![file_id, user_id, ip.to_string()],
                |row| {
                    Ok(FileUser {
                        file_id: row.get(0)?,
                        user_id: row.get(1)?,
                        ip: row.get::<_, String>(2)?.parse().expect("stored ip is invalid"),
                        active: row.get(3)?,
                        completed: row.get(4)?,
                        announced: row.get(5)?,
                        uploaded: row.get(6)?,
                        downloaded: row.get(7)?,
                        left: row.get(8)?,
                        last_announce: row.get::<_, i64>(9)? as u64,
                    })
                },
            )
            .optional()?;

        Ok(record)
    }

    async fn save_file_user(&self, record: &FileUser) -> Result<(), Error> {
        let conn = self.pool.get()?;

        conn.execute(
            "INSERT INTO files_users (file_id, user_id, ip, active, completed, announced, uploaded, downloaded, `left`, last_announce)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT (file_id, user_id, ip) DO UPDATE SET
                 active = excluded.active,
                 completed = excluded.completed,
                 announced = excluded.announced,
                 uploaded = excluded.uploaded,
                 downloaded = excluded.downloaded,
                 `left` = excluded.`left`,
                 last_announce = excluded.last_announce",
            params![
                record.file_id,
                record.user_id,
                record.ip.to_string(),
                record.active,
                record.completed,
                record.announced,
                record.uploaded,
                record.downloaded,
                record.left,
                record.last_announce as i64
            ],
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
        let conn = self.pool.get()?;

        let cutoff = current_time().saturating_sub(window) as i64;

        let mut stmt = conn.prepare(
            "SELECT DISTINCT announce_log.ip, announce_log.port FROM announce_log
             INNER JOIN files ON files.info_hash = announce_log.info_hash
             WHERE files.id = ?1 AND announce_log.ip != ?2 AND announce_log.time >= ?3
             LIMIT ?4",
        )?;

        let peers = stmt
            .query_map(
                params![file_id, exclude_ip.to_string(), cutoff, i64::from(numwant)],
                |row| {
                    let ip: String = row.get(0)?;
                    let port: u16 = row.get(1)?;
                    Ok((ip, port))
                },
            )?
            .filter_map(Result::ok)
            .filter_map(|(ip, port)| ip.parse::<IpAddr>().ok().map(|ip| Peer::new(ip, port)))
            .collect();

        Ok(peers)
    }

    async fn seeders(&self, file_id: FileId) -> Result<u32, Error> {
        let conn = self.pool.get()?;

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM files_users WHERE file_id = ?1 AND active = 1 AND `left` = 0",
            [file_id],
            |row| row.get(0),
        )?;

        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    async fn leechers(&self, file_id: FileId) -> Result<u32, Error> {
        let conn = self.pool.get()?;

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM files_users WHERE file_id = ?1 AND active = 1 AND `left` > 0",
            [file_id],
            |row| row.get(0),
        )?;

        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    async fn completed(&self, file_id: FileId) -> Result<u32, Error> {
        let conn = self.pool.get()?;

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM files_users WHERE file_id = ?1 AND completed = 1",
            [file_id],
            |row| row.get(0),
        )?;

        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    async fn reap_peers(&self, file_id: FileId, threshold: u64) -> Result<usize, Error> {
        let conn = self.pool.get()?;

        let cutoff = current_time().saturating_sub(threshold) as i64;

        let reaped = conn.execute(
            "UPDATE files_users SET active = 0 WHERE file_id = ?1 AND active = 1 AND last_announce < ?2",
            params![file_id, cutoff],
        )?;

        Ok(reaped)
    }

    async fn save_announce_log(&self, announce: &Announce) -> Result<(), Error> {
        let conn = self.pool.get()?;

        conn.execute(
            "INSERT INTO announce_log (info_hash, peer_id, ip, port, udp, uploaded, downloaded, `left`, event, `key`, time)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                announce.info_hash.to_string(),
                announce.peer_id.to_string(),
                announce.ip.to_string(),
                announce.port,
                announce.protocol == Protocol::Udp,
                announce.uploaded,
                announce.downloaded,
                announce.left,
                announce.event.to_string(),
                announce.key,
                current_time() as i64
            ],
        )?;

        Ok(())
    }

    async fn save_scrape_log(&self, info_hash: &InfoHash, ip: &IpAddr, protocol: Protocol) -> Result<(), Error> {
        let conn = self.pool.get()?;

        conn.execute(
            "INSERT INTO scrape_log (info_hash, ip, udp, time) VALUES (?1, ?2, ?3, ?4)",
            params![
                info_hash.to_string(),
                ip.to_string(),
                protocol == Protocol::Udp,
                current_time() as i64
            ],
        )?;

        Ok(())
    }
}
