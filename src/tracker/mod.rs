pub mod auth;
pub mod error;
pub mod peer;
pub mod reaper;
pub mod request;
pub mod statistics;
pub mod swarm;

use std::sync::Arc;

use log::{info, warn};
use rand::{thread_rng, Rng};
use tokio::time::timeout;

use self::error::Error;
use self::peer::Peer;
use self::reaper::PeerReaper;
use self::request::{Announce, Protocol, Scrape};
use self::swarm::{File, FileUser, User};
use crate::config::Configuration;
use crate::databases::{self, Database};
use crate::protocol::common::MAINTENANCE_TIMEOUT;
use crate::protocol::info_hash::InfoHash;

/// The tracker core: verifies torrents, maintains swarm membership through
/// the store facade, and composes the data both wire formats are rendered
/// from. One instance is shared by every transport.
pub struct Tracker {
    pub config: Arc<Configuration>,
    pub database: Arc<dyn Database>,
    pub stats: statistics::Keeper,
    reaper: PeerReaper,
}

/// What an announce responds with, before wire encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnounceData {
    pub peers: Vec<Peer>,
    pub complete: u32,
    pub incomplete: u32,
    pub interval: u32,
    pub min_interval: u32,
}

/// Aggregate counts for one scraped file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrapeData {
    pub info_hash: InfoHash,
    pub complete: u32,
    pub downloaded: u32,
    pub incomplete: u32,
}

impl Tracker {
    /// Connects the swarm store and creates its tables.
    ///
    /// # Errors
    ///
    /// Will return a `databases::error::Error` if the store is unreachable.
    /// That is fatal at startup; the caller terminates the process.
    pub fn new(config: &Arc<Configuration>) -> Result<Tracker, databases::error::Error> {
        let database = databases::connect(&config.db_driver, &config.db_path)?;
        database.create_database_tables()?;

        Ok(Tracker {
            config: config.clone(),
            database,
            stats: statistics::Keeper::default(),
            reaper: PeerReaper::default(),
        })
    }

    /// Handles a normalized announce request.
    ///
    /// HTTP announces carry a resolved user and update the swarm membership
    /// row; UDP announces are anonymous and only read swarm state. In both
    /// cases the file must exist and be verified, and an unknown info-hash
    /// creates an unverified file row awaiting administrator approval.
    ///
    /// # Errors
    ///
    /// Will return an `Error` whose `Display` form is the failure reason to
    /// put on the wire.
    pub async fn announce(&self, announce: &Announce, user: Option<&User>) -> Result<AnnounceData, Error> {
        self.spawn_announce_log(announce);

        let Some(file) = self.database.load_file(&announce.info_hash).await? else {
            info!(
                "tracker: detected new file, awaiting manual approval [hash: {}]",
                announce.info_hash
            );
            self.spawn_file_creation(File::new_unverified(announce.info_hash));
            return Err(Error::UnregisteredTorrent);
        };

        if !file.verified {
            return Err(Error::UnverifiedTorrent);
        }

        self.reaper
            .schedule(self.database.clone(), file.id, self.reap_threshold());

        let completed = match (announce.protocol, user) {
            (Protocol::Http, Some(user)) => {
                let record = match self.database.load_file_user(file.id, user.id, &announce.ip).await? {
                    Some(mut record) => {
                        record.merge(announce);
                        record
                    }
                    None => FileUser::new(file.id, user.id, announce),
                };

                // Awaited so the caller's own record is visible in the
                // seeder/leecher counts of its own response.
                self.database.save_file_user(&record).await?;

                record.completed
            }
            // UDP announces are anonymous: no membership row is written and
            // the steady-state interval applies.
            _ => true,
        };

        let complete = self.database.seeders(file.id).await?;
        let incomplete = self.database.leechers(file.id).await?;

        let peers = match self
            .database
            .peer_list(file.id, &announce.ip, announce.numwant, self.peer_window())
            .await
        {
            Ok(peers) => peers,
            Err(e) => {
                warn!("tracker: peer list read failed [hash: {}]: {}", announce.info_hash, e);
                Vec::new()
            }
        };

        let (interval, min_interval) = self.announce_interval(completed);

        Ok(AnnounceData {
            peers,
            complete,
            incomplete,
            interval,
            min_interval,
        })
    }

    /// Handles a normalized scrape request, resolving each hash in order.
    ///
    /// Scraping never auto-creates files: an unknown info-hash is an error.
    ///
    /// # Errors
    ///
    /// Will return an `Error` on the first unregistered or unverified hash.
    pub async fn scrape(&self, scrape: &Scrape) -> Result<Vec<ScrapeData>, Error> {
        self.spawn_scrape_log(scrape);

        let mut files = Vec::with_capacity(scrape.info_hashes.len());

        for info_hash in &scrape.info_hashes {
            let file = self
                .database
                .load_file(info_hash)
                .await?
                .ok_or(Error::UnregisteredTorrent)?;

            if !file.verified {
                return Err(Error::UnverifiedTorrent);
            }

            self.reaper
                .schedule(self.database.clone(), file.id, self.reap_threshold());

            files.push(ScrapeData {
                info_hash: *info_hash,
                complete: self.database.seeders(file.id).await?,
                downloaded: self.database.completed(file.id).await?,
                incomplete: self.database.leechers(file.id).await?,
            });
        }

        Ok(files)
    }

    /// Interval policy: leeching clients are asked back quickly so they can
    /// gather peers and report progress; completed clients get the
    /// steady-state interval.
    #[must_use]
    pub fn announce_interval(&self, completed: bool) -> (u32, u32) {
        if completed {
            self.steady_interval()
        } else {
            (thread_rng().gen_range(300..=600), 300)
        }
    }

    /// The steady-state interval with jitter, also used on error documents.
    #[must_use]
    pub fn steady_interval(&self) -> (u32, u32) {
        let interval = self.config.announce_interval;
        (
            thread_rng().gen_range(interval.saturating_sub(600)..=interval),
            interval / 2,
        )
    }

    fn reap_threshold(&self) -> u64 {
        u64::from(self.config.announce_interval) * 2
    }

    fn peer_window(&self) -> u64 {
        u64::from(self.config.announce_interval) * 2
    }

    fn spawn_announce_log(&self, announce: &Announce) {
        let database = self.database.clone();
        let announce = announce.clone();

        tokio::spawn(async move {
            match timeout(MAINTENANCE_TIMEOUT, database.save_announce_log(&announce)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("tracker: announce log write failed: {}", e),
                Err(_) => warn!("tracker: announce log write timed out"),
            }
        });
    }

    fn spawn_scrape_log(&self, scrape: &Scrape) {
        let database = self.database.clone();
        let scrape = scrape.clone();

        tokio::spawn(async move {
            for info_hash in &scrape.info_hashes {
                match timeout(
                    MAINTENANCE_TIMEOUT,
                    database.save_scrape_log(info_hash, &scrape.ip, scrape.protocol),
                )
                .await
                {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => warn!("tracker: scrape log write failed: {}", e),
                    Err(_) => warn!("tracker: scrape log write timed out"),
                }
            }
        });
    }

    fn spawn_file_creation(&self, file: File) {
        let database = self.database.clone();

        tokio::spawn(async move {
            match timeout(MAINTENANCE_TIMEOUT, database.save_file(&file)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("tracker: file row write failed [hash: {}]: {}", file.info_hash, e),
                Err(_) => warn!("tracker: file row write timed out [hash: {}]", file.info_hash),
            }
        });
    }
}

#[cfg(test)]
mod tests {

    mod the_tracker {
        use std::future::Future;
        use std::net::{IpAddr, Ipv4Addr};
        use std::str::FromStr;
        use std::sync::Arc;
        use std::time::Duration;

        use crate::config::Configuration;
        use crate::protocol::clock::current_time;
        use crate::protocol::info_hash::InfoHash;
        use crate::tracker::error::Error;
        use crate::tracker::request::{Announce, Event, Protocol, Scrape};
        use crate::tracker::swarm::{File, User};
        use crate::tracker::{auth, peer, Tracker};

        fn tracker_factory() -> Tracker {
            let configuration = Arc::new(Configuration::ephemeral());

            match Tracker::new(&configuration) {
                Ok(tracker) => tracker,
                Err(error) => panic!("{}", error),
            }
        }

        async fn provision_user(tracker: &Tracker, username: &str) -> User {
            let user = User {
                id: 0,
                username: username.to_string(),
                passkey: auth::generate(),
                torrent_limit: 0,
                uploaded: 0,
                downloaded: 0,
            };

            tracker.database.save_user(&user).await.expect("failed to save user");

            tracker
                .database
                .load_user_by_passkey(&user.passkey)
                .await
                .expect("failed to load user")
                .expect("user not found after save")
        }

        async fn provision_file(tracker: &Tracker, info_hash: &InfoHash, verified: bool) -> File {
            let file = File {
                id: 0,
                info_hash: *info_hash,
                verified,
                created_at: current_time(),
            };

            tracker.database.save_file(&file).await.expect("failed to save file");

            tracker
                .database
                .load_file(info_hash)
                .await
                .expect("failed to load file")
                .expect("file not found after save")
        }

        fn sample_info_hash() -> InfoHash {
            InfoHash::from_str("3b245504cf5f11bbdbe1201cea6a6bf45aee1bc0").unwrap()
        }

        fn announce_from(ip: [u8; 4], uploaded: i64, downloaded: i64, left: i64, event: Event) -> Announce {
            Announce {
                info_hash: sample_info_hash(),
                peer_id: peer::Id(*b"-qB00000000000000000"),
                ip: IpAddr::V4(Ipv4Addr::new(ip[0], ip[1], ip[2], ip[3])),
                port: 6881,
                uploaded,
                downloaded,
                left,
                event,
                numwant: 50,
                key: None,
                protocol: Protocol::Http,
            }
        }

        /// Detached writes land eventually; poll instead of sleeping blind.
        async fn eventually<F, Fut>(mut condition: F) -> bool
        where
            F: FnMut() -> Fut,
            Fut: Future<Output = bool>,
        {
            for _ in 0..100 {
                if condition().await {
                    return true;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
            false
        }

        #[tokio::test]
        async fn it_rejects_and_auto_creates_an_unknown_info_hash() {
            let tracker = tracker_factory();
            let alice = provision_user(&tracker, "alice").await;

            let result = tracker
                .announce(&announce_from([126, 0, 0, 1], 0, 0, 1000, Event::Started), Some(&alice))
                .await;

            assert!(matches!(result, Err(Error::UnregisteredTorrent)));

            // The unverified file row is written by a detached task.
            let created = eventually(|| async {
                matches!(
                    tracker.database.load_file(&sample_info_hash()).await,
                    Ok(Some(file)) if !file.verified
                )
            })
            .await;
            assert!(created, "unverified file row was never created");
        }

        #[tokio::test]
        async fn it_rejects_an_unverified_file() {
            let tracker = tracker_factory();
            let alice = provision_user(&tracker, "alice").await;
            provision_file(&tracker, &sample_info_hash(), false).await;

            let result = tracker
                .announce(&announce_from([126, 0, 0, 1], 0, 0, 1000, Event::Started), Some(&alice))
                .await;

            assert!(matches!(result, Err(Error::UnverifiedTorrent)));
        }

        #[tokio::test]
        async fn an_initial_seeder_is_created_completed_and_counted() {
            let tracker = tracker_factory();
            let alice = provision_user(&tracker, "alice").await;
            let file = provision_file(&tracker, &sample_info_hash(), true).await;

            let data = tracker
                .announce(&announce_from([126, 0, 0, 1], 0, 0, 0, Event::Started), Some(&alice))
                .await
                .unwrap();

            assert_eq!(data.complete, 1);
            assert_eq!(data.incomplete, 0);

            let record = tracker
                .database
                .load_file_user(file.id, alice.id, &"126.0.0.1".parse().unwrap())
                .await
                .unwrap()
                .unwrap();
            assert!(record.active);
            assert!(record.completed);
            assert_eq!(record.announced, 1);
            assert_eq!(record.left, 0);
        }

        #[tokio::test]
        async fn counters_are_merged_monotonically_across_announces() {
            let tracker = tracker_factory();
            let alice = provision_user(&tracker, "alice").await;
            let file = provision_file(&tracker, &sample_info_hash(), true).await;

            tracker
                .announce(&announce_from([126, 0, 0, 1], 0, 0, 5000, Event::Started), Some(&alice))
                .await
                .unwrap();
            tracker
                .announce(&announce_from([126, 0, 0, 1], 500, 1000, 2000, Event::None), Some(&alice))
                .await
                .unwrap();
            tracker
                .announce(&announce_from([126, 0, 0, 1], 200, 900, 3000, Event::None), Some(&alice))
                .await
                .unwrap();

            let record = tracker
                .database
                .load_file_user(file.id, alice.id, &"126.0.0.1".parse().unwrap())
                .await
                .unwrap()
                .unwrap();
            assert_eq!(record.uploaded, 500);
            assert_eq!(record.downloaded, 1000);
            assert_eq!(record.left, 2000);
            assert_eq!(record.announced, 3);
        }

        #[tokio::test]
        async fn a_stopped_event_on_a_fresh_record_creates_it_inactive() {
            let tracker = tracker_factory();
            let alice = provision_user(&tracker, "alice").await;
            let file = provision_file(&tracker, &sample_info_hash(), true).await;

            let data = tracker
                .announce(&announce_from([126, 0, 0, 1], 0, 0, 0, Event::Stopped), Some(&alice))
                .await
                .unwrap();

            // Inactive peers are not counted as seeders.
            assert_eq!(data.complete, 0);

            let record = tracker
                .database
                .load_file_user(file.id, alice.id, &"126.0.0.1".parse().unwrap())
                .await
                .unwrap()
                .unwrap();
            assert!(!record.active);
        }

        #[tokio::test]
        async fn a_udp_announce_writes_no_membership_row() {
            let tracker = tracker_factory();
            let file = provision_file(&tracker, &sample_info_hash(), true).await;

            let mut announce = announce_from([126, 0, 0, 1], 0, 0, 0, Event::None);
            announce.protocol = Protocol::Udp;

            tracker.announce(&announce, None).await.unwrap();

            let rows = tracker
                .database
                .load_file_user(file.id, 0, &"126.0.0.1".parse().unwrap())
                .await
                .unwrap();
            assert!(rows.is_none());
        }

        #[tokio::test]
        async fn the_peer_list_never_contains_the_requester() {
            let tracker = tracker_factory();
            let alice = provision_user(&tracker, "alice").await;
            let bob = provision_user(&tracker, "bob").await;
            provision_file(&tracker, &sample_info_hash(), true).await;

            tracker
                .announce(&announce_from([126, 0, 0, 10], 0, 0, 0, Event::Started), Some(&alice))
                .await
                .unwrap();

            let alice_ip: IpAddr = "126.0.0.10".parse().unwrap();
            let bob_ip: IpAddr = "126.0.0.11".parse().unwrap();

            // Announce-log writes are detached; re-announce until alice's
            // entry becomes visible to bob.
            let saw_alice = eventually(|| async {
                let data = tracker
                    .announce(&announce_from([126, 0, 0, 11], 0, 0, 4000, Event::Started), Some(&bob))
                    .await
                    .unwrap();
                assert!(data.peers.iter().all(|peer| peer.ip != bob_ip));
                data.peers.iter().any(|peer| peer.ip == alice_ip)
            })
            .await;

            assert!(saw_alice, "alice never appeared in bob's peer list");
        }

        #[tokio::test]
        async fn the_interval_policy_hurries_leechers_and_relaxes_seeders() {
            let tracker = tracker_factory();

            let (interval, min_interval) = tracker.announce_interval(false);
            assert!((300..=600).contains(&interval));
            assert_eq!(min_interval, 300);

            let steady = tracker.config.announce_interval;
            let (interval, min_interval) = tracker.announce_interval(true);
            assert!((steady.saturating_sub(600)..=steady).contains(&interval));
            assert_eq!(min_interval, steady / 2);
        }

        #[tokio::test]
        async fn scraping_reports_swarm_counts() {
            let tracker = tracker_factory();
            let alice = provision_user(&tracker, "alice").await;
            let bob = provision_user(&tracker, "bob").await;
            provision_file(&tracker, &sample_info_hash(), true).await;

            tracker
                .announce(&announce_from([126, 0, 0, 10], 0, 0, 0, Event::Started), Some(&alice))
                .await
                .unwrap();
            tracker
                .announce(&announce_from([126, 0, 0, 11], 0, 0, 4000, Event::Started), Some(&bob))
                .await
                .unwrap();

            let scrape = Scrape {
                info_hashes: vec![sample_info_hash()],
                ip: "126.0.0.12".parse().unwrap(),
                protocol: Protocol::Http,
            };

            let files = tracker.scrape(&scrape).await.unwrap();

            assert_eq!(files.len(), 1);
            assert_eq!(files[0].complete, 1);
            assert_eq!(files[0].incomplete, 1);
            assert_eq!(files[0].downloaded, 1);
        }

        #[tokio::test]
        async fn scraping_an_unknown_info_hash_does_not_auto_create_it() {
            let tracker = tracker_factory();

            let scrape = Scrape {
                info_hashes: vec![sample_info_hash()],
                ip: "126.0.0.12".parse().unwrap(),
                protocol: Protocol::Http,
            };

            let result = tracker.scrape(&scrape).await;
            assert!(matches!(result, Err(Error::UnregisteredTorrent)));

            tokio::time::sleep(Duration::from_millis(50)).await;
            assert!(tracker.database.load_file(&sample_info_hash()).await.unwrap().is_none());
        }
    }
}
