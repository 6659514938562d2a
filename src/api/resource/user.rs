use serde::{Deserialize, Serialize};

use crate::tracker::swarm;

/// A registered user. The passkey is an authentication token and is never
/// serialized.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub torrent_limit: i64,
    pub uploaded: i64,
    pub downloaded: i64,
}

impl From<swarm::User> for User {
    fn from(user: swarm::User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            torrent_limit: user.torrent_limit,
            uploaded: user.uploaded,
            downloaded: user.downloaded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::User;
    use crate::tracker::auth;
    use crate::tracker::swarm;

    #[test]
    fn the_passkey_is_not_part_of_the_serialized_user() {
        let user = User::from(swarm::User {
            id: 1,
            username: "alice".to_string(),
            passkey: auth::generate(),
            torrent_limit: 0,
            uploaded: 100,
            downloaded: 200,
        });

        let json = serde_json::to_string(&user).unwrap();

        assert!(!json.contains("passkey"));
        assert!(json.contains("\"username\":\"alice\""));
    }
}
