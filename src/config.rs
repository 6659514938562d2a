use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::databases::driver::Driver;

#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct HttpTrackerConfig {
    pub enabled: bool,
    pub bind_address: String,
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct UdpTrackerConfig {
    pub enabled: bool,
    pub bind_address: String,
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct HttpApiConfig {
    pub enabled: bool,
    pub bind_address: String,
}

/// The process configuration, loaded once at startup from a TOML file.
/// Changes require a restart.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct Configuration {
    pub log_level: Option<String>,
    /// Steady-state announce interval in seconds.
    pub announce_interval: u32,
    /// Seconds between status log lines (and `current` counter resets).
    pub stats_log_interval: u64,
    pub db_driver: Driver,
    pub db_path: String,
    pub http_tracker: HttpTrackerConfig,
    pub udp_tracker: UdpTrackerConfig,
    pub http_api: HttpApiConfig,
}

impl Default for Configuration {
    fn default() -> Configuration {
        Configuration {
            log_level: Some(String::from("info")),
            announce_interval: 3600,
            stats_log_interval: 60,
            db_driver: Driver::Sqlite3,
            db_path: String::from("data.db"),
            http_tracker: HttpTrackerConfig {
                enabled: true,
                bind_address: String::from("0.0.0.0:7070"),
            },
            udp_tracker: UdpTrackerConfig {
                enabled: true,
                bind_address: String::from("0.0.0.0:6881"),
            },
            http_api: HttpApiConfig {
                enabled: true,
                bind_address: String::from("127.0.0.1:1212"),
            },
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("could not read configuration file: {source}")]
    Io { source: std::io::Error },

    #[error("could not parse configuration: {source}")]
    Parse { source: toml::de::Error },

    #[error("created a new configuration file at {path}, please review it and restart")]
    CreatedNewFile { path: String },
}

impl Configuration {
    /// Loads the configuration, writing a default file on first run.
    ///
    /// # Errors
    ///
    /// Will return `Error::CreatedNewFile` after writing the default file,
    /// so the operator reviews it before the tracker serves anything.
    pub fn load_from_file(path: &str) -> Result<Configuration, Error> {
        if !Path::new(path).exists() {
            let config = Configuration::default();
            config.save_to_file(path)?;
            return Err(Error::CreatedNewFile { path: path.to_string() });
        }

        let data = std::fs::read_to_string(path).map_err(|source| Error::Io { source })?;

        toml::from_str(&data).map_err(|source| Error::Parse { source })
    }

    /// # Errors
    ///
    /// Will return an `Error::Io` if the file cannot be written.
    ///
    /// # Panics
    ///
    /// Will panic if the configuration cannot be serialized to TOML.
    pub fn save_to_file(&self, path: &str) -> Result<(), Error> {
        let data = toml::to_string(self).expect("configuration serialization failed");

        std::fs::write(path, data).map_err(|source| Error::Io { source })
    }

    /// A configuration for tests: silent logging, random ports, and a
    /// random SQLite file in the temp directory so parallel tests do not
    /// collide.
    #[must_use]
    pub fn ephemeral() -> Configuration {
        use rand::Rng;

        let mut config = Configuration {
            log_level: Some(String::from("off")),
            ..Default::default()
        };

        config.http_tracker.bind_address = String::from("127.0.0.1:0");
        config.udp_tracker.bind_address = String::from("127.0.0.1:0");
        config.http_api.bind_address = String::from("127.0.0.1:0");

        let random_id: u32 = rand::thread_rng().gen();
        config.db_path = std::env::temp_dir()
            .join(format!("ratio-tracker-{random_id}.db"))
            .to_str()
            .expect("temp dir path is not valid utf-8")
            .to_owned();

        config
    }
}

#[cfg(test)]
mod tests {
    use super::Configuration;

    #[test]
    fn the_default_configuration_round_trips_through_toml() {
        let config = Configuration::default();

        let serialized = toml::to_string(&config).unwrap();
        let deserialized: Configuration = toml::from_str(&serialized).unwrap();

        assert_eq!(deserialized, config);
    }

    #[test]
    fn ephemeral_configurations_use_distinct_database_files() {
        assert_ne!(Configuration::ephemeral().db_path, Configuration::ephemeral().db_path);
    }
}
