//! Logging setup.
//!
//! The level comes from the configuration and can be overridden per run
//! with the `RATIO_TRACKER_LOG` environment variable, so an operator can
//! debug a deployment without touching `tracker.toml`.

use std::str::FromStr;

use log::{info, LevelFilter};
use thiserror::Error;

use crate::config::Configuration;

/// Environment variable overriding the configured log level.
pub const LOG_LEVEL_ENV: &str = "RATIO_TRACKER_LOG";

#[derive(Error, Debug)]
pub enum Error {
    #[error("unknown log level '{raw_level}', expected off, error, warn, info, debug or trace")]
    UnknownLevel { raw_level: String },

    #[error("logging was already initialized")]
    AlreadyInitialized,
}

/// Installs the global dispatcher. Called once at startup; failures are
/// fatal and the caller terminates the process.
///
/// # Errors
///
/// Will return an `Error` on an unknown level name or when a logger is
/// already installed.
pub fn setup(cfg: &Configuration) -> Result<(), Error> {
    let raw_level = std::env::var(LOG_LEVEL_ENV).ok().or_else(|| cfg.log_level.clone());
    let level = level_from(raw_level.as_deref())?;

    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{} {:5} [{}] {}",
                chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ"),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stdout())
        .apply()
        .map_err(|_| Error::AlreadyInitialized)?;

    info!("logging at level {}", level);

    Ok(())
}

fn level_from(raw_level: Option<&str>) -> Result<LevelFilter, Error> {
    match raw_level {
        None => Ok(LevelFilter::Info),
        Some(raw_level) => LevelFilter::from_str(raw_level).map_err(|_| Error::UnknownLevel {
            raw_level: raw_level.to_string(),
        }),
    }
}
