use std::time::{SystemTime, UNIX_EPOCH};

/// Current unix time in seconds.
///
/// # Panics
///
/// Will panic if the system clock is set before the unix epoch.
#[must_use]
pub fn current_time() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is before the unix epoch")
        .as_secs()
}
