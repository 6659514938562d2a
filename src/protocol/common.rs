use std::time::Duration;

/// Maximum number of torrents accepted in a single scrape request (BEP 15).
pub const MAX_SCRAPE_TORRENTS: usize = 70;

/// Length of a user passkey in hexadecimal characters.
pub const PASSKEY_LENGTH: usize = 40;

/// Number of peers returned when the client does not ask for a specific amount.
pub const DEFAULT_NUMWANT: u32 = 50;

/// Soft deadline for serving a single announce or scrape request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Deadline for detached maintenance writes (logs, file rows, reaper passes).
pub const MAINTENANCE_TIMEOUT: Duration = Duration::from_secs(30);
