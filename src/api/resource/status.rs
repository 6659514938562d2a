use serde::Serialize;

use crate::tracker::statistics::Metrics;
use crate::tracker::Tracker;

#[derive(Serialize, Debug, PartialEq, Eq)]
pub struct ProtocolStats {
    pub current: u64,
    pub total: u64,
}

/// A snapshot of the process and its request counters, served on
/// `GET /api/status` and logged periodically.
#[derive(Serialize, Debug)]
pub struct Status {
    pub pid: u32,
    pub hostname: String,
    pub platform: String,
    pub architecture: String,
    #[serde(rename = "numCpu")]
    pub num_cpu: usize,
    pub workers: usize,
    #[serde(rename = "memoryMb")]
    pub memory_mb: f64,
    pub http: ProtocolStats,
    pub udp: ProtocolStats,
}

impl Status {
    #[must_use]
    pub fn collect(tracker: &Tracker) -> Status {
        Status::from_metrics(&tracker.stats.snapshot())
    }

    #[must_use]
    pub fn from_metrics(metrics: &Metrics) -> Status {
        Status {
            pid: std::process::id(),
            hostname: gethostname::gethostname().to_string_lossy().into_owned(),
            platform: std::env::consts::OS.to_string(),
            architecture: std::env::consts::ARCH.to_string(),
            num_cpu: std::thread::available_parallelism().map(std::num::NonZeroUsize::get).unwrap_or(1),
            workers: tokio::runtime::Handle::try_current()
                .map(|handle| handle.metrics().num_workers())
                .unwrap_or(0),
            memory_mb: resident_memory_mb(),
            http: ProtocolStats {
                current: metrics.http_current,
                total: metrics.http_total,
            },
            udp: ProtocolStats {
                current: metrics.udp_current,
                total: metrics.udp_total,
            },
        }
    }
}

#[cfg(target_os = "linux")]
fn resident_memory_mb() -> f64 {
    std::fs::read_to_string("/proc/self/status")
        .ok()
        .and_then(|status| {
            status
                .lines()
                .find(|line| line.starts_with("VmRSS:"))
                .and_then(|line| line.split_whitespace().nth(1))
                .and_then(|kb| kb.parse::<f64>().ok())
        })
        .map_or(0.0, |kb| kb / 1024.0)
}

#[cfg(not(target_os = "linux"))]
fn resident_memory_mb() -> f64 {
    0.0
}
