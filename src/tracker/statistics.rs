//! Request counters, incremented on request acceptance.
//!
//! `current` counts requests since the last status-report tick and is reset
//! by the statistics logging job; `total` is monotone for the lifetime of
//! the process.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default, PartialEq, Eq, Clone)]
pub struct Metrics {
    pub http_current: u64,
    pub http_total: u64,
    pub udp_current: u64,
    pub udp_total: u64,
}

#[derive(Debug, Default)]
pub struct Keeper {
    http_current: AtomicU64,
    http_total: AtomicU64,
    udp_current: AtomicU64,
    udp_total: AtomicU64,
}

impl Keeper {
    pub fn accept_http(&self) {
        self.http_current.fetch_add(1, Ordering::Relaxed);
        self.http_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn accept_udp(&self) {
        self.udp_current.fetch_add(1, Ordering::Relaxed);
        self.udp_total.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn snapshot(&self) -> Metrics {
        Metrics {
            http_current: self.http_current.load(Ordering::Relaxed),
            http_total: self.http_total.load(Ordering::Relaxed),
            udp_current: self.udp_current.load(Ordering::Relaxed),
            udp_total: self.udp_total.load(Ordering::Relaxed),
        }
    }

    /// Zeroes the per-tick gauges. Called by the status logging job.
    pub fn reset_current(&self) {
        self.http_current.store(0, Ordering::Relaxed);
        self.udp_current.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::Keeper;

    #[test]
    fn it_counts_accepted_requests_per_protocol() {
        let keeper = Keeper::default();

        keeper.accept_http();
        keeper.accept_http();
        keeper.accept_udp();

        let metrics = keeper.snapshot();
        assert_eq!(metrics.http_current, 2);
        assert_eq!(metrics.http_total, 2);
        assert_eq!(metrics.udp_current, 1);
        assert_eq!(metrics.udp_total, 1);
    }

    #[test]
    fn resetting_clears_current_but_keeps_totals() {
        let keeper = Keeper::default();

        keeper.accept_http();
        keeper.accept_udp();
        keeper.reset_current();
        keeper.accept_udp();

        let metrics = keeper.snapshot();
        assert_eq!(metrics.http_current, 0);
        assert_eq!(metrics.http_total, 1);
        assert_eq!(metrics.udp_current, 1);
        assert_eq!(metrics.udp_total, 2);
    }
}
