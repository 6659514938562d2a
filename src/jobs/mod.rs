pub mod http_tracker;
pub mod log_statistics;
pub mod tracker_api;
pub mod udp_tracker;
