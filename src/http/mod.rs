pub mod handlers;
pub mod percent_encoding;
pub mod query;
pub mod requests;
pub mod responses;
pub mod routes;
pub mod server;
