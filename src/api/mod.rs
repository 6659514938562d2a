pub mod handlers;
pub mod resource;
pub mod responses;
pub mod routes;
pub mod server;
