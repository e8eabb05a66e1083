//! API module - HTTP gateway for submissions and status queries

pub mod handlers;
pub mod routes;

pub use routes::create_router;
