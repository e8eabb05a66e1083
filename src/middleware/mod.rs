//! Middleware module - Inbound request guards

pub mod rate_limit;
