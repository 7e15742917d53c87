//! Ramp daemon: HTTP surface, content backend client, persistence, and
//! notification dispatch around the ramp-core engine.

pub mod backend;
pub mod config;
pub mod notify;
pub mod server;
pub mod store;
