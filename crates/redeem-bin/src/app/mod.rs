//! Application wiring and lifecycle management.

mod commands;
mod init;
mod shutdown;

pub use commands::{inspect, issue_once, stats};
pub use init::run_server;
