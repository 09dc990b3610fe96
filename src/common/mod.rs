//! Common utilities shared by the CLI, the runner and the mock service

pub mod config;
pub mod error;
pub mod logging;
pub mod paths;

pub use error::{Error, Result};

/// Parse a "listening at:" address from a server's startup line.
/// Handles the wildcard bind by converting `0.0.0.0` to `127.0.0.1`
pub fn parse_listen_address(line: &str) -> Option<String> {
    let addr_start = line.find("listening at:")?;
    let addr = line[addr_start + "listening at:".len()..].trim();
    if addr.is_empty() {
        return None;
    }
    Some(addr.replace("0.0.0.0", "127.0.0.1"))
}
