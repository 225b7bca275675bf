use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

/// Default database file, relative to the working directory.
pub const DEFAULT_DATABASE: &str = "state.db";
/// Default listen address.
pub const DEFAULT_IP: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);
/// Default listen port.
pub const DEFAULT_PORT: u16 = 8080;
/// Default cap on request bodies (state blobs and lock envelopes).
pub const DEFAULT_MAX_BODY_SIZE: usize = 64 * 1024 * 1024;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub database: PathBuf,
    pub max_body_size: usize,
}

impl ServerConfig {
    /// Check values that the type system does not.
    pub fn validate(&self) -> ServerResult<()> {
        if self.database.as_os_str().is_empty() {
            return Err(ServerError::Config("database path must not be empty".into()));
        }
        if self.max_body_size == 0 {
            return Err(ServerError::Config("max body size must be positive".into()));
        }
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::new(DEFAULT_IP, DEFAULT_PORT),
            database: PathBuf::from(DEFAULT_DATABASE),
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }
}
