use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tfstate_server::config::{DEFAULT_DATABASE, DEFAULT_IP, DEFAULT_MAX_BODY_SIZE, DEFAULT_PORT};
use tfstate_server::ServerConfig;

#[derive(Parser, Debug)]
#[command(
    name = "tfstated",
    about = "HTTP remote-state backend with LOCK/UNLOCK support",
    version,
)]
pub struct Cli {
    /// Defaults to `serve`
    #[command(subcommand)]
    pub command: Option<Command>,

    /// SQLite database file (created if missing)
    #[arg(long, env = "DATABASE", default_value = DEFAULT_DATABASE, global = true)]
    pub database: PathBuf,

    /// Address to listen on
    #[arg(long, env = "IP", default_value_t = DEFAULT_IP, global = true)]
    pub ip: IpAddr,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT, global = true)]
    pub port: u16,

    /// Largest accepted request body, in bytes
    #[arg(long, env = "MAX_BODY_SIZE", default_value_t = DEFAULT_MAX_BODY_SIZE, global = true)]
    pub max_body_size: usize,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Serve the HTTP backend
    Serve,
    /// Print every stored record as JSON
    Dump,
    /// Print the storage key a request would map to
    Fingerprint(FingerprintArgs),
}

#[derive(Args, Debug, PartialEq, Eq)]
pub struct FingerprintArgs {
    /// Request path, e.g. /s/prod
    pub path: String,
    #[arg(short, long, default_value = "")]
    pub username: String,
    #[arg(short, long, default_value = "")]
    pub password: String,
}

impl Cli {
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            bind_addr: SocketAddr::new(self.ip, self.port),
            database: self.database.clone(),
            max_body_size: self.max_body_size,
        }
    }
}
