use clap::Parser;

use lobby_system::{LobbyPolicy, DEFAULT_INTERVAL_FLOOR_MS, DEFAULT_UPDATE_INTERVAL_MS};

/// Command line configuration of the lobby server.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about)]
pub struct ServerConfig {
    /// Server IP address to bind to
    #[clap(short = 'H', long, default_value = "127.0.0.1")]
    pub host: String,
    /// Server port to listen on
    #[clap(short, long, default_value = "8080")]
    pub port: u16,
    /// Lowest location update interval a host can set, in milliseconds
    #[clap(long, default_value_t = DEFAULT_INTERVAL_FLOOR_MS)]
    pub interval_floor_ms: u64,
    /// Interval announced before any host declares one, in milliseconds
    #[clap(long, default_value_t = DEFAULT_UPDATE_INTERVAL_MS)]
    pub default_interval_ms: u64,
    /// Pending commands a session mailbox holds before senders wait
    #[clap(short, long, default_value = "64")]
    pub mailbox_capacity: usize,
}

impl ServerConfig {
    pub fn policy(&self) -> LobbyPolicy {
        LobbyPolicy {
            interval_floor_ms: self.interval_floor_ms,
            default_interval_ms: self.default_interval_ms,
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
