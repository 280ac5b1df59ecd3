//! Server configuration from environment variables (and `.env`).

use crate::types::ROOM_TTL;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Read an environment variable, treating blank values as unset
pub(crate) fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

/// Parse an environment variable, warning and using `default` when it is garbage
fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    match env_var(name) {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring invalid value {:?} for {}", raw, name);
            default
        }),
        None => default,
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// JSON file shared between server processes; `None` keeps rooms in memory
    pub rooms_file: Option<PathBuf>,
    pub room_ttl: Duration,
    /// How often the sweeper purges expired rooms
    pub cleanup_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            rooms_file: None,
            room_ttl: ROOM_TTL,
            cleanup_interval: Duration::from_secs(60),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind_addr: env_parse("BIND_ADDR", defaults.bind_addr),
            rooms_file: env_var("ROOMS_FILE").map(PathBuf::from),
            room_ttl: Duration::from_secs(env_parse("ROOM_TTL_SECS", defaults.room_ttl.as_secs())),
            cleanup_interval: Duration::from_secs(
                env_parse("CLEANUP_INTERVAL_SECS", defaults.cleanup_interval.as_secs()).max(1),
            ),
        }
    }
}
