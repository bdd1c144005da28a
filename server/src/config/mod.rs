use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::create_security_headers_layer;

const DEFAULT_PORT: u16 = 5000;
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_SESSION_TTL_DAYS: i64 = 30;
const DEFAULT_SESSION_SWEEP_SECS: u64 = 3600;

#[derive(Debug, Clone)]
pub struct Config {
    /// `None` runs the server on the in-memory store.
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub host: IpAddr,
    pub port: u16,
    pub session_ttl_days: i64,
    /// How often expired sessions are purged.
    pub session_sweep_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            session_ttl_days: DEFAULT_SESSION_TTL_DAYS,
            session_sweep_secs: DEFAULT_SESSION_SWEEP_SECS,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            database_url: env::var("DATABASE_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
            max_connections: parse_or("DATABASE_MAX_CONNECTIONS", defaults.max_connections),
            host: parse_or("HOST", defaults.host),
            port: parse_or("PORT", defaults.port),
            session_ttl_days: parse_or("SESSION_TTL_DAYS", defaults.session_ttl_days),
            session_sweep_secs: parse_or("SESSION_SWEEP_SECS", defaults.session_sweep_secs)
                .max(1),
        }
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn parse_or<T>(key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => match raw.trim().parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!("Config: invalid {} '{}', using {}", key, raw, default);
                default
            }
        },
        Err(_) => default,
    }
}
