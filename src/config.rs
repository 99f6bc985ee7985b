use std::net::{IpAddr, SocketAddr};

use anyhow::{Context, Result};

const DEFAULT_DATABASE_URL: &str = "sqlite://todos.db";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database_url: String,
    pub addr: SocketAddr,
}

impl Config {
    /// Reads `.env` (if present) and then the process environment.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let database_url = lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());
        let host = lookup("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let host: IpAddr = host.parse().with_context(|| format!("invalid HOST {host:?}"))?;
        let port = match lookup("PORT") {
            Some(raw) => raw.parse::<u16>().with_context(|| format!("invalid PORT {raw:?}"))?,
            None => DEFAULT_PORT,
        };
        Ok(Self { database_url, addr: SocketAddr::new(host, port) })
    }
}
