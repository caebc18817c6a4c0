use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let db_path = lookup("SCRIBE_DB_PATH").unwrap_or_else(|| "scribe.db".into());
        let host = lookup("SCRIBE_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port = match lookup("SCRIBE_PORT") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("SCRIBE_PORT is not a port number: {raw:?}"))?,
            None => 3000,
        };

        Ok(Self {
            db_path: db_path.into(),
            host,
            port,
        })
    }

    pub fn addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }
}
