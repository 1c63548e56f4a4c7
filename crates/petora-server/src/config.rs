use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;

pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
}

impl Config {
    /// `PETORA_HOST`, `PETORA_PORT` and `PETORA_DB_PATH`, with local
    /// development defaults.
    pub fn from_env() -> anyhow::Result<Self> {
        let host = std::env::var("PETORA_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port = std::env::var("PETORA_PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .context("PETORA_PORT must be a port number")?;
        let db_path = std::env::var("PETORA_DB_PATH").unwrap_or_else(|_| "petora.db".into());

        Ok(Self { host, port, db_path: PathBuf::from(db_path) })
    }

    pub fn addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }
}
