use std::time::Duration;

use tracing::warn;

/// Chat views re-fetch on this period unless configured otherwise.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            request_timeout: Duration::from_secs(10),
        }
    }

    /// Reads `PETORA_API_URL` and `PETORA_POLL_SECS`.
    pub fn from_env() -> Self {
        let base_url =
            std::env::var("PETORA_API_URL").unwrap_or_else(|_| "http://127.0.0.1:3000".into());
        let mut config = Self::new(base_url);

        if let Ok(raw) = std::env::var("PETORA_POLL_SECS") {
            match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => config.poll_interval = Duration::from_secs(secs),
                _ => warn!("Ignoring invalid PETORA_POLL_SECS '{}'", raw),
            }
        }
        config
    }
}
