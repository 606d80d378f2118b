use std::path::PathBuf;
use std::time::Duration;

use crate::{Error, Result};

/// Process-level settings loaded from environment variables at startup.
///
/// Decision parameters live in the TOML file named by `config_path`; this
/// layer only says where inputs and outputs are and how fast to replay.
#[derive(Debug, Clone)]
pub struct Config {
    /// Engine TOML file.
    pub config_path: PathBuf,
    /// CSV file of bars replayed by the feed.
    pub bars_path: PathBuf,
    /// Delay between replayed cycles.
    pub poll_interval: Duration,
    /// Number of leading cycles loaded as history without running decisions.
    pub warmup_cycles: usize,
    /// Optional JSON-lines file receiving pipeline events.
    pub events_path: Option<PathBuf>,
}

impl Config {
    /// Load from environment variables, reading `.env` first if present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv(); // ignore error if .env not present

        let bars_path = required_env("SWINGBOT_BARS")?;

        Ok(Config {
            config_path: optional_env("SWINGBOT_CONFIG")
                .unwrap_or_else(|| "config/swingbot.toml".to_string())
                .into(),
            bars_path: bars_path.into(),
            poll_interval: Duration::from_millis(parse_env("SWINGBOT_POLL_MS")?.unwrap_or(0)),
            warmup_cycles: parse_env("SWINGBOT_WARMUP")?.unwrap_or(0),
            events_path: optional_env("SWINGBOT_EVENTS").map(PathBuf::from),
        })
    }
}

fn required_env(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| {
        Error::Config(format!(
            "required environment variable '{key}' is not set. Check your .env file."
        ))
    })
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match optional_env(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| Error::Config(format!("{key} has invalid value '{raw}'"))),
    }
}
