use common::{Error, Result};
use connectors::{hyperliquid::HYPERLIQUID_API_URL, lighter::LIGHTER_API_URL, DEFAULT_TIMEOUT};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use store::StoreConfig;

pub const DEFAULT_WATCH_INTERVAL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl ApiConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let host = std::env::var("API_HOST").unwrap_or(defaults.host);
        let port = env_parse("API_PORT", defaults.port)?;

        Ok(Self { host, port })
    }
}

/// Everything the binary needs, read from the environment
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub store: StoreConfig,
    pub hyperliquid_url: String,
    pub lighter_url: String,
    pub http_timeout: Duration,
    pub watch_interval: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let http_timeout = env_secs("HTTP_TIMEOUT_SECS", DEFAULT_TIMEOUT)?;
        let watch_interval = env_secs("WATCH_INTERVAL_SECS", DEFAULT_WATCH_INTERVAL)?;

        Ok(Self {
            api: ApiConfig::from_env()?,
            store: StoreConfig::from_env(),
            hyperliquid_url: std::env::var("HYPERLIQUID_BASE_URL")
                .unwrap_or_else(|_| HYPERLIQUID_API_URL.to_string()),
            lighter_url: std::env::var("LIGHTER_BASE_URL")
                .unwrap_or_else(|_| LIGHTER_API_URL.to_string()),
            http_timeout,
            watch_interval,
        })
    }
}

fn env_parse<T: FromStr>(name: &str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => parse_value(name, &raw),
        Err(_) => Ok(default),
    }
}

fn env_secs(name: &str, default: Duration) -> Result<Duration> {
    match std::env::var(name) {
        Ok(raw) => parse_secs(name, &raw),
        Err(_) => Ok(default),
    }
}

// Zero would disable the HTTP timeout or spin the watch loop
fn parse_secs(name: &str, raw: &str) -> Result<Duration> {
    match parse_value::<u64>(name, raw)? {
        0 => Err(Error::ConfigError(format!("{} must be at least 1 second", name))),
        secs => Ok(Duration::from_secs(secs)),
    }
}

fn parse_value<T: FromStr>(name: &str, raw: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| Error::ConfigError(format!("{} has invalid value {:?}: {}", name, raw, e)))
}
