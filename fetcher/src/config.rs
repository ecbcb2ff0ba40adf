use anyhow::{Context, Result, anyhow};
use meteo_core::{DEFAULT_STATION_ID, ParserConfig};
use std::time::Duration;

pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 600;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

const URL_VAR: &str = "METEO_BULLETIN_URL";
const STATION_VAR: &str = "METEO_STATION_ID";
const POLL_INTERVAL_VAR: &str = "METEO_POLL_INTERVAL_SECS";
const REQUEST_TIMEOUT_VAR: &str = "METEO_REQUEST_TIMEOUT_SECS";

#[derive(Debug, Clone)]
pub struct FetcherConfig {
    pub url: String,
    pub parser: ParserConfig,
    /// `None` fetches a single bulletin and exits.
    pub poll_interval: Option<Duration>,
    pub request_timeout: Duration,
}

impl FetcherConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let url = non_empty(&lookup, URL_VAR).ok_or_else(|| anyhow!("Missing env var: {URL_VAR}"))?;
        let station_id =
            non_empty(&lookup, STATION_VAR).unwrap_or_else(|| DEFAULT_STATION_ID.to_string());
        let poll_secs = parse_secs(&lookup, POLL_INTERVAL_VAR, DEFAULT_POLL_INTERVAL_SECS)?;
        let timeout_secs = parse_secs(&lookup, REQUEST_TIMEOUT_VAR, DEFAULT_REQUEST_TIMEOUT_SECS)?;
        if timeout_secs == 0 {
            return Err(anyhow!("{REQUEST_TIMEOUT_VAR} must be greater than zero"));
        }

        Ok(Self {
            url,
            parser: ParserConfig::new(station_id),
            poll_interval: (poll_secs > 0).then(|| Duration::from_secs(poll_secs)),
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

fn non_empty(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_secs(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: u64) -> Result<u64> {
    match non_empty(lookup, key) {
        Some(value) => value
            .parse::<u64>()
            .with_context(|| format!("Failed to parse {key} with value '{value}'")),
        None => Ok(default),
    }
}
