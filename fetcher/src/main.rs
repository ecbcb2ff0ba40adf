use anyhow::{Context, Result};
use meteo_core::BulletinParser;
use reqwest::Client as HTTPClient;
use tokio::time::MissedTickBehavior;
use tracing::instrument;
use tracing_subscriber::EnvFilter;

use crate::bulletin::PollResult;
use crate::config::FetcherConfig;
mod bulletin;
mod config;
mod logging;

/// One fetch of the bulletin. Failures are logged here and reported as `None`.
#[instrument(skip_all, fields(station = %parser.config().station_id))]
async fn poll(
    http_client: &HTTPClient,
    config: &FetcherConfig,
    parser: &mut BulletinParser,
) -> Option<PollResult> {
    let logger = logging::Logger::new()
        .station(&config.parser.station_id)
        .url(&config.url);
    match bulletin::fetch_bulletin(http_client, &config.url, parser).await {
        Ok(result) => {
            bulletin::log_readings(&result);
            logger
                .bytes(result.bytes_read)
                .values_present(result.values_present)
                .info("bulletin.poll", "Bulletin processed");
            Some(result)
        }
        Err(err) => {
            logger.error("bulletin.poll_failed", &err, "Failed to fetch bulletin");
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env()) // Enable log level filtering via `RUST_LOG` env var
        .json()
        .with_current_span(false)
        .with_span_list(false)
        .with_target(false)
        .init();

    let config = FetcherConfig::from_env()?;
    let http_client = HTTPClient::builder()
        .timeout(config.request_timeout)
        .build()?;
    let mut parser = BulletinParser::new(config.parser.clone())?;

    let Some(period) = config.poll_interval else {
        poll(&http_client, &config, &mut parser)
            .await
            .context("Bulletin poll failed")?;
        return Ok(());
    };

    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        poll(&http_client, &config, &mut parser).await;
    }
}
