use crate::logging;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use futures::{Stream, StreamExt};
use meteo_core::{BulletinParser, Snapshot};
use reqwest::Client as HTTPClient;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct PollResult {
    pub fetched_at: DateTime<Utc>,
    pub bytes_read: usize,
    pub values_present: usize,
    pub snapshot: Snapshot,
}

/// Downloads the bulletin at `url` and streams it through `parser`.
///
/// The scanner is reset first so a payload cut short by the previous poll
/// cannot leave it inside a station block. Readings from earlier polls stay
/// in place until the bulletin carries a newer one.
pub async fn fetch_bulletin(
    http_client: &HTTPClient,
    url: &str,
    parser: &mut BulletinParser,
) -> Result<PollResult> {
    let response = http_client
        .get(url)
        .send()
        .await
        .with_context(|| format!("GET {url}"))?;
    response
        .error_for_status_ref()
        .with_context(|| format!("GET {url}"))?;

    parser.reset();
    let bytes_read = feed_stream(parser, response.bytes_stream()).await?;
    let snapshot = parser.snapshot();

    Ok(PollResult {
        fetched_at: Utc::now(),
        bytes_read,
        values_present: snapshot.values_present(),
        snapshot,
    })
}

/// Feeds every chunk of `stream` to `parser`, flushing the last line at the
/// end. Returns the number of bytes read.
pub async fn feed_stream<S, B, E>(parser: &mut BulletinParser, stream: S) -> Result<usize>
where
    S: Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
    E: std::error::Error + Send + Sync + 'static,
{
    let mut stream = std::pin::pin!(stream);
    let mut bytes_read = 0usize;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.context("Failed to read bulletin body")?;
        bytes_read += chunk.as_ref().len();
        parser.feed(chunk);
    }
    parser.finish();
    Ok(bytes_read)
}

pub fn log_readings(result: &PollResult) {
    let snapshot = &result.snapshot;
    for entry in &snapshot.readings {
        let Some(value) = entry.value.as_deref() else {
            continue;
        };
        logging::Logger::new()
            .station(&snapshot.station_id)
            .measurement(entry.kind.code())
            .value(value)
            .info("bulletin.reading", "Latest reading");
    }
}
