use tracing::{error, info};

pub(crate) const TARGET: &str = "meteo_fetcher";

#[derive(Clone, Default)]
pub(crate) struct Logger {
    station: Option<String>,
    url: Option<String>,
    measurement: Option<&'static str>,
    value: Option<String>,
    bytes: Option<usize>,
    values_present: Option<usize>,
}

impl Logger {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn station(mut self, station: impl Into<String>) -> Self {
        self.station = Some(station.into());
        self
    }

    pub(crate) fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub(crate) fn measurement(mut self, measurement: &'static str) -> Self {
        self.measurement = Some(measurement);
        self
    }

    pub(crate) fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub(crate) fn bytes(mut self, bytes: usize) -> Self {
        self.bytes = Some(bytes);
        self
    }

    pub(crate) fn values_present(mut self, values_present: usize) -> Self {
        self.values_present = Some(values_present);
        self
    }

    pub(crate) fn info(&self, event: &'static str, message: &str) {
        info!(
            target: TARGET,
            event,
            station = self.station.as_deref(),
            url = self.url.as_deref(),
            measurement = self.measurement,
            value = self.value.as_deref(),
            bytes = self.bytes,
            values_present = self.values_present,
            "{}",
            message
        );
    }

    pub(crate) fn error<E: std::fmt::Debug>(&self, event: &'static str, err: &E, message: &str) {
        error!(
            target: TARGET,
            event,
            station = self.station.as_deref(),
            url = self.url.as_deref(),
            measurement = self.measurement,
            value = self.value.as_deref(),
            bytes = self.bytes,
            values_present = self.values_present,
            error = ?err,
            "{}",
            message
        );
    }
}
