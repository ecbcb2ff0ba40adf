use crate::error::{MeteoError, Result};
use crate::extractor;
use crate::measurement::{MeasurementEntry, MeasurementTable, MeasurementType};
use memchr::memchr;
use memchr::memmem::Finder;
use serde::Serialize;
use tracing::{debug, warn};

pub const DEFAULT_STATION_ID: &str = "AM5";
pub const DEFAULT_MAX_LINE_LEN: usize = 4096;

const SUBSTANCE_PATTERN: &[u8] = b"<substance type=";
const STATION_END_PATTERN: &[u8] = b"</station>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserConfig {
    /// Value of the `name` attribute of the station to follow.
    pub station_id: String,
    /// Longest line analyzed; longer lines are dropped whole.
    pub max_line_len: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            station_id: DEFAULT_STATION_ID.to_string(),
            max_line_len: DEFAULT_MAX_LINE_LEN,
        }
    }
}

impl ParserConfig {
    pub fn new(station_id: impl Into<String>) -> Self {
        Self {
            station_id: station_id.into(),
            ..Self::default()
        }
    }

    pub fn max_line_len(mut self, max_line_len: usize) -> Self {
        self.max_line_len = max_line_len;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.station_id.trim().is_empty() {
            return Err(MeteoError::Configuration {
                message: "station id must not be empty".to_string(),
            });
        }
        if self.station_id.contains(['"', '\n']) {
            return Err(MeteoError::Configuration {
                message: format!(
                    "station id {:?} cannot appear in a name attribute",
                    self.station_id
                ),
            });
        }
        if self.max_line_len == 0 {
            return Err(MeteoError::Configuration {
                message: "max_line_len must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    InTargetStation,
}

/// Owned copy of the table, handed to readers between `feed` calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub station_id: String,
    pub readings: Vec<MeasurementEntry>,
}

impl Snapshot {
    pub fn value(&self, kind: MeasurementType) -> Option<&str> {
        self.readings
            .iter()
            .find(|entry| entry.kind == kind)
            .and_then(|entry| entry.value.as_deref())
    }

    pub fn values_present(&self) -> usize {
        self.readings
            .iter()
            .filter(|entry| entry.value.is_some())
            .count()
    }
}

/// Line-oriented scanner that follows one station block of a bulletin and
/// keeps the latest reading of every registered measurement.
#[derive(Debug, Clone)]
pub struct BulletinParser {
    config: ParserConfig,
    station_start: Finder<'static>,
    substance: Finder<'static>,
    station_end: Finder<'static>,
    state: ScanState,
    table: MeasurementTable,
    pending: Vec<u8>,
    discarding: bool,
}

impl Default for BulletinParser {
    fn default() -> Self {
        Self::build(ParserConfig::default())
    }
}

impl BulletinParser {
    pub fn new(config: ParserConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    pub fn for_station(station_id: impl Into<String>) -> Result<Self> {
        Self::new(ParserConfig::new(station_id))
    }

    fn build(config: ParserConfig) -> Self {
        let station_pattern = format!("<station name=\"{}\"", config.station_id);
        Self {
            station_start: Finder::new(station_pattern.as_bytes()).into_owned(),
            substance: Finder::new(SUBSTANCE_PATTERN).into_owned(),
            station_end: Finder::new(STATION_END_PATTERN).into_owned(),
            config,
            state: ScanState::Idle,
            table: MeasurementTable::new(),
            pending: Vec::new(),
            discarding: false,
        }
    }

    /// Back to `Idle`. Readings are kept as last known good values; a
    /// partially received line is dropped.
    pub fn reset(&mut self) {
        self.state = ScanState::Idle;
        self.pending.clear();
        self.discarding = false;
    }

    /// Processes every `\n`-terminated line in `chunk`. The unterminated tail
    /// is kept and completed by the next call.
    pub fn feed(&mut self, chunk: impl AsRef<[u8]>) {
        let mut rest = chunk.as_ref();
        while let Some(end) = memchr(b'\n', rest) {
            let line = &rest[..end];
            rest = &rest[end + 1..];
            if self.discarding {
                self.discarding = false;
                continue;
            }
            if self.pending.is_empty() {
                if !self.oversized(line.len()) {
                    self.analyze_line(line);
                }
                continue;
            }
            let mut buffered = std::mem::take(&mut self.pending);
            if !self.oversized(buffered.len() + line.len()) {
                buffered.extend_from_slice(line);
                self.analyze_line(&buffered);
            }
            buffered.clear();
            self.pending = buffered;
        }
        self.retain_tail(rest);
    }

    /// Treats a retained unterminated tail as the payload's last line.
    pub fn finish(&mut self) {
        if self.discarding {
            self.discarding = false;
            return;
        }
        if !self.pending.is_empty() {
            let line = std::mem::take(&mut self.pending);
            self.analyze_line(&line);
        }
    }

    fn retain_tail(&mut self, tail: &[u8]) {
        if tail.is_empty() || self.discarding {
            return;
        }
        if self.oversized(self.pending.len() + tail.len()) {
            self.pending.clear();
            self.discarding = true;
            return;
        }
        self.pending.extend_from_slice(tail);
    }

    fn oversized(&self, len: usize) -> bool {
        if len <= self.config.max_line_len {
            return false;
        }
        warn!(
            station = %self.config.station_id,
            len,
            "Line exceeds max_line_len, dropped"
        );
        true
    }

    fn analyze_line(&mut self, line: &[u8]) {
        match self.state {
            ScanState::Idle => {
                if self.station_start.find(line).is_some() {
                    self.state = ScanState::InTargetStation;
                    debug!(station = %self.config.station_id, "Station block opened");
                }
            }
            ScanState::InTargetStation => {
                if let Some(pos) = self.substance.find(line) {
                    let fragment = &line[pos + SUBSTANCE_PATTERN.len()..];
                    extractor::identify_and_extract(fragment, &mut self.table);
                }
                if self.station_end.find(line).is_some() {
                    self.state = ScanState::Idle;
                    debug!(station = %self.config.station_id, "Station block closed");
                }
            }
        }
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    pub fn table(&self) -> &MeasurementTable {
        &self.table
    }

    pub fn value(&self, kind: MeasurementType) -> Option<&str> {
        self.table.value(kind)
    }

    /// Lookup by numeric id; ids outside the registered range yield `None`.
    pub fn value_by_id(&self, id: usize) -> Option<&str> {
        self.table.value_by_id(id)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            station_id: self.config.station_id.clone(),
            readings: self.table.entries().cloned().collect(),
        }
    }
}
