//! Streaming extractor for the latest readings of one station in a
//! line-oriented weather bulletin.
//!
//! The bulletin is never parsed as XML: lines are scanned for the station and
//! substance markers and the value series inside each substance tag is read
//! directly.

pub mod error;
pub mod extractor;
pub mod measurement;
mod parser;

pub use error::{MeteoError, Result};
pub use measurement::{MAX_VALUE_LEN, MeasurementEntry, MeasurementTable, MeasurementType};
pub use parser::{
    BulletinParser, DEFAULT_MAX_LINE_LEN, DEFAULT_STATION_ID, ParserConfig, ScanState, Snapshot,
};
