use crate::error::MeteoError;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// Maximum number of payload bytes kept for a single reading.
pub const MAX_VALUE_LEN: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasurementType {
    Temperature,
    GustWind,
    Pressure,
    WindVelocity,
    WindDirection,
    Rainfall,
}

impl MeasurementType {
    /// Registration order. Short codes are matched after every longer code
    /// they could be confused with.
    pub const ALL: [MeasurementType; 6] = [
        MeasurementType::Temperature,
        MeasurementType::GustWind,
        MeasurementType::Pressure,
        MeasurementType::WindVelocity,
        MeasurementType::WindDirection,
        MeasurementType::Rainfall,
    ];

    pub fn id(self) -> usize {
        self as usize
    }

    /// Code used in the `type` attribute of a substance tag.
    pub fn code(self) -> &'static str {
        match self {
            MeasurementType::Temperature => "TEMP",
            MeasurementType::GustWind => "WILG",
            MeasurementType::Pressure => "CISN",
            MeasurementType::WindVelocity => "WV",
            MeasurementType::WindDirection => "WD",
            MeasurementType::Rainfall => "RAIN",
        }
    }

    /// Number of leading bytes compared against the feed's 4-byte code field.
    pub fn match_len(self) -> usize {
        self.code().len()
    }

    pub fn matches(self, field: &[u8]) -> bool {
        let len = self.match_len();
        field.len() >= len && field[..len] == self.code().as_bytes()[..len]
    }
}

impl fmt::Display for MeasurementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for MeasurementType {
    type Err = MeteoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim();
        MeasurementType::ALL
            .into_iter()
            .find(|kind| kind.code().eq_ignore_ascii_case(code))
            .ok_or_else(|| MeteoError::UnknownCode(code.to_string()))
    }
}

impl TryFrom<usize> for MeasurementType {
    type Error = MeteoError;

    fn try_from(id: usize) -> Result<Self, Self::Error> {
        MeasurementType::ALL
            .get(id)
            .copied()
            .ok_or(MeteoError::UnknownId(id))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MeasurementEntry {
    pub kind: MeasurementType,
    pub value: Option<String>,
    pub truncated: bool,
}

impl MeasurementEntry {
    fn new(kind: MeasurementType) -> Self {
        Self {
            kind,
            value: None,
            truncated: false,
        }
    }

    /// Overwrites the stored reading, cutting it to `MAX_VALUE_LEN` bytes.
    pub(crate) fn store(&mut self, raw: &[u8]) {
        let text = String::from_utf8_lossy(raw);
        let mut end = text.len().min(MAX_VALUE_LEN);
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        self.truncated = end < text.len();
        if self.truncated {
            warn!(
                measurement = %self.kind,
                raw = %text,
                "Reading longer than {} bytes, truncated",
                MAX_VALUE_LEN
            );
        }
        self.value = Some(text[..end].to_string());
    }
}

/// One entry per measurement type, indexed by `MeasurementType::id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeasurementTable {
    entries: [MeasurementEntry; 6],
}

impl Default for MeasurementTable {
    fn default() -> Self {
        Self {
            entries: MeasurementType::ALL.map(MeasurementEntry::new),
        }
    }
}

impl MeasurementTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// First registered type whose code prefixes `field`.
    pub fn identify(field: &[u8]) -> Option<MeasurementType> {
        MeasurementType::ALL
            .into_iter()
            .find(|kind| kind.matches(field))
    }

    pub fn entry(&self, kind: MeasurementType) -> &MeasurementEntry {
        &self.entries[kind.id()]
    }

    pub(crate) fn entry_mut(&mut self, kind: MeasurementType) -> &mut MeasurementEntry {
        &mut self.entries[kind.id()]
    }

    pub fn value(&self, kind: MeasurementType) -> Option<&str> {
        self.entry(kind).value.as_deref()
    }

    pub fn value_by_id(&self, id: usize) -> Option<&str> {
        self.entries.get(id).and_then(|entry| entry.value.as_deref())
    }

    pub fn entries(&self) -> impl Iterator<Item = &MeasurementEntry> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registered_codes_have_no_prefix_collisions() {
        for (i, first) in MeasurementType::ALL.iter().enumerate() {
            for second in &MeasurementType::ALL[i + 1..] {
                assert!(
                    !second.matches(first.code().as_bytes()),
                    "{second} shadows {first}"
                );
                assert!(
                    !first.matches(second.code().as_bytes()),
                    "{first} shadows {second}"
                );
            }
        }
    }

    #[test]
    fn identify_short_codes_on_padded_field() {
        assert_eq!(
            MeasurementTable::identify(b"WV\" unit=\"m/s\">"),
            Some(MeasurementType::WindVelocity)
        );
        assert_eq!(
            MeasurementTable::identify(b"WD  "),
            Some(MeasurementType::WindDirection)
        );
        assert_eq!(
            MeasurementTable::identify(b"WILG"),
            Some(MeasurementType::GustWind)
        );
        assert_eq!(MeasurementTable::identify(b"PM10"), None);
        assert_eq!(MeasurementTable::identify(b"TE"), None);
    }

    #[test]
    fn ids_round_trip_through_try_from() {
        for kind in MeasurementType::ALL {
            assert_eq!(MeasurementType::try_from(kind.id()), Ok(kind));
        }
        assert_eq!(MeasurementType::try_from(6), Err(MeteoError::UnknownId(6)));
    }

    #[test]
    fn parse_code_ignores_case_and_whitespace() {
        assert_eq!(
            " rain ".parse::<MeasurementType>(),
            Ok(MeasurementType::Rainfall)
        );
        assert_eq!(
            "NO2".parse::<MeasurementType>(),
            Err(MeteoError::UnknownCode("NO2".to_string()))
        );
    }

    #[test]
    fn store_truncates_long_values_and_flags_them() {
        let mut entry = MeasurementEntry::new(MeasurementType::Pressure);
        entry.store(b"1013.25");
        assert_eq!(entry.value.as_deref(), Some("1013."));
        assert!(entry.truncated);

        entry.store(b"998");
        assert_eq!(entry.value.as_deref(), Some("998"));
        assert!(!entry.truncated);
    }

    #[test]
    fn store_never_splits_a_char() {
        let mut entry = MeasurementEntry::new(MeasurementType::Temperature);
        entry.store("12.3°C".as_bytes());
        assert_eq!(entry.value.as_deref(), Some("12.3"));
        assert!(entry.truncated);
    }

    #[test]
    fn value_by_id_out_of_range_is_none() {
        let mut table = MeasurementTable::new();
        table.entry_mut(MeasurementType::Rainfall).store(b"0.2");
        assert_eq!(table.value_by_id(5), Some("0.2"));
        assert_eq!(table.value_by_id(0), None);
        assert_eq!(table.value_by_id(6), None);
    }
}
