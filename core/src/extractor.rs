use crate::measurement::{MeasurementTable, MeasurementType};
use memchr::memchr;
use tracing::{debug, trace};

/// Placeholder the feed uses for a sample slot without a reading.
pub const MISSING_SENTINEL: &[u8] = b"-999";
const VALUE_DELIMITER: u8 = b'|';

/// Bytes between the first `>` and the following `<`.
pub fn tag_body(fragment: &[u8]) -> Option<&[u8]> {
    let start = memchr(b'>', fragment)? + 1;
    let end = memchr(b'<', &fragment[start..])? + start;
    Some(&fragment[start..end])
}

/// Most recent usable value of an oldest-to-newest series `v1|v2|...|vN|`.
///
/// Only `|`-terminated tokens count. Tokens starting with the missing-data
/// sentinel are skipped; an empty token is a reading of `""`.
pub fn latest_value(body: &[u8]) -> Option<&[u8]> {
    let mut latest = None;
    let mut rest = body;
    while let Some(end) = memchr(VALUE_DELIMITER, rest) {
        let token = &rest[..end];
        rest = &rest[end + 1..];
        if token.starts_with(MISSING_SENTINEL) {
            trace!(token = %String::from_utf8_lossy(token), "Skipping sample");
            continue;
        }
        latest = Some(token);
    }
    latest
}

/// Handles the part of a line that follows `<substance type=`.
///
/// Returns the measurement whose entry was overwritten, if any. Unknown codes,
/// missing delimiters and all-sentinel series leave the table untouched.
pub fn identify_and_extract(
    fragment: &[u8],
    table: &mut MeasurementTable,
) -> Option<MeasurementType> {
    // skip the attribute's opening quote
    let field = fragment.get(1..)?;
    let Some(kind) = MeasurementTable::identify(field) else {
        trace!(
            fragment = %String::from_utf8_lossy(fragment),
            "Unregistered substance"
        );
        return None;
    };
    let body = tag_body(&field[kind.match_len()..])?;
    let value = latest_value(body)?;
    let entry = table.entry_mut(kind);
    entry.store(value);
    debug!(
        measurement = %kind,
        value = entry.value.as_deref(),
        "Reading updated"
    );
    Some(kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(fragment: &str, table: &mut MeasurementTable) -> Option<MeasurementType> {
        identify_and_extract(fragment.as_bytes(), table)
    }

    #[test]
    fn latest_value_skips_sentinels() {
        assert_eq!(latest_value(b"-999|-999|12.3|"), Some(&b"12.3"[..]));
        assert_eq!(latest_value(b"-999|-999|-999|"), None);
        assert_eq!(latest_value(b"4.1|-999.0|"), Some(&b"4.1"[..]));
    }

    #[test]
    fn latest_value_last_wins() {
        assert_eq!(latest_value(b"10|11|12|"), Some(&b"12"[..]));
        assert_eq!(latest_value(b"10|11|-999|"), Some(&b"11"[..]));
    }

    #[test]
    fn latest_value_ignores_unterminated_tokens() {
        assert_eq!(latest_value(b"10|11|12"), Some(&b"11"[..]));
        assert_eq!(latest_value(b""), None);
        assert_eq!(latest_value(b"12"), None);
    }

    #[test]
    fn empty_token_is_a_reading() {
        assert_eq!(latest_value(b"7||"), Some(&b""[..]));
        assert_eq!(latest_value(b"|-999|"), Some(&b""[..]));
        assert_eq!(latest_value(b"||8|"), Some(&b"8"[..]));
    }

    #[test]
    fn empty_token_clears_previous_value() {
        let mut table = MeasurementTable::new();
        extract("\"TEMP\">4.2|</substance>", &mut table);
        let kind = extract("\"TEMP\">5||</substance>", &mut table);
        assert_eq!(kind, Some(MeasurementType::Temperature));
        assert_eq!(table.value(MeasurementType::Temperature), Some(""));
    }

    #[test]
    fn sentinel_check_does_not_leak_between_tokens() {
        assert_eq!(latest_value(b"-999x|-9|"), Some(&b"-9"[..]));
    }

    #[test]
    fn tag_body_requires_both_delimiters() {
        assert_eq!(tag_body(b"\" unit=\"C\">1|2|</substance>"), Some(&b"1|2|"[..]));
        assert_eq!(tag_body(b"\" unit=\"C\" 1|2|"), None);
        assert_eq!(tag_body(b"\">1|2|"), None);
    }

    #[test]
    fn extracts_into_matching_entry() {
        let mut table = MeasurementTable::new();
        let kind = extract("\"TEMP\" unit=\"C\">-999|7.5|</substance>", &mut table);
        assert_eq!(kind, Some(MeasurementType::Temperature));
        assert_eq!(table.value(MeasurementType::Temperature), Some("7.5"));
    }

    #[test]
    fn short_codes_match_on_prefix() {
        let mut table = MeasurementTable::new();
        extract("\"WV\">3.2|3.4|</substance>", &mut table);
        extract("\"WD  \">180|190|</substance>", &mut table);
        assert_eq!(table.value(MeasurementType::WindVelocity), Some("3.4"));
        assert_eq!(table.value(MeasurementType::WindDirection), Some("190"));
    }

    #[test]
    fn all_sentinel_series_keeps_previous_value() {
        let mut table = MeasurementTable::new();
        extract("\"RAIN\">0.4|</substance>", &mut table);
        let kind = extract("\"RAIN\">-999|-999|-999|</substance>", &mut table);
        assert_eq!(kind, None);
        assert_eq!(table.value(MeasurementType::Rainfall), Some("0.4"));
    }

    #[test]
    fn unknown_code_is_a_no_op() {
        let mut table = MeasurementTable::new();
        extract("\"CISN\">1002|</substance>", &mut table);
        let before = table.clone();
        assert_eq!(extract("\"PM10\">55|</substance>", &mut table), None);
        assert_eq!(table, before);
    }

    #[test]
    fn missing_body_delimiters_are_a_no_op() {
        let mut table = MeasurementTable::new();
        assert_eq!(extract("\"TEMP\" 1|2|", &mut table), None);
        assert_eq!(extract("\"TEMP\">1|2|", &mut table), None);
        assert_eq!(extract("", &mut table), None);
        assert_eq!(table.value(MeasurementType::Temperature), None);
    }

    #[test]
    fn extraction_touches_only_its_own_entry() {
        let mut table = MeasurementTable::new();
        extract("\"WILG\">12|14|</substance>", &mut table);
        extract("\"TEMP\">3|</substance>", &mut table);
        assert_eq!(table.value(MeasurementType::GustWind), Some("14"));
        for kind in MeasurementType::ALL {
            if !matches!(kind, MeasurementType::GustWind | MeasurementType::Temperature) {
                assert_eq!(table.value(kind), None, "{kind}");
            }
        }
    }
}
