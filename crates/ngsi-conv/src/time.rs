//! Timestamp normalization
//!
//! The backend stores timestamps in whatever shape its clients wrote; the
//! gateway always emits UTC. Naive timestamps are interpreted as UTC.
//! Unparsable input is returned verbatim so callers can decide the
//! fallback instead of failing the whole conversion.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, TimeZone, Utc};
use ngsi_core::TemporalKind;

/// Normalizes `raw` according to the temporal kind: full RFC 3339 with
/// milliseconds for `DateTime`, date-only and time-only renderings for the
/// other kinds.
pub fn normalize(kind: TemporalKind, raw: &str) -> String {
    match kind {
        TemporalKind::DateTime => to_utc_iso(raw).unwrap_or_else(|| raw.to_string()),
        TemporalKind::Date => parse_utc(raw)
            .map(|dt| dt.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| raw.to_string()),
        TemporalKind::Time => normalize_time(raw).unwrap_or_else(|| raw.to_string()),
    }
}

/// Parses `raw` and renders it as an RFC 3339 UTC timestamp with
/// millisecond precision. `None` when the input is unparsable.
pub fn to_utc_iso(raw: &str) -> Option<String> {
    parse_utc(raw).map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
}

fn normalize_time(raw: &str) -> Option<String> {
    if let Ok(time) = NaiveTime::parse_from_str(raw, "%H:%M:%S%.f") {
        return Some(time.format("%H:%M:%S").to_string());
    }
    if let Ok(time) = NaiveTime::parse_from_str(raw, "%H:%M") {
        return Some(time.format("%H:%M:%S").to_string());
    }
    parse_utc(raw).map(|dt| dt.format("%H:%M:%S").to_string())
}

fn parse_utc(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_utc_with_milliseconds() {
        assert_eq!(
            to_utc_iso("2023-05-01T10:20:30+02:00").as_deref(),
            Some("2023-05-01T08:20:30.000Z")
        );
        assert_eq!(
            to_utc_iso("2023-05-01T10:20:30Z").as_deref(),
            Some("2023-05-01T10:20:30.000Z")
        );
    }

    #[test]
    fn naive_input_is_read_as_utc() {
        assert_eq!(
            to_utc_iso("2023-05-01T10:20:30").as_deref(),
            Some("2023-05-01T10:20:30.000Z")
        );
    }

    #[test]
    fn date_and_time_kinds_truncate() {
        assert_eq!(
            normalize(TemporalKind::Date, "2023-05-01T10:20:30Z"),
            "2023-05-01"
        );
        assert_eq!(normalize(TemporalKind::Time, "10:20:30.5"), "10:20:30");
    }

    #[test]
    fn unparsable_input_is_kept_verbatim() {
        assert_eq!(normalize(TemporalKind::DateTime, "not-a-date"), "not-a-date");
        assert_eq!(to_utc_iso("not-a-date"), None);
    }
}
