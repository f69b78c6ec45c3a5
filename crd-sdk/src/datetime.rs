//! Conversion between the stored canonical instant form and the
//! operator-editable local wall-clock form.
//!
//! Stored form: RFC 3339 UTC instant. Editable form: `YYYY-MM-DDTHH:MM`,
//! minute precision, no timezone suffix, interpreted in the caller's
//! timezone. Bad input never errors: it degrades to empty / absent.

use chrono::{DateTime, LocalResult, NaiveDateTime, SecondsFormat, TimeZone, Utc};

/// Editable wall-clock format, minute precision.
pub const EDITABLE_FORMAT: &str = "%Y-%m-%dT%H:%M";

const EDITABLE_FORMAT_SECONDS: &str = "%Y-%m-%dT%H:%M:%S";

/// Render a stored instant as editable local wall-clock text in `tz`.
///
/// Absent or unparseable input yields the empty string. Sub-minute
/// precision is dropped.
pub fn to_editable_in<Tz: TimeZone>(stored: Option<&str>, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let Some(raw) = stored else {
        return String::new();
    };
    match DateTime::parse_from_rfc3339(raw) {
        Ok(instant) => instant.with_timezone(tz).format(EDITABLE_FORMAT).to_string(),
        Err(_) => String::new(),
    }
}

/// Parse editable text as wall-clock time in `tz` and return the
/// canonical UTC instant string.
///
/// Blank or unparseable input yields `None`. Seconds are accepted on
/// input. Round-trip: `to_editable_in(to_stored_in(x))` reproduces `x`
/// at minute precision for any `x` that parses.
pub fn to_stored_in<Tz: TimeZone>(editable: &str, tz: &Tz) -> Option<String> {
    let trimmed = editable.trim();
    if trimmed.is_empty() {
        return None;
    }
    let naive = NaiveDateTime::parse_from_str(trimmed, EDITABLE_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(trimmed, EDITABLE_FORMAT_SECONDS))
        .ok()?;
    let local = resolve_local(tz, naive)?;
    Some(
        local
            .with_timezone(&Utc)
            .to_rfc3339_opts(SecondsFormat::Secs, true),
    )
}

/// [`to_editable_in`] bound to the host timezone.
pub fn to_editable(stored: Option<&str>) -> String {
    to_editable_in(stored, &chrono::Local)
}

/// [`to_stored_in`] bound to the host timezone.
pub fn to_stored(editable: &str) -> Option<String> {
    to_stored_in(editable, &chrono::Local)
}

/// Resolve a naive wall-clock time in `tz`, taking the earlier of two
/// ambiguous mappings and rejecting times that fall in a DST gap.
pub(crate) fn resolve_local<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> Option<DateTime<Tz>> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(instant) => Some(instant),
        LocalResult::Ambiguous(earliest, _) => Some(earliest),
        LocalResult::None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn kolkata() -> FixedOffset {
        // UTC+05:30, no DST
        FixedOffset::east_opt(5 * 3600 + 1800).unwrap()
    }

    #[test]
    fn test_round_trip_minute_precision() {
        let tz = kolkata();
        for input in ["2024-01-02T10:00", "2024-06-30T23:59", "2023-02-28T00:01"] {
            let stored = to_stored_in(input, &tz).unwrap();
            assert_eq!(to_editable_in(Some(&stored), &tz), input);
        }
    }

    #[test]
    fn test_to_stored_converts_to_utc() {
        let tz = kolkata();
        let stored = to_stored_in("2024-01-02T10:00", &tz).unwrap();
        assert_eq!(stored, "2024-01-02T04:30:00Z");
    }

    #[test]
    fn test_to_stored_blank_is_absent() {
        assert_eq!(to_stored_in("", &Utc), None);
        assert_eq!(to_stored_in("   \t ", &Utc), None);
    }

    #[test]
    fn test_to_stored_garbage_is_absent() {
        assert_eq!(to_stored_in("not-a-date", &Utc), None);
        assert_eq!(to_stored_in("2024-13-40T99:99", &Utc), None);
    }

    #[test]
    fn test_to_stored_accepts_seconds_and_truncates() {
        let stored = to_stored_in("2024-01-02T10:00:45", &Utc).unwrap();
        assert_eq!(stored, "2024-01-02T10:00:45Z");
        assert_eq!(to_editable_in(Some(&stored), &Utc), "2024-01-02T10:00");
    }

    #[test]
    fn test_to_editable_absent_is_empty() {
        assert_eq!(to_editable_in(None, &Utc), "");
    }

    #[test]
    fn test_to_editable_unparseable_degrades_to_empty() {
        assert_eq!(to_editable_in(Some("yesterday"), &Utc), "");
        assert_eq!(to_editable_in(Some("2024-01-02"), &Utc), "");
    }

    #[test]
    fn test_to_editable_shifts_into_zone() {
        let tz = kolkata();
        assert_eq!(
            to_editable_in(Some("2024-01-02T04:30:00Z"), &tz),
            "2024-01-02T10:00"
        );
    }

    #[test]
    fn test_to_editable_accepts_offset_instants() {
        // Hosted stores often emit +00:00 instead of Z
        assert_eq!(
            to_editable_in(Some("2024-01-02T10:00:00+00:00"), &Utc),
            "2024-01-02T10:00"
        );
    }
}
