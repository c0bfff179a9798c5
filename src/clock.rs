use std::error::Error;
use std::fmt;

use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime, UtcOffset};

pub fn now_ms() -> i64 {
    to_ms(OffsetDateTime::now_utc())
}

pub fn to_ms(at: OffsetDateTime) -> i64 {
    (at.unix_timestamp_nanos() / 1_000_000) as i64
}

pub fn from_ms(ms: i64) -> Option<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(ms) * 1_000_000).ok()
}

/// The machine's UTC offset, or UTC when it cannot be determined.
pub fn local_offset() -> UtcOffset {
    UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC)
}

/// Accepts RFC3339, or `YYYY-MM-DD HH:MM` interpreted at `offset`.
pub fn parse_when(raw: &str, offset: UtcOffset) -> Result<OffsetDateTime, ParseWhenError> {
    let trimmed = raw.trim();
    if let Ok(at) = OffsetDateTime::parse(trimmed, &Rfc3339) {
        return Ok(at);
    }

    let format = format_description!("[year]-[month]-[day] [hour]:[minute]");
    PrimitiveDateTime::parse(trimmed, format)
        .map(|local| local.assume_offset(offset))
        .map_err(|_| ParseWhenError {
            value: raw.to_string(),
        })
}

/// `yyyy-MM-dd HH:mm` at `offset`, as shown in listings.
pub fn format_label(ms: i64, offset: UtcOffset) -> String {
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]");
    from_ms(ms)
        .and_then(|at| at.to_offset(offset).format(format).ok())
        .unwrap_or_else(|| format!("@{ms}"))
}

pub fn format_clock(ms: i64, offset: UtcOffset) -> String {
    let format = format_description!("[hour]:[minute]");
    from_ms(ms)
        .and_then(|at| at.to_offset(offset).format(format).ok())
        .unwrap_or_else(|| "--:--".to_string())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseWhenError {
    value: String,
}

impl fmt::Display for ParseWhenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid time '{}', expected RFC3339 or 'YYYY-MM-DD HH:MM'",
            self.value
        )
    }
}

impl Error for ParseWhenError {}

#[cfg(test)]
mod tests {
    use time::macros::{datetime, offset};
    use time::UtcOffset;

    use super::{format_clock, format_label, from_ms, parse_when, to_ms};

    #[test]
    fn parses_local_minutes_at_given_offset() {
        let at = parse_when("2026-10-20 09:30", offset!(+2)).expect("local time should parse");
        assert_eq!(at, datetime!(2026-10-20 09:30 +2));
    }

    #[test]
    fn parses_rfc3339_with_its_own_offset() {
        let at = parse_when("2026-10-20T09:30:00Z", offset!(+2)).expect("rfc3339 should parse");
        assert_eq!(at, datetime!(2026-10-20 09:30 UTC));
    }

    #[test]
    fn rejects_other_shapes() {
        let err = parse_when("tomorrow 9am", UtcOffset::UTC).expect_err("should fail");
        assert!(err.to_string().contains("'tomorrow 9am'"));
        assert!(parse_when("2026-10-20", UtcOffset::UTC).is_err());
    }

    #[test]
    fn millisecond_conversions_agree() {
        let at = datetime!(2026-10-20 09:30:00.250 UTC);
        let ms = to_ms(at);
        assert_eq!(ms % 1_000, 250);
        assert_eq!(from_ms(ms), Some(at));
    }

    #[test]
    fn labels_render_in_requested_offset() {
        let ms = to_ms(datetime!(2026-10-20 07:05 UTC));
        assert_eq!(format_label(ms, offset!(+2)), "2026-10-20 09:05");
        assert_eq!(format_clock(ms, UtcOffset::UTC), "07:05");
    }
}
