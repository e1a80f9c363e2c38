//! HL7 `TS` timestamps: `YYYY[MM[DD[HH[MM[SS[.S+]]]]]][+|-ZZZZ]`.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

/// Parse an HL7 timestamp into UTC. Missing components default to the start
/// of the period; timestamps without an offset are taken as UTC.
pub fn parse_hl7_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    let (digits, offset) = split_offset(raw)?;
    let (digits, fraction) = match digits.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (digits, None),
    };
    if !digits.bytes().all(|b| b.is_ascii_digit())
        || !matches!(digits.len(), 4 | 6 | 8 | 10 | 12 | 14)
    {
        return None;
    }

    let field = |start: usize, len: usize, default: u32| -> Option<u32> {
        match digits.get(start..start + len) {
            Some(part) => part.parse().ok(),
            None => Some(default),
        }
    };
    let year: i32 = digits.get(0..4)?.parse().ok()?;
    let date = NaiveDate::from_ymd_opt(year, field(4, 2, 1)?, field(6, 2, 1)?)?;
    let nanos = match fraction {
        Some(fraction) => parse_fraction(fraction)?,
        None => 0,
    };
    let time = NaiveTime::from_hms_nano_opt(
        field(8, 2, 0)?,
        field(10, 2, 0)?,
        field(12, 2, 0)?,
        nanos,
    )?;
    let naive = NaiveDateTime::new(date, time);

    match offset {
        Some(offset) => offset
            .from_local_datetime(&naive)
            .single()
            .map(|at| at.with_timezone(&Utc)),
        None => Some(naive.and_utc()),
    }
}

fn split_offset(raw: &str) -> Option<(&str, Option<FixedOffset>)> {
    let Some(index) = raw.find(['+', '-']) else {
        return Some((raw, None));
    };
    let (digits, zone) = raw.split_at(index);
    let sign = if zone.starts_with('-') { -1 } else { 1 };
    let zone = &zone[1..];
    if zone.len() != 4 || !zone.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hours: i32 = zone[0..2].parse().ok()?;
    let minutes: i32 = zone[2..4].parse().ok()?;
    let offset = FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))?;
    Some((digits, Some(offset)))
}

fn parse_fraction(fraction: &str) -> Option<u32> {
    if fraction.is_empty() || fraction.len() > 9 || !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let value: u32 = fraction.parse().ok()?;
    Some(value * 10u32.pow(9 - fraction.len() as u32))
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, Timelike};

    use super::*;

    #[test]
    fn parses_full_precision_with_offset() {
        let at = parse_hl7_timestamp("20240315103000-0500").expect("timestamp");
        assert_eq!((at.year(), at.month(), at.day()), (2024, 3, 15));
        assert_eq!((at.hour(), at.minute()), (15, 30));
    }

    #[test]
    fn partial_precision_defaults_to_period_start() {
        let at = parse_hl7_timestamp("202403").expect("timestamp");
        assert_eq!((at.year(), at.month(), at.day(), at.hour()), (2024, 3, 1, 0));
        assert!(parse_hl7_timestamp("2024").is_some());
    }

    #[test]
    fn keeps_fractional_seconds() {
        let at = parse_hl7_timestamp("20240315103000.25").expect("timestamp");
        assert_eq!(at.nanosecond(), 250_000_000);
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_hl7_timestamp("").is_none());
        assert!(parse_hl7_timestamp("2024-03-15").is_none());
        assert!(parse_hl7_timestamp("20241345").is_none());
        assert!(parse_hl7_timestamp("20240315+05").is_none());
        assert!(parse_hl7_timestamp("202403151").is_none());
    }
}
