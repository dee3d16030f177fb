//! ISO 8601 duration conversion
//!
//! Statements report session duration as an ISO 8601 duration string.
//! Only hour/minute/second components are supported; durations carrying
//! year, month, week or day components are rejected rather than guessed at,
//! since their length depends on the calendar.

use std::fmt::Write as _;

use crate::error::ValidationError;

/// Convert a millisecond count to an ISO 8601 duration string
///
/// The value is rounded to the nearest 0.01 seconds. Negative durations are
/// prefixed with `-`.
pub fn millis_to_iso8601(millis: i64) -> String {
    // round to nearest 0.01 seconds
    let mut centis = ((millis as f64) / 10.0).round() as i64;

    let mut result = String::new();
    if centis < 0 {
        result.push('-');
        centis = -centis;
    }
    result.push_str("PT");

    let hours = centis / 360_000;
    let minutes = (centis % 360_000) / 6_000;
    let sec_centis = centis % 6_000;

    if hours > 0 {
        let _ = write!(result, "{hours}H");
    }
    if minutes > 0 {
        let _ = write!(result, "{minutes}M");
    }

    let whole = sec_centis / 100;
    let frac = sec_centis % 100;
    if frac == 0 {
        let _ = write!(result, "{whole}S");
    } else if frac % 10 == 0 {
        let _ = write!(result, "{whole}.{}S", frac / 10);
    } else {
        let _ = write!(result, "{whole}.{frac:02}S");
    }

    result
}

/// Convert an ISO 8601 duration string to milliseconds
///
/// Accepts `PT[nH][nM][n[.nn]S]` with an optional leading `-`. A component
/// that is absent counts as zero.
pub fn iso8601_to_millis(value: &str) -> Result<i64, ValidationError> {
    let body = value.strip_prefix('-').unwrap_or(value);
    let negative = body.len() != value.len();

    let t = body
        .find('T')
        .ok_or_else(|| ValidationError::InvalidDuration(value.to_string()))?;
    let date_part = &body[..t];
    if date_part
        .chars()
        .any(|c| matches!(c, 'Y' | 'M' | 'W' | 'D'))
    {
        return Err(ValidationError::UnsupportedDuration(value.to_string()));
    }
    if date_part != "P" {
        return Err(ValidationError::InvalidDuration(value.to_string()));
    }

    let mut rest = &body[t + 1..];
    let hours = take_component(&mut rest, 'H', value)?;
    let minutes = take_component(&mut rest, 'M', value)?;
    let seconds = take_seconds(&mut rest, value)?;
    if !rest.is_empty() {
        return Err(ValidationError::InvalidDuration(value.to_string()));
    }

    let millis = hours * 3_600_000 + minutes * 60_000 + (seconds * 1000.0).round() as i64;

    Ok(if negative { -millis } else { millis })
}

fn take_component(rest: &mut &str, marker: char, original: &str) -> Result<i64, ValidationError> {
    match rest.find(marker) {
        Some(idx) => {
            let parsed = rest[..idx]
                .parse::<i64>()
                .map_err(|_| ValidationError::InvalidDuration(original.to_string()))?;
            *rest = &rest[idx + 1..];
            Ok(parsed)
        }
        None => Ok(0),
    }
}

fn take_seconds(rest: &mut &str, original: &str) -> Result<f64, ValidationError> {
    match rest.find('S') {
        Some(idx) => {
            let parsed = rest[..idx]
                .parse::<f64>()
                .map_err(|_| ValidationError::InvalidDuration(original.to_string()))?;
            *rest = &rest[idx + 1..];
            Ok(parsed)
        }
        None => Ok(0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_seconds_only() {
        assert_eq!(millis_to_iso8601(2000), "PT2S");
        assert_eq!(millis_to_iso8601(2500), "PT2.5S");
        assert_eq!(millis_to_iso8601(2250), "PT2.25S");
    }

    #[test]
    fn formats_zero() {
        assert_eq!(millis_to_iso8601(0), "PT0S");
    }

    #[test]
    fn formats_hours_minutes_seconds() {
        assert_eq!(millis_to_iso8601(3_600_000), "PT1H0S");
        assert_eq!(millis_to_iso8601(3_661_000), "PT1H1M1S");
        assert_eq!(millis_to_iso8601(90_000), "PT1M30S");
    }

    #[test]
    fn formats_negative() {
        assert_eq!(millis_to_iso8601(-2500), "-PT2.5S");
    }

    #[test]
    fn rounds_to_centiseconds() {
        assert_eq!(millis_to_iso8601(1004), "PT1S");
        assert_eq!(millis_to_iso8601(1005), "PT1.01S");
    }

    #[test]
    fn parses_seconds_only() {
        assert_eq!(iso8601_to_millis("PT2S").unwrap(), 2000);
        assert_eq!(iso8601_to_millis("PT2.5S").unwrap(), 2500);
    }

    #[test]
    fn parses_hours_minutes_seconds() {
        assert_eq!(iso8601_to_millis("PT1H1M1S").unwrap(), 3_661_000);
        assert_eq!(iso8601_to_millis("PT1M30S").unwrap(), 90_000);
    }

    #[test]
    fn parses_missing_components_as_zero() {
        assert_eq!(iso8601_to_millis("PT1H").unwrap(), 3_600_000);
        assert_eq!(iso8601_to_millis("PT").unwrap(), 0);
    }

    #[test]
    fn parses_negative() {
        assert_eq!(iso8601_to_millis("-PT2.5S").unwrap(), -2500);
    }

    #[test]
    fn rejects_date_components() {
        assert!(matches!(
            iso8601_to_millis("P1DT2H"),
            Err(ValidationError::UnsupportedDuration(_))
        ));
        assert!(matches!(
            iso8601_to_millis("P1Y2M3DT4H"),
            Err(ValidationError::UnsupportedDuration(_))
        ));
    }

    #[test]
    fn rejects_missing_time_designator() {
        assert!(matches!(
            iso8601_to_millis("1H30M"),
            Err(ValidationError::InvalidDuration(_))
        ));
    }

    #[test]
    fn rejects_garbage_components() {
        assert!(iso8601_to_millis("PTxS").is_err());
        assert!(iso8601_to_millis("PT1H2X").is_err());
    }

    #[test]
    fn round_trips_representable_durations() {
        for millis in [0, 10, 1500, 60_000, 3_600_000, 5_432_100] {
            let formatted = millis_to_iso8601(millis);
            assert_eq!(iso8601_to_millis(&formatted).unwrap(), millis);
        }
    }
}
