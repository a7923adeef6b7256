//! # ISO-8601 Duration Parsing
//!
//! Sleep states declare their delay as an ISO-8601 duration string. The
//! engine accepts the designators `W` (weeks), `D` (days), `H` (hours),
//! `M` (minutes), and `S` (seconds, optionally fractional). Year and
//! month designators are rejected: they have no fixed length and a
//! workflow sleeping for months is almost certainly a mistake.

use std::time::Duration;
use thiserror::Error;

/// Failure while parsing an ISO-8601 duration string.
#[derive(Debug, Clone, Error)]
#[error("invalid ISO-8601 duration '{input}': {reason}")]
pub struct DurationError {
    pub input: String,
    pub reason: String,
}

const SECONDS_PER_WEEK: u64 = 7 * 24 * 60 * 60;
const SECONDS_PER_DAY: u64 = 24 * 60 * 60;
const SECONDS_PER_HOUR: u64 = 60 * 60;
const SECONDS_PER_MINUTE: u64 = 60;

/// Parse an ISO-8601 duration like `PT5S`, `PT1H30M`, or `P2W`.
pub fn parse_iso8601_duration(input: &str) -> Result<Duration, DurationError> {
    let error = |reason: &str| DurationError {
        input: input.to_string(),
        reason: reason.to_string(),
    };

    let trimmed = input.trim();
    let Some(body) = trimmed.strip_prefix('P') else {
        return Err(error("must start with 'P'"));
    };

    let mut whole_seconds: u64 = 0;
    let mut fractional_seconds: f64 = 0.0;
    let mut components = 0usize;
    let mut in_time_part = false;
    let mut chars = body.chars().peekable();

    while let Some(&character) = chars.peek() {
        if character == 'T' || character == 't' {
            if in_time_part {
                return Err(error("repeated 'T' time designator"));
            }
            in_time_part = true;
            chars.next();
            continue;
        }

        let mut number = String::new();
        while let Some(&digit) = chars.peek() {
            if digit.is_ascii_digit() || digit == '.' {
                number.push(digit);
                chars.next();
            } else {
                break;
            }
        }
        if number.is_empty() {
            return Err(error(&format!("expected a number before '{character}'")));
        }

        let Some(designator) = chars.next() else {
            return Err(error("number is missing a unit designator"));
        };
        let designator = designator.to_ascii_uppercase();

        let is_fractional = number.contains('.');
        if is_fractional && designator != 'S' {
            return Err(error("fractions are only allowed on the seconds component"));
        }

        let multiplier = match (in_time_part, designator) {
            (false, 'W') => SECONDS_PER_WEEK,
            (false, 'D') => SECONDS_PER_DAY,
            (false, 'Y') | (false, 'M') => {
                return Err(error("year and month designators are not supported"));
            }
            (true, 'H') => SECONDS_PER_HOUR,
            (true, 'M') => SECONDS_PER_MINUTE,
            (true, 'S') => 1,
            (false, 'H') | (false, 'S') => {
                return Err(error(&format!("'{designator}' must appear after the 'T' time designator")));
            }
            (_, other) => return Err(error(&format!("unknown duration designator '{other}'"))),
        };

        if is_fractional {
            let value: f64 = number
                .parse()
                .map_err(|_| error(&format!("invalid number '{number}'")))?;
            fractional_seconds += value;
        } else {
            let value: u64 = number
                .parse()
                .map_err(|_| error(&format!("invalid number '{number}'")))?;
            whole_seconds = whole_seconds
                .checked_add(value.checked_mul(multiplier).ok_or_else(|| error("duration overflows"))?)
                .ok_or_else(|| error("duration overflows"))?;
        }
        components += 1;
    }

    if components == 0 {
        return Err(error("must contain at least one component"));
    }

    let duration = Duration::from_secs(whole_seconds) + Duration::from_secs_f64(fractional_seconds);
    Ok(duration)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_seconds() {
        assert_eq!(parse_iso8601_duration("PT1S").expect("parse"), Duration::from_secs(1));
        assert_eq!(parse_iso8601_duration("PT90S").expect("parse"), Duration::from_secs(90));
    }

    #[test]
    fn parses_fractional_seconds() {
        assert_eq!(
            parse_iso8601_duration("PT0.5S").expect("parse"),
            Duration::from_millis(500)
        );
        assert_eq!(
            parse_iso8601_duration("PT1M4.5S").expect("parse"),
            Duration::from_millis(64_500)
        );
    }

    #[test]
    fn parses_weeks_as_fixed_days() {
        assert_eq!(
            parse_iso8601_duration("P2W").expect("parse"),
            Duration::from_secs(14 * 24 * 60 * 60)
        );
    }

    #[test]
    fn parses_combined_components() {
        assert_eq!(
            parse_iso8601_duration("P1DT2H3M4S").expect("parse"),
            Duration::from_secs(24 * 3600 + 2 * 3600 + 3 * 60 + 4)
        );
    }

    #[test]
    fn rejects_shorthand_notation() {
        let error = parse_iso8601_duration("2h30m").expect_err("should reject shorthand");
        assert!(error.to_string().contains("must start with 'P'"), "unexpected error: {error}");
    }

    #[test]
    fn rejects_minutes_outside_time_part() {
        // 'M' before 'T' means months, which have no fixed length
        let error = parse_iso8601_duration("P3M").expect_err("should reject months");
        assert!(error.to_string().contains("not supported"), "unexpected error: {error}");
    }

    #[test]
    fn rejects_empty_duration() {
        let error = parse_iso8601_duration("P").expect_err("should reject empty body");
        assert!(
            error.to_string().contains("at least one component"),
            "unexpected error: {error}"
        );
    }

    #[test]
    fn rejects_missing_designator() {
        let error = parse_iso8601_duration("PT5").expect_err("should require a unit");
        assert!(error.to_string().contains("unit designator"), "unexpected error: {error}");
    }

    #[test]
    fn rejects_fraction_on_non_seconds() {
        let error = parse_iso8601_duration("PT1.5H").expect_err("should reject fractional hours");
        assert!(error.to_string().contains("seconds component"), "unexpected error: {error}");
    }
}
