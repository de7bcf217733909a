//! Parsing of rule duration strings such as `"30s"`, `"5m"` or `"1h"`.

/// Error returned when a duration string does not match `<digits><s|m|h>`.
///
/// # Examples
///
/// ```rust
/// use monres_common::duration::parse_duration_secs;
///
/// let err = parse_duration_secs("5 minutes").unwrap_err();
/// assert!(err.to_string().contains("5 minutes"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DurationParseError {
    #[error("invalid duration '{0}', expected a form like '10s', '5m' or '1h'")]
    InvalidFormat(String),

    #[error("duration '{0}' is out of range")]
    OutOfRange(String),
}

/// Parses a duration string into whole seconds.
///
/// Empty strings and the zero forms (`"0"`, `"0s"`, `"0m"`, `"0h"`) are
/// instantaneous and map to `0`.
///
/// # Examples
///
/// ```
/// use monres_common::duration::parse_duration_secs;
///
/// assert_eq!(parse_duration_secs("").unwrap(), 0);
/// assert_eq!(parse_duration_secs("300s").unwrap(), 300);
/// assert_eq!(parse_duration_secs("5M").unwrap(), 300);
/// assert_eq!(parse_duration_secs("1h").unwrap(), 3600);
/// ```
pub fn parse_duration_secs(s: &str) -> Result<u64, DurationParseError> {
    let lowered = s.trim().to_lowercase();
    if matches!(lowered.as_str(), "" | "0" | "0s" | "0m" | "0h") {
        return Ok(0);
    }

    let Some(unit) = lowered.chars().last() else {
        return Err(DurationParseError::InvalidFormat(s.to_string()));
    };
    let digits = &lowered[..lowered.len() - unit.len_utf8()];
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(DurationParseError::InvalidFormat(s.to_string()));
    }

    let multiplier = match unit {
        's' => 1,
        'm' => 60,
        'h' => 3600,
        _ => return Err(DurationParseError::InvalidFormat(s.to_string())),
    };

    let value: u64 = digits
        .parse()
        .map_err(|_| DurationParseError::OutOfRange(s.to_string()))?;
    value
        .checked_mul(multiplier)
        .ok_or_else(|| DurationParseError::OutOfRange(s.to_string()))
}
