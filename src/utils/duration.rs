//! Duration parsing utilities.
//!
//! Run lengths are written as short strings such as "90s", "2m" or "1h".

/// Unit suffixes and their length in seconds. Longer spellings come first so
/// "5min" is not read as "5mi" + "n".
const UNITS: &[(&str, u64)] = &[
    ("hours", 3600),
    ("hour", 3600),
    ("hrs", 3600),
    ("hr", 3600),
    ("h", 3600),
    ("minutes", 60),
    ("minute", 60),
    ("mins", 60),
    ("min", 60),
    ("m", 60),
    ("seconds", 1),
    ("second", 1),
    ("secs", 1),
    ("sec", 1),
    ("s", 1),
];

/// Parse a duration string (e.g. "60", "60s", "2m", "1h") to whole seconds
///
/// A bare number is taken as seconds.
///
/// # Examples
/// ```
/// use pcdsim::utils::duration::parse_duration_to_seconds;
///
/// assert_eq!(parse_duration_to_seconds("90"), Ok(90));
/// assert_eq!(parse_duration_to_seconds("2m"), Ok(120));
/// assert_eq!(parse_duration_to_seconds("1h"), Ok(3600));
/// assert!(parse_duration_to_seconds("fast").is_err());
/// ```
pub fn parse_duration_to_seconds(duration: &str) -> Result<u64, String> {
    let duration = duration.trim();
    let digits_end = duration
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(duration.len());
    let (number, unit) = duration.split_at(digits_end);

    let value: u64 = number
        .parse()
        .map_err(|_| format!("Invalid duration format: {}", duration))?;

    if unit.is_empty() {
        return Ok(value);
    }

    let multiplier = UNITS
        .iter()
        .find(|(suffix, _)| *suffix == unit.trim())
        .map(|(_, secs)| *secs)
        .ok_or_else(|| format!("Invalid duration unit '{}' in: {}", unit, duration))?;

    value
        .checked_mul(multiplier)
        .ok_or_else(|| format!("Duration overflows: {}", duration))
}
