//! Parser for the remote sensor listing
//!
//! The remote script prints one `<sensor id>\t<milli-degrees>` line per
//! sensor. Anything else (a truncated last line, a device whose read failed)
//! is ignored line by line; the rest of the output is still used.

use std::fmt;

/// A single decoded sensor line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorReading {
    /// Sensor ID with the family prefix stripped (e.g. `0316a279f1ff`)
    pub sensor_id: String,
    /// Temperature in milli-degrees Celsius
    pub raw_value: i64,
}

impl SensorReading {
    /// Creates a reading
    #[must_use]
    pub fn new(sensor_id: impl Into<String>, raw_value: i64) -> Self {
        Self {
            sensor_id: sensor_id.into(),
            raw_value,
        }
    }

    /// Temperature formatted with one decimal place
    #[must_use]
    pub fn display_value(&self) -> String {
        format_temperature(self.raw_value)
    }
}

/// Why a line was not turned into a reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The line does not have exactly two tab-separated fields
    FieldCount,
    /// The sensor ID field is empty
    EmptyId,
    /// The value field is not a decimal integer
    InvalidValue,
}

impl fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FieldCount => f.write_str("expected two tab-separated fields"),
            Self::EmptyId => f.write_str("empty sensor id"),
            Self::InvalidValue => f.write_str("value is not an integer"),
        }
    }
}

/// Result of classifying one output line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedLine {
    /// A valid reading
    Reading(SensorReading),
    /// A line that was dropped
    Ignored(IgnoreReason),
}

/// Classifies a single output line
///
/// A trailing `\r` or `\n` is stripped before splitting on tab.
#[must_use]
pub fn classify_line(line: &str) -> ParsedLine {
    let line = line.trim_end_matches(['\r', '\n']);
    let mut fields = line.split('\t');
    let (Some(id), Some(value), None) = (fields.next(), fields.next(), fields.next()) else {
        return ParsedLine::Ignored(IgnoreReason::FieldCount);
    };

    let id = id.trim();
    if id.is_empty() {
        return ParsedLine::Ignored(IgnoreReason::EmptyId);
    }

    match value.trim().parse::<i64>() {
        Ok(raw_value) => ParsedLine::Reading(SensorReading::new(id, raw_value)),
        Err(_) => ParsedLine::Ignored(IgnoreReason::InvalidValue),
    }
}

/// Lazily parses captured output into readings, skipping ignored lines
pub fn parse_output(output: &str) -> impl Iterator<Item = SensorReading> + '_ {
    output
        .lines()
        .filter(|line| !line.is_empty())
        .filter_map(|line| match classify_line(line) {
            ParsedLine::Reading(reading) => Some(reading),
            ParsedLine::Ignored(reason) => {
                tracing::trace!(line, %reason, "Ignoring sensor line");
                None
            }
        })
}

/// Formats milli-degrees as a one-decimal fixed-point string
///
/// Rounds half up at the hundredths digit: `(raw + 50) / 100` with floor
/// division, then places the decimal point before the last digit.
/// `23456` gives `"23.5"`, `1000` gives `"1.0"`, `-1250` gives `"-1.2"`.
#[must_use]
pub fn format_temperature(raw: i64) -> String {
    let scaled = raw.saturating_add(50).div_euclid(100);
    let sign = if scaled < 0 { "-" } else { "" };
    let magnitude = scaled.unsigned_abs();
    format!("{sign}{}.{}", magnitude / 10, magnitude % 10)
}
