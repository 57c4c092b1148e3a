//! Property tests for the sensor output parser

use proptest::prelude::*;
use w1poll_core::parser::{IgnoreReason, ParsedLine, SensorReading, classify_line, parse_output};

/// Sensor IDs as they appear after the family prefix is stripped
fn sensor_id_strategy() -> impl Strategy<Value = String> {
    "[0-9a-f]{12}"
}

fn readings_strategy() -> impl Strategy<Value = Vec<(String, i64)>> {
    prop::collection::vec((sensor_id_strategy(), -55_000i64..125_000), 0..16)
}

proptest! {
    /// Property: well-formed output parses back to the same readings in order
    #[test]
    fn well_formed_output_is_fully_parsed(readings in readings_strategy()) {
        let output: String = readings
            .iter()
            .map(|(id, value)| format!("{id}\t{value}\n"))
            .collect();

        let parsed: Vec<SensorReading> = parse_output(&output).collect();
        let expected: Vec<SensorReading> = readings
            .iter()
            .map(|(id, value)| SensorReading::new(id.clone(), *value))
            .collect();
        prop_assert_eq!(parsed, expected);
    }

    /// Property: lines without a tab never produce a reading
    #[test]
    fn lines_without_tab_are_ignored(line in "[^\t\r\n]{0,40}") {
        prop_assert_eq!(classify_line(&line), ParsedLine::Ignored(IgnoreReason::FieldCount));
    }

    /// Property: garbage lines between valid ones do not affect the valid ones
    #[test]
    fn garbage_lines_are_skipped(
        readings in readings_strategy(),
        garbage in prop::collection::vec("[a-z ]{1,20}", 0..8),
    ) {
        let mut output = String::new();
        for (i, (id, value)) in readings.iter().enumerate() {
            if let Some(junk) = garbage.get(i) {
                output.push_str(junk);
                output.push('\n');
            }
            output.push_str(&format!("{id}\t{value}\n"));
        }

        prop_assert_eq!(parse_output(&output).count(), readings.len());
    }
}

#[test]
fn single_field_line_is_dropped() {
    assert_eq!(
        classify_line("onlyonefield"),
        ParsedLine::Ignored(IgnoreReason::FieldCount)
    );
    assert_eq!(parse_output("onlyonefield\n").count(), 0);
}

#[test]
fn truncated_last_line_is_dropped() {
    let parsed: Vec<_> = parse_output("A1\t23456\nA2\t").collect();
    assert_eq!(parsed, vec![SensorReading::new("A1", 23456)]);
}

#[test]
fn crlf_output_is_accepted() {
    let parsed: Vec<_> = parse_output("A1\t23456\r\nA2\t10000\r\n").collect();
    assert_eq!(parsed.len(), 2);
    assert_eq!(parsed[1], SensorReading::new("A2", 10000));
}
