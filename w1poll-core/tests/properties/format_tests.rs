//! Property tests for temperature formatting

use proptest::prelude::*;
use w1poll_core::parser::format_temperature;

/// Checks the `-?\d+\.\d` shape without a regex engine
fn has_fixed_point_shape(s: &str) -> bool {
    let unsigned = s.strip_prefix('-').unwrap_or(s);
    let Some((int, frac)) = unsigned.split_once('.') else {
        return false;
    };
    !int.is_empty()
        && int.bytes().all(|b| b.is_ascii_digit())
        && frac.len() == 1
        && frac.bytes().all(|b| b.is_ascii_digit())
}

/// Tenths of a degree encoded in a formatted value
fn tenths(s: &str) -> i128 {
    s.replace('.', "").parse().unwrap()
}

proptest! {
    /// Property: every value formats as an optional sign, digits, a dot and one digit
    #[test]
    fn format_has_fixed_point_shape(raw in any::<i64>()) {
        let formatted = format_temperature(raw);
        prop_assert!(has_fixed_point_shape(&formatted), "bad shape: {}", formatted);
    }

    /// Property: formatting never decreases as the raw value grows
    #[test]
    fn format_is_monotonic(a in -200_000i64..200_000, b in -200_000i64..200_000) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(tenths(&format_temperature(lo)) <= tenths(&format_temperature(hi)));
    }

    /// Property: the result is the raw value rounded to the nearest tenth
    #[test]
    fn format_rounds_to_nearest_tenth(raw in -1_000_000i64..1_000_000) {
        let value = tenths(&format_temperature(raw));
        let exact = i128::from(raw);
        // Within half a tenth, ties rounding up
        prop_assert!(value * 100 - exact <= 50);
        prop_assert!(exact - value * 100 < 50);
    }

    /// Property: whole milli-degree multiples of 100 format exactly
    #[test]
    fn format_exact_tenths(tenth in -10_000i64..10_000) {
        prop_assert_eq!(tenths(&format_temperature(tenth * 100)), i128::from(tenth));
    }
}

#[test]
fn format_reference_values() {
    assert_eq!(format_temperature(23456), "23.5");
    assert_eq!(format_temperature(10000), "10.0");
    assert_eq!(format_temperature(1000), "1.0");
    assert_eq!(format_temperature(0), "0.0");
    assert_eq!(format_temperature(-1250), "-1.2");
    assert_eq!(format_temperature(123_456), "123.5");
}
