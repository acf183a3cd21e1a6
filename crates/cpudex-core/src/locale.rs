//! # Locale-Aware Numeric Parsing
//!
//! The import format writes decimal numbers with a comma as the fractional
//! separator ("3,7" means 3.7) and leaves missing values blank. This module
//! isolates that conversion as pure string transforms so the rest of the
//! import pipeline never touches locale details.
//!
//! Blank input maps to "no value" (`None`), never to zero.

use thiserror::Error;

/// A numeric cell that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("not a number: `{0}`")]
pub struct ParseNumberError(pub String);

/// Replace the decimal comma with a period: `"3,7"` -> `"3.7"`.
///
/// Leading/trailing whitespace is stripped. No other transformation happens;
/// input already using a period passes through unchanged.
#[must_use]
pub fn normalize_decimal(raw: &str) -> String {
    raw.trim().replace(',', ".")
}

/// Parse an optional decimal cell. Blank -> `Ok(None)`.
pub fn parse_decimal(raw: &str) -> Result<Option<f64>, ParseNumberError> {
    let normalized = normalize_decimal(raw);
    if normalized.is_empty() {
        return Ok(None);
    }
    normalized
        .parse::<f64>()
        .map(Some)
        .map_err(|_| ParseNumberError(raw.trim().to_string()))
}

/// Parse an optional count cell (cores, threads).
///
/// The source sometimes writes counts with a trailing fraction ("64,0"); a
/// value is accepted when it is a whole non-negative number.
pub fn parse_count(raw: &str) -> Result<Option<u32>, ParseNumberError> {
    match parse_decimal(raw)? {
        None => Ok(None),
        Some(v) if v >= 0.0 && v.fract() == 0.0 && v <= f64::from(u32::MAX) => Ok(Some(v as u32)),
        Some(_) => Err(ParseNumberError(raw.trim().to_string())),
    }
}

/// Parse an optional year cell. Range checking happens during validation.
pub fn parse_year(raw: &str) -> Result<Option<i32>, ParseNumberError> {
    match parse_decimal(raw)? {
        None => Ok(None),
        Some(v) if v.fract() == 0.0 && v >= f64::from(i32::MIN) && v <= f64::from(i32::MAX) => {
            Ok(Some(v as i32))
        }
        Some(_) => Err(ParseNumberError(raw.trim().to_string())),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use proptest::prelude::*;

    #[test]
    fn comma_becomes_period() {
        assert_eq!(normalize_decimal("3,7"), "3.7");
        assert_eq!(normalize_decimal(" 256,5 "), "256.5");
    }

    #[test]
    fn period_passes_through() {
        assert_eq!(normalize_decimal("3.7"), "3.7");
    }

    #[test]
    fn blank_is_no_value_not_zero() {
        assert_eq!(parse_decimal("").unwrap(), None);
        assert_eq!(parse_decimal("   ").unwrap(), None);
        assert_eq!(parse_count("").unwrap(), None);
        assert_eq!(parse_year("").unwrap(), None);
    }

    #[test]
    fn decimal_comma_parses() {
        assert_eq!(parse_decimal("3,7").unwrap(), Some(3.7));
        assert_eq!(parse_decimal("1,5").unwrap(), Some(1.5));
    }

    #[test]
    fn garbage_reports_original_text() {
        let err = parse_decimal("fast").unwrap_err();
        assert_eq!(err, ParseNumberError("fast".to_string()));
    }

    #[test]
    fn count_accepts_whole_values_only() {
        assert_eq!(parse_count("64").unwrap(), Some(64));
        assert_eq!(parse_count("64,0").unwrap(), Some(64));
        assert!(parse_count("64,5").is_err());
        assert!(parse_count("-4").is_err());
    }

    #[test]
    fn year_parses_as_integer() {
        assert_eq!(parse_year("2021").unwrap(), Some(2021));
        assert_eq!(parse_year("2021,0").unwrap(), Some(2021));
        assert!(parse_year("soon").is_err());
    }

    proptest! {
        /// Comma-decimal and period-decimal spellings of the same number
        /// parse to the same value.
        #[test]
        fn comma_and_period_agree(int_part in 0u32..100_000, frac_part in 0u32..100) {
            let comma = format!("{int_part},{frac_part:02}");
            let period = format!("{int_part}.{frac_part:02}");
            let a = parse_decimal(&comma).unwrap().unwrap();
            let b = period.parse::<f64>().unwrap();
            prop_assert_eq!(a, b);
        }

        /// Whole counts survive the decimal path unchanged.
        #[test]
        fn counts_round_trip(n in 0u32..1_000_000) {
            prop_assert_eq!(parse_count(&n.to_string()).unwrap(), Some(n));
        }
    }
}
