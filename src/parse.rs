//! Field-level parsing shared by every ingestor.
//!
//! None of these functions fail: malformed text, suppression markers and
//! empty cells all come back as `None`.

use regex::Regex;
use std::sync::LazyLock;

static NON_SLUG_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9\s-]").expect("valid slug pattern"));
static SLUG_SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s_]+").expect("valid separator pattern"));
static REPEATED_DASHES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-+").expect("valid dash pattern"));

/// Suppressed values are published as `*`, `<10` style ranges, or a lone dash.
fn is_suppressed(raw: &str) -> bool {
    raw.contains('*') || raw.contains('<') || raw.trim() == "-"
}

/// Round to one decimal, ties to the even digit of the exact binary value.
/// Precision formatting rounds that way; `f64::round` would not.
pub fn round1(value: f64) -> f64 {
    format!("{:.1}", value).parse().unwrap_or(value)
}

/// Parse a rate, rounded to one decimal.
pub fn parse_rate(raw: &str) -> Option<f64> {
    if is_suppressed(raw) {
        return None;
    }
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(round1)
}

/// Parse an integer count. Whole-number decimals (`"25.0"`) are accepted
/// since spreadsheet exports often write integers that way.
pub fn parse_count(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    if let Ok(value) = trimmed.parse::<i64>() {
        return Some(value);
    }
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && v.fract() == 0.0)
        .map(|v| v as i64)
}

/// Parse a rate that may be published either as a fraction (`0.87`) or a
/// percentage (`87`). Values at or below 1 are rescaled to percent.
pub fn parse_percentage(raw: &str) -> Option<f64> {
    parse_rate(raw).map(|v| if v <= 1.0 { round1(v * 100.0) } else { v })
}

/// Parse a district or school identifier.
pub fn parse_code(raw: &str) -> Option<u32> {
    parse_count(raw).and_then(|v| u32::try_from(v).ok())
}

/// Upper-cased, trimmed form used for name joins.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_uppercase()
}

/// Missing cells arrive either empty or as the literal `NAN` marker.
pub fn is_missing_marker(normalized: &str) -> bool {
    normalized.is_empty() || normalized == "NAN"
}

/// Capitalize the first letter of each alphabetic run, lower-case the rest.
pub fn title_case(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut prev_is_letter = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            if prev_is_letter {
                result.extend(c.to_lowercase());
            } else {
                result.extend(c.to_uppercase());
            }
            prev_is_letter = true;
        } else {
            result.push(c);
            prev_is_letter = false;
        }
    }
    result
}

/// URL-friendly slug for a school name.
pub fn create_slug(name: &str) -> String {
    let lower = name.to_lowercase();
    let cleaned = NON_SLUG_CHARS.replace_all(&lower, "");
    let dashed = SLUG_SEPARATORS.replace_all(&cleaned, "-");
    let collapsed = REPEATED_DASHES.replace_all(&dashed, "-");
    collapsed.trim_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rate_rejects_suppression_markers() {
        assert_eq!(parse_rate("*"), None);
        assert_eq!(parse_rate("<5%"), None);
        assert_eq!(parse_rate(" - "), None);
        assert_eq!(parse_rate("**"), None);
    }

    #[test]
    fn test_parse_rate_rounds_to_one_decimal() {
        assert_eq!(parse_rate("87.46"), Some(87.5));
        assert_eq!(parse_rate(" 90 "), Some(90.0));
        assert_eq!(parse_rate("-4.2"), Some(-4.2));
    }

    #[test]
    fn test_parse_rate_rounds_ties_to_even() {
        assert_eq!(parse_rate("87.25"), Some(87.2));
        assert_eq!(parse_rate("19.45"), Some(19.4));
        assert_eq!(parse_rate("91.35"), Some(91.3));
        assert_eq!(parse_rate("87.75"), Some(87.8));
    }

    #[test]
    fn test_round1_matches_shared_rounding() {
        assert_eq!(round1(0.25), 0.2);
        assert_eq!(round1(70.375), 70.4);
        assert_eq!(round1(-4.25), -4.2);
    }

    #[test]
    fn test_parse_rate_never_fails_on_garbage() {
        assert_eq!(parse_rate(""), None);
        assert_eq!(parse_rate("n/a"), None);
        assert_eq!(parse_rate("NaN"), None);
    }

    #[test]
    fn test_parse_percentage_rescales_fractions() {
        assert_eq!(parse_percentage("0.5"), Some(50.0));
        assert_eq!(parse_percentage("50"), Some(50.0));
        assert_eq!(parse_percentage("0.873"), Some(90.0));
        assert_eq!(parse_percentage("*"), None);
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count("125"), Some(125));
        assert_eq!(parse_count("125.0"), Some(125));
        assert_eq!(parse_count("12.5"), None);
        assert_eq!(parse_count("*"), None);
        assert_eq!(parse_code("-3"), None);
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("DAVIDSON"), "Davidson");
        assert_eq!(title_case("VAN BUREN"), "Van Buren");
        assert_eq!(title_case("mcminn"), "Mcminn");
    }

    #[test]
    fn test_create_slug() {
        assert_eq!(create_slug("Oak Ridge High School"), "oak-ridge-high-school");
        assert_eq!(create_slug("St. Mary's - Academy"), "st-marys-academy");
        assert_eq!(create_slug("  Early_College  "), "early-college");
    }
}
