// ABOUTME: Number scraping helpers for counters such as bonus points, seeders and message counts.
// ABOUTME: Handles thousands separators and numbers embedded in surrounding text.

use once_cell::sync::Lazy;
use regex::Regex;

static NUMBER_TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"-?\d[\d,]*(?:\.\d+)?|-?\.\d+").unwrap());

/// Parses a whole string as a number, ignoring thousands separators.
///
/// Returns `0.0` when the string is not numeric.
pub fn parse_number(text: &str) -> f64 {
    text.trim().replace(',', "").parse().unwrap_or(0.0)
}

/// Finds the first number in free text, e.g. "Bonus: 12,345.6 (view)" -> 12345.6.
pub fn find_then_parse_number(text: &str) -> f64 {
    NUMBER_TOKEN_RE
        .find(text)
        .map(|m| parse_number(m.as_str()))
        .unwrap_or(0.0)
}
