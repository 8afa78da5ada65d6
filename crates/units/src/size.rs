// ABOUTME: Byte-size string parsing for tracker listings and user statistics.
// ABOUTME: Converts strings like "1.5 GiB" or "700 MB" into byte counts using binary (1024) scaling.

use once_cell::sync::Lazy;
use regex::Regex;

/// Unit letters in ascending order; the index + 1 is the power of 1024.
const UNIT_LETTERS: &str = "KMGTPEZ";

/// A full size string: magnitude, optional unit letter with optional `i` and `B`, optional plural `s`.
static SIZE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(\d*\.?\d+)\s*(?:([KMGTPEZ])(?:i?B)?|B)?s?$").unwrap()
});

/// A size-looking token somewhere inside free text, e.g. "12.3 GiB (13,207,024,435 bytes)".
static SIZE_TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:\d[\d,]*(?:\.\d+)?|\.\d+)\s*(?:[KMGTPEZ]i?)?B").unwrap());

/// Parses a size string into bytes.
///
/// Accepts a decimal magnitude followed by an optional unit (`K`, `M`, `G`, `T`,
/// `P`, `E`, `Z`), each with or without the binary `i` marker and trailing `B`.
/// Every unit scales by `1024^n`; a bare number or a plain `B` is taken as bytes.
/// Thousands separators are ignored. Anything else yields `0.0`.
pub fn parse_size(text: &str) -> f64 {
    let cleaned = text.trim().replace(',', "");
    let caps = match SIZE_RE.captures(&cleaned) {
        Some(c) => c,
        None => return 0.0,
    };

    let magnitude: f64 = match caps[1].parse() {
        Ok(v) => v,
        Err(_) => return 0.0,
    };

    let power = caps
        .get(2)
        .and_then(|m| {
            let letter = m.as_str().to_ascii_uppercase();
            UNIT_LETTERS.find(letter.as_str())
        })
        .map(|idx| idx as i32 + 1)
        .unwrap_or(0);

    magnitude * 1024f64.powi(power)
}

/// Finds the first size-looking token in free text and parses it.
///
/// Returns `0.0` when the text contains no size.
pub fn find_then_parse_size(text: &str) -> f64 {
    SIZE_TOKEN_RE
        .find(text)
        .map(|m| parse_size(m.as_str()))
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

    #[test]
    fn test_binary_units() {
        assert_eq!(parse_size("1.5 GiB"), 1.5 * GIB);
        assert_eq!(parse_size("1 KiB"), 1024.0);
        assert_eq!(parse_size("2 TiB"), 2.0 * 1024f64.powi(4));
        assert_eq!(parse_size("1 ZiB"), 1024f64.powi(7));
    }

    #[test]
    fn test_decimal_looking_units_still_scale_by_1024() {
        assert_eq!(parse_size("700 MB"), 700.0 * 1024.0 * 1024.0);
        assert_eq!(parse_size("3.2GB"), 3.2 * GIB);
    }

    #[test]
    fn test_case_insensitive_and_plural() {
        assert_eq!(parse_size("1 gib"), GIB);
        assert_eq!(parse_size("4 GBs"), 4.0 * GIB);
    }

    #[test]
    fn test_bare_number_and_bytes() {
        assert_eq!(parse_size("10"), 10.0);
        assert_eq!(parse_size("512 B"), 512.0);
        assert_eq!(parse_size(".5 K"), 512.0);
    }

    #[test]
    fn test_thousands_separator() {
        assert_eq!(parse_size("1,024 KB"), 1024.0 * 1024.0);
    }

    #[test]
    fn test_unmatched_is_zero() {
        assert_eq!(parse_size("bogus"), 0.0);
        assert_eq!(parse_size(""), 0.0);
        assert_eq!(parse_size("GiB"), 0.0);
    }

    #[test]
    fn test_find_then_parse_size() {
        assert_eq!(
            find_then_parse_size("12.3 GiB (13,207,024,435 bytes)"),
            12.3 * GIB
        );
        assert_eq!(find_then_parse_size("Uploaded: 100 MiB"), 100.0 * 1024.0 * 1024.0);
        assert_eq!(find_then_parse_size("nothing here"), 0.0);
    }

    #[test]
    fn test_find_leading_dot_magnitude() {
        assert_eq!(find_then_parse_size("Size: .5 GiB"), 0.5 * GIB);
        assert_eq!(find_then_parse_size(".5 GiB"), 0.5 * GIB);
    }
}
