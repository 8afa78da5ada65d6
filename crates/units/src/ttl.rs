// ABOUTME: Relative duration parsing for "uploaded 3 days ago" style listing columns.
// ABOUTME: Canonicalizes localized unit tokens and subtracts each quantity from the current instant.

use chrono::{DateTime, Duration, Months, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

/// Canonical duration units, in the order they are subtracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateUnit {
    Year,
    Quarter,
    Month,
    Week,
    Day,
    Hour,
    Minute,
    Second,
}

impl DateUnit {
    pub const ALL: [DateUnit; 8] = [
        DateUnit::Year,
        DateUnit::Quarter,
        DateUnit::Month,
        DateUnit::Week,
        DateUnit::Day,
        DateUnit::Hour,
        DateUnit::Minute,
        DateUnit::Second,
    ];
}

/// Unit tokens as they appear on sites, mapped onto the canonical vocabulary.
const UNIT_TOKENS: &[(&str, DateUnit)] = &[
    ("year", DateUnit::Year),
    ("years", DateUnit::Year),
    ("yr", DateUnit::Year),
    ("yrs", DateUnit::Year),
    ("y", DateUnit::Year),
    ("年", DateUnit::Year),
    ("quarter", DateUnit::Quarter),
    ("quarters", DateUnit::Quarter),
    ("季", DateUnit::Quarter),
    ("季度", DateUnit::Quarter),
    ("month", DateUnit::Month),
    ("months", DateUnit::Month),
    ("mo", DateUnit::Month),
    ("mos", DateUnit::Month),
    ("月", DateUnit::Month),
    ("个月", DateUnit::Month),
    ("week", DateUnit::Week),
    ("weeks", DateUnit::Week),
    ("wk", DateUnit::Week),
    ("wks", DateUnit::Week),
    ("w", DateUnit::Week),
    ("周", DateUnit::Week),
    ("星期", DateUnit::Week),
    ("day", DateUnit::Day),
    ("days", DateUnit::Day),
    ("d", DateUnit::Day),
    ("天", DateUnit::Day),
    ("日", DateUnit::Day),
    ("hour", DateUnit::Hour),
    ("hours", DateUnit::Hour),
    ("hr", DateUnit::Hour),
    ("hrs", DateUnit::Hour),
    ("h", DateUnit::Hour),
    ("时", DateUnit::Hour),
    ("小时", DateUnit::Hour),
    ("minute", DateUnit::Minute),
    ("minutes", DateUnit::Minute),
    ("min", DateUnit::Minute),
    ("mins", DateUnit::Minute),
    ("m", DateUnit::Minute),
    ("分", DateUnit::Minute),
    ("分钟", DateUnit::Minute),
    ("second", DateUnit::Second),
    ("seconds", DateUnit::Second),
    ("sec", DateUnit::Second),
    ("secs", DateUnit::Second),
    ("s", DateUnit::Second),
    ("秒", DateUnit::Second),
];

/// A quantity followed by a latin word or a run of CJK characters.
static QUANTITY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)\s*(\p{Han}+|[A-Za-z]+)").unwrap());

/// Maps a raw unit token to its canonical unit.
///
/// Exact matches win. CJK runs often carry trailing words ("3天前"), so those
/// fall back to the longest known token the run starts with.
pub fn canonical_unit(token: &str) -> Option<DateUnit> {
    let lower = token.to_lowercase();
    if let Some((_, unit)) = UNIT_TOKENS.iter().find(|(t, _)| *t == lower) {
        return Some(*unit);
    }
    if !lower.chars().next().map(|c| c.is_ascii()).unwrap_or(true) {
        return UNIT_TOKENS
            .iter()
            .filter(|(t, _)| lower.starts_with(t))
            .max_by_key(|(t, _)| t.len())
            .map(|(_, unit)| *unit);
    }
    None
}

/// Parses a relative duration such as "2 days 3 hours" or "1天2小时" into the
/// epoch timestamp (seconds) that far before now.
pub fn parse_ttl(text: &str) -> i64 {
    parse_ttl_at(text, Utc::now())
}

/// Same as [`parse_ttl`] with an explicit reference instant.
///
/// For each canonical unit only the first quantity found counts. Text
/// without any recognizable quantity returns `now` unchanged.
pub fn parse_ttl_at(text: &str, now: DateTime<Utc>) -> i64 {
    let mut quantities: Vec<(DateUnit, u32)> = Vec::new();
    for caps in QUANTITY_RE.captures_iter(text) {
        let Some(unit) = canonical_unit(&caps[2]) else {
            continue;
        };
        if quantities.iter().any(|(u, _)| *u == unit) {
            continue;
        }
        if let Ok(n) = caps[1].parse::<u32>() {
            quantities.push((unit, n));
        }
    }

    let mut instant = now;
    for unit in DateUnit::ALL {
        if let Some((_, n)) = quantities.iter().find(|(u, _)| *u == unit) {
            instant = subtract(instant, unit, *n);
        }
    }
    instant.timestamp()
}

fn subtract(instant: DateTime<Utc>, unit: DateUnit, n: u32) -> DateTime<Utc> {
    let n64 = i64::from(n);
    let shifted = match unit {
        DateUnit::Year => instant.checked_sub_months(Months::new(n.saturating_mul(12))),
        DateUnit::Quarter => instant.checked_sub_months(Months::new(n.saturating_mul(3))),
        DateUnit::Month => instant.checked_sub_months(Months::new(n)),
        DateUnit::Week => instant.checked_sub_signed(Duration::weeks(n64)),
        DateUnit::Day => instant.checked_sub_signed(Duration::days(n64)),
        DateUnit::Hour => instant.checked_sub_signed(Duration::hours(n64)),
        DateUnit::Minute => instant.checked_sub_signed(Duration::minutes(n64)),
        DateUnit::Second => instant.checked_sub_signed(Duration::seconds(n64)),
    };
    shifted.unwrap_or(instant)
}
