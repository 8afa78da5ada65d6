// ABOUTME: Timestamp parsing for listing dates published in a site's own timezone.
// ABOUTME: Re-interprets naive datetimes with an explicit UTC offset and returns epoch milliseconds.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

static OFFSET_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([+-])(\d{2}):?(\d{2})$").unwrap());

/// Formats sites print without any timezone information.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%d %b %Y %H:%M:%S",
    "%b %d %Y, %H:%M",
];

const NAIVE_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

/// Parses an offset such as `+0800`, `+08:00`, `-0530` or `Z`.
pub fn parse_offset(offset: &str) -> Option<FixedOffset> {
    let offset = offset.trim();
    if offset.eq_ignore_ascii_case("z") || offset.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0);
    }
    let caps = OFFSET_RE.captures(offset)?;
    let hours: i32 = caps[2].parse().ok()?;
    let minutes: i32 = caps[3].parse().ok()?;
    let secs = hours * 3600 + minutes * 60;
    if &caps[1] == "-" {
        FixedOffset::west_opt(secs)
    } else {
        FixedOffset::east_opt(secs)
    }
}

/// Parses a datetime without timezone information.
pub fn parse_naive(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(naive);
        }
    }
    for fmt in NAIVE_DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, fmt) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    None
}

/// Interprets an all-digit value as an epoch: 10 digits are seconds, 13 digits milliseconds.
fn parse_epoch(value: &str) -> Option<i64> {
    if !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    match value.len() {
        10 => value.parse::<i64>().ok().map(|secs| secs * 1000),
        13 => value.parse::<i64>().ok(),
        _ => None,
    }
}

/// Parses a timestamp string without a site offset, assuming UTC for naive values.
pub fn parse_time(value: &str) -> Option<i64> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Some(ms) = parse_epoch(value) {
        return Some(ms);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.timestamp_millis());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Some(dt.timestamp_millis());
    }
    if let Some(naive) = parse_naive(value) {
        return Some(Utc.from_utc_datetime(&naive).timestamp_millis());
    }
    dateparser::parse(value).ok().map(|dt| dt.timestamp_millis())
}

/// Parses a timestamp printed in a site's local time into epoch milliseconds.
///
/// - Without an offset (or with an unparsable one) this is [`parse_time`].
/// - Epoch values (10 or 13 digits) already name an instant and are returned as milliseconds.
/// - Naive datetimes are read as wall-clock time at `offset`.
/// - Values carrying their own zone keep it.
pub fn parse_time_with_zone(value: &str, offset: Option<&str>) -> Option<i64> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    let fixed = match offset.and_then(parse_offset) {
        Some(fixed) => fixed,
        None => return parse_time(value),
    };
    if let Some(ms) = parse_epoch(value) {
        return Some(ms);
    }
    if let Some(naive) = parse_naive(value) {
        return fixed
            .from_local_datetime(&naive)
            .single()
            .map(|dt| dt.timestamp_millis());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.timestamp_millis());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Some(dt.timestamp_millis());
    }
    // free-form shapes: dateparser reads naive ones at the given offset
    dateparser::parse_with_timezone(value, &fixed)
        .ok()
        .map(|dt| dt.timestamp_millis())
}
