// ABOUTME: Closed registry of named, pure filter functions applied after field extraction.
// ABOUTME: Field queries reference filters by identifier; builtins cover sizes, numbers, times and text cleanup.

//! Filter registry.
//!
//! A filter is a pure function `(FieldValue, args) -> FieldValue`. Site data
//! names filters by identifier, so no site-supplied code is ever evaluated.
//! Every builtin is total: given an empty string it returns a zero value
//! (numeric filters) or the input unchanged.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::config::FilterSpec;
use crate::entity::FieldValue;

/// Signature of a registered filter.
pub type FilterFn = Arc<dyn Fn(FieldValue, &[String]) -> FieldValue + Send + Sync>;

/// Compiled patterns of the `regex` filter, keyed by source text.
static PATTERN_CACHE: Lazy<RwLock<HashMap<String, Option<Regex>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Name-to-function lookup for filters.
#[derive(Clone)]
pub struct FilterRegistry {
    filters: HashMap<String, FilterFn>,
}

impl fmt::Debug for FilterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.filters.keys().collect();
        names.sort();
        f.debug_struct("FilterRegistry").field("filters", &names).finish()
    }
}

impl Default for FilterRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl FilterRegistry {
    /// Creates a registry without any filters.
    pub fn empty() -> Self {
        Self {
            filters: HashMap::new(),
        }
    }

    /// Creates a registry with every builtin filter.
    pub fn builtin() -> Self {
        let mut reg = Self::empty();
        reg.register("trim", |v, _| map_text(v, |s| s.trim().to_string()));
        reg.register("lowercase", |v, _| map_text(v, |s| s.to_lowercase()));
        reg.register("parse_size", |v, _| to_number(v, trawl_units::parse_size));
        reg.register("find_then_parse_size", |v, _| {
            to_number(v, trawl_units::find_then_parse_size)
        });
        reg.register("parse_number", |v, _| to_number(v, trawl_units::parse_number));
        reg.register("find_then_parse_number", |v, _| {
            to_number(v, trawl_units::find_then_parse_number)
        });
        reg.register("parse_float", |v, _| to_number(v, parse_float_prefix));
        reg.register("parse_int", |v, _| {
            to_number(v, |s| parse_float_prefix(s).trunc())
        });
        reg.register("parse_ttl", |v, _| match v {
            FieldValue::Text(s) if s.trim().is_empty() => FieldValue::Number(0.0),
            FieldValue::Text(s) => FieldValue::Number(trawl_units::parse_ttl(&s) as f64),
            other => other,
        });
        reg.register("parse_time", |v, _| parse_time_value(v, None));
        reg.register("parse_time_with_zone", |v, args| {
            parse_time_value(v, args.first().map(String::as_str))
        });
        reg.register("query_param", |v, args| match args.first() {
            Some(key) => map_text(v, |s| query_param(s, key)),
            None => v,
        });
        reg.register("split_first", |v, args| match args.first() {
            Some(sep) => map_text(v, |s| {
                s.split(sep.as_str()).next().unwrap_or("").trim().to_string()
            }),
            None => v,
        });
        reg.register("regex", |v, args| match args.first() {
            Some(pattern) => {
                let group = args.get(1).and_then(|g| g.parse().ok()).unwrap_or(1);
                map_text(v, |s| regex_capture(s, pattern, group))
            }
            None => v,
        });
        reg.register("replace", |v, args| match (args.first(), args.get(1)) {
            (Some(from), to) => {
                let to = to.map(String::as_str).unwrap_or("");
                map_text(v, |s| s.replace(from.as_str(), to))
            }
            _ => v,
        });
        reg.register("cf_decode_email", |v, _| {
            map_text(v, trawl_units::cf_decode_email)
        });
        reg
    }

    /// Registers (or replaces) a filter under `name`.
    pub fn register<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(FieldValue, &[String]) -> FieldValue + Send + Sync + 'static,
    {
        self.filters.insert(name.into(), Arc::new(f));
    }

    /// Binds `offset` as the default of `parse_time_with_zone` calls that pass
    /// no argument of their own.
    pub fn with_default_zone(mut self, offset: &str) -> Self {
        if let Some(inner) = self.filters.get("parse_time_with_zone").cloned() {
            let zone = [offset.to_string()];
            self.filters.insert(
                "parse_time_with_zone".to_string(),
                Arc::new(move |v: FieldValue, args: &[String]| {
                    if args.is_empty() {
                        inner(v, &zone)
                    } else {
                        inner(v, args)
                    }
                }),
            );
        }
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.filters.contains_key(name)
    }

    /// Applies one filter. Unknown names leave the value untouched.
    pub fn apply(&self, spec: &FilterSpec, value: FieldValue) -> FieldValue {
        match self.filters.get(spec.name()) {
            Some(f) => f(value, spec.args()),
            None => {
                tracing::warn!(filter = spec.name(), "unknown filter skipped");
                value
            }
        }
    }

    /// Threads a value through filters in declared order.
    pub fn apply_all(&self, specs: &[FilterSpec], value: FieldValue) -> FieldValue {
        specs.iter().fold(value, |acc, spec| self.apply(spec, acc))
    }
}

fn map_text(value: FieldValue, f: impl FnOnce(&str) -> String) -> FieldValue {
    match value {
        FieldValue::Text(s) => FieldValue::Text(f(&s)),
        other => other,
    }
}

fn to_number(value: FieldValue, f: impl FnOnce(&str) -> f64) -> FieldValue {
    match value {
        FieldValue::Text(s) => FieldValue::Number(f(&s)),
        other => other,
    }
}

static FLOAT_PREFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*[-+]?(?:\d+\.?\d*|\.\d+)(?:[eE][-+]?\d+)?").unwrap());

/// Parses the leading number of a string ("1.234 (ratio)" -> 1.234); 0 when there is none.
fn parse_float_prefix(s: &str) -> f64 {
    FLOAT_PREFIX_RE
        .find(s)
        .and_then(|m| m.as_str().trim().parse().ok())
        .unwrap_or(0.0)
}

fn parse_time_value(value: FieldValue, offset: Option<&str>) -> FieldValue {
    match value {
        FieldValue::Text(s) => match trawl_units::parse_time_with_zone(&s, offset) {
            Some(ms) => FieldValue::Number(ms as f64),
            None => FieldValue::Text(s),
        },
        other => other,
    }
}

/// Reads a query parameter from an absolute or relative link.
fn query_param(link: &str, key: &str) -> String {
    let base = Url::parse("http://localhost/").ok();
    let parsed = Url::parse(link)
        .ok()
        .or_else(|| base.and_then(|b| b.join(link).ok()));
    parsed
        .and_then(|u| {
            u.query_pairs()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.into_owned())
        })
        .unwrap_or_default()
}

fn regex_capture(text: &str, pattern: &str, group: usize) -> String {
    let cached = {
        let cache = PATTERN_CACHE.read().unwrap();
        cache.get(pattern).cloned()
    };
    let compiled = match cached {
        Some(c) => c,
        None => {
            let compiled = Regex::new(pattern).ok();
            let mut cache = PATTERN_CACHE.write().unwrap();
            cache.insert(pattern.to_string(), compiled.clone());
            compiled
        }
    };
    compiled
        .and_then(|re| {
            re.captures(text)
                .and_then(|c| c.get(group).or_else(|| c.get(0)))
                .map(|m| m.as_str().to_string())
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, args: &[&str]) -> FilterSpec {
        FilterSpec::Call {
            name: name.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    fn text(s: &str) -> FieldValue {
        FieldValue::Text(s.to_string())
    }

    #[test]
    fn test_size_filters() {
        let reg = FilterRegistry::builtin();
        assert_eq!(
            reg.apply(&"parse_size".into(), text("1.5 GiB")),
            FieldValue::Number(1.5 * 1024f64.powi(3))
        );
        assert_eq!(reg.apply(&"parse_size".into(), text("")), FieldValue::Number(0.0));
        assert_eq!(
            reg.apply(&"find_then_parse_size".into(), text("Total: 2 MiB")),
            FieldValue::Number(2.0 * 1024.0 * 1024.0)
        );
    }

    #[test]
    fn test_number_filters() {
        let reg = FilterRegistry::builtin();
        assert_eq!(reg.apply(&"parse_float".into(), text("1.234 (ratio)")), FieldValue::Number(1.234));
        assert_eq!(reg.apply(&"parse_float".into(), text("Inf.")), FieldValue::Number(0.0));
        assert_eq!(reg.apply(&"parse_int".into(), text("42.9")), FieldValue::Number(42.0));
        assert_eq!(
            reg.apply(&"find_then_parse_number".into(), text("Bonus 1,000")),
            FieldValue::Number(1000.0)
        );
    }

    #[test]
    fn test_numbers_pass_through_text_filters() {
        let reg = FilterRegistry::builtin();
        assert_eq!(
            reg.apply(&"lowercase".into(), FieldValue::Number(3.0)),
            FieldValue::Number(3.0)
        );
    }

    #[test]
    fn test_query_param() {
        let reg = FilterRegistry::builtin();
        let spec = call("query_param", &["id"]);
        assert_eq!(reg.apply(&spec, text("userdetails.php?id=1234")), text("1234"));
        assert_eq!(
            reg.apply(&spec, text("https://site.org/userdetails.php?x=1&id=9")),
            text("9")
        );
        assert_eq!(reg.apply(&spec, text("userdetails.php")), text(""));
    }

    #[test]
    fn test_split_first() {
        let reg = FilterRegistry::builtin();
        let spec = call("split_first", &[" ("]);
        assert_eq!(
            reg.apply(&spec, text("2020-01-01 10:00:00 (3 years ago)")),
            text("2020-01-01 10:00:00")
        );
    }

    #[test]
    fn test_regex_filter() {
        let reg = FilterRegistry::builtin();
        let spec = call("regex", &[r"id=(\d+)"]);
        assert_eq!(reg.apply(&spec, text("details.php?id=77&hit=1")), text("77"));
        assert_eq!(reg.apply(&spec, text("no id here")), text(""));
        let bad = call("regex", &["("]);
        assert_eq!(reg.apply(&bad, text("abc")), text(""));
    }

    #[test]
    fn test_replace_filter() {
        let reg = FilterRegistry::builtin();
        assert_eq!(reg.apply(&call("replace", &[",", ""]), text("1,234")), text("1234"));
    }

    #[test]
    fn test_time_filters() {
        let reg = FilterRegistry::builtin();
        let zoned = call("parse_time_with_zone", &["+0800"]);
        assert_eq!(
            reg.apply(&zoned, text("2020-01-01 00:00:01")),
            FieldValue::Number(1_577_808_001_000.0)
        );
        assert_eq!(reg.apply(&zoned, text("garbage")), text("garbage"));
        assert_eq!(reg.apply(&"parse_ttl".into(), text("")), FieldValue::Number(0.0));
    }

    #[test]
    fn test_default_zone_applies_without_args() {
        let reg = FilterRegistry::builtin().with_default_zone("+0800");
        assert_eq!(
            reg.apply(&"parse_time_with_zone".into(), text("2020-01-01 00:00:01")),
            FieldValue::Number(1_577_808_001_000.0)
        );
        let utc = call("parse_time_with_zone", &["+0000"]);
        assert_eq!(
            reg.apply(&utc, text("2020-01-01 00:00:00")),
            FieldValue::Number(1_577_836_800_000.0)
        );
    }

    #[test]
    fn test_apply_all_threads_in_order() {
        let reg = FilterRegistry::builtin();
        let specs = vec![call("split_first", &["|"]), FilterSpec::from("parse_size")];
        assert_eq!(
            reg.apply_all(&specs, text("3 KiB | 3072 bytes")),
            FieldValue::Number(3072.0)
        );
    }

    #[test]
    fn test_unknown_filter_is_identity() {
        let reg = FilterRegistry::builtin();
        assert_eq!(reg.apply(&"no_such_filter".into(), text("x")), text("x"));
        assert!(!reg.contains("no_such_filter"));
    }

    #[test]
    fn test_custom_registration() {
        let mut reg = FilterRegistry::empty();
        reg.register("double", |v, _| match v {
            FieldValue::Number(n) => FieldValue::Number(n * 2.0),
            other => other,
        });
        assert_eq!(
            reg.apply(&"double".into(), FieldValue::Number(2.0)),
            FieldValue::Number(4.0)
        );
    }

    #[test]
    fn test_cf_decode_email() {
        let reg = FilterRegistry::builtin();
        assert_eq!(reg.apply(&"cf_decode_email".into(), text("422302206c21")), text("a@b.c"));
    }
}
