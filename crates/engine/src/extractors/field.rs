// ABOUTME: Field extraction: evaluates one FieldQuery against an HTML selection or a JSON value.
// ABOUTME: Walks the selector fallback chain, runs the filter pipeline and resolves misses to zero values.

//! Field extraction.
//!
//! Selectors are tried strictly in order. A selector whose raw value is empty
//! misses without running filters; otherwise the filters run and a non-empty
//! result wins. When every selector misses, the pipeline runs once over `""`
//! so numeric fields come out as `0` instead of text.

use dom_query::Selection;
use serde_json::Value;

use crate::config::FieldQuery;
use crate::entity::FieldValue;
use crate::extractors::compiled::get_or_compile;
use crate::extractors::json_path;
use crate::filters::FilterRegistry;

/// What a field query reads from.
#[derive(Clone, Copy)]
pub enum ValueSource<'a> {
    /// A row or section of a parsed document; selectors match its descendants.
    Html(&'a Selection<'a>),
    /// A JSON row or body; selectors are paths.
    Json(&'a Value),
}

/// Collapses runs of whitespace into single spaces.
fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Turns a dataset key into its attribute name: `torrentId` -> `data-torrent-id`.
pub fn data_attribute(key: &str) -> String {
    let mut attr = String::from("data-");
    for c in key.chars() {
        if c.is_ascii_uppercase() {
            attr.push('-');
            attr.push(c.to_ascii_lowercase());
        } else {
            attr.push(c);
        }
    }
    attr
}

/// Reads the raw, trimmed value of a single selector.
fn read_raw(source: ValueSource<'_>, selector: &str, query: &FieldQuery) -> String {
    match source {
        ValueSource::Html(selection) => {
            let matcher = match get_or_compile(selector) {
                Some(m) => m,
                None => return String::new(),
            };
            let found = selection.select_matcher(&matcher).first();
            if !found.exists() {
                return String::new();
            }
            if let Some(key) = &query.data {
                let attr = data_attribute(key);
                return found
                    .attr(&attr)
                    .map(|v| v.trim().to_string())
                    .unwrap_or_default();
            }
            if let Some(attr) = &query.attr {
                return found
                    .attr(attr)
                    .map(|v| v.trim().to_string())
                    .unwrap_or_default();
            }
            normalize_whitespace(&found.text())
        }
        ValueSource::Json(value) => json_path::scalar_text(json_path::lookup(value, selector))
            .trim()
            .to_string(),
    }
}

/// Extracts one field value.
///
/// Never fails: a query that matches nothing resolves to the zero value of
/// its filter pipeline.
pub fn extract(source: ValueSource<'_>, query: &FieldQuery, filters: &FilterRegistry) -> FieldValue {
    query
        .selector
        .as_slice()
        .iter()
        .find_map(|selector| {
            let raw = read_raw(source, selector, query);
            if raw.is_empty() {
                return None;
            }
            let value = filters.apply_all(&query.filters, FieldValue::Text(raw));
            (!value.is_empty()).then_some(value)
        })
        .unwrap_or_else(|| filters.apply_all(&query.filters, FieldValue::default()))
}
