// ABOUTME: Extraction output types: FieldValue scalars and flat Entity records.
// ABOUTME: Also defines SearchFilter, the caller's keyword and category constraints.

use std::borrow::Cow;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A scalar produced by the field extractor and threaded through filters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
}

impl Default for FieldValue {
    fn default() -> Self {
        FieldValue::Text(String::new())
    }
}

impl FieldValue {
    /// Text that is blank after trimming is empty. Numbers never are, zero included.
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Text(s) => s.trim().is_empty(),
            FieldValue::Number(_) => false,
        }
    }

    /// Whether this is what a missed field extracts to: blank text or `0`.
    pub fn is_zero_value(&self) -> bool {
        match self {
            FieldValue::Text(s) => s.trim().is_empty(),
            FieldValue::Number(n) => *n == 0.0,
        }
    }

    /// The value as text; whole numbers print without a fractional part.
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            FieldValue::Text(s) => Cow::Borrowed(s.as_str()),
            FieldValue::Number(n) => Cow::Owned(format_number(*n)),
        }
    }

    /// The value as a number, parsing text when needed.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            FieldValue::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_text())
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        FieldValue::Number(n)
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// One extracted record: a flat, ordered mapping from field name to scalar.
///
/// Fields that could not be found are present with their zero value; callers
/// read a zero value as "unknown", not as a failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Entity {
    fields: IndexMap<String, FieldValue>,
}

/// A search result row.
pub type Torrent = Entity;

/// A merged user statistics record.
pub type UserProfile = Entity;

impl Entity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: FieldValue) {
        self.fields.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Text of a field, empty when absent.
    pub fn text(&self, name: &str) -> String {
        self.get(name).map(|v| v.as_text().into_owned()).unwrap_or_default()
    }

    /// Numeric value of a field, if present and numeric.
    pub fn number(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(FieldValue::as_f64)
    }

    /// Copies every field of `other` into this entity, replacing existing values.
    pub fn merge(&mut self, other: Entity) {
        self.fields.extend(other.fields);
    }

    /// Like [`Entity::merge`], but a zero value never replaces a filled one.
    pub fn merge_filled(&mut self, other: Entity) {
        for (name, value) in other.fields {
            match self.fields.get(&name) {
                Some(existing) if value.is_zero_value() && !existing.is_zero_value() => {}
                _ => {
                    self.fields.insert(name, value);
                }
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// One category constraint of a search, e.g. `cat=1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryConstraint {
    pub key: String,
    pub value: String,
}

/// Keywords plus category constraints for a search request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFilter {
    #[serde(default)]
    pub keywords: Option<String>,
    #[serde(default)]
    pub categories: Vec<CategoryConstraint>,
}

impl SearchFilter {
    pub fn keywords(keywords: impl Into<String>) -> Self {
        Self {
            keywords: Some(keywords.into()),
            categories: Vec::new(),
        }
    }

    pub fn category(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.categories.push(CategoryConstraint {
            key: key.into(),
            value: value.into(),
        });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emptiness() {
        assert!(FieldValue::Text("   ".to_string()).is_empty());
        assert!(!FieldValue::Text("x".to_string()).is_empty());
        assert!(!FieldValue::Number(0.0).is_empty());
    }

    #[test]
    fn test_as_text_formats_whole_numbers() {
        assert_eq!(FieldValue::Number(42.0).as_text(), "42");
        assert_eq!(FieldValue::Number(1.5).as_text(), "1.5");
    }

    #[test]
    fn test_entity_serializes_flat_in_insertion_order() {
        let mut entity = Entity::new();
        entity.insert("title", FieldValue::from("Some.Release.1080p"));
        entity.insert("size", FieldValue::from(1024.0));
        let json = serde_json::to_string(&entity).unwrap();
        assert_eq!(json, r#"{"title":"Some.Release.1080p","size":1024.0}"#);
    }

    #[test]
    fn test_merge_replaces_existing() {
        let mut a = Entity::new();
        a.insert("id", FieldValue::from("1"));
        a.insert("name", FieldValue::from("alice"));
        let mut b = Entity::new();
        b.insert("id", FieldValue::from("2"));
        b.insert("uploaded", FieldValue::from(10.0));
        a.merge(b);
        assert_eq!(a.text("id"), "2");
        assert_eq!(a.text("name"), "alice");
        assert_eq!(a.number("uploaded"), Some(10.0));
        assert_eq!(a.len(), 3);
    }

    #[test]
    fn test_merge_filled_keeps_earlier_values() {
        let mut a = Entity::new();
        a.insert("id", FieldValue::from("1"));
        a.insert("name", FieldValue::from(""));
        let mut b = Entity::new();
        b.insert("id", FieldValue::from(""));
        b.insert("name", FieldValue::from("alice"));
        b.insert("uploaded", FieldValue::from(0.0));
        a.insert("ratio", FieldValue::from(2.5));
        b.insert("ratio", FieldValue::from(0.0));
        a.merge_filled(b);
        assert_eq!(a.text("id"), "1");
        assert_eq!(a.text("name"), "alice");
        assert_eq!(a.number("uploaded"), Some(0.0));
        assert_eq!(a.number("ratio"), Some(2.5));
    }

    #[test]
    fn test_search_filter_builder() {
        let filter = SearchFilter::keywords("ubuntu").category("cat", "1");
        assert_eq!(filter.keywords.as_deref(), Some("ubuntu"));
        assert_eq!(filter.categories.len(), 1);
    }
}
