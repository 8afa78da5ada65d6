// ABOUTME: Path lookups into JSON values for sites whose APIs return JSON instead of HTML.
// ABOUTME: Supports dotted keys, numeric indexes and quoted bracket keys, e.g. data.items[0]['name'].

use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Key(String),
    Index(usize),
}

/// Splits a path like `a.b[0]['c.d']` into segments. Returns `None` when malformed.
fn parse_path(path: &str) -> Option<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut chars = path.chars().peekable();
    let mut key = String::new();

    while let Some(c) = chars.next() {
        match c {
            '.' => {
                if !key.is_empty() {
                    segments.push(Segment::Key(std::mem::take(&mut key)));
                }
            }
            '[' => {
                if !key.is_empty() {
                    segments.push(Segment::Key(std::mem::take(&mut key)));
                }
                let mut inner = String::new();
                let mut closed = false;
                for c in chars.by_ref() {
                    if c == ']' {
                        closed = true;
                        break;
                    }
                    inner.push(c);
                }
                if !closed {
                    return None;
                }
                let inner = inner.trim();
                let quoted = inner.len() >= 2
                    && ((inner.starts_with('\'') && inner.ends_with('\''))
                        || (inner.starts_with('"') && inner.ends_with('"')));
                if quoted {
                    segments.push(Segment::Key(inner[1..inner.len() - 1].to_string()));
                } else {
                    segments.push(Segment::Index(inner.parse().ok()?));
                }
            }
            _ => key.push(c),
        }
    }
    if !key.is_empty() {
        segments.push(Segment::Key(key));
    }
    Some(segments)
}

/// Looks up `path` in `value`. An empty path returns the value itself.
///
/// Numeric keys also index arrays, so `items.0.name` works like `items[0].name`.
pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let segments = parse_path(path.trim())?;
    segments.iter().try_fold(value, |current, segment| match segment {
        Segment::Key(k) => match current {
            Value::Object(map) => map.get(k),
            Value::Array(items) => k.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        },
        Segment::Index(i) => current.as_array().and_then(|items| items.get(*i)),
    })
}

/// Renders a scalar JSON value as extraction text. Missing values, null,
/// arrays and objects read as empty.
pub fn scalar_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "data": {
                "items": [
                    { "name": "first", "size": 1024, "free": true },
                    { "name": "second", "tags": ["a", "b"] }
                ],
                "odd.key": "dotted"
            }
        })
    }

    #[test]
    fn test_dotted_and_indexed() {
        let v = sample();
        assert_eq!(lookup(&v, "data.items[0].name"), Some(&json!("first")));
        assert_eq!(lookup(&v, "data.items.1.name"), Some(&json!("second")));
        assert_eq!(lookup(&v, "data.items[1].tags[1]"), Some(&json!("b")));
    }

    #[test]
    fn test_quoted_key() {
        let v = sample();
        assert_eq!(lookup(&v, "data['odd.key']"), Some(&json!("dotted")));
    }

    #[test]
    fn test_missing_and_malformed() {
        let v = sample();
        assert_eq!(lookup(&v, "data.nope"), None);
        assert_eq!(lookup(&v, "data.items[9]"), None);
        assert_eq!(lookup(&v, "data.items[0"), None);
        assert_eq!(lookup(&v, "data.items[x]"), None);
    }

    #[test]
    fn test_empty_path_is_root() {
        let v = json!("root");
        assert_eq!(lookup(&v, ""), Some(&v));
    }

    #[test]
    fn test_scalar_text() {
        let v = sample();
        assert_eq!(scalar_text(lookup(&v, "data.items[0].size")), "1024");
        assert_eq!(scalar_text(lookup(&v, "data.items[0].free")), "true");
        assert_eq!(scalar_text(lookup(&v, "data.items[1].tags")), "");
        assert_eq!(scalar_text(None), "");
    }
}
