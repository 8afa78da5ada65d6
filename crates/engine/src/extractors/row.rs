// ABOUTME: Row transformation: applies a field group to each result row and to whole-page sections.
// ABOUTME: Locates rows by CSS selector or JSON path and routes url/link fields through the LinkNormalizer.

use dom_query::Document;
use serde_json::Value;

use crate::config::{FieldGroup, ResponseType};
use crate::entity::{Entity, FieldValue};
use crate::extractors::compiled::get_or_compile;
use crate::extractors::field::{extract, ValueSource};
use crate::extractors::json_path;
use crate::filters::FilterRegistry;
use crate::link::LinkNormalizer;

/// Fields that hold links and are always normalized.
pub const LINK_FIELDS: &[&str] = &["url", "link"];

/// Builds one entity from a row. Every field of the group is present, in
/// declaration order, with its zero value when nothing matched.
pub fn transform_row(
    source: ValueSource<'_>,
    group: &FieldGroup,
    filters: &FilterRegistry,
    links: &dyn LinkNormalizer,
) -> Entity {
    transform_fields(source, group, None, filters, links)
}

fn transform_fields(
    source: ValueSource<'_>,
    group: &FieldGroup,
    only: Option<&[String]>,
    filters: &FilterRegistry,
    links: &dyn LinkNormalizer,
) -> Entity {
    let mut entity = Entity::new();
    for (name, query) in group {
        if let Some(only) = only {
            if !only.iter().any(|f| f == name) {
                continue;
            }
        }
        let mut value = extract(source, query, filters);
        if LINK_FIELDS.contains(&name.as_str()) {
            value = FieldValue::Text(links.normalize(&value.as_text()));
        }
        entity.insert(name.clone(), value);
    }
    entity
}

/// Transforms a result page into one entity per row.
///
/// `rows` is a CSS selector for documents and a path for JSON bodies; a JSON
/// body without a path must itself be an array. Unparsable bodies and missing
/// rows give an empty list.
pub fn transform_page(
    body: &str,
    response_type: ResponseType,
    rows: Option<&str>,
    group: &FieldGroup,
    filters: &FilterRegistry,
    links: &dyn LinkNormalizer,
) -> Vec<Entity> {
    match response_type {
        ResponseType::Document => {
            let Some(css) = rows else {
                tracing::warn!("no row selector configured for document results");
                return Vec::new();
            };
            let Some(matcher) = get_or_compile(css) else {
                tracing::warn!(selector = css, "row selector does not compile");
                return Vec::new();
            };
            let doc = Document::from(body);
            let entities = doc
                .select_matcher(&matcher)
                .iter()
                .map(|row| transform_row(ValueSource::Html(&row), group, filters, links))
                .collect();
            entities
        }
        ResponseType::Json => {
            let value: Value = match serde_json::from_str(body) {
                Ok(v) => v,
                Err(e) => {
                    tracing::warn!(error = %e, "result body is not valid JSON");
                    return Vec::new();
                }
            };
            let path = rows.unwrap_or("");
            match json_path::lookup(&value, path) {
                Some(Value::Array(items)) => items
                    .iter()
                    .map(|row| transform_row(ValueSource::Json(row), group, filters, links))
                    .collect(),
                _ => {
                    tracing::warn!(path, "JSON row path does not point at an array");
                    Vec::new()
                }
            }
        }
    }
}

/// Transforms a whole page as a single section, e.g. a user profile page.
///
/// `only` restricts extraction to the named fields of the group.
pub fn transform_section(
    body: &str,
    response_type: ResponseType,
    group: &FieldGroup,
    only: Option<&[String]>,
    filters: &FilterRegistry,
    links: &dyn LinkNormalizer,
) -> Entity {
    match response_type {
        ResponseType::Document => {
            let doc = Document::from(body);
            let root = doc.select("html");
            transform_fields(ValueSource::Html(&root), group, only, filters, links)
        }
        ResponseType::Json => {
            let value: Value = serde_json::from_str(body).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "section body is not valid JSON");
                Value::Null
            });
            transform_fields(ValueSource::Json(&value), group, only, filters, links)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FieldQuery;
    use crate::link::ActiveUrl;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;

    /// Records every link it sees and tags it.
    struct SpyLinks {
        seen: RefCell<Vec<String>>,
    }

    impl LinkNormalizer for SpyLinks {
        fn normalize(&self, raw: &str) -> String {
            self.seen.borrow_mut().push(raw.to_string());
            format!("spy:{}", raw)
        }
    }

    const BROWSE_HTML: &str = r#"
        <html><body>
        <table class="torrents"><tbody>
          <tr>
            <td><a class="title" href="details.php?id=1">Ubuntu 24.04</a></td>
            <td><a class="dl" href="/download.php?id=1">DL</a></td>
            <td class="size">4.5 GiB</td>
            <td class="seeders">12</td>
          </tr>
          <tr>
            <td><a class="title" href="//cdn.site.org/details.php?id=2">Debian 12</a></td>
            <td><a class="dl" href="magnet:?xt=urn:btih:abc">DL</a></td>
            <td class="size">700 MiB</td>
          </tr>
        </tbody></table>
        </body></html>
    "#;

    fn search_group() -> FieldGroup {
        let mut group = FieldGroup::new();
        group.insert("title".to_string(), FieldQuery::new("a.title"));
        group.insert("url".to_string(), FieldQuery::new("a.title").attr("href"));
        group.insert("link".to_string(), FieldQuery::new("a.dl").attr("href"));
        group.insert("size".to_string(), FieldQuery::new("td.size").filter("parse_size"));
        group.insert("seeders".to_string(), FieldQuery::new("td.seeders").filter("parse_int"));
        group
    }

    #[test]
    fn test_transform_page_document() {
        let links = ActiveUrl::new("https://site.org/");
        let rows = transform_page(
            BROWSE_HTML,
            ResponseType::Document,
            Some("table.torrents > tbody > tr"),
            &search_group(),
            &FilterRegistry::builtin(),
            &links,
        );
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].text("title"), "Ubuntu 24.04");
        assert_eq!(rows[0].text("url"), "https://site.org/details.php?id=1");
        assert_eq!(rows[0].text("link"), "https://site.org/download.php?id=1");
        assert_eq!(rows[0].number("size"), Some(4.5 * 1024f64.powi(3)));
        assert_eq!(rows[0].number("seeders"), Some(12.0));

        assert_eq!(rows[1].text("url"), "https://cdn.site.org/details.php?id=2");
        assert_eq!(rows[1].text("link"), "magnet:?xt=urn:btih:abc");
        // missing cell resolves to the numeric zero value
        assert_eq!(rows[1].number("seeders"), Some(0.0));
    }

    #[test]
    fn test_fields_keep_declared_order() {
        let links = ActiveUrl::new("https://site.org/");
        let rows = transform_page(
            BROWSE_HTML,
            ResponseType::Document,
            Some("table.torrents > tbody > tr"),
            &search_group(),
            &FilterRegistry::builtin(),
            &links,
        );
        let names: Vec<&str> = rows[0].iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(names, vec!["title", "url", "link", "size", "seeders"]);
    }

    #[test]
    fn test_link_fields_always_pass_through_normalizer() {
        let spy = SpyLinks {
            seen: RefCell::new(Vec::new()),
        };
        let mut group = search_group();
        group.insert("link".to_string(), FieldQuery::new("a.nothing").attr("href"));
        let rows = transform_page(
            BROWSE_HTML,
            ResponseType::Document,
            Some("table.torrents > tbody > tr"),
            &group,
            &FilterRegistry::builtin(),
            &spy,
        );
        assert_eq!(rows[0].text("url"), "spy:details.php?id=1");
        assert_eq!(rows[0].text("link"), "spy:");
        assert_eq!(rows[0].text("title"), "Ubuntu 24.04");
        // two link fields per row, two rows
        assert_eq!(spy.seen.borrow().len(), 4);
    }

    #[test]
    fn test_transform_page_json() {
        let body = r#"{"data": {"torrents": [
            {"name": "Arch", "id": 7, "size": "800 MiB", "download": "api/dl/7"},
            {"name": "Fedora", "id": 8, "size": "2 GiB", "download": "api/dl/8"}
        ]}}"#;
        let mut group = FieldGroup::new();
        group.insert("title".to_string(), FieldQuery::new("name"));
        group.insert("id".to_string(), FieldQuery::new("id"));
        group.insert("size".to_string(), FieldQuery::new("size").filter("parse_size"));
        group.insert("link".to_string(), FieldQuery::new("download"));
        let rows = transform_page(
            body,
            ResponseType::Json,
            Some("data.torrents"),
            &group,
            &FilterRegistry::builtin(),
            &ActiveUrl::new("https://api.site.org"),
        );
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].text("title"), "Fedora");
        assert_eq!(rows[1].text("id"), "8");
        assert_eq!(rows[0].number("size"), Some(800.0 * 1024.0 * 1024.0));
        assert_eq!(rows[0].text("link"), "https://api.site.org/api/dl/7");
    }

    #[test]
    fn test_bad_inputs_give_no_rows() {
        let reg = FilterRegistry::builtin();
        let links = ActiveUrl::new("https://site.org/");
        let group = search_group();
        assert!(transform_page("not json", ResponseType::Json, None, &group, &reg, &links).is_empty());
        assert!(transform_page("{\"a\": 1}", ResponseType::Json, Some("a"), &group, &reg, &links).is_empty());
        assert!(transform_page(BROWSE_HTML, ResponseType::Document, None, &group, &reg, &links).is_empty());
        assert!(
            transform_page(BROWSE_HTML, ResponseType::Document, Some("[[["), &group, &reg, &links)
                .is_empty()
        );
    }

    #[test]
    fn test_transform_section_subset() {
        let html = r#"<html><body>
            <a class="user" href="userdetails.php?id=42">alice</a>
            <table><tr><td class="rowhead">Uploaded</td><td>1 TiB</td></tr></table>
        </body></html>"#;
        let mut group = FieldGroup::new();
        group.insert("name".to_string(), FieldQuery::new("a.user"));
        group.insert(
            "uploaded".to_string(),
            FieldQuery::new("td.rowhead:contains('Uploaded') + td").filter("parse_size"),
        );
        let only = vec!["name".to_string()];
        let profile = transform_section(
            html,
            ResponseType::Document,
            &group,
            Some(&only),
            &FilterRegistry::builtin(),
            &ActiveUrl::new("https://site.org/"),
        );
        assert_eq!(profile.len(), 1);
        assert_eq!(profile.text("name"), "alice");

        let full = transform_section(
            html,
            ResponseType::Document,
            &group,
            None,
            &FilterRegistry::builtin(),
            &ActiveUrl::new("https://site.org/"),
        );
        assert_eq!(full.number("uploaded"), Some(1024f64.powi(4)));
    }
}
