// ABOUTME: Loads site definitions from JSON text and from the embedded sample definitions.
// ABOUTME: Accepts a single SiteMetadata object or an array of them.

use serde_json::Value;

use crate::config::SiteMetadata;
use crate::error::ConfigError;
use crate::registry::SiteRegistry;

/// Embedded JSON with the sample site definitions.
const BUILTIN_SITES_JSON: &str = include_str!("../data/builtin_sites.json");

/// Parses site definitions: one object or an array of objects.
pub fn load_sites_json(text: &str) -> Result<Vec<SiteMetadata>, ConfigError> {
    let value: Value = serde_json::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
    let sites = if value.is_array() {
        serde_json::from_value::<Vec<SiteMetadata>>(value)
    } else {
        serde_json::from_value::<SiteMetadata>(value).map(|site| vec![site])
    };
    sites.map_err(|e| ConfigError::Parse(e.to_string()))
}

/// Loads the embedded site definitions into a registry.
///
/// # Panics
///
/// Panics if the embedded JSON is malformed or cannot be deserialized.
pub fn load_builtin_registry() -> SiteRegistry {
    load_sites_json(BUILTIN_SITES_JSON)
        .expect("failed to parse builtin sites")
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::resolve;
    use crate::filters::FilterRegistry;

    #[test]
    fn load_builtin_registry_succeeds() {
        let registry = load_builtin_registry();
        assert_eq!(registry.len(), 2);
        assert!(registry.get("sdb").is_some());
        assert!(registry.get("openindex").is_some());
    }

    #[test]
    fn builtin_sites_resolve_with_known_filters() {
        let filters = FilterRegistry::builtin();
        for site in load_builtin_registry().iter() {
            let config = resolve(site, &Value::Null).unwrap();
            assert!(!config.host.is_empty());
            for (group, field, filter) in config.filter_refs() {
                assert!(
                    filters.contains(filter),
                    "{}: {}.{} uses unknown filter {}",
                    site.name,
                    group,
                    field,
                    filter
                );
            }
        }
    }

    #[test]
    fn load_single_object() {
        let sites = load_sites_json(r#"{"name": "Solo", "url": "https://solo.example/"}"#).unwrap();
        assert_eq!(sites.len(), 1);
        assert_eq!(sites[0].name, "Solo");
    }

    #[test]
    fn load_rejects_bad_json() {
        assert!(matches!(load_sites_json("{"), Err(ConfigError::Parse(_))));
        assert!(matches!(
            load_sites_json(r#"[{"name": 5}]"#),
            Err(ConfigError::Parse(_))
        ));
    }
}
