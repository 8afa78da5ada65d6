// ABOUTME: Declarative site configuration: metadata, field queries, search and user-info settings.
// ABOUTME: Resolves defaults plus caller overrides into an effective SiteConfig through a pure deep merge.

//! Site configuration model and resolver.
//!
//! A site ships [`SiteMetadata`] as data. Callers may supply partial overrides
//! as JSON. [`resolve`] deep-merges the two (objects merge key by key, overrides
//! win, `null` is ignored, arrays replace) and derives `host` from the base URL
//! when absent. Neither input is mutated.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::auth::AuthPolicy;
use crate::error::ConfigError;

/// One selector or an ordered fallback list of selectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SelectorList {
    One(String),
    Many(Vec<String>),
}

impl Default for SelectorList {
    fn default() -> Self {
        SelectorList::Many(Vec::new())
    }
}

impl SelectorList {
    /// The selectors in evaluation order.
    pub fn as_slice(&self) -> &[String] {
        match self {
            SelectorList::One(s) => std::slice::from_ref(s),
            SelectorList::Many(v) => v.as_slice(),
        }
    }
}

impl From<&str> for SelectorList {
    fn from(s: &str) -> Self {
        SelectorList::One(s.to_string())
    }
}

/// A reference to a registered filter, optionally with string arguments.
///
/// Written either as `"parse_size"` or as `{"name": "query_param", "args": ["id"]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterSpec {
    Name(String),
    Call {
        name: String,
        #[serde(default)]
        args: Vec<String>,
    },
}

impl FilterSpec {
    pub fn name(&self) -> &str {
        match self {
            FilterSpec::Name(name) => name,
            FilterSpec::Call { name, .. } => name,
        }
    }

    pub fn args(&self) -> &[String] {
        match self {
            FilterSpec::Name(_) => &[],
            FilterSpec::Call { args, .. } => args,
        }
    }
}

impl From<&str> for FilterSpec {
    fn from(s: &str) -> Self {
        FilterSpec::Name(s.to_string())
    }
}

/// Where and how to extract one scalar value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldQuery {
    /// Selectors tried in order (CSS for documents, paths for JSON)
    #[serde(default)]
    pub selector: SelectorList,
    /// Attribute to read instead of text content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attr: Option<String>,
    /// Dataset key (camelCase) to read instead of text content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    /// Filters applied in order after extraction
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<FilterSpec>,
}

impl FieldQuery {
    pub fn new(selector: impl Into<SelectorList>) -> Self {
        Self {
            selector: selector.into(),
            ..Default::default()
        }
    }

    pub fn selectors<I, S>(selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            selector: SelectorList::Many(selectors.into_iter().map(Into::into).collect()),
            ..Default::default()
        }
    }

    pub fn attr(mut self, attr: impl Into<String>) -> Self {
        self.attr = Some(attr.into());
        self
    }

    pub fn data(mut self, key: impl Into<String>) -> Self {
        self.data = Some(key.into());
        self
    }

    pub fn filter(mut self, filter: impl Into<FilterSpec>) -> Self {
        self.filters.push(filter.into());
        self
    }
}

/// Field name to query, in declaration order.
pub type FieldGroup = IndexMap<String, FieldQuery>;

/// Body format of a response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    #[default]
    Document,
    Json,
}

/// Request template as written in site data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub params: IndexMap<String, Value>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub headers: IndexMap<String, String>,
}

/// One selectable option of a search category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryOption {
    pub value: Value,
    pub name: String,
}

/// A search category vocabulary, e.g. `cat` with Movie/TV options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub key: String,
    #[serde(default)]
    pub options: Vec<CategoryOption>,
}

/// Search settings of a site.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords_param: Option<String>,
    #[serde(default)]
    pub request_config: RequestConfig,
    #[serde(default, rename = "type")]
    pub response_type: ResponseType,
    /// Locates result rows: a CSS selector for documents, a path for JSON
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rows: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<Category>,
}

/// One request of the user-info process.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessStep {
    #[serde(default)]
    pub request_config: RequestConfig,
    /// Profile field name to request parameter name, filled from earlier steps
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub assertion: IndexMap<String, String>,
    /// Fields of the `userInfo` group extracted by this step; all of them when empty
    #[serde(default)]
    pub fields: Vec<String>,
    #[serde(default, rename = "type")]
    pub response_type: ResponseType,
}

/// Multi-request user statistics collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfoConfig {
    #[serde(default)]
    pub process: Vec<ProcessStep>,
}

/// Site defaults as shipped in data. Every field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteMetadata {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aka: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activate_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone_offset: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collaborator: Option<String>,
    #[serde(default)]
    pub auth_policy: AuthPolicy,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_info: Option<UserInfoConfig>,
    #[serde(default)]
    pub selector: IndexMap<String, FieldGroup>,
    /// Detail page template containing `{id}`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail_page_path: Option<String>,
}

/// The effective configuration of one site: defaults merged with overrides,
/// with `url` and `host` guaranteed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteConfig {
    pub name: String,
    pub aka: Vec<String>,
    pub description: Option<String>,
    pub url: String,
    pub activate_url: Option<String>,
    pub host: String,
    pub timezone_offset: Option<String>,
    pub tags: Vec<String>,
    pub collaborator: Option<String>,
    pub auth_policy: AuthPolicy,
    pub search: SearchConfig,
    pub user_info: Option<UserInfoConfig>,
    pub selector: IndexMap<String, FieldGroup>,
    pub detail_page_path: Option<String>,
}

impl SiteConfig {
    /// The URL requests and links are resolved against.
    pub fn active_url(&self) -> &str {
        self.activate_url.as_deref().unwrap_or(&self.url)
    }

    /// Looks up a field-query group such as `search` or `userInfo`.
    pub fn group(&self, name: &str) -> Option<&FieldGroup> {
        self.selector.get(name)
    }

    /// Every filter reference as (group, field, filter name).
    pub fn filter_refs(&self) -> impl Iterator<Item = (&str, &str, &str)> {
        self.selector.iter().flat_map(|(group, fields)| {
            fields.iter().flat_map(move |(field, query)| {
                query
                    .filters
                    .iter()
                    .map(move |f| (group.as_str(), field.as_str(), f.name()))
            })
        })
    }
}

impl From<SiteConfig> for SiteMetadata {
    fn from(c: SiteConfig) -> Self {
        Self {
            name: c.name,
            aka: c.aka,
            description: c.description,
            url: Some(c.url),
            activate_url: c.activate_url,
            host: Some(c.host),
            timezone_offset: c.timezone_offset,
            tags: c.tags,
            collaborator: c.collaborator,
            auth_policy: c.auth_policy,
            search: c.search,
            user_info: c.user_info,
            selector: c.selector,
            detail_page_path: c.detail_page_path,
        }
    }
}

/// Recursively merges `overrides` into `base`.
///
/// Objects merge key by key; any other override value replaces the base value;
/// `null` overrides are skipped so they never erase a default.
pub fn deep_merge(base: &mut Value, overrides: &Value) {
    match (base, overrides) {
        (_, Value::Null) => {}
        (Value::Object(base_map), Value::Object(over_map)) => {
            for (key, over_value) in over_map {
                match base_map.get_mut(key) {
                    Some(base_value) => deep_merge(base_value, over_value),
                    None => {
                        if !over_value.is_null() {
                            base_map.insert(key.clone(), over_value.clone());
                        }
                    }
                }
            }
        }
        (base, over_value) => *base = over_value.clone(),
    }
}

/// Merges overrides onto defaults without touching either input.
pub fn merge_metadata(
    defaults: &SiteMetadata,
    overrides: &Value,
) -> Result<SiteMetadata, ConfigError> {
    let mut merged = serde_json::to_value(defaults).map_err(ConfigError::schema)?;
    deep_merge(&mut merged, overrides);
    serde_json::from_value(merged).map_err(ConfigError::schema)
}

/// Derives `host` from a base URL: the host name plus any non-default port.
pub fn host_from_url(url: &str) -> Result<String, ConfigError> {
    let parsed = Url::parse(url).map_err(|e| ConfigError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    let host = parsed.host_str().ok_or_else(|| ConfigError::InvalidUrl {
        url: url.to_string(),
        reason: "url has no host".to_string(),
    })?;
    Ok(match parsed.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

/// Resolves the effective configuration of a site.
pub fn resolve(defaults: &SiteMetadata, overrides: &Value) -> Result<SiteConfig, ConfigError> {
    let merged = merge_metadata(defaults, overrides)?;

    let url = merged
        .url
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingUrl(merged.name.clone()))?;
    let derived_host = host_from_url(&url)?;
    let host = merged
        .host
        .filter(|h| !h.trim().is_empty())
        .unwrap_or(derived_host);

    Ok(SiteConfig {
        name: merged.name,
        aka: merged.aka,
        description: merged.description,
        url,
        activate_url: merged.activate_url.filter(|u| !u.trim().is_empty()),
        host,
        timezone_offset: merged.timezone_offset,
        tags: merged.tags,
        collaborator: merged.collaborator,
        auth_policy: merged.auth_policy,
        search: merged.search,
        user_info: merged.user_info,
        selector: merged.selector,
        detail_page_path: merged.detail_page_path,
    })
}
