// ABOUTME: Shared cache of compiled CSS selectors, warmed per site when its config resolves.
// ABOUTME: Reports selectors that do not compile so broken site definitions show up before extraction.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use dom_query::Matcher;
use once_cell::sync::Lazy;

use crate::config::{FieldGroup, ResponseType, SiteConfig};
use crate::site::{SEARCH_GROUP, USER_INFO_GROUP};

/// Selector source text to its compiled form; `None` marks a selector that does not compile.
static MATCHERS: Lazy<RwLock<HashMap<String, Option<Matcher>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// The compiled matcher for `css`, or `None` when it does not compile.
///
/// Callers treat an uncompilable selector as one that matched nothing.
pub fn get_or_compile(css: &str) -> Option<Matcher> {
    if let Some(hit) = MATCHERS
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(css)
    {
        return hit.clone();
    }

    let compiled = Matcher::new(css).ok();
    MATCHERS
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .entry(css.to_string())
        .or_insert(compiled)
        .clone()
}

/// Compiles every CSS selector a site evaluates against HTML.
///
/// JSON-typed groups address fields by path and are skipped. Returns the
/// selectors that failed to compile, each also logged as a warning.
pub fn warm_site(config: &SiteConfig) -> Vec<String> {
    let mut selectors: Vec<&str> = Vec::new();

    if config.search.response_type == ResponseType::Document {
        selectors.extend(config.search.rows.as_deref());
        selectors.extend(group_selectors(config.group(SEARCH_GROUP)));
    }

    let user_info_is_html = config.user_info.as_ref().map_or(true, |u| {
        u.process.is_empty()
            || u.process
                .iter()
                .any(|step| step.response_type == ResponseType::Document)
    });
    if user_info_is_html {
        selectors.extend(group_selectors(config.group(USER_INFO_GROUP)));
    }

    // groups other than search and userInfo are only ever read from documents
    for (name, group) in &config.selector {
        if name != SEARCH_GROUP && name != USER_INFO_GROUP {
            selectors.extend(group_selectors(Some(group)));
        }
    }

    let mut invalid = Vec::new();
    for css in selectors {
        if get_or_compile(css).is_none() && !invalid.iter().any(|seen| seen == css) {
            tracing::warn!(site = %config.name, selector = css, "selector does not compile");
            invalid.push(css.to_string());
        }
    }
    invalid
}

fn group_selectors(group: Option<&FieldGroup>) -> impl Iterator<Item = &str> {
    group
        .into_iter()
        .flat_map(|fields| fields.values())
        .flat_map(|query| query.selector.as_slice())
        .map(String::as_str)
}
