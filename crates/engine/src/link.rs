// ABOUTME: Link normalization for extracted url/link fields against a site's active URL.
// ABOUTME: Keeps magnet and absolute http(s) links, completes protocol-relative ones and joins relative paths.

use url::Url;

/// Rewrites extracted links into absolute URLs.
///
/// The row transformer routes `url` and `link` fields through this seam.
pub trait LinkNormalizer {
    fn normalize(&self, raw: &str) -> String;
}

/// Resolves links against a fixed active URL.
#[derive(Debug, Clone)]
pub struct ActiveUrl {
    url: String,
}

impl ActiveUrl {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.url
    }
}

impl LinkNormalizer for ActiveUrl {
    fn normalize(&self, raw: &str) -> String {
        normalize(raw, &self.url)
    }
}

/// Normalizes a raw href against `active_url`.
///
/// Rules, in order:
/// 1. `magnet:` URIs are returned unchanged.
/// 2. `//host/path` takes the scheme of `active_url`.
/// 3. `http://` and `https://` links are returned unchanged.
/// 4. Anything else is joined onto `active_url` as a path.
///
/// An empty link stays empty.
pub fn normalize(raw: &str, active_url: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return String::new();
    }
    if raw.starts_with("magnet:") {
        return raw.to_string();
    }
    if raw.starts_with("//") {
        let scheme = Url::parse(active_url)
            .map(|u| u.scheme().to_string())
            .unwrap_or_else(|_| "https".to_string());
        return format!("{}:{}", scheme, raw);
    }
    let lower = raw.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        return raw.to_string();
    }
    join_path(active_url, raw)
}

/// Joins a path onto a base URL with exactly one slash between them.
///
/// Unlike RFC 3986 resolution the last segment of `base` is kept, so
/// `https://site.org/base` + `foo.php` gives `https://site.org/base/foo.php`.
/// Query-only and fragment-only paths attach directly.
pub fn join_path(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    if path.is_empty() {
        return base.to_string();
    }
    if path.starts_with('?') || path.starts_with('#') {
        return format!("{}{}", base, path);
    }
    format!("{}/{}", base, path.trim_start_matches('/'))
}
