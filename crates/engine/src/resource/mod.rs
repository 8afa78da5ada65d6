// ABOUTME: HTTP request building and fetching for site requests.
// ABOUTME: Joins paths onto base URLs, applies params and headers, enforces size limits and decodes charsets.

use std::collections::HashMap;

use anyhow::{anyhow, bail, Context};
use bytes::Bytes;
use reqwest::Method;
use url::Url;

use crate::config::RequestConfig;
use crate::link::join_path;

/// Maximum allowed content length (10 MB).
pub const MAX_CONTENT_LENGTH: usize = 10 * 1024 * 1024;

/// One concrete request against a site.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSpec {
    pub method: Method,
    /// Path relative to the base URL, or an absolute URL
    pub url: String,
    /// Per-call base URL, taking precedence over the site's active URL
    pub base_url: Option<String>,
    pub params: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
}

impl Default for RequestSpec {
    fn default() -> Self {
        Self {
            method: Method::GET,
            url: String::new(),
            base_url: None,
            params: Vec::new(),
            headers: Vec::new(),
        }
    }
}

impl RequestSpec {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    pub fn base_url(mut self, base: impl Into<String>) -> Self {
        self.base_url = Some(base.into());
        self
    }

    /// Builds a request from a site-data template. Unknown methods fall back to GET.
    pub fn from_config(config: &RequestConfig) -> Self {
        let method = config
            .method
            .as_deref()
            .and_then(|m| Method::from_bytes(m.to_ascii_uppercase().as_bytes()).ok())
            .unwrap_or(Method::GET);
        Self {
            method,
            url: config.url.clone().unwrap_or_default(),
            base_url: config.base_url.clone(),
            params: config
                .params
                .iter()
                .map(|(k, v)| (k.clone(), param_string(v)))
                .collect(),
            headers: config
                .headers
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }

    /// The absolute URL of this request against `base`, query params included.
    pub fn resolve_url(&self, base: &str) -> anyhow::Result<Url> {
        let lower = self.url.to_ascii_lowercase();
        let joined = if lower.starts_with("http://") || lower.starts_with("https://") {
            self.url.clone()
        } else {
            join_path(base, &self.url)
        };
        let mut url = Url::parse(&joined).with_context(|| format!("invalid request url {:?}", joined))?;
        if !self.params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in &self.params {
                pairs.append_pair(k, v);
            }
        }
        Ok(url)
    }
}

/// Renders a JSON parameter value the way it appears in a query string.
pub fn param_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// A response as seen by the auth detector and the extractors.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub url: String,
    pub final_url: String,
    /// Header names lowercased
    pub headers: HashMap<String, String>,
    pub content_type: Option<String>,
    /// Decoded body; absent for bodiless requests
    pub body: Option<String>,
}

impl RawResponse {
    /// Looks up a header by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// The body, or an empty string when absent.
    pub fn text(&self) -> &str {
        self.body.as_deref().unwrap_or("")
    }
}

/// Decode body bytes to a String using charset from content-type header or detection.
fn decode_body(body: &[u8], content_type: Option<&str>) -> String {
    if let Some(ct) = content_type {
        if let Some(charset) = extract_charset(ct) {
            if let Some(encoding) = encoding_rs::Encoding::for_label(charset.as_bytes()) {
                let (decoded, _, _) = encoding.decode(body);
                return decoded.into_owned();
            }
        }
    }

    let mut detector = chardetng::EncodingDetector::new();
    detector.feed(body, true);
    let encoding = detector.guess(None, true);
    let (decoded, _, _) = encoding.decode(body);
    decoded.into_owned()
}

/// Extract charset value from Content-Type header.
fn extract_charset(content_type: &str) -> Option<String> {
    let lower = content_type.to_lowercase();
    for part in lower.split(';') {
        let trimmed = part.trim();
        if let Some(charset) = trimmed.strip_prefix("charset=") {
            let charset = charset.trim_matches('"').trim_matches('\'');
            return Some(charset.to_string());
        }
    }
    None
}

/// Sends one request and returns the response whatever its status.
///
/// Errors only when no usable response exists: invalid URL, transport failure,
/// or a body over [`MAX_CONTENT_LENGTH`].
pub async fn fetch(
    client: &reqwest::Client,
    spec: &RequestSpec,
    base: &str,
    default_headers: &HashMap<String, String>,
) -> anyhow::Result<RawResponse> {
    let url = spec.resolve_url(base)?;
    let requested = url.to_string();

    let mut request = client.request(spec.method.clone(), url);
    for (key, value) in default_headers {
        request = request.header(key, value);
    }
    for (key, value) in &spec.headers {
        request = request.header(key, value);
    }

    let response = request
        .send()
        .await
        .map_err(|e| anyhow!("request failed: {}", e))?;

    if let Some(len) = response.content_length() {
        if len as usize > MAX_CONTENT_LENGTH {
            bail!("content too large");
        }
    }

    let status = response.status().as_u16();
    let final_url = response.url().to_string();
    let headers: HashMap<String, String> = response
        .headers()
        .iter()
        .filter_map(|(k, v)| {
            v.to_str()
                .ok()
                .map(|v| (k.as_str().to_ascii_lowercase(), v.to_string()))
        })
        .collect();
    let content_type = headers.get("content-type").map(|s| s.to_lowercase());

    let body: Bytes = response
        .bytes()
        .await
        .map_err(|e| anyhow!("failed to read body: {}", e))?;
    if body.len() > MAX_CONTENT_LENGTH {
        bail!("content too large");
    }

    let body = if spec.method == Method::HEAD {
        None
    } else {
        Some(decode_body(&body, content_type.as_deref()))
    };

    Ok(RawResponse {
        status,
        url: requested,
        final_url,
        headers,
        content_type,
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn create_test_client() -> reqwest::Client {
        reqwest::Client::builder()
            .user_agent("test-agent")
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_fetch_ok_utf8() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/browse.php").query_param("search", "ubuntu");
            then.status(200)
                .header("content-type", "text/html; charset=utf-8")
                .body("hello");
        });

        let client = create_test_client();
        let spec = RequestSpec::get("/browse.php").param("search", "ubuntu");
        let result = fetch(&client, &spec, &server.base_url(), &HashMap::new()).await;
        mock.assert();

        let result = result.expect("fetch should succeed");
        assert_eq!(result.status, 200);
        assert_eq!(result.text(), "hello");
        assert_eq!(result.header("Content-Type"), Some("text/html; charset=utf-8"));
    }

    #[tokio::test]
    async fn test_fetch_returns_error_statuses() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/missing");
            then.status(404).body("not found");
        });

        let client = create_test_client();
        let result = fetch(
            &client,
            &RequestSpec::get("/missing"),
            &server.base_url(),
            &HashMap::new(),
        )
        .await;
        mock.assert();

        assert_eq!(result.expect("response expected").status, 404);
    }

    #[tokio::test]
    async fn test_fetch_sends_headers() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/").header("cookie", "uid=1; pass=abc");
            then.status(200).body("ok");
        });

        let client = create_test_client();
        let mut defaults = HashMap::new();
        defaults.insert("cookie".to_string(), "uid=1; pass=abc".to_string());
        let result = fetch(&client, &RequestSpec::get("/"), &server.base_url(), &defaults).await;
        mock.assert();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_transport_failure_is_error() {
        let client = create_test_client();
        // Nothing listens on port 9 of the loopback interface.
        let result = fetch(
            &client,
            &RequestSpec::get("/"),
            "http://127.0.0.1:9",
            &HashMap::new(),
        )
        .await;
        assert!(result.is_err());
    }

    #[test]
    fn test_resolve_url_joins_and_appends_params() {
        let spec = RequestSpec::get("/browse.php")
            .param("search", "a b")
            .param("cat", "1");
        let url = spec.resolve_url("https://site.org/").unwrap();
        assert_eq!(url.as_str(), "https://site.org/browse.php?search=a+b&cat=1");
    }

    #[test]
    fn test_resolve_url_keeps_absolute() {
        let spec = RequestSpec::get("https://api.site.org/v1/search");
        let url = spec.resolve_url("https://site.org/").unwrap();
        assert_eq!(url.as_str(), "https://api.site.org/v1/search");
    }

    #[test]
    fn test_from_config() {
        let config: RequestConfig = serde_json::from_value(json!({
            "url": "/userdetails.php",
            "method": "post",
            "params": { "seeding": 1, "mode": "full" }
        }))
        .unwrap();
        let spec = RequestSpec::from_config(&config);
        assert_eq!(spec.method, Method::POST);
        assert_eq!(spec.url, "/userdetails.php");
        assert_eq!(
            spec.params,
            vec![
                ("seeding".to_string(), "1".to_string()),
                ("mode".to_string(), "full".to_string())
            ]
        );
    }

    #[test]
    fn test_extract_charset() {
        assert_eq!(
            extract_charset("text/html; charset=gbk"),
            Some("gbk".to_string())
        );
        assert_eq!(extract_charset("text/html"), None);
    }

    #[test]
    fn test_decode_gbk_body() {
        // "种子" in GBK
        let gbk: &[u8] = &[0xd6, 0xd6, 0xd7, 0xd3];
        assert_eq!(decode_body(gbk, Some("text/html; charset=gbk")), "种子");
    }
}
