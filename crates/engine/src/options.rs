// ABOUTME: Per-site runtime options and the SiteBuilder used to construct Site instances.
// ABOUTME: Covers HTTP settings, extra headers, filter registry, auth policy and caller config overrides.

use std::collections::HashMap;
use std::time::Duration;

use serde_json::Value;

use crate::auth::AuthPolicy;
use crate::config::SiteMetadata;
use crate::filters::FilterRegistry;
use crate::site::Site;

/// Runtime options of one site handle.
#[derive(Debug, Clone)]
pub struct SiteOptions {
    pub timeout: Duration,
    pub user_agent: String,
    /// Sent with every request, e.g. a session `cookie`
    pub headers: HashMap<String, String>,
    pub http_client: Option<reqwest::Client>,
    pub filters: Option<FilterRegistry>,
    /// Replaces the policy declared in site data
    pub auth_policy: Option<AuthPolicy>,
    /// Partial site data deep-merged over the defaults
    pub overrides: Value,
}

impl Default for SiteOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: format!("trawl/{}", env!("CARGO_PKG_VERSION")),
            headers: HashMap::new(),
            http_client: None,
            filters: None,
            auth_policy: None,
            overrides: Value::Null,
        }
    }
}

/// Builder for [`Site`] handles.
#[derive(Debug, Clone)]
pub struct SiteBuilder {
    defaults: SiteMetadata,
    opts: SiteOptions,
}

impl SiteBuilder {
    pub fn new(defaults: SiteMetadata) -> Self {
        Self {
            defaults,
            opts: SiteOptions::default(),
        }
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.opts.timeout = timeout;
        self
    }

    /// Set the User-Agent header.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.opts.user_agent = user_agent.into();
        self
    }

    /// Add a header to all requests.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.opts.headers.insert(key.into(), value.into());
        self
    }

    /// Shorthand for a `cookie` header carrying the session.
    pub fn cookie(self, cookie: impl Into<String>) -> Self {
        self.header("cookie", cookie)
    }

    /// Use a custom HTTP client. Timeout and user agent are then the client's own.
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.opts.http_client = Some(client);
        self
    }

    /// Use a custom filter registry instead of the builtins.
    pub fn filters(mut self, filters: FilterRegistry) -> Self {
        self.opts.filters = Some(filters);
        self
    }

    pub fn auth_policy(mut self, policy: AuthPolicy) -> Self {
        self.opts.auth_policy = Some(policy);
        self
    }

    /// Set the config overrides. Later calls merge over earlier ones.
    pub fn overrides(mut self, overrides: Value) -> Self {
        crate::config::deep_merge(&mut self.opts.overrides, &overrides);
        self
    }

    pub fn build(self) -> Site {
        Site::new(self.defaults, self.opts)
    }
}
