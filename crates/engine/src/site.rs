// ABOUTME: Site handle: lazily resolved configuration plus the request orchestrator and high-level operations.
// ABOUTME: Maps transport, status and login failures to SiteError and drives search, user info, ping and links.

//! Request orchestration for one tracker site.
//!
//! A [`Site`] owns immutable default metadata and caller options. Its effective
//! [`SiteConfig`] is resolved on first use and memoized; every operation after
//! that reads the same value. Each request resolves its base URL (explicit
//! per-call base, else `activateUrl`, else `url`), then passes two gates:
//! statuses above 400 are network errors, and the site's [`AuthPolicy`]
//! decides whether the session is still logged in.

use once_cell::sync::OnceCell;

use crate::auth::AuthPolicy;
use crate::config::{resolve, ResponseType, SiteConfig, SiteMetadata};
use crate::entity::{Entity, FieldValue, SearchFilter};
use crate::error::{ConfigError, SiteError};
use crate::extractors::compiled::warm_site;
use crate::extractors::row::{transform_page, transform_section};
use crate::filters::FilterRegistry;
use crate::link::{ActiveUrl, LinkNormalizer};
use crate::options::{SiteBuilder, SiteOptions};
use crate::resource::{fetch, param_string, RawResponse, RequestSpec};

/// Field group used for search result rows.
pub const SEARCH_GROUP: &str = "search";
/// Field group used for user profile pages.
pub const USER_INFO_GROUP: &str = "userInfo";

/// One tracker site.
pub struct Site {
    defaults: SiteMetadata,
    opts: SiteOptions,
    http: reqwest::Client,
    filters: FilterRegistry,
    resolved: OnceCell<Resolved>,
}

/// Configuration plus the filters bound to it.
struct Resolved {
    config: SiteConfig,
    filters: FilterRegistry,
}

impl Site {
    /// Create a new SiteBuilder for the given defaults.
    pub fn builder(defaults: SiteMetadata) -> SiteBuilder {
        SiteBuilder::new(defaults)
    }

    pub fn new(defaults: SiteMetadata, opts: SiteOptions) -> Self {
        let http = opts.http_client.clone().unwrap_or_else(|| {
            reqwest::Client::builder()
                .user_agent(&opts.user_agent)
                .timeout(opts.timeout)
                .cookie_store(true)
                .gzip(true)
                .brotli(true)
                .deflate(true)
                .build()
                .unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "falling back to a default HTTP client");
                    reqwest::Client::new()
                })
        });
        let filters = opts.filters.clone().unwrap_or_default();

        Self {
            defaults,
            opts,
            http,
            filters,
            resolved: OnceCell::new(),
        }
    }

    /// The site name as shipped in its defaults.
    pub fn name(&self) -> &str {
        &self.defaults.name
    }

    /// The effective configuration, resolved on first access.
    pub fn config(&self) -> Result<&SiteConfig, SiteError> {
        Ok(&self.resolved()?.config)
    }

    fn resolved(&self) -> Result<&Resolved, SiteError> {
        self.resolved.get_or_try_init(|| {
            let config = self
                .resolve_config()
                .map_err(|e| SiteError::config(self.name(), "Config", Some(e.into())))?;
            let filters = match config.timezone_offset.as_deref() {
                Some(offset) => self.filters.clone().with_default_zone(offset),
                None => self.filters.clone(),
            };
            Ok(Resolved { config, filters })
        })
    }

    fn resolve_config(&self) -> Result<SiteConfig, ConfigError> {
        let mut config = resolve(&self.defaults, &self.opts.overrides)?;
        if let Some(policy) = self.opts.auth_policy {
            config.auth_policy = policy;
        }

        if let Some((group, field, filter)) = config
            .filter_refs()
            .find(|(_, _, name)| !self.filters.contains(name))
        {
            return Err(ConfigError::UnknownFilter {
                group: group.to_string(),
                field: field.to_string(),
                filter: filter.to_string(),
            });
        }

        warm_site(&config);

        tracing::debug!(site = %config.name, url = %config.url, "resolved site config");
        Ok(config)
    }

    /// The URL requests and links resolve against.
    pub fn active_url(&self) -> Result<&str, SiteError> {
        Ok(self.config()?.active_url())
    }

    pub fn auth_policy(&self) -> Result<AuthPolicy, SiteError> {
        Ok(self.config()?.auth_policy)
    }

    fn links(&self, config: &SiteConfig) -> ActiveUrl {
        ActiveUrl::new(config.active_url())
    }

    /// Performs one request and applies the status and login gates.
    pub async fn request(&self, spec: &RequestSpec) -> Result<RawResponse, SiteError> {
        self.send(spec, "Request").await
    }

    async fn send(&self, spec: &RequestSpec, op: &str) -> Result<RawResponse, SiteError> {
        let config = self.config()?;
        let base = spec.base_url.as_deref().unwrap_or_else(|| config.active_url());

        let response = fetch(&self.http, spec, base, &self.opts.headers)
            .await
            .map_err(|e| SiteError::network(&config.name, op, Some(e)))?;

        tracing::debug!(
            site = %config.name,
            url = %response.url,
            status = response.status,
            "request completed"
        );

        if response.status > 400 {
            return Err(SiteError::network(
                &config.name,
                op,
                Some(anyhow::anyhow!("HTTP status {}", response.status)),
            ));
        }

        if !config.auth_policy.is_authenticated(&response) {
            return Err(SiteError::authentication(
                &config.name,
                op,
                Some(anyhow::anyhow!("login required at {}", response.final_url)),
            ));
        }

        Ok(response)
    }

    /// Builds the search request for a filter.
    ///
    /// Category constraints outside the site's vocabulary are dropped.
    pub fn build_search_request(&self, filter: &SearchFilter) -> Result<RequestSpec, SiteError> {
        let config = self.config()?;
        let search = &config.search;
        let mut spec = RequestSpec::from_config(&search.request_config);

        if let Some(keywords) = filter.keywords.as_deref().filter(|k| !k.trim().is_empty()) {
            match search.keywords_param.as_deref() {
                Some(param) => spec = spec.param(param, keywords.trim()),
                None => tracing::warn!(site = %config.name, "site has no keywordsParam, keywords ignored"),
            }
        }

        for constraint in &filter.categories {
            let known = search
                .categories
                .iter()
                .filter(|c| c.key == constraint.key)
                .flat_map(|c| c.options.iter())
                .find(|o| param_string(&o.value) == constraint.value);
            match known {
                Some(option) => spec = spec.param(&constraint.key, param_string(&option.value)),
                None => tracing::warn!(
                    site = %config.name,
                    key = %constraint.key,
                    value = %constraint.value,
                    "category constraint not offered by site, dropped"
                ),
            }
        }

        Ok(spec)
    }

    /// Transforms a search result body with the `search` field group.
    pub fn transform_search_page(&self, body: &str) -> Result<Vec<Entity>, SiteError> {
        let Resolved { config, filters } = self.resolved()?;
        let Some(group) = config.group(SEARCH_GROUP) else {
            tracing::warn!(site = %config.name, "site has no search field group");
            return Ok(Vec::new());
        };
        Ok(transform_page(
            body,
            config.search.response_type,
            config.search.rows.as_deref(),
            group,
            filters,
            &self.links(config),
        ))
    }

    pub async fn search(&self, filter: &SearchFilter) -> Result<Vec<Entity>, SiteError> {
        let spec = self.build_search_request(filter)?;
        let response = self.send(&spec, "Search").await?;
        self.transform_search_page(response.text())
    }

    /// Extracts one field group from a whole page; all of its fields when `fields` is `None`.
    ///
    /// An unknown group yields an empty entity.
    pub fn transform_section_page(
        &self,
        group: &str,
        body: &str,
        response_type: ResponseType,
        fields: Option<&[String]>,
    ) -> Result<Entity, SiteError> {
        let Resolved { config, filters } = self.resolved()?;
        let Some(group) = config.group(group) else {
            return Ok(Entity::new());
        };
        Ok(transform_section(
            body,
            response_type,
            group,
            fields,
            filters,
            &self.links(config),
        ))
    }

    /// Extracts `userInfo` fields from one page.
    pub fn transform_user_info_page(
        &self,
        body: &str,
        response_type: ResponseType,
        fields: Option<&[String]>,
    ) -> Result<Entity, SiteError> {
        self.transform_section_page(USER_INFO_GROUP, body, response_type, fields)
    }

    /// Collects the user profile.
    ///
    /// Runs the `userInfo.process` steps in order, feeding fields extracted by
    /// earlier steps into later request params. A later step's zero
    /// value never erases one an earlier step found. Without a process, the active
    /// URL is requested and every `userInfo` field extracted from it.
    pub async fn user_info(&self) -> Result<Entity, SiteError> {
        let config = self.config()?;
        let process = config
            .user_info
            .as_ref()
            .map(|u| u.process.as_slice())
            .unwrap_or_default();

        if process.is_empty() {
            let response = self.send(&RequestSpec::get(""), "UserInfo").await?;
            return self.transform_user_info_page(response.text(), ResponseType::Document, None);
        }

        let mut profile = Entity::new();
        'steps: for (index, step) in process.iter().enumerate() {
            let mut spec = RequestSpec::from_config(&step.request_config);
            for (field, param) in &step.assertion {
                match profile.get(field).filter(|v| !v.is_empty()) {
                    Some(value) => spec = spec.param(param, value.as_text()),
                    None => {
                        tracing::warn!(
                            site = %config.name,
                            step = index,
                            field = %field,
                            "asserted field missing, user info step skipped"
                        );
                        continue 'steps;
                    }
                }
            }

            let response = self.send(&spec, "UserInfo").await?;
            let pending: Vec<String>;
            let fields = if step.fields.is_empty() {
                // whole-group steps only fill what earlier steps left empty
                pending = config
                    .group(USER_INFO_GROUP)
                    .map(|group| {
                        group
                            .keys()
                            .filter(|name| {
                                profile.get(name).map_or(true, FieldValue::is_zero_value)
                            })
                            .cloned()
                            .collect()
                    })
                    .unwrap_or_default();
                pending.as_slice()
            } else {
                step.fields.as_slice()
            };
            let part =
                self.transform_user_info_page(response.text(), step.response_type, Some(fields))?;
            profile.merge_filled(part);
        }
        Ok(profile)
    }

    /// Checks that the site answers with a logged-in page.
    ///
    /// Authentication failures read as `false`; other errors propagate.
    pub async fn ping(&self) -> Result<bool, SiteError> {
        match self.send(&RequestSpec::get(""), "Ping").await {
            Ok(_) => Ok(true),
            Err(e) if e.is_authentication() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// The detail page link of a torrent id, when the site declares a template.
    pub fn detail_page_link(&self, id: &str) -> Result<Option<String>, SiteError> {
        let config = self.config()?;
        Ok(config
            .detail_page_path
            .as_deref()
            .map(|template| self.links(config).normalize(&template.replace("{id}", id))))
    }
}
