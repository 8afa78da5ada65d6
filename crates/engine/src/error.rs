// ABOUTME: Error types for the extraction engine: ErrorCode enum, SiteError struct and ConfigError enum.
// ABOUTME: SiteError carries the site name and failing operation with convenience constructors and predicates.

use std::fmt;

use thiserror::Error;

/// Error codes representing the three failure categories a caller reacts to differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// The effective configuration could not be resolved. Not retryable.
    Config,
    /// Transport failure or an HTTP status above 400.
    Network,
    /// The response arrived but the session is not logged in.
    Authentication,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCode::Config => "configuration error",
            ErrorCode::Network => "network error",
            ErrorCode::Authentication => "not authenticated",
        };
        write!(f, "{}", s)
    }
}

/// The main error type for site operations.
#[derive(Debug, Error)]
pub struct SiteError {
    pub code: ErrorCode,
    pub site: String,
    pub op: String,
    #[source]
    pub source: Option<anyhow::Error>,
}

impl fmt::Display for SiteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "trawl: {} {}: {}", self.op, self.site, self.code)?;
        if let Some(ref src) = self.source {
            write!(f, ": {}", src)?;
        }
        Ok(())
    }
}

impl SiteError {
    /// Create a Config error.
    pub fn config(
        site: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self {
            code: ErrorCode::Config,
            site: site.into(),
            op: op.into(),
            source,
        }
    }

    /// Create a Network error.
    pub fn network(
        site: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self {
            code: ErrorCode::Network,
            site: site.into(),
            op: op.into(),
            source,
        }
    }

    /// Create an Authentication error.
    pub fn authentication(
        site: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self {
            code: ErrorCode::Authentication,
            site: site.into(),
            op: op.into(),
            source,
        }
    }

    /// Returns true if this is a Config error.
    pub fn is_config(&self) -> bool {
        self.code == ErrorCode::Config
    }

    /// Returns true if this is a Network error.
    pub fn is_network(&self) -> bool {
        self.code == ErrorCode::Network
    }

    /// Returns true if this is an Authentication error.
    pub fn is_authentication(&self) -> bool {
        self.code == ErrorCode::Authentication
    }
}

/// Reasons an effective configuration cannot be resolved.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No base URL in either the defaults or the overrides.
    #[error("site {0:?} has no base url")]
    MissingUrl(String),

    /// The base URL does not parse or has no host.
    #[error("invalid base url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The merged document no longer matches the configuration schema.
    #[error("invalid configuration: {0}")]
    Schema(String),

    /// A field query references a filter that is not registered.
    #[error("unknown filter {filter:?} in {group}.{field}")]
    UnknownFilter {
        group: String,
        field: String,
        filter: String,
    },

    /// Site definition data could not be parsed.
    #[error("failed to parse site definitions: {0}")]
    Parse(String),
}

impl ConfigError {
    /// Creates a Schema error from an underlying serde error.
    pub fn schema(err: impl fmt::Display) -> Self {
        ConfigError::Schema(err.to_string())
    }
}
