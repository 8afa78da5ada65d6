// ABOUTME: Main library entry point for the trawl tracker-site extraction engine.
// ABOUTME: Re-exports the public API: Site, SiteBuilder, SiteConfig, Entity, FilterRegistry, SiteError and loaders.

//! Trawl - declarative data extraction for torrent tracker sites.
//!
//! Each site is described as data: base URL, search request template, and
//! field queries (CSS selectors or JSON paths plus named filters). A [`Site`]
//! resolves that data with caller overrides, performs requests, detects
//! logged-out sessions, and turns pages into flat [`Entity`] records.
//!
//! # Example
//!
//! ```no_run
//! use trawl_engine::{load_builtin_registry, SearchFilter, SiteError};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), SiteError> {
//!     let registry = load_builtin_registry();
//!     let site = registry
//!         .builder("SDBits")
//!         .expect("site is registered")
//!         .cookie("uid=1; pass=secret")
//!         .build();
//!     for torrent in site.search(&SearchFilter::keywords("dune")).await? {
//!         println!("{}", serde_json::to_string(&torrent).unwrap());
//!     }
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod config;
pub mod entity;
pub mod error;
pub mod extractors;
pub mod filters;
pub mod link;
pub mod loader;
pub mod options;
pub mod registry;
pub mod resource;
pub mod site;

pub use crate::auth::AuthPolicy;
pub use crate::config::{
    resolve, Category, CategoryOption, FieldGroup, FieldQuery, FilterSpec, ProcessStep,
    RequestConfig, ResponseType, SearchConfig, SelectorList, SiteConfig, SiteMetadata,
    UserInfoConfig,
};
pub use crate::entity::{CategoryConstraint, Entity, FieldValue, SearchFilter, Torrent, UserProfile};
pub use crate::error::{ConfigError, ErrorCode, SiteError};
pub use crate::extractors::field::{extract, ValueSource};
pub use crate::extractors::row::{transform_page, transform_row, transform_section};
pub use crate::filters::{FilterFn, FilterRegistry};
pub use crate::link::{ActiveUrl, LinkNormalizer};
pub use crate::loader::{load_builtin_registry, load_sites_json};
pub use crate::options::{SiteBuilder, SiteOptions};
pub use crate::registry::SiteRegistry;
pub use crate::resource::{RawResponse, RequestSpec};
pub use crate::site::Site;
