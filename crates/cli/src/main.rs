// ABOUTME: CLI for the trawl extraction engine: offline extraction, search, user info and site listing.
// ABOUTME: Resolves a site by name or JSON file and prints entities as JSON.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use trawl_engine::{
    load_builtin_registry, load_sites_json, ResponseType, SearchFilter, Site, SiteMetadata,
};

/// Extract torrent listings and user statistics from tracker sites.
#[derive(Parser, Debug)]
#[command(name = "trawl")]
#[command(about = "Declarative tracker-site extraction", long_about = None)]
struct Args {
    /// Output compact JSON instead of pretty.
    #[arg(long, global = true, default_value_t = false)]
    compact: bool,

    /// Cookie header sent with every request.
    #[arg(long, global = true)]
    cookie: Option<String>,

    /// Override the site's base URL.
    #[arg(long, global = true)]
    url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract a field group from a saved HTML page, without network access.
    Extract {
        /// Site name, alias, or path to a site definition JSON file
        #[arg(long)]
        site: String,
        /// Field group to apply, e.g. search or userInfo
        #[arg(long, default_value = "search")]
        group: String,
        /// HTML file to read
        #[arg(long)]
        html: PathBuf,
    },
    /// Search a site and print the result rows.
    Search {
        #[arg(long)]
        site: String,
        /// Category constraint as key=value; repeatable
        #[arg(long = "cat", value_name = "KEY=VALUE")]
        categories: Vec<String>,
        /// Search keywords
        keywords: Vec<String>,
    },
    /// Collect the logged-in user's statistics.
    UserInfo {
        #[arg(long)]
        site: String,
    },
    /// List the builtin site definitions.
    Sites,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let output = match &args.command {
        Command::Extract { site, group, html } => {
            let site = build_site(site, &args)?;
            let body = fs::read_to_string(html)
                .with_context(|| format!("failed to read {}", html.display()))?;
            extract_offline(&site, group, &body)?
        }
        Command::Search {
            site,
            categories,
            keywords,
        } => {
            let site = build_site(site, &args)?;
            let filter = search_filter(keywords, categories)?;
            let rows = site.search(&filter).await?;
            serde_json::to_value(rows)?
        }
        Command::UserInfo { site } => {
            let site = build_site(site, &args)?;
            serde_json::to_value(site.user_info().await?)?
        }
        Command::Sites => {
            let sites: Vec<Value> = load_builtin_registry()
                .iter()
                .map(|s| {
                    json!({
                        "name": s.name,
                        "aka": s.aka,
                        "url": s.url,
                        "tags": s.tags,
                    })
                })
                .collect();
            Value::Array(sites)
        }
    };

    if args.compact {
        println!("{}", serde_json::to_string(&output)?);
    } else {
        println!("{}", serde_json::to_string_pretty(&output)?);
    }

    Ok(())
}

/// Resolves `--site` as a definition file when it names one, else by registry name.
fn load_site(target: &str) -> Result<SiteMetadata> {
    let path = Path::new(target);
    if path.is_file() {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        return load_sites_json(&text)?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("no site definition in {}", target));
    }
    load_builtin_registry()
        .get(target)
        .cloned()
        .ok_or_else(|| anyhow!("unknown site: {}", target))
}

fn build_site(target: &str, args: &Args) -> Result<Site> {
    let mut builder = Site::builder(load_site(target)?);
    if let Some(cookie) = &args.cookie {
        builder = builder.cookie(cookie);
    }
    if let Some(url) = &args.url {
        builder = builder.overrides(json!({ "url": url, "activateUrl": url }));
    }
    let site = builder.build();
    // surface configuration problems before any request
    let config = site.config()?;
    tracing::debug!(site = %config.name, url = %config.active_url(), "site ready");
    Ok(site)
}

fn extract_offline(site: &Site, group: &str, body: &str) -> Result<Value> {
    if group == "search" {
        return Ok(serde_json::to_value(site.transform_search_page(body)?)?);
    }
    let config = site.config()?;
    if config.group(group).is_none() {
        bail!("site {} has no field group {:?}", config.name, group);
    }
    let entity = site.transform_section_page(group, body, ResponseType::Document, None)?;
    Ok(serde_json::to_value(entity)?)
}

fn search_filter(keywords: &[String], categories: &[String]) -> Result<SearchFilter> {
    let mut filter = SearchFilter::default();
    if !keywords.is_empty() {
        filter.keywords = Some(keywords.join(" "));
    }
    for constraint in categories {
        let Some((key, value)) = constraint.split_once('=') else {
            bail!("category must be KEY=VALUE, got {:?}", constraint);
        };
        filter = filter.category(key.trim(), value.trim());
    }
    Ok(filter)
}
