// ABOUTME: SiteRegistry: site definitions looked up by name or alias, case-insensitively.
// ABOUTME: Keeps registration order so listings are stable.

use std::collections::HashMap;

use crate::config::SiteMetadata;
use crate::options::SiteBuilder;

/// Registry of site definitions.
#[derive(Debug, Clone, Default)]
pub struct SiteRegistry {
    sites: Vec<SiteMetadata>,
    index: HashMap<String, usize>,
}

impl SiteRegistry {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a site under its name and every alias.
    ///
    /// A later site with the same name replaces the earlier one, dropping the
    /// aliases it no longer declares. Names win over aliases: an alias never
    /// shadows another site's name.
    pub fn register(&mut self, site: SiteMetadata) {
        let name = site.name.to_lowercase();
        let existing = self
            .sites
            .iter()
            .position(|s| s.name.to_lowercase() == name);
        let slot = match existing {
            Some(slot) => {
                self.index.retain(|_, v| *v != slot);
                self.sites[slot] = site;
                slot
            }
            None => {
                self.sites.push(site);
                self.sites.len() - 1
            }
        };

        let site = &self.sites[slot];
        for alias in &site.aka {
            let key = alias.to_lowercase();
            let taken_by_name = self
                .index
                .get(&key)
                .is_some_and(|&other| other != slot && self.sites[other].name.to_lowercase() == key);
            if !taken_by_name {
                self.index.insert(key, slot);
            }
        }
        self.index.insert(name, slot);
    }

    /// Looks up a site by name or alias.
    pub fn get(&self, name: &str) -> Option<&SiteMetadata> {
        self.index
            .get(&name.trim().to_lowercase())
            .map(|&slot| &self.sites[slot])
    }

    /// A builder for the named site, ready for options and overrides.
    pub fn builder(&self, name: &str) -> Option<SiteBuilder> {
        self.get(name).cloned().map(SiteBuilder::new)
    }

    /// Sites in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &SiteMetadata> {
        self.sites.iter()
    }

    /// Returns the number of registered sites.
    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }
}

impl FromIterator<SiteMetadata> for SiteRegistry {
    fn from_iter<T: IntoIterator<Item = SiteMetadata>>(iter: T) -> Self {
        let mut registry = Self::new();
        for site in iter {
            registry.register(site);
        }
        registry
    }
}
