//! Deterministic placement of packages inside the assembled site tree.
//!
//! Rules are an ordered list of `(kind, pattern, target)` entries tried in
//! priority order: exact `vendor/project` matches always precede
//! `vendor/*` wildcards, so precedence is a property of the data rather
//! than of scattered lookups.

use log::info;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use crate::config::ExtraConfig;
use crate::package::{PackageIdentity, PackageType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Exact,
    VendorWildcard,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementRule {
    pub kind: MatchKind,
    pub pattern: String,
    pub target: String,
}

/// Bucket used when no module/theme rule matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DefaultBucket {
    /// Legacy behavior.
    #[default]
    Custom,
    /// Newer behavior.
    Project,
}

impl DefaultBucket {
    fn dir_name(self) -> &'static str {
        match self {
            Self::Custom => "custom",
            Self::Project => "project",
        }
    }
}

/// The full rule set: one table per category plus the tree layout.
#[derive(Debug, Clone)]
pub struct PlacementRules {
    root: PathBuf,
    sites: String,
    site: String,
    modules: Vec<PlacementRule>,
    themes: Vec<PlacementRule>,
    libraries: Vec<PlacementRule>,
    default_bucket: DefaultBucket,
}

impl PlacementRules {
    pub fn from_config(config: &ExtraConfig) -> Self {
        Self {
            root: PathBuf::from(&config.root),
            sites: config.sites.clone(),
            site: config.site.clone(),
            modules: build_table(&config.modules, &[("drupal/*", "contrib")]),
            themes: build_table(&config.themes, &[("drupal/*", "contrib")]),
            libraries: build_table(&config.libraries, &[("ckeditor/ckeditor", "")]),
            default_bucket: DefaultBucket::default(),
        }
    }

    pub fn with_default_bucket(mut self, bucket: DefaultBucket) -> Self {
        self.default_bucket = bucket;
        self
    }

    /// Compute the installation path for a package, or `None` when this
    /// rule set has no opinion and the host's own placement applies.
    pub fn resolve(&self, identity: &PackageIdentity) -> Option<PathBuf> {
        // Early-bootstrap plugins always belong to the host.
        if identity.package_type == PackageType::Plugin {
            return None;
        }
        if identity.is_root() {
            return Some(self.root.clone());
        }

        let site_base = self.root.join(&self.sites).join(&self.site);

        let tree = match identity.package_type {
            PackageType::Module => Some(("modules", &self.modules)),
            PackageType::Theme => Some(("themes", &self.themes)),
            _ => None,
        };
        if let Some((tree_dir, table)) = tree {
            let bucket = match lookup(table, identity) {
                Some(rule) => rule.target.as_str(),
                None => self.default_bucket.dir_name(),
            };
            return Some(
                site_base
                    .join(tree_dir)
                    .join(bucket)
                    .join(&identity.project),
            );
        }

        // The library table only applies when no module/theme path was
        // produced above.
        if let Some(rule) = lookup(&self.libraries, identity) {
            let dir_name = if rule.target.is_empty() {
                identity.project.as_str()
            } else {
                rule.target.as_str()
            };
            return Some(site_base.join("libraries").join(dir_name));
        }

        None
    }
}

fn build_table(configured: &BTreeMap<String, String>, defaults: &[(&str, &str)]) -> Vec<PlacementRule> {
    let mut merged: BTreeMap<String, String> = configured
        .iter()
        .map(|(pattern, target)| (pattern.to_lowercase(), target.clone()))
        .collect();
    for (pattern, target) in defaults {
        merged
            .entry((*pattern).to_string())
            .or_insert_with(|| (*target).to_string());
    }

    let mut exact = Vec::new();
    let mut wildcards = Vec::new();
    for (pattern, target) in merged {
        if pattern.ends_with("/*") {
            wildcards.push(PlacementRule {
                kind: MatchKind::VendorWildcard,
                pattern,
                target,
            });
        } else {
            exact.push(PlacementRule {
                kind: MatchKind::Exact,
                pattern,
                target,
            });
        }
    }
    exact.extend(wildcards);
    exact
}

fn lookup<'a>(rules: &'a [PlacementRule], identity: &PackageIdentity) -> Option<&'a PlacementRule> {
    rules.iter().find(|rule| match rule.kind {
        MatchKind::Exact => rule.pattern == identity.name,
        MatchKind::VendorWildcard => {
            rule.pattern[..rule.pattern.len() - 2] == *identity.vendor
        }
    })
}

/// Rule-set resolution with a per-run cache keyed by package name.
pub struct PlacementResolver {
    rules: PlacementRules,
    cache: HashMap<String, Option<PathBuf>>,
}

impl PlacementResolver {
    pub fn new(rules: PlacementRules) -> Self {
        Self {
            rules,
            cache: HashMap::new(),
        }
    }

    pub fn resolve(&mut self, identity: &PackageIdentity) -> Option<PathBuf> {
        if let Some(cached) = self.cache.get(&identity.name) {
            return cached.clone();
        }
        let resolved = self.rules.resolve(identity);
        if let Some(path) = &resolved {
            info!("Installing {} in {}", identity.name, path.display());
        }
        self.cache.insert(identity.name.clone(), resolved.clone());
        resolved
    }

    /// Resolve to a concrete directory, falling back to the host's default
    /// layout when the rule set has no opinion.
    pub fn install_path(&mut self, identity: &PackageIdentity) -> PathBuf {
        self.resolve(identity).unwrap_or_else(|| {
            Path::new("vendor")
                .join(&identity.vendor)
                .join(&identity.project)
        })
    }
}
