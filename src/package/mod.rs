//! Package identity as reported by the host package manager.

pub mod descriptor;
pub mod version;

use anyhow::{Result, bail};

pub use descriptor::DescriptorInfo;
pub use version::CanonicalVersion;

/// Declared package type, parsed from the host's type string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageType {
    /// `drupal-module`
    Module,
    /// `drupal-theme`
    Theme,
    /// Any other `drupal-*` type (core, drush extensions, ...)
    DrupalOther,
    /// `library`
    Library,
    /// `metapackage`
    Metapackage,
    /// `composer-plugin` and friends, loaded during early bootstrap
    Plugin,
    Other,
}

impl PackageType {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "drupal-module" => Self::Module,
            "drupal-theme" => Self::Theme,
            "library" => Self::Library,
            "metapackage" => Self::Metapackage,
            other => match other.split('-').next() {
                Some("composer") => Self::Plugin,
                Some("drupal") => Self::DrupalOther,
                _ => Self::Other,
            },
        }
    }

    /// True for types belonging to the assembled site tree.
    pub fn is_drupal(self) -> bool {
        matches!(self, Self::Module | Self::Theme | Self::DrupalOther)
    }
}

/// Identity of a package for one lifecycle event. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageIdentity {
    /// Full `vendor/project` name, lower-cased.
    pub name: String,
    pub vendor: String,
    pub project: String,
    pub package_type: PackageType,
    /// Raw type string as reported by the host.
    pub type_name: String,
    /// Version as reported by the host (composer "pretty" form).
    pub version: String,
    /// Address of the originating package source, when known.
    pub source_url: Option<String>,
}

impl PackageIdentity {
    pub fn new(name: &str, type_name: &str, version: &str) -> Result<Self> {
        let name = name.to_lowercase();
        let Some((vendor, project)) = name.split_once('/') else {
            bail!("invalid package name {name:?}: expected \"vendor/project\"");
        };
        if vendor.is_empty() || project.is_empty() {
            bail!("invalid package name {name:?}: expected \"vendor/project\"");
        }
        Ok(Self {
            vendor: vendor.to_string(),
            project: project.to_string(),
            name: name.clone(),
            package_type: PackageType::parse(type_name),
            type_name: type_name.to_string(),
            version: version.to_string(),
            source_url: None,
        })
    }

    pub fn with_source_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }

    /// The site skeleton package that owns the install root.
    pub fn is_root(&self) -> bool {
        self.name == "drupal/drupal"
    }

    /// Distribution series resolved from the package source address.
    ///
    /// The dedicated package endpoint separates the platform series from
    /// the version entirely; it is encoded as the first path segment of
    /// the source URL (e.g. `https://packages.drupal.org/7`).
    pub fn distribution_series(&self) -> Option<&str> {
        let url = self.source_url.as_deref()?;
        let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
        let (host, path) = rest.split_once('/')?;
        if host != "packages.drupal.org" {
            return None;
        }
        let series = path.split('/').next()?;
        if series.is_empty() { None } else { Some(series) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_type_parse() {
        assert_eq!(PackageType::parse("drupal-module"), PackageType::Module);
        assert_eq!(PackageType::parse("drupal-theme"), PackageType::Theme);
        assert_eq!(PackageType::parse("drupal-core"), PackageType::DrupalOther);
        assert_eq!(PackageType::parse("drupal-drush"), PackageType::DrupalOther);
        assert_eq!(PackageType::parse("library"), PackageType::Library);
        assert_eq!(PackageType::parse("metapackage"), PackageType::Metapackage);
        assert_eq!(PackageType::parse("composer-plugin"), PackageType::Plugin);
        assert_eq!(
            PackageType::parse("composer-installer"),
            PackageType::Plugin
        );
        assert_eq!(PackageType::parse("php-library"), PackageType::Other);
    }

    #[test]
    fn test_package_type_is_drupal() {
        assert!(PackageType::Module.is_drupal());
        assert!(PackageType::Theme.is_drupal());
        assert!(PackageType::DrupalOther.is_drupal());
        assert!(!PackageType::Library.is_drupal());
        assert!(!PackageType::Plugin.is_drupal());
        assert!(!PackageType::Other.is_drupal());
    }

    #[test]
    fn test_identity_new_splits_and_lowercases() {
        let identity = PackageIdentity::new("Acme/Widgets", "drupal-module", "1.0.0").unwrap();
        assert_eq!(identity.name, "acme/widgets");
        assert_eq!(identity.vendor, "acme");
        assert_eq!(identity.project, "widgets");
        assert_eq!(identity.package_type, PackageType::Module);
        assert_eq!(identity.version, "1.0.0");
    }

    #[test]
    fn test_identity_new_rejects_malformed_names() {
        assert!(PackageIdentity::new("widgets", "drupal-module", "1.0").is_err());
        assert!(PackageIdentity::new("/widgets", "drupal-module", "1.0").is_err());
        assert!(PackageIdentity::new("acme/", "drupal-module", "1.0").is_err());
    }

    #[test]
    fn test_identity_is_root() {
        let root = PackageIdentity::new("drupal/drupal", "drupal-core", "8.1.0").unwrap();
        assert!(root.is_root());
        let module = PackageIdentity::new("drupal/views", "drupal-module", "1.0").unwrap();
        assert!(!module.is_root());
    }

    #[test]
    fn test_distribution_series_from_source_url() {
        let identity = PackageIdentity::new("drupal/views", "drupal-module", "3.24.0")
            .unwrap()
            .with_source_url("https://packages.drupal.org/7");
        assert_eq!(identity.distribution_series(), Some("7"));

        let other = PackageIdentity::new("drupal/views", "drupal-module", "3.24.0")
            .unwrap()
            .with_source_url("https://packagist.org/p/drupal/views");
        assert_eq!(other.distribution_series(), None);

        let none = PackageIdentity::new("drupal/views", "drupal-module", "3.24.0").unwrap();
        assert_eq!(none.distribution_series(), None);
    }
}
