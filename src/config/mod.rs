//! Host-provided configuration.
//!
//! The host package manager loads and merges the project configuration;
//! this crate only consumes the recognized options of the resulting
//! "extra" object, then layers environment overrides on top.

use anyhow::{Context, Result};
use log::debug;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::runtime::Runtime;

/// Recognized options of the host "extra" object.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ExtraConfig {
    /// Install root for the site skeleton package.
    #[serde(rename = "drupal-root")]
    pub root: String,
    /// Sites collection subpath under the root.
    #[serde(rename = "drupal-sites")]
    pub sites: String,
    /// Active site name inside the sites collection.
    #[serde(rename = "drupal-site")]
    pub site: String,
    /// Placement rules for modules: `vendor/project` or `vendor/*` to a
    /// target subdirectory name.
    #[serde(rename = "drupal-modules")]
    pub modules: BTreeMap<String, String>,
    /// Placement rules for themes, same shape as modules.
    #[serde(rename = "drupal-themes")]
    pub themes: BTreeMap<String, String>,
    /// Placement rules for libraries; an empty target means "use the
    /// project name", anything else overrides the directory name.
    #[serde(rename = "drupal-libraries")]
    pub libraries: BTreeMap<String, String>,
    /// Extra paths preserved across destructive reinstalls.
    #[serde(rename = "drupal-custom")]
    pub custom: Vec<String>,
    /// Patches per package name; packages listed here defer their branch
    /// retention decision until all patches have been applied.
    pub patches: BTreeMap<String, Vec<String>>,
    pub git: GitSettings,
}

impl Default for ExtraConfig {
    fn default() -> Self {
        Self {
            root: "core".to_string(),
            sites: "sites".to_string(),
            site: "all".to_string(),
            modules: BTreeMap::new(),
            themes: BTreeMap::new(),
            libraries: BTreeMap::new(),
            custom: Vec::new(),
            patches: BTreeMap::new(),
            git: GitSettings::default(),
        }
    }
}

impl ExtraConfig {
    /// Parse from JSON text: either a full manifest carrying an `extra`
    /// key, or the bare extra object itself.
    pub fn from_json_str(contents: &str) -> Result<Self> {
        let value: serde_json::Value =
            serde_json::from_str(contents).context("invalid configuration JSON")?;
        Self::from_value(value)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let extra = match value.get("extra") {
            Some(extra) => extra.clone(),
            None => value,
        };
        serde_json::from_value(extra).context("unrecognized configuration shape")
    }

    /// Layer environment overrides on top of the loaded configuration.
    pub fn apply_env_overrides<R: Runtime>(&mut self, runtime: &R) {
        if let Ok(remote) = runtime.env_var("COMPOSER_GIT_REMOTE") {
            debug!("git.remote overridden from environment");
            self.git.remote = remote;
        }
        if let Ok(prefix) = runtime.env_var("COMPOSER_GIT_COMMIT_PREFIX") {
            debug!("git.commit-prefix overridden from environment");
            self.git.commit_prefix = prefix;
        }
        if let Ok(security) = runtime.env_var("COMPOSER_GIT_SECURITY") {
            debug!("git.security overridden from environment");
            self.git.security = env_flag(&security);
        }
        if let Ok(auto_remove) = runtime.env_var("COMPOSER_GIT_AUTO_REMOVE") {
            debug!("git.auto-remove overridden from environment");
            self.git.auto_remove = env_flag(&auto_remove);
        }
    }

    /// The site-specific data directory, always preserved.
    pub fn sites_path(&self) -> PathBuf {
        Path::new(&self.root).join(&self.sites)
    }

    /// Paths that must survive a destructive reinstall: the configured
    /// custom paths plus the sites directory.
    pub fn preserved_paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self.custom.iter().map(PathBuf::from).collect();
        let sites = self.sites_path();
        if !paths.contains(&sites) {
            paths.push(sites);
        }
        paths
    }
}

/// Revision-workflow settings, process-wide for one run.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GitSettings {
    /// Commit install/patch changes to the per-package branch.
    pub commit: bool,
    #[serde(rename = "commit-prefix")]
    pub commit_prefix: String,
    /// Backup subdirectory name for embedded repository metadata; an
    /// empty value disables the whole metadata shuffle and branching.
    pub path: String,
    #[serde(rename = "base-branch")]
    pub base_branch: String,
    #[serde(rename = "branch-prefix")]
    pub branch_prefix: String,
    #[serde(rename = "auto-push")]
    pub auto_push: bool,
    #[serde(rename = "auto-remove")]
    pub auto_remove: bool,
    pub remote: String,
    /// Keep only branches crossing a security-relevant release boundary.
    pub security: bool,
}

impl Default for GitSettings {
    fn default() -> Self {
        Self {
            commit: false,
            commit_prefix: String::new(),
            path: ".git-drupal".to_string(),
            base_branch: String::new(),
            branch_prefix: "composer-".to_string(),
            auto_push: false,
            auto_remove: true,
            remote: "origin".to_string(),
            security: false,
        }
    }
}

// Empty and "0" are off, anything else is on.
fn env_flag(value: &str) -> bool {
    !(value.is_empty() || value == "0")
}
