//! Lifecycle phase orchestration.
//!
//! The host drives each package operation through four synchronous
//! phases: `before_package`, `after_package`, optionally `after_patch`
//! (once per applied patch) and `after_all_patches`, with `finish` once
//! at the end of the run. All run-scoped mutable state lives in an
//! explicit [`RunContext`] so the ordering dependencies between phases
//! stay visible.

use anyhow::Result;
use log::{debug, info};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use crate::config::ExtraConfig;
use crate::git::{self, GitWorkflow};
use crate::package::descriptor::DescriptorInfo;
use crate::package::{PackageIdentity, PackageType, version};
use crate::placement::{PlacementResolver, PlacementRules};
use crate::preserve::{self, PreservationState};
use crate::release::FetchReleaseHistory;
use crate::runtime::Runtime;
use crate::stamp::{self, StampInfo};

/// State accumulated across one install/update run.
#[derive(Debug, Default)]
pub struct RunContext {
    pub preservation: PreservationState,
    /// Pre-install descriptor snapshots per package name.
    pub snapshots: HashMap<String, BTreeMap<PathBuf, DescriptorInfo>>,
    /// Branch names are a pure function of (project, version), computed
    /// once per package and cached for the run.
    branch_names: HashMap<String, String>,
}

/// How much of the lifecycle applies to a package.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    /// Host-internal packages: nothing to do.
    Skipped,
    /// Site-tree packages: descriptors, preservation and git.
    SiteTree,
    /// Plain libraries: git bookkeeping only.
    GitOnly,
}

fn package_scope(identity: &PackageIdentity) -> Scope {
    match identity.package_type {
        PackageType::Library => Scope::GitOnly,
        PackageType::Plugin | PackageType::Metapackage => Scope::Skipped,
        PackageType::Module | PackageType::Theme | PackageType::DrupalOther => Scope::SiteTree,
        PackageType::Other => {
            if identity.vendor == "drupal" {
                Scope::SiteTree
            } else {
                Scope::Skipped
            }
        }
    }
}

/// Phase handlers for one run, owning the collaborators and the context.
pub struct Lifecycle<R: Runtime, F: FetchReleaseHistory> {
    runtime: R,
    fetcher: F,
    config: ExtraConfig,
    resolver: PlacementResolver,
    ctx: RunContext,
}

impl<R: Runtime, F: FetchReleaseHistory> Lifecycle<R, F> {
    pub fn new(runtime: R, fetcher: F, mut config: ExtraConfig) -> Self {
        config.apply_env_overrides(&runtime);

        info!("Initializing drubuild lifecycle");
        debug!("drupal-root={}", config.root);
        if config.git.commit {
            debug!("git={:?}", config.git);
        } else {
            debug!("git.commit=false");
        }
        for path in &config.custom {
            debug!("drupal-custom[]={path}");
        }

        let resolver = PlacementResolver::new(PlacementRules::from_config(&config));
        Self {
            runtime,
            fetcher,
            config,
            resolver,
            ctx: RunContext::default(),
        }
    }

    pub fn config(&self) -> &ExtraConfig {
        &self.config
    }

    pub fn context(&self) -> &RunContext {
        &self.ctx
    }

    /// Pre-install/pre-update phase.
    pub fn before_package(&mut self, identity: &PackageIdentity) -> Result<()> {
        debug!("before: name={}, type={}", identity.name, identity.type_name);

        // Do not overwrite user changes: the only recovery path from a
        // half-finished run is re-running from a clean tree.
        GitWorkflow::new(&self.runtime, &self.config.git).ensure_clean_tree()?;

        let scope = package_scope(identity);
        if scope == Scope::Skipped {
            return Ok(());
        }

        if scope == Scope::SiteTree {
            let package_path = self.resolver.install_path(identity);
            let snapshot = stamp::read_tree_info(&self.runtime, &package_path)?;
            self.ctx.snapshots.insert(identity.name.clone(), snapshot);

            if identity.is_root() {
                info!("Saving custom paths");
                preserve::harden_site_permissions(&self.runtime, &self.config.sites_path());
                let paths = self.config.preserved_paths();
                preserve::save(&self.runtime, &mut self.ctx.preservation, &paths)?;
            }
        }

        if self.config.git.path.is_empty() {
            return Ok(());
        }
        if !self.config.git.base_branch.is_empty() {
            let branch = self.branch_name(identity);
            GitWorkflow::new(&self.runtime, &self.config.git).create_branch(&branch)?;
        }
        let package_path = self.resolver.install_path(identity);
        GitWorkflow::new(&self.runtime, &self.config.git).restore_metadata(&package_path);
        Ok(())
    }

    /// Post-install/post-update phase.
    pub fn after_package(&mut self, identity: &PackageIdentity) -> Result<()> {
        debug!("after: name={}, type={}", identity.name, identity.type_name);

        let scope = package_scope(identity);
        if scope == Scope::Skipped {
            return Ok(());
        }

        let package_path = self.resolver.install_path(identity);

        if scope == Scope::SiteTree {
            if identity.is_root() {
                preserve::restore(&self.runtime, &mut self.ctx.preservation)?;
            } else {
                let display = version::display(identity);
                let info = StampInfo::now(display, Some(identity.project.clone()));
                let empty = BTreeMap::new();
                let snapshot = self.ctx.snapshots.get(&identity.name).unwrap_or(&empty);
                stamp::stamp_tree(&self.runtime, &package_path, &info, snapshot)?;
            }
        }

        {
            let workflow = GitWorkflow::new(&self.runtime, &self.config.git);
            workflow.backup_metadata(&package_path);
            if self.config.git.commit {
                let display = version::display(identity);
                info!("Committing {} with version {} to git", identity.name, display);
                let message = format!(
                    "{}Update package {} to version {}",
                    self.config.git.commit_prefix, identity.name, display
                );
                workflow.commit_all(&package_path, &message);
            }
        }

        // Packages without configured patches decide branch retention now;
        // the rest wait until all their patches have been applied.
        if !self.config.patches.contains_key(&identity.name) {
            self.branch_cleanup(identity)?;
        }
        Ok(())
    }

    /// Fired once per applied patch by the patch-application collaborator.
    pub fn after_patch(&mut self, identity: &PackageIdentity, url: &str, description: &str) -> Result<()> {
        debug!(
            "after patch: name={}, type={}",
            identity.name, identity.type_name
        );
        if !identity.package_type.is_drupal() {
            return Ok(());
        }
        if !self.config.git.commit {
            return Ok(());
        }

        let package_path = self.resolver.install_path(identity);
        info!(
            "Committing patch {url} ({description}) for package {} to git",
            identity.name
        );
        let message = format!(
            "{}Applied patch {url} ({description}) for {}.",
            self.config.git.commit_prefix, identity.name
        );
        GitWorkflow::new(&self.runtime, &self.config.git).commit_all(&package_path, &message);
        // The branch is pushed after all patches have been committed.
        Ok(())
    }

    /// Fired once per package after all its patches have been applied.
    pub fn after_all_patches(&mut self, identity: &PackageIdentity) -> Result<()> {
        if identity.package_type.is_drupal() && self.config.patches.contains_key(&identity.name) {
            self.branch_cleanup(identity)?;
        }
        Ok(())
    }

    /// End of the entire run: return to the base branch.
    pub fn finish(&mut self) -> Result<()> {
        if !self.config.git.base_branch.is_empty() {
            GitWorkflow::new(&self.runtime, &self.config.git)
                .checkout(&self.config.git.base_branch);
        }
        Ok(())
    }

    /// Branch retention decision for one package.
    fn branch_cleanup(&mut self, identity: &PackageIdentity) -> Result<()> {
        if self.config.git.base_branch.is_empty() {
            return Ok(());
        }
        let branch = self.branch_name(identity);
        debug!("branch cleanup for {branch}");

        let workflow = GitWorkflow::new(&self.runtime, &self.config.git);
        workflow.verify_branch_exists(&self.config.git.base_branch)?;

        let differs = workflow.has_diff(Some(&branch));
        if differs {
            // Drop any half-applied state before deciding.
            workflow.reset_hard();
            let protected =
                !self.config.git.security || branch.ends_with(git::SECURITY_SUFFIX);
            if protected {
                debug!(
                    "Keeping branch {branch}, security={}",
                    self.config.git.security
                );
                if self.config.git.auto_push {
                    workflow.push_branch(&branch);
                }
                return Ok(());
            }
        }

        if !self.config.git.auto_remove {
            return Ok(());
        }
        workflow.delete_branch(&branch);
        if self.config.git.auto_push {
            workflow.delete_remote_branch(&branch);
        }
        Ok(())
    }

    fn branch_name(&mut self, identity: &PackageIdentity) -> String {
        if let Some(existing) = self.ctx.branch_names.get(&identity.name) {
            return existing.clone();
        }
        let display = version::display(identity);
        let security = identity.vendor == "drupal"
            && git::is_security_advisory(
                &self.fetcher,
                &identity.project,
                &display,
                self.previous_version(identity).as_deref(),
            );
        let name = git::branch_name(&self.config.git, &identity.project, &display, security);
        self.ctx
            .branch_names
            .insert(identity.name.clone(), name.clone());
        name
    }

    /// Version recorded in the package's descriptors before the install,
    /// used as the lower bound for security-boundary detection.
    fn previous_version(&self, identity: &PackageIdentity) -> Option<String> {
        self.ctx
            .snapshots
            .get(&identity.name)?
            .values()
            .next()?
            .version()
            .map(str::to_string)
    }
}
