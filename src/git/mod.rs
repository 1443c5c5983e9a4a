//! Git plumbing for the per-package revision workflow.
//!
//! Every operation shells out through the [`Runtime`] command capability,
//! so the whole workflow is testable without a real repository. Only two
//! conditions are fatal: an uncommitted working tree at the start of a
//! package operation, and a configured base branch that does not exist.
//! Everything else is reported and skipped.

use anyhow::{Result, bail};
use log::{debug, info, warn};
use std::path::Path;

use crate::config::GitSettings;
use crate::package::CanonicalVersion;
use crate::release::FetchReleaseHistory;
use crate::runtime::{CommandOutput, CommandSpec, Runtime};

/// Suffix marking a branch as crossing a security-relevant release
/// boundary; such branches are always retained.
pub const SECURITY_SUFFIX: &str = "-SA";

/// Branch name for one package operation: prefix + project + display
/// version, with underscores flattened to dashes.
pub fn branch_name(settings: &GitSettings, project: &str, version: &str, security: bool) -> String {
    let mut name = format!("{}{}", settings.branch_prefix, project).replace('_', "-");
    name.push('-');
    name.push_str(version);
    if security {
        name.push_str(SECURITY_SUFFIX);
    }
    name
}

/// True when upgrading from `old_version` to `new_version` crosses a
/// release classified as a security update in the project's history.
pub fn is_security_advisory<F: FetchReleaseHistory + ?Sized>(
    fetcher: &F,
    project: &str,
    new_version: &str,
    old_version: Option<&str>,
) -> bool {
    // Development releases are never security advisories.
    if new_version.contains("dev") {
        return false;
    }
    let major: String = new_version
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    if major.is_empty() {
        return false;
    }

    let history = match fetcher.fetch(project, &major) {
        Ok(Some(history)) => history,
        Ok(None) => return false,
        Err(err) => {
            warn!("Cannot fetch release history for {project}: {err}");
            return false;
        }
    };

    let new = CanonicalVersion::parse(new_version);
    let old = old_version
        .map(CanonicalVersion::parse)
        .unwrap_or_else(CanonicalVersion::zero);

    for release in &history.releases {
        if !release.is_security_update() {
            continue;
        }
        let boundary = CanonicalVersion::parse(&release.version);
        if old < boundary && new >= boundary {
            debug!(
                "{project}: {old_version:?} -> {new_version} crosses security release {}",
                release.version
            );
            return true;
        }
    }
    false
}

/// Git operations for one run, parameterized by the run's settings.
pub struct GitWorkflow<'a, R: Runtime> {
    runtime: &'a R,
    settings: &'a GitSettings,
}

impl<'a, R: Runtime> GitWorkflow<'a, R> {
    pub fn new(runtime: &'a R, settings: &'a GitSettings) -> Self {
        Self { runtime, settings }
    }

    fn git(&self, args: &[&str]) -> Result<CommandOutput> {
        self.runtime.run(&CommandSpec::new("git").args(args.iter().copied()))
    }

    fn git_in(&self, cwd: &Path, args: &[&str]) -> Result<CommandOutput> {
        self.runtime
            .run(&CommandSpec::new("git").args(args.iter().copied()).cwd(cwd))
    }

    /// Run a git command, logging a failure instead of propagating it.
    fn run_logged(&self, args: &[&str]) -> bool {
        match self.git(args) {
            Ok(output) if output.success() => true,
            Ok(output) => {
                warn!("git {} failed: {}", args.join(" "), output.stderr.trim());
                false
            }
            Err(err) => {
                warn!("git {} failed: {err}", args.join(" "));
                false
            }
        }
    }

    fn run_logged_in(&self, cwd: &Path, args: &[&str]) -> bool {
        match self.git_in(cwd, args) {
            Ok(output) if output.success() => true,
            Ok(output) => {
                warn!("git {} failed: {}", args.join(" "), output.stderr.trim());
                false
            }
            Err(err) => {
                warn!("git {} failed: {err}", args.join(" "));
                false
            }
        }
    }

    /// Fatal when the configured branch does not exist.
    pub fn verify_branch_exists(&self, branch: &str) -> Result<()> {
        let exists = matches!(
            self.git(&["rev-parse", "--verify", branch]),
            Ok(output) if output.success()
        );
        if !exists {
            bail!("specified base-branch {branch:?} does not exist");
        }
        Ok(())
    }

    /// True when `git diff` output is non-empty: against the working tree
    /// by default, or between the base branch and `branch` when given.
    pub fn has_diff(&self, branch: Option<&str>) -> bool {
        let mut args = vec!["diff"];
        if let Some(branch) = branch {
            args.push(self.settings.base_branch.as_str());
            args.push(branch);
        }
        match self.git(&args) {
            Ok(output) if output.success() => {
                let diff = output.stdout.trim();
                if !diff.is_empty() {
                    let preview: String = diff.chars().take(10).collect();
                    debug!("{preview}...");
                }
                !diff.is_empty()
            }
            _ => false,
        }
    }

    /// Guard against destroying user edits: fatal when the working tree
    /// already differs before any work begins.
    pub fn ensure_clean_tree(&self) -> Result<()> {
        if self.has_diff(None) {
            bail!(
                "there are uncommitted changes which would be removed; commit all changes first"
            );
        }
        Ok(())
    }

    /// Force-create the per-package branch off the base branch and switch
    /// to it. Fatal when the base branch is missing.
    pub fn create_branch(&self, name: &str) -> Result<()> {
        self.verify_branch_exists(&self.settings.base_branch)?;
        info!("Creating branch {name}");
        self.run_logged(&["reset", "--hard"]);
        self.run_logged(&["branch", name, self.settings.base_branch.as_str(), "--force"]);
        self.run_logged(&["checkout", name]);
        Ok(())
    }

    /// Undo a previous run's metadata backup so existing history is
    /// available for diffing and committing.
    pub fn restore_metadata(&self, package_path: &Path) {
        if self.settings.path.is_empty() {
            return;
        }
        let live = package_path.join(".git");
        let backup = package_path.join(&self.settings.path);
        if !self.runtime.exists(&live) && self.runtime.exists(&backup) {
            match self.runtime.rename(&backup, &live) {
                Ok(()) => info!("Restored {} from {}", live.display(), backup.display()),
                Err(err) => warn!("Cannot restore {}: {err}", live.display()),
            }
        }
    }

    /// Move embedded repository metadata aside so the assembled tree does
    /// not ship it.
    pub fn backup_metadata(&self, package_path: &Path) {
        if self.settings.path.is_empty() {
            return;
        }
        let live = package_path.join(".git");
        let backup = package_path.join(&self.settings.path);
        if !self.runtime.exists(&live) {
            return;
        }
        info!("Moving {} to {}", live.display(), backup.display());
        if self.runtime.exists(&backup) {
            if let Err(err) = self.runtime.remove_dir_all(&backup) {
                warn!("Cannot clear old backup {}: {err}", backup.display());
                return;
            }
        }
        if let Err(err) = self.runtime.rename(&live, &backup) {
            warn!("Cannot back up {}: {err}", live.display());
        }
    }

    /// Stage everything under the package path and commit, skipping
    /// silently when the staged diff is empty.
    pub fn commit_all(&self, package_path: &Path, message: &str) {
        if !self.run_logged_in(package_path, &["add", "--all", "."]) {
            return;
        }
        match self.git_in(package_path, &["diff", "--cached", "--quiet"]) {
            Ok(output) if output.success() => {
                debug!("Nothing staged under {}", package_path.display());
            }
            Ok(_) => {
                self.run_logged_in(package_path, &["commit", "-m", message]);
            }
            Err(err) => warn!("git diff --cached failed: {err}"),
        }
    }

    pub fn checkout(&self, branch: &str) -> bool {
        self.run_logged(&["checkout", branch])
    }

    pub fn reset_hard(&self) {
        self.run_logged(&["reset", "--hard"]);
    }

    pub fn delete_branch(&self, name: &str) {
        info!("Removing local branch {name}");
        if self.checkout(self.settings.base_branch.as_str()) {
            self.run_logged(&["branch", "-D", name]);
        }
    }

    pub fn push_branch(&self, name: &str) {
        info!("Pushing {name} to {}", self.settings.remote);
        self.run_logged(&["push", self.settings.remote.as_str(), name, "--force"]);
    }

    pub fn delete_remote_branch(&self, name: &str) {
        info!(
            "Removing upstream branch {name} from remote {}",
            self.settings.remote
        );
        let refspec = format!(":{name}");
        self.run_logged(&["push", self.settings.remote.as_str(), refspec.as_str()]);
    }
}
