//! Descriptor stamping: provenance injection into installed package trees.
//!
//! Every `.info` descriptor under a freshly installed package gets the
//! resolved version (and project/datestamp provenance) appended, unless
//! the file already carries everything we would add.

use anyhow::Result;
use chrono::{Local, Utc};
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::package::descriptor::{self, DescriptorInfo};
use crate::runtime::Runtime;

/// Provenance to stamp into a package's descriptors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StampInfo {
    pub version: String,
    pub project: Option<String>,
    /// Stamp date in `YYYY-MM-DD` form, written into the comment line.
    pub date: String,
    /// Epoch seconds of the stamping moment.
    pub datestamp: Option<String>,
}

impl StampInfo {
    /// Provenance for a package stamped right now.
    pub fn now(version: impl Into<String>, project: Option<String>) -> Self {
        Self {
            version: version.into(),
            project,
            date: Local::now().format("%Y-%m-%d").to_string(),
            datestamp: Some(Utc::now().timestamp().to_string()),
        }
    }
}

/// Read every descriptor under `dir` into a snapshot map. Missing or
/// unreadable directories are treated as empty.
pub fn read_tree_info<R: Runtime>(
    runtime: &R,
    dir: &Path,
) -> Result<BTreeMap<PathBuf, DescriptorInfo>> {
    let mut snapshot = BTreeMap::new();
    collect_tree_info(runtime, dir, &mut snapshot);
    Ok(snapshot)
}

fn collect_tree_info<R: Runtime>(
    runtime: &R,
    dir: &Path,
    snapshot: &mut BTreeMap<PathBuf, DescriptorInfo>,
) {
    if !runtime.is_dir(dir) {
        return;
    }
    let entries = match runtime.read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            debug!("Skipping unreadable directory {}: {err}", dir.display());
            return;
        }
    };
    for entry in entries {
        if runtime.is_dir(&entry) {
            collect_tree_info(runtime, &entry, snapshot);
        } else if is_descriptor(&entry) {
            match runtime.read_to_string(&entry) {
                Ok(contents) => {
                    if let Some(info) = DescriptorInfo::parse(&contents) {
                        snapshot.insert(entry, info);
                    }
                }
                Err(err) => debug!("Skipping unreadable descriptor {}: {err}", entry.display()),
            }
        }
    }
}

/// Stamp every descriptor under `dir`. Safe to run twice: the second run
/// finds nothing new to add and writes nothing.
pub fn stamp_tree<R: Runtime>(
    runtime: &R,
    dir: &Path,
    info: &StampInfo,
    snapshot: &BTreeMap<PathBuf, DescriptorInfo>,
) -> Result<()> {
    if !runtime.is_dir(dir) {
        debug!("Nothing to stamp under missing {}", dir.display());
        return Ok(());
    }
    let entries = match runtime.read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            debug!("Skipping unreadable directory {}: {err}", dir.display());
            return Ok(());
        }
    };
    for entry in entries {
        if runtime.is_dir(&entry) {
            stamp_tree(runtime, &entry, info, snapshot)?;
        } else if is_descriptor(&entry) {
            stamp_file(runtime, &entry, info, snapshot)?;
        }
    }
    Ok(())
}

fn stamp_file<R: Runtime>(
    runtime: &R,
    path: &Path,
    info: &StampInfo,
    snapshot: &BTreeMap<PathBuf, DescriptorInfo>,
) -> Result<()> {
    let contents = match runtime.read_to_string(path) {
        Ok(contents) => contents,
        Err(err) => {
            warn!("Cannot read {}: {err}", path.display());
            return Ok(());
        }
    };

    let stamped_version = descriptor::last_version(&contents);
    let old_info = DescriptorInfo::parse(&contents);
    let missing = |key: &str| old_info.as_ref().is_none_or(|old| old.get(key).is_none());

    // Re-stamp when the file has no version yet, or when it has one but
    // lacks provenance fields we are about to add. A file carrying all of
    // them is left untouched.
    let needs_stamp = stamped_version.is_none()
        || (info.project.is_some() && missing("project"))
        || (info.datestamp.is_some() && missing("datestamp"));
    if !needs_stamp {
        debug!("{} already stamped", path.display());
        return Ok(());
    }

    let mut effective = info.clone();
    if !info.version.contains("dev") {
        if let Some(previous) = snapshot.get(path) {
            if previous.version() == Some(info.version.as_str()) {
                // Same version as before the reinstall: carry incidental
                // old fields forward, new fields win.
                if effective.project.is_none() {
                    effective.project = previous.get("project").map(str::to_string);
                }
                if effective.datestamp.is_none() {
                    effective.datestamp = previous.get("datestamp").map(str::to_string);
                }
            }
        }
    }

    info!(
        "Rewriting {} with version {}",
        path.display(),
        effective.version
    );

    let mut updated = contents;
    updated.push_str("\n; Information added by drubuild packaging script on ");
    updated.push_str(&effective.date);
    updated.push('\n');
    updated.push_str(&format!("version = \"{}\"\n", effective.version));
    if let Some(project) = &effective.project {
        updated.push_str(&format!("project = \"{project}\"\n"));
    }
    if let Some(datestamp) = &effective.datestamp {
        updated.push_str(&format!("datestamp = \"{datestamp}\"\n"));
    }
    runtime.write(path, updated.as_bytes())
}

fn is_descriptor(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "info")
}
