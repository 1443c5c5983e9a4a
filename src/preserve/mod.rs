//! Preservation of user-owned paths across destructive package replaces.
//!
//! Before the site skeleton package is replaced, every configured
//! must-survive path is moved into a scratch directory; after the replace
//! the backups are moved back over whatever the reinstall produced.

use anyhow::{Context, Result};
use log::{debug, info};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

use crate::runtime::Runtime;

/// One saved path: where it was and where its backup lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreservationRecord {
    pub original: PathBuf,
    pub backup: PathBuf,
}

/// In-memory state of one preservation transaction, alive for a single
/// install/update run.
#[derive(Debug, Default)]
pub struct PreservationState {
    scratch: Option<PathBuf>,
    records: Vec<PreservationRecord>,
}

impl PreservationState {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[PreservationRecord] {
        &self.records
    }

    pub fn scratch_dir(&self) -> Option<&Path> {
        self.scratch.as_deref()
    }
}

/// Loosen permissions under the site-data directory so the destructive
/// replace can delete files the host left read-only. Failures are ignored;
/// this is an optimization, not a correctness requirement.
pub fn harden_site_permissions<R: Runtime>(runtime: &R, sites_dir: &Path) {
    if !runtime.is_dir(sites_dir) {
        return;
    }
    let Ok(entries) = runtime.read_dir(sites_dir) else {
        return;
    };
    for entry in entries {
        if runtime.is_dir(&entry) {
            let _ = runtime.set_permissions(&entry, 0o755);
            let _ = runtime.set_permissions(&entry.join("settings.php"), 0o644);
        }
    }
}

/// Move every existing path into the scratch directory, recording the
/// mapping. Paths that do not exist are skipped; a failed move aborts the
/// run rather than silently dropping a record.
pub fn save<R: Runtime>(
    runtime: &R,
    state: &mut PreservationState,
    paths: &[PathBuf],
) -> Result<()> {
    for path in paths {
        if !runtime.exists(path) {
            continue;
        }

        let scratch = match &state.scratch {
            Some(scratch) => scratch.clone(),
            None => {
                let scratch = runtime.create_scratch_dir("dci")?;
                debug!("Ensuring {}", scratch.display());
                state.scratch = Some(scratch.clone());
                scratch
            }
        };

        let basename = path
            .file_name()
            .with_context(|| format!("cannot preserve path without a final component: {}", path.display()))?;
        let mut backup = scratch.join(basename);
        if state.records.iter().any(|record| record.backup == backup) || runtime.exists(&backup) {
            // Same basename saved twice; nest under a digest of the
            // original path to keep backups unique.
            let nested = scratch.join(hash_path(path));
            debug!("Ensuring {}", nested.display());
            runtime.create_dir_all(&nested)?;
            backup = nested.join(basename);
        }

        info!("Saving {} to {}", path.display(), backup.display());
        runtime.rename(path, &backup).with_context(|| {
            format!(
                "failed to save {} to {}; aborting before any data is lost",
                path.display(),
                backup.display()
            )
        })?;
        state.records.push(PreservationRecord {
            original: path.clone(),
            backup,
        });
    }
    Ok(())
}

/// Move every backup over its (freshly reinstalled) original, then remove
/// the scratch directory. A no-op when nothing was saved this run.
pub fn restore<R: Runtime>(runtime: &R, state: &mut PreservationState) -> Result<()> {
    let Some(scratch) = state.scratch.take() else {
        return Ok(());
    };

    info!("Restoring custom paths");
    for record in state.records.drain(..) {
        info!(
            "Restoring {} from {}",
            record.original.display(),
            record.backup.display()
        );
        if runtime.exists(&record.original) {
            runtime.remove_dir_all(&record.original)?;
        }
        runtime
            .rename(&record.backup, &record.original)
            .with_context(|| format!("failed to restore {}", record.original.display()))?;
    }
    runtime.remove_dir_all(&scratch)?;
    Ok(())
}

fn hash_path(path: &Path) -> String {
    let digest = Sha256::digest(path.to_string_lossy().as_bytes());
    digest.iter().map(|byte| format!("{byte:02x}")).collect()
}
