//! Release-history retrieval for security-advisory classification.
//!
//! The updates service publishes, per project and major series, the list
//! of historical releases together with named terms. The only term this
//! crate cares about is the `Release type` / `Security update` pair.

mod client;

use anyhow::Result;

pub use client::{DEFAULT_BASE_URL, UpdatesClient};

/// Parsed release history of one project/major series.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReleaseHistory {
    pub short_name: String,
    pub releases: Vec<HistoryRelease>,
}

/// One historical release with its classification terms.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HistoryRelease {
    pub version: String,
    pub terms: Vec<ReleaseTerm>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseTerm {
    pub name: String,
    pub value: String,
}

impl HistoryRelease {
    pub fn is_security_update(&self) -> bool {
        self.terms
            .iter()
            .any(|term| term.name == "Release type" && term.value == "Security update")
    }
}

/// Capability to fetch the structured release list for a project.
///
/// `Ok(None)` means no usable history: unknown project, unreachable
/// service, or an unparseable response. Callers treat that as "no known
/// security releases".
#[cfg_attr(test, mockall::automock)]
pub trait FetchReleaseHistory: Send + Sync {
    fn fetch(&self, project: &str, major: &str) -> Result<Option<ReleaseHistory>>;
}
