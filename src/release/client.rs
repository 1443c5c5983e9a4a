//! HTTP client for the release-history service.

use anyhow::{Context, Result};
use log::debug;
use quick_xml::Reader;
use quick_xml::events::Event;
use std::time::Duration;

use super::{FetchReleaseHistory, HistoryRelease, ReleaseHistory, ReleaseTerm};

pub const DEFAULT_BASE_URL: &str = "https://updates.drupal.org/release-history";

/// Blocking client for the updates endpoint. Slow or missing histories are
/// never an error; security classification just degrades to "unknown".
pub struct UpdatesClient {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl UpdatesClient {
    pub fn new(base_url: Option<String>) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent("drubuild")
            .timeout(Duration::from_secs(2))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            client,
        })
    }
}

impl FetchReleaseHistory for UpdatesClient {
    fn fetch(&self, project: &str, major: &str) -> Result<Option<ReleaseHistory>> {
        let url = format!("{}/{}/{}.x", self.base_url, project, major);
        debug!("Fetching release history from {url}");

        let response = match self.client.get(&url).send() {
            Ok(response) => response,
            Err(err) => {
                debug!("Release history request failed: {err}");
                return Ok(None);
            }
        };
        if !response.status().is_success() {
            debug!("Release history for {project} returned {}", response.status());
            return Ok(None);
        }
        let body = match response.text() {
            Ok(body) => body,
            Err(err) => {
                debug!("Release history body unreadable: {err}");
                return Ok(None);
            }
        };
        Ok(parse_history(&body))
    }
}

/// Parse a release-history XML document. Returns `None` when the document
/// is invalid or carries no project data.
pub fn parse_history(xml: &str) -> Option<ReleaseHistory> {
    let mut reader = Reader::from_str(xml);

    let mut history = ReleaseHistory::default();
    let mut release: Option<HistoryRelease> = None;
    let mut term: Option<ReleaseTerm> = None;
    let mut path: Vec<String> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(element)) => {
                let name = String::from_utf8_lossy(element.name().as_ref()).into_owned();
                if name == "release" && path.last().is_some_and(|p| p == "releases") {
                    release = Some(HistoryRelease::default());
                } else if name == "term" {
                    term = Some(ReleaseTerm {
                        name: String::new(),
                        value: String::new(),
                    });
                }
                path.push(name);
            }
            Ok(Event::Text(text)) => {
                let Ok(text) = text.unescape() else { continue };
                let text = text.trim();
                if text.is_empty() {
                    continue;
                }
                match path.last().map(String::as_str) {
                    Some("short_name") if path.len() == 2 => {
                        history.short_name = text.to_string();
                    }
                    Some("name") => {
                        if let Some(term) = term.as_mut() {
                            term.name = text.to_string();
                        }
                    }
                    Some("value") => {
                        if let Some(term) = term.as_mut() {
                            term.value = text.to_string();
                        }
                    }
                    Some("version") => {
                        if term.is_none() {
                            if let Some(release) = release.as_mut() {
                                release.version = text.to_string();
                            }
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::End(element)) => {
                let name = String::from_utf8_lossy(element.name().as_ref()).into_owned();
                path.pop();
                if name == "term" {
                    if let (Some(release), Some(term)) = (release.as_mut(), term.take()) {
                        release.terms.push(term);
                    }
                } else if name == "release" {
                    if let Some(release) = release.take() {
                        history.releases.push(release);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(err) => {
                debug!("Invalid release history XML: {err}");
                return None;
            }
            _ => {}
        }
    }

    // Without a project short name the document is not valid history.
    if history.short_name.is_empty() {
        return None;
    }
    Some(history)
}
