//! Descriptor (`.info`) file parsing.
//!
//! Descriptors are line-oriented text. Recognized lines are
//! `key = "value"` assignments (quotes optional) and comment lines
//! carrying an `on YYYY-MM-DD` stamp date.

use std::collections::BTreeMap;

/// Parsed key/value fields of a descriptor file.
///
/// Used as a comparison oracle by the stamper: which provenance fields did
/// the file already carry before a rewrite.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DescriptorInfo {
    fields: BTreeMap<String, String>,
}

impl DescriptorInfo {
    /// Parse descriptor text. Returns `None` when no recognizable line
    /// was found, mirroring "file carries no info at all".
    pub fn parse(contents: &str) -> Option<Self> {
        let mut fields = BTreeMap::new();
        for line in contents.lines() {
            if let Some((key, value)) = parse_assignment(line) {
                fields.insert(key.to_string(), value.to_string());
            } else if let Some(date) = parse_comment_date(line) {
                fields.insert("date".to_string(), date.to_string());
            }
        }
        if fields.is_empty() {
            None
        } else {
            Some(Self { fields })
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn version(&self) -> Option<&str> {
        self.get("version")
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }
}

/// Last `version = ...` assignment in the file, if any.
pub fn last_version(contents: &str) -> Option<String> {
    let mut version = None;
    for line in contents.lines() {
        if let Some(("version", value)) = parse_assignment(line) {
            version = Some(value.to_string());
        }
    }
    version
}

fn parse_assignment(line: &str) -> Option<(&str, &str)> {
    let trimmed = line.trim_start();
    let key_end = trimmed
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(trimmed.len());
    if key_end == 0 {
        return None;
    }
    let key = &trimmed[..key_end];
    let rest = trimmed[key_end..].trim_start();
    let value = rest.strip_prefix('=')?.trim_start();
    let value = match value.strip_prefix('"') {
        Some(quoted) => quoted.split('"').next().unwrap_or(""),
        None => value,
    };
    Some((key, value.trim_end()))
}

fn parse_comment_date(line: &str) -> Option<&str> {
    let rest = line.strip_prefix(';')?;
    let mut offset = 0;
    while let Some(position) = rest[offset..].find("on ") {
        let start = offset + position + 3;
        if let Some(date) = rest.get(start..start + 10) {
            if is_date(date) {
                return Some(date);
            }
        }
        offset = offset + position + 1;
    }
    None
}

fn is_date(candidate: &str) -> bool {
    let bytes = candidate.as_bytes();
    bytes.len() == 10
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && [0, 1, 2, 3, 5, 6, 8, 9]
            .iter()
            .all(|&i| bytes[i].is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"name = Views
description = "Create customized lists and queries from your database."
core = 7.x
package = Views

; Information added by drupal.org packaging script on 2015-04-01
version = "7.x-3.10"
project = "views"
datestamp = "1427889743"
"#;

    #[test]
    fn test_parse_fields() {
        let info = DescriptorInfo::parse(SAMPLE).unwrap();
        assert_eq!(info.get("name"), Some("Views"));
        assert_eq!(
            info.get("description"),
            Some("Create customized lists and queries from your database.")
        );
        assert_eq!(info.get("core"), Some("7.x"));
        assert_eq!(info.version(), Some("7.x-3.10"));
        assert_eq!(info.get("project"), Some("views"));
        assert_eq!(info.get("datestamp"), Some("1427889743"));
    }

    #[test]
    fn test_parse_comment_date() {
        let info = DescriptorInfo::parse(SAMPLE).unwrap();
        assert_eq!(info.get("date"), Some("2015-04-01"));
    }

    #[test]
    fn test_parse_empty_is_none() {
        assert_eq!(DescriptorInfo::parse(""), None);
        assert_eq!(DescriptorInfo::parse("; just a comment\n"), None);
    }

    #[test]
    fn test_parse_unquoted_values() {
        let info = DescriptorInfo::parse("core = 7.x\nversion = 7.x-1.0\n").unwrap();
        assert_eq!(info.get("core"), Some("7.x"));
        assert_eq!(info.version(), Some("7.x-1.0"));
    }

    #[test]
    fn test_parse_ignores_malformed_lines() {
        let info = DescriptorInfo::parse("just some prose\nname = ok\n- bullet\n").unwrap();
        assert_eq!(info.fields().len(), 1);
        assert_eq!(info.get("name"), Some("ok"));
    }

    #[test]
    fn test_comment_date_requires_comment_prefix() {
        assert_eq!(
            DescriptorInfo::parse("packaged on 2015-04-01 by someone\n"),
            None
        );
    }

    #[test]
    fn test_last_version_takes_the_last_assignment() {
        let contents = "version = \"7.x-1.0\"\nname = x\nversion = \"7.x-1.1\"\n";
        assert_eq!(last_version(contents), Some("7.x-1.1".to_string()));
    }

    #[test]
    fn test_last_version_missing() {
        assert_eq!(last_version("name = x\n"), None);
        assert_eq!(last_version("project_version = 1.0\n"), None);
    }
}
