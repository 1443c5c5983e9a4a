//! Version normalization and display.
//!
//! Heterogeneous version strings (semantic versions, branch-style versions,
//! stability suffixes) are normalized into ordered numeric tuples so that
//! any two versions can be compared, and rendered back into the project's
//! legacy display forms.

use std::cmp::Ordering;
use std::fmt;

use super::PackageIdentity;

/// Stability words in ascending order. A version carrying none of these
/// (and no dev-branch `.x` suffix) ranks above all of them.
pub const STABILITIES: [&str; 5] = ["dev", "unstable", "alpha", "beta", "rc"];

const STABLE_ORDINAL: u64 = STABILITIES.len() as u64;

/// Canonical, order-comparable form of a version string.
///
/// Comparison is lexicographic over the components, zero-extending the
/// shorter tuple. Equality follows the same rule, so `1.0` and `1.0.0.0`
/// compare equal.
#[derive(Debug, Clone)]
pub struct CanonicalVersion(Vec<u64>);

impl CanonicalVersion {
    /// The all-zero tuple produced for empty or unparseable input.
    pub fn zero() -> Self {
        Self(vec![0, 0, 0, 0])
    }

    pub fn components(&self) -> &[u64] {
        &self.0
    }

    /// Normalize a raw version string.
    ///
    /// All digit runs, optionally prefixed by a stability word, become the
    /// base tuple in order of appearance; the stability level (and its
    /// trailing number, if any) is appended as extra ordered components.
    /// A trailing `.x` with no stability word counts as a dev version.
    pub fn parse(raw: &str) -> Self {
        let version = raw.to_ascii_lowercase();
        let bytes = version.as_bytes();

        let mut numeric: Vec<u64> = Vec::new();
        let mut found_any = false;
        let mut i = 0;
        while i < bytes.len() {
            if let Some(word) = stability_at(&version, i) {
                let end = i + word.len();
                if end < bytes.len() && bytes[end].is_ascii_digit() {
                    // A stability run like "rc1"; its digits belong to the
                    // stability components, not the base tuple.
                    i = skip_digits(bytes, end);
                    found_any = true;
                    continue;
                }
                i += 1;
                continue;
            }
            if bytes[i].is_ascii_digit() {
                let end = skip_digits(bytes, i);
                numeric.push(parse_digits(&version[i..end]));
                found_any = true;
                i = end;
                continue;
            }
            i += 1;
        }

        if !found_any {
            return Self::zero();
        }

        let mut components = numeric;
        if let Some((ordinal, extra)) = find_stability(&version) {
            components.push(ordinal);
            if let Some(extra) = extra {
                components.push(extra);
            }
        } else if version.ends_with(".x") {
            // Dev-branch versions such as 1.x rank below every release.
            components.push(0);
        } else {
            components.push(STABLE_ORDINAL);
        }

        Self(components)
    }
}

impl PartialEq for CanonicalVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for CanonicalVersion {}

impl PartialOrd for CanonicalVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CanonicalVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.0.len().max(other.0.len());
        for index in 0..len {
            let a = self.0.get(index).copied().unwrap_or(0);
            let b = other.0.get(index).copied().unwrap_or(0);
            match a.cmp(&b) {
                Ordering::Equal => continue,
                unequal => return unequal,
            }
        }
        Ordering::Equal
    }
}

impl fmt::Display for CanonicalVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.0.iter().map(u64::to_string).collect();
        write!(f, "{}", rendered.join("."))
    }
}

fn skip_digits(bytes: &[u8], from: usize) -> usize {
    let mut i = from;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    i
}

fn parse_digits(digits: &str) -> u64 {
    digits.parse().unwrap_or(u64::MAX)
}

// Byte-wise matching keeps the scanners safe on arbitrary input.
fn stability_at(version: &str, index: usize) -> Option<&'static str> {
    let bytes = version.as_bytes();
    STABILITIES
        .iter()
        .find(|word| bytes[index..].starts_with(word.as_bytes()))
        .copied()
}

/// Leftmost stability word, with a trailing number if one follows it.
fn find_stability(version: &str) -> Option<(u64, Option<u64>)> {
    let bytes = version.as_bytes();
    for index in 0..bytes.len() {
        for (ordinal, word) in STABILITIES.iter().enumerate() {
            if bytes[index..].starts_with(word.as_bytes()) {
                let end = index + word.len();
                let digits_end = skip_digits(bytes, end);
                let extra = if digits_end > end {
                    Some(parse_digits(&version[end..digits_end]))
                } else {
                    None
                };
                return Some((ordinal as u64, extra));
            }
        }
    }
    None
}

/// Render a host-reported version in the project's display form.
///
/// The root package uses the plain `MAJOR.MINOR[.PATCH]` form; contributed
/// packages from the `drupal` vendor use `<series>.x-MAJOR.MINOR[.PATCH]`
/// when the distribution series is known from the package source address,
/// falling back to the legacy `MAJOR.x-MINOR[.PATCH]` form; everything
/// else passes through lightly normalized.
pub fn display(identity: &PackageIdentity) -> String {
    let version = identity.version.as_str();
    let series = identity.distribution_series();

    if let Some(branch) = version.strip_prefix("dev-") {
        return match series {
            Some(series) => format!("{series}.x-{branch}"),
            None => branch.to_string(),
        };
    }

    if identity.vendor == "drupal" {
        let Some(parts) = split_release(version) else {
            return version.to_string();
        };
        let mut display = if identity.project == "drupal" {
            // Core versions carry two numbers, i.e. 7.38.
            let mut v = format!("{}.{}", parts.major, parts.minor);
            if let Some(patch) = parts.patch {
                v.push('.');
                v.push_str(patch);
            }
            v
        } else if let Some(series) = series {
            let mut v = format!("{series}.x-{}.{}", parts.major, parts.minor);
            if let Some(patch) = parts.patch {
                v.push('.');
                v.push_str(patch);
            }
            v
        } else {
            // Legacy contrib form, i.e. 7.x-1.7.
            let mut v = format!("{}.x-{}", parts.major, parts.minor);
            if let Some(patch) = parts.patch {
                v.push('.');
                v.push_str(patch);
            }
            v
        };
        if let Some(extra) = parts.extra {
            display.push_str(extra);
        }
        return display;
    }

    // Strip a leading v from tag-style versions and flatten branch slashes.
    let version = match version.strip_prefix('v') {
        Some(rest) if rest.starts_with(|c: char| c.is_ascii_digit()) => rest,
        _ => version,
    };
    version.replace('/', "-")
}

struct ReleaseParts<'a> {
    major: &'a str,
    minor: &'a str,
    patch: Option<&'a str>,
    /// Includes the leading dash, e.g. `-beta1`.
    extra: Option<&'a str>,
}

/// First `MAJOR.MINOR[.PATCH][-EXTRA]` release shape found in the string.
fn split_release(version: &str) -> Option<ReleaseParts<'_>> {
    let bytes = version.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if !bytes[i].is_ascii_digit() {
            i += 1;
            continue;
        }
        let major_end = skip_digits(bytes, i);
        if major_end >= bytes.len()
            || bytes[major_end] != b'.'
            || major_end + 1 >= bytes.len()
            || !bytes[major_end + 1].is_ascii_digit()
        {
            i = major_end;
            continue;
        }
        let major = &version[i..major_end];
        let minor_start = major_end + 1;
        let minor_end = skip_digits(bytes, minor_start);
        let minor = &version[minor_start..minor_end];

        let mut position = minor_end;
        let mut patch = None;
        if position < bytes.len()
            && bytes[position] == b'.'
            && position + 1 < bytes.len()
            && bytes[position + 1].is_ascii_digit()
        {
            let patch_start = position + 1;
            let patch_end = skip_digits(bytes, patch_start);
            patch = Some(&version[patch_start..patch_end]);
            position = patch_end;
        }

        let mut extra = None;
        if position < bytes.len() && bytes[position] == b'-' {
            let mut end = position + 1;
            while end < bytes.len() && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'_') {
                end += 1;
            }
            if end > position + 1 {
                extra = Some(&version[position..end]);
            }
        }

        return Some(ReleaseParts {
            major,
            minor,
            patch,
            extra,
        });
    }
    None
}
