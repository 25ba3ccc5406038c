//! Library version tags and the version resolver
//!
//! A [`VersionTag`] names one mirrored snapshot of the upstream OAuth client
//! library. Three shapes are accepted:
//! - semantic releases: `v<major>.<minor>.<patch>`
//! - the moving branch snapshot: `master`
//! - operator-maintained forks: `c-<issue-number>`
//!
//! Presence of `<versions>/releases/<tag>/` is the only signal that a version
//! is installed.

use crate::constants::{MIRROR_RECORD_FILE, RELEASES_DIR, STAGING_DIR};
use crate::{ConsoleError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

static RELEASE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^v(\d+)\.(\d+)\.(\d+)$").expect("valid release pattern"));

static CUSTOM_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^c-(\d+)$").expect("valid custom pattern"));

const MASTER: &str = "master";

/// Shape of a version tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionKind {
    Release(semver::Version),
    Master,
    Custom(u64),
}

/// A validated library version identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VersionTag(String);

impl VersionTag {
    /// Parse a tag, rejecting anything outside the grammar
    pub fn parse(raw: &str) -> Result<Self> {
        if Self::is_valid(raw) {
            Ok(Self(raw.to_string()))
        } else {
            Err(ConsoleError::InvalidVersion(raw.to_string()))
        }
    }

    /// Whether a string matches the version grammar
    pub fn is_valid(raw: &str) -> bool {
        raw == MASTER || RELEASE_PATTERN.is_match(raw) || CUSTOM_PATTERN.is_match(raw)
    }

    pub fn master() -> Self {
        Self(MASTER.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn kind(&self) -> VersionKind {
        if let Some(caps) = RELEASE_PATTERN.captures(&self.0) {
            // The grammar guarantees digits; overflow on absurd numbers degrades to 0
            let part = |i: usize| caps[i].parse::<u64>().unwrap_or(0);
            return VersionKind::Release(semver::Version::new(part(1), part(2), part(3)));
        }
        if let Some(caps) = CUSTOM_PATTERN.captures(&self.0) {
            return VersionKind::Custom(caps[1].parse::<u64>().unwrap_or(0));
        }
        VersionKind::Master
    }

    pub fn is_release(&self) -> bool {
        RELEASE_PATTERN.is_match(&self.0)
    }

    pub fn is_custom(&self) -> bool {
        CUSTOM_PATTERN.is_match(&self.0)
    }

    pub fn is_master(&self) -> bool {
        self.0 == MASTER
    }

    /// Display ordering: newest release first, then master, then customs by number
    fn display_cmp(&self, other: &Self) -> Ordering {
        fn rank(kind: &VersionKind) -> u8 {
            match kind {
                VersionKind::Release(_) => 0,
                VersionKind::Master => 1,
                VersionKind::Custom(_) => 2,
            }
        }

        match (self.kind(), other.kind()) {
            (VersionKind::Release(a), VersionKind::Release(b)) => b.cmp(&a),
            (VersionKind::Custom(a), VersionKind::Custom(b)) => a.cmp(&b),
            (a, b) => rank(&a).cmp(&rank(&b)),
        }
    }
}

impl FromStr for VersionTag {
    type Err = ConsoleError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for VersionTag {
    type Error = ConsoleError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<VersionTag> for String {
    fn from(tag: VersionTag) -> Self {
        tag.0
    }
}

impl fmt::Display for VersionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for VersionTag {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// On-disk layout of the versions directory
#[derive(Debug, Clone)]
pub struct VersionLayout {
    root: PathBuf,
}

impl VersionLayout {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn releases_dir(&self) -> PathBuf {
        self.root.join(RELEASES_DIR)
    }

    pub fn release_dir(&self, tag: &VersionTag) -> PathBuf {
        self.releases_dir().join(tag.as_str())
    }

    pub fn staging_dir(&self) -> PathBuf {
        self.root.join(STAGING_DIR)
    }

    pub fn record_path(&self) -> PathBuf {
        self.root.join(MIRROR_RECORD_FILE)
    }

    pub fn is_installed(&self, tag: &VersionTag) -> bool {
        self.release_dir(tag).is_dir()
    }

    /// List installed versions, newest release first
    ///
    /// Entries whose names fall outside the version grammar are ignored.
    pub fn installed(&self) -> Result<Vec<VersionTag>> {
        let dir = self.releases_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut tags = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str()
                && let Ok(tag) = VersionTag::parse(name)
            {
                tags.push(tag);
            }
        }

        tags.sort_by(|a, b| a.display_cmp(b));
        Ok(tags)
    }
}

/// Select the version governing a request
///
/// The path segment wins when it matches the grammar, installed or not (a
/// missing version fails later, when it is opened). Otherwise the cookie is
/// used under the same rule. Otherwise the newest installed release wins;
/// `master` is only chosen when no release is installed and custom tags are
/// never chosen implicitly.
pub fn resolve(
    path_segment: Option<&str>,
    cookie: Option<&str>,
    available: &[VersionTag],
) -> Result<VersionTag> {
    if let Some(tag) = path_segment.and_then(|s| VersionTag::parse(s).ok()) {
        return Ok(tag);
    }

    if let Some(tag) = cookie.and_then(|s| VersionTag::parse(s).ok()) {
        return Ok(tag);
    }

    most_recent(available).ok_or(ConsoleError::NoVersionsAvailable)
}

/// Newest installed release, falling back to `master`
pub fn most_recent(available: &[VersionTag]) -> Option<VersionTag> {
    let newest_release = available
        .iter()
        .filter_map(|tag| match tag.kind() {
            VersionKind::Release(version) => Some((version, tag)),
            _ => None,
        })
        .max_by(|(a, _), (b, _)| a.cmp(b))
        .map(|(_, tag)| tag.clone());

    newest_release.or_else(|| available.iter().find(|t| t.is_master()).cloned())
}

#[cfg(test)]
mod version_test;
