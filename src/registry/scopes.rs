//! Scope sources
//!
//! A provider's scope set comes either from an inline list or from a library
//! source file declaring `SCOPE_*` constants.

use crate::constants::{NAMESPACED_SCOPE_SUFFIX, SCOPE_CONSTANT_PREFIX};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

static SCOPE_CONSTANT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r#"const\s+{}[A-Za-z0-9_]*\s*=\s*(?:'([^']*)'|"([^"]*)")"#,
        regex::escape(SCOPE_CONSTANT_PREFIX)
    ))
    .expect("valid scope constant pattern")
});

/// Where a provider's scopes come from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScopeSource {
    List(Vec<String>),
    /// Source file, relative to the version directory
    File(PathBuf),
}

impl ScopeSource {
    /// Resolve to an ordered, de-duplicated scope set
    ///
    /// An unreadable file yields an empty set.
    pub fn resolve(&self, version_dir: &Path) -> Vec<String> {
        match self {
            ScopeSource::List(scopes) => dedupe(scopes.iter().map(|s| s.trim().to_string())),
            ScopeSource::File(relative) => {
                let path = version_dir.join(relative);
                match std::fs::read_to_string(&path) {
                    Ok(source) => introspect(&source),
                    Err(e) => {
                        tracing::debug!(path = %path.display(), error = %e, "Scope source unavailable");
                        Vec::new()
                    }
                }
            }
        }
    }
}

/// Extract scope constant values from library source text
pub fn introspect(source: &str) -> Vec<String> {
    dedupe(
        SCOPE_CONSTANT
            .captures_iter(source)
            .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
            .map(|m| m.as_str().to_string())
            .filter(|scope| !scope.ends_with(NAMESPACED_SCOPE_SUFFIX)),
    )
}

fn dedupe(scopes: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    scopes
        .filter(|s| !s.is_empty())
        .filter(|s| seen.insert(s.clone()))
        .collect()
}
