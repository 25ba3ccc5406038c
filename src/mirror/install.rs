//! Staged installation of one version directory
//!
//! A version moves `absent → staged → published`. Staging happens under
//! `<versions>/.staging`, on the same filesystem as `releases/`, so the
//! publish step is a single `rename`. A staged install that fails keeps its
//! staging directory for inspection.

use crate::constants::{ARCHIVE_FILE_NAME, EXTRACT_DIR};
use crate::version::{VersionLayout, VersionTag};
use crate::{ConsoleError, Result};
use std::io;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Archive unpacked in staging, not yet visible under `releases/`
#[derive(Debug)]
pub struct Staged {
    tag: VersionTag,
    staging: PathBuf,
    source: PathBuf,
}

/// Download an archive into a fresh staging directory and unpack it
///
/// The archive must contain exactly one top-level directory whose name starts
/// with `prefix`.
pub async fn stage(
    layout: &VersionLayout,
    tag: &VersionTag,
    archive: &[u8],
    prefix: &str,
) -> Result<Staged> {
    let staging = layout
        .staging_dir()
        .join(format!("{}-{}", tag, Uuid::new_v4().simple()));
    tokio::fs::create_dir_all(&staging).await?;

    let archive_path = staging.join(ARCHIVE_FILE_NAME);
    tokio::fs::write(&archive_path, archive).await?;

    let extract_to = staging.join(EXTRACT_DIR);
    let unpack_from = archive_path.clone();
    let unpack_to = extract_to.clone();
    let entries = tokio::task::spawn_blocking(move || extract(&unpack_from, &unpack_to))
        .await
        .map_err(|e| ConsoleError::Other(e.into()))?
        .map_err(|e| ConsoleError::ArchiveExtractionFailed {
            tag: tag.to_string(),
            staging: staging.clone(),
            reason: format!("{:#}", e),
        })?;

    let source = locate_top_level(tag, &extract_to, prefix)?;
    tracing::debug!(tag = %tag, entries, staging = %staging.display(), "Archive staged");

    Ok(Staged {
        tag: tag.clone(),
        staging,
        source,
    })
}

impl Staged {
    pub fn tag(&self) -> &VersionTag {
        &self.tag
    }

    /// Unpacked top-level directory
    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn staging(&self) -> &Path {
        &self.staging
    }

    /// Move the staged tree to `target`, which must not exist yet
    pub async fn publish(self, target: &Path) -> Result<PathBuf> {
        if tokio::fs::try_exists(target).await? {
            return Err(ConsoleError::DirectoryConflict {
                tag: self.tag.to_string(),
                path: target.to_path_buf(),
                reason: "target directory already exists".to_string(),
            });
        }
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::rename(&self.source, target).await?;
        self.cleanup().await;
        Ok(target.to_path_buf())
    }

    /// Swap the staged tree in for an existing `target`
    ///
    /// The previous tree is moved aside into staging first, then deleted once
    /// the new one is in place. Returns whether a previous tree was replaced.
    pub async fn replace(self, target: &Path) -> Result<bool> {
        if !tokio::fs::try_exists(target).await? {
            self.publish(target).await?;
            return Ok(false);
        }

        let previous = self.staging.join("previous");
        tokio::fs::rename(target, &previous).await?;

        if let Err(e) = tokio::fs::rename(&self.source, target).await {
            if let Err(restore) = tokio::fs::rename(&previous, target).await {
                tracing::error!(
                    tag = %self.tag,
                    error = %restore,
                    previous = %previous.display(),
                    "Failed to restore previous version directory"
                );
            }
            return Err(e.into());
        }

        self.cleanup().await;
        Ok(true)
    }

    async fn cleanup(self) {
        if let Err(e) = tokio::fs::remove_dir_all(&self.staging).await {
            tracing::warn!(
                tag = %self.tag,
                staging = %self.staging.display(),
                error = %e,
                "Failed to remove staging directory"
            );
        }
    }
}

/// Unpack every entry of a zip archive below `dest`
fn extract(archive: &Path, dest: &Path) -> anyhow::Result<usize> {
    let file = std::fs::File::open(archive)?;
    let mut archive = zip::ZipArchive::new(file)?;
    std::fs::create_dir_all(dest)?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let Some(relative) = entry.enclosed_name() else {
            anyhow::bail!("entry '{}' escapes the archive root", entry.name());
        };
        let path = dest.join(relative);

        if entry.is_dir() {
            std::fs::create_dir_all(&path)?;
            continue;
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut out = std::fs::File::create(&path)?;
        io::copy(&mut entry, &mut out)?;
    }

    Ok(archive.len())
}

fn locate_top_level(tag: &VersionTag, extracted: &Path, prefix: &str) -> Result<PathBuf> {
    let conflict = |reason: String| ConsoleError::DirectoryConflict {
        tag: tag.to_string(),
        path: extracted.to_path_buf(),
        reason,
    };

    let mut candidates = Vec::new();
    for entry in std::fs::read_dir(extracted)? {
        let entry = entry?;
        if entry.file_type()?.is_dir()
            && entry.file_name().to_string_lossy().starts_with(prefix)
        {
            candidates.push(entry.path());
        }
    }

    match candidates.len() {
        1 => Ok(candidates.remove(0)),
        0 => Err(conflict(format!(
            "no top-level directory starting with '{}'",
            prefix
        ))),
        n => Err(conflict(format!(
            "{} top-level directories start with '{}'",
            n, prefix
        ))),
    }
}
