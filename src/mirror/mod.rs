//! Release mirror
//!
//! Downloads upstream releases, the moving branch snapshot and operator
//! forks into `<versions>/releases/<tag>`. Runs out-of-band from serving:
//! every directory is staged first and published with one rename, so the
//! console only ever sees absent or complete versions.
//!
//! Failures are isolated per version. A failed version is logged, counted
//! and retried on the next run.

pub mod install;
pub mod record;
pub mod schedule;
pub mod source;

pub use install::{Staged, stage};
pub use record::{MirrorJobRecord, SyncEntry};
pub use source::{GitHubClient, SourceHost, UpstreamTag};

use crate::config::Config;
use crate::constants::{DEFAULT_ARCHIVE_PREFIX, DEFAULT_BRANCH};
use crate::telemetry;
use crate::version::{VersionLayout, VersionTag};
use crate::{ConsoleError, Result};
use bytes::Bytes;
use chrono::Utc;
use std::fmt;
use std::sync::Arc;

/// A version directory written by the mirror
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirroredVersion {
    pub tag: VersionTag,
    pub source_url: String,
}

/// A version the mirror could not install
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorFailure {
    pub tag: String,
    pub reason: String,
}

/// Outcome of one or more mirror steps
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MirrorReport {
    /// Newly published
    pub installed: Vec<MirroredVersion>,
    /// Existing branch snapshot replaced
    pub refreshed: Vec<MirroredVersion>,
    /// Already present, left alone
    pub skipped: Vec<VersionTag>,
    /// Custom versions that were never touched
    pub protected: Vec<VersionTag>,
    pub failed: Vec<MirrorFailure>,
}

impl MirrorReport {
    pub fn merge(&mut self, other: MirrorReport) {
        self.installed.extend(other.installed);
        self.refreshed.extend(other.refreshed);
        self.skipped.extend(other.skipped);
        self.protected.extend(other.protected);
        self.failed.extend(other.failed);
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    fn fail(&mut self, kind: &str, tag: &str, err: &ConsoleError) {
        tracing::warn!(kind, tag, error = %err, "Mirror step failed");
        telemetry::record_mirror_version(kind, "failed");
        self.failed.push(MirrorFailure {
            tag: tag.to_string(),
            reason: err.to_string(),
        });
    }
}

impl fmt::Display for MirrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "installed {}, refreshed {}, skipped {}, protected {}, failed {}",
            self.installed.len(),
            self.refreshed.len(),
            self.skipped.len(),
            self.protected.len(),
            self.failed.len()
        )
    }
}

/// What a job run covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobScope {
    #[default]
    All,
    ReleasesOnly,
}

/// Mirror of one upstream repository into a versions directory
pub struct Mirror {
    layout: VersionLayout,
    source: Arc<dyn SourceHost>,
    archive_prefix: String,
    branch: String,
    custom_versions: Vec<String>,
}

impl Mirror {
    pub fn new(layout: VersionLayout, source: Arc<dyn SourceHost>) -> Self {
        Self {
            layout,
            source,
            archive_prefix: DEFAULT_ARCHIVE_PREFIX.to_string(),
            branch: DEFAULT_BRANCH.to_string(),
            custom_versions: Vec::new(),
        }
    }

    /// Mirror of the configured repository into the configured versions dir
    pub fn from_config(config: &Config) -> Result<Self> {
        let settings = &config.mirror;
        let source = GitHubClient::new(
            &settings.api_url,
            &settings.repository,
            &settings.user_agent,
        )?;

        Ok(Self::new(config.versions.layout(), Arc::new(source))
            .with_archive_prefix(settings.archive_prefix.clone())
            .with_branch(settings.branch.clone())
            .with_custom_versions(settings.custom_versions.clone()))
    }

    /// Prefix of the single top-level directory inside upstream archives
    pub fn with_archive_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.archive_prefix = prefix.into();
        self
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = branch.into();
        self
    }

    /// Custom versions seeded by [`Mirror::run_job`]
    pub fn with_custom_versions(mut self, tags: Vec<String>) -> Self {
        self.custom_versions = tags;
        self
    }

    pub fn layout(&self) -> &VersionLayout {
        &self.layout
    }

    /// Install every upstream release tag that is not present yet
    ///
    /// Fails only when the tag listing itself cannot be fetched.
    pub async fn mirror_releases(&self) -> Result<MirrorReport> {
        let tags = self.source.list_tags().await?;
        let mut report = MirrorReport::default();

        for upstream in tags {
            let tag = match VersionTag::parse(&upstream.name) {
                Ok(tag) if tag.is_release() => tag,
                _ => {
                    tracing::warn!(tag = %upstream.name, "Skipping upstream tag outside the release grammar");
                    continue;
                }
            };

            if self.layout.is_installed(&tag) {
                telemetry::record_mirror_version("release", "skipped");
                report.skipped.push(tag);
                continue;
            }

            match self.install(&tag, &upstream.zipball_url).await {
                Ok(()) => {
                    telemetry::record_mirror_version("release", "installed");
                    tracing::info!(tag = %tag, "Release installed");
                    report.installed.push(MirroredVersion {
                        tag,
                        source_url: upstream.zipball_url,
                    });
                }
                Err(e) => report.fail("release", tag.as_str(), &e),
            }
        }

        Ok(report)
    }

    async fn install(&self, tag: &VersionTag, url: &str) -> Result<()> {
        let archive = self.source.download(url).await?;
        stage(&self.layout, tag, &archive, &self.archive_prefix)
            .await?
            .publish(&self.layout.release_dir(tag))
            .await?;
        Ok(())
    }

    /// Re-download a branch snapshot and swap it in
    ///
    /// Custom version names are refused: those directories belong to the
    /// operator once they exist.
    pub async fn mirror_branch(&self, tag_name: &str, archive_url: &str) -> Result<MirrorReport> {
        let tag = VersionTag::parse(tag_name)?;
        let mut report = MirrorReport::default();

        if tag.is_custom() {
            tracing::warn!(tag = %tag, "Refusing to overwrite a custom version with a branch snapshot");
            telemetry::record_mirror_version("branch", "protected");
            report.protected.push(tag);
            return Ok(report);
        }

        let result = async {
            let archive = self.source.download(archive_url).await?;
            let staged = stage(&self.layout, &tag, &archive, &self.archive_prefix).await?;
            staged.replace(&self.layout.release_dir(&tag)).await
        }
        .await;

        match result {
            Ok(replaced) => {
                let mirrored = MirroredVersion {
                    tag: tag.clone(),
                    source_url: archive_url.to_string(),
                };
                if replaced {
                    telemetry::record_mirror_version("branch", "refreshed");
                    tracing::info!(tag = %tag, "Branch snapshot refreshed");
                    report.refreshed.push(mirrored);
                } else {
                    telemetry::record_mirror_version("branch", "installed");
                    tracing::info!(tag = %tag, "Branch snapshot installed");
                    report.installed.push(mirrored);
                }
            }
            Err(e) => report.fail("branch", tag.as_str(), &e),
        }

        Ok(report)
    }

    /// Seed missing custom versions from the branch archive
    ///
    /// Existing custom directories are never refreshed. The branch archive is
    /// downloaded at most once per call.
    pub async fn mirror_custom(&self, tag_names: &[String]) -> MirrorReport {
        let mut report = MirrorReport::default();
        let archive_url = self.source.branch_archive_url(&self.branch);
        let mut archive: Option<Bytes> = None;

        for name in tag_names {
            let tag = match VersionTag::parse(name) {
                Ok(tag) if tag.is_custom() => tag,
                Ok(_) => {
                    let err = ConsoleError::validation(format!("'{}' is not a custom version", name));
                    report.fail("custom", name, &err);
                    continue;
                }
                Err(e) => {
                    report.fail("custom", name, &e);
                    continue;
                }
            };

            if self.layout.is_installed(&tag) {
                telemetry::record_mirror_version("custom", "protected");
                report.protected.push(tag);
                continue;
            }

            let bytes = match &archive {
                Some(bytes) => bytes.clone(),
                None => match self.source.download(&archive_url).await {
                    Ok(bytes) => {
                        archive = Some(bytes.clone());
                        bytes
                    }
                    Err(e) => {
                        report.fail("custom", tag.as_str(), &e);
                        continue;
                    }
                },
            };

            let result = async {
                let staged = stage(&self.layout, &tag, &bytes, &self.archive_prefix).await?;
                staged.publish(&self.layout.release_dir(&tag)).await
            }
            .await;

            match result {
                Ok(_) => {
                    telemetry::record_mirror_version("custom", "installed");
                    tracing::info!(tag = %tag, branch = %self.branch, "Custom version seeded");
                    report.installed.push(MirroredVersion {
                        tag,
                        source_url: archive_url.clone(),
                    });
                }
                Err(e) => report.fail("custom", tag.as_str(), &e),
            }
        }

        report
    }

    /// Releases, then the branch snapshot, then custom seeds
    ///
    /// The job record is loaded first and reconciled with the versions
    /// directory, so entries for directories removed by hand are dropped
    /// before the releases pass reinstalls them. It is saved at the end,
    /// whatever the individual outcomes.
    pub async fn run_job(&self, scope: JobScope) -> Result<MirrorReport> {
        let record_path = self.layout.record_path();
        let mut record = match MirrorJobRecord::load(&record_path).await {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(path = %record_path.display(), error = %e, "Unreadable mirror record, starting fresh");
                MirrorJobRecord::default()
            }
        };
        for tag in record.forget_missing(&self.layout) {
            tracing::warn!(tag = %tag, "Recorded version missing from disk, dropping it from the record");
        }

        let mut report = MirrorReport::default();
        match self.mirror_releases().await {
            Ok(releases) => report.merge(releases),
            Err(e) => report.fail("release", "releases", &e),
        }

        if scope == JobScope::All {
            let branch_url = self.source.branch_archive_url(&self.branch);
            match self.mirror_branch(&self.branch, &branch_url).await {
                Ok(branch) => report.merge(branch),
                Err(e) => report.fail("branch", &self.branch, &e),
            }
            report.merge(self.mirror_custom(&self.custom_versions).await);
        }

        for mirrored in report.installed.iter().chain(&report.refreshed) {
            record.mark(mirrored.tag.as_str(), &mirrored.source_url);
        }
        record.last_run = Some(Utc::now());
        record.save(&record_path).await?;

        tracing::info!(%report, "Mirror job finished");
        Ok(report)
    }
}
