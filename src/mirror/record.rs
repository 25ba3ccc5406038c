use crate::Result;
use crate::version::{VersionLayout, VersionTag};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Last successful sync of one version directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncEntry {
    pub source_url: String,
    pub synced_at: DateTime<Utc>,
}

/// Persistent record of what the mirror job has installed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MirrorJobRecord {
    #[serde(default)]
    pub versions: BTreeMap<String, SyncEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run: Option<DateTime<Utc>>,
}

impl MirrorJobRecord {
    /// Load the record, or an empty one when the file does not exist
    pub async fn load(path: &Path) -> Result<Self> {
        if !tokio::fs::try_exists(path).await? {
            return Ok(Self::default());
        }
        let content = tokio::fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Write through a temporary file so readers never see a partial record
    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(self)?).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    pub fn mark(&mut self, tag: &str, source_url: &str) {
        self.versions.insert(
            tag.to_string(),
            SyncEntry {
                source_url: source_url.to_string(),
                synced_at: Utc::now(),
            },
        );
    }

    /// Drop entries whose directory is gone from disk
    ///
    /// Returns the removed tags so the caller can report them. The next
    /// releases pass reinstalls whatever upstream still publishes.
    pub fn forget_missing(&mut self, layout: &VersionLayout) -> Vec<String> {
        let mut removed = Vec::new();
        self.versions.retain(|name, _| {
            let present = VersionTag::parse(name)
                .map(|tag| layout.is_installed(&tag))
                .unwrap_or(false);
            if !present {
                removed.push(name.clone());
            }
            present
        });
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_record_is_empty() {
        let dir = TempDir::new().unwrap();
        let record = MirrorJobRecord::load(&dir.path().join("mirror-state.json"))
            .await
            .unwrap();
        assert!(record.versions.is_empty());
        assert!(record.last_run.is_none());
    }

    #[tokio::test]
    async fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("mirror-state.json");

        let mut record = MirrorJobRecord::default();
        record.mark("v0.3.0", "https://api.github.com/repos/o/r/zipball/v0.3.0");
        record.last_run = Some(Utc::now());
        record.save(&path).await.unwrap();

        let loaded = MirrorJobRecord::load(&path).await.unwrap();
        assert_eq!(loaded, record);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_forget_missing_drops_deleted_and_invalid_entries() {
        let dir = TempDir::new().unwrap();
        let layout = VersionLayout::new(dir.path());
        let kept = VersionTag::parse("v0.3.0").unwrap();
        std::fs::create_dir_all(layout.release_dir(&kept)).unwrap();

        let mut record = MirrorJobRecord::default();
        record.mark("v0.3.0", "https://example.com/v0.3.0");
        record.mark("v0.2.0", "https://example.com/v0.2.0");
        record.mark("../escape", "https://example.com/x");

        let mut removed = record.forget_missing(&layout);
        removed.sort();

        assert_eq!(removed, vec!["../escape".to_string(), "v0.2.0".to_string()]);
        assert_eq!(record.versions.keys().collect::<Vec<_>>(), vec!["v0.3.0"]);
    }
}
