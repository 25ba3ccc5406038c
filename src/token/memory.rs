//! In-memory token store
//!
//! Uses DashMap for concurrent access. State is lost on restart, which only
//! means users re-authorize.

use super::*;
use dashmap::DashMap;
use std::sync::Arc;

/// In-memory token store
#[derive(Clone, Default)]
pub struct MemoryTokenStore {
    states: Arc<DashMap<TokenKey, StoredState>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    fn remove_where(&self, predicate: impl Fn(&TokenKey, &StoredState) -> bool) -> usize {
        let keys: Vec<TokenKey> = self
            .states
            .iter()
            .filter(|entry| predicate(entry.key(), entry.value()))
            .map(|entry| entry.key().clone())
            .collect();

        for key in &keys {
            self.states.remove(key);
        }
        keys.len()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn load(&self, key: &TokenKey) -> Result<Option<StoredState>> {
        Ok(self.states.get(key).map(|s| s.clone()))
    }

    async fn save(&self, key: &TokenKey, state: AuthorizationState) -> Result<()> {
        self.states.insert(
            key.clone(),
            StoredState {
                state,
                updated_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn remove(&self, key: &TokenKey) -> Result<()> {
        self.states.remove(key);
        Ok(())
    }

    async fn clear_session(&self, version: &VersionTag, session_id: &str) -> Result<usize> {
        Ok(self.remove_where(|key, _| &key.version == version && key.session_id == session_id))
    }

    async fn clear_version(&self, version: &VersionTag) -> Result<usize> {
        Ok(self.remove_where(|key, _| &key.version == version))
    }

    async fn prune_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        Ok(self.remove_where(|_, stored| stored.updated_at < cutoff))
    }
}
