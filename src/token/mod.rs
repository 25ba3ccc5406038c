//! Token storage
//!
//! Authorization state and token material keyed by
//! (version, session, provider). Versions never share entries: the provider
//! implementation differs per library version.

pub mod memory;

use crate::model::AuthorizationState;
use crate::version::VersionTag;
use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use memory::MemoryTokenStore;

/// Key of one authorization state
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenKey {
    pub version: VersionTag,
    pub session_id: String,
    /// Canonical provider name
    pub provider: String,
}

impl TokenKey {
    pub fn new(version: &VersionTag, session_id: &str, provider: &str) -> Self {
        Self {
            version: version.clone(),
            session_id: session_id.to_string(),
            provider: provider.to_string(),
        }
    }
}

/// Authorization state plus the time it was last written
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredState {
    pub state: AuthorizationState,
    pub updated_at: DateTime<Utc>,
}

/// Persistence backend for authorization state
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Load the state for a key
    async fn load(&self, key: &TokenKey) -> Result<Option<StoredState>>;

    /// Store the state for a key, stamping it with the current time
    async fn save(&self, key: &TokenKey, state: AuthorizationState) -> Result<()>;

    /// Forget one key
    async fn remove(&self, key: &TokenKey) -> Result<()>;

    /// Forget every provider of one session within a version
    ///
    /// Returns the number of entries removed.
    async fn clear_session(&self, version: &VersionTag, session_id: &str) -> Result<usize>;

    /// Forget every session of a version
    async fn clear_version(&self, version: &VersionTag) -> Result<usize>;

    /// Forget entries last written before `cutoff` (expired sessions)
    async fn prune_before(&self, cutoff: DateTime<Utc>) -> Result<usize>;
}
