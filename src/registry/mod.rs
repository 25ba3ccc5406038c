//! Provider registry
//!
//! Holds the configured provider connections for one library version,
//! enumerable in registration order. Names are case-folded once, here, and
//! every lookup goes through the same canonical form.

pub mod scopes;

pub use scopes::ScopeSource;

use crate::constants::AUTHORIZE_SEGMENT;
use crate::model::ProviderDescriptor;
use crate::provider::{ProviderConnection, ServiceCatalog, ServiceFactory};
use crate::{ConsoleError, Result};
use once_cell::sync::OnceCell;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Canonical form of a provider name
pub fn canonical_name(name: &str) -> String {
    name.trim().to_lowercase()
}

struct RegistryEntry {
    descriptor: Arc<ProviderDescriptor>,
    connection: OnceCell<Arc<ProviderConnection>>,
}

/// Provider connections for one library version
pub struct ProviderRegistry {
    version_dir: PathBuf,
    callback_base: String,
    catalog: Arc<ServiceCatalog>,
    factory: Arc<dyn ServiceFactory>,
    entries: Vec<RegistryEntry>,
}

impl ProviderRegistry {
    /// Create an empty registry
    ///
    /// `version_dir` anchors file scope sources; `callback_base` is the public
    /// URL prefix of the version (`<origin>/<version>`).
    pub fn new(
        version_dir: impl Into<PathBuf>,
        callback_base: impl Into<String>,
        catalog: Arc<ServiceCatalog>,
        factory: Arc<dyn ServiceFactory>,
    ) -> Self {
        Self {
            version_dir: version_dir.into(),
            callback_base: callback_base.into().trim_end_matches('/').to_string(),
            catalog,
            factory,
            entries: Vec::new(),
        }
    }

    pub fn version_dir(&self) -> &Path {
        &self.version_dir
    }

    /// Register (or re-register) a provider
    ///
    /// Re-registering an existing name replaces its descriptor in place and
    /// drops any connection created for the old one.
    pub fn register(
        &mut self,
        name: &str,
        client_id: &str,
        client_secret: &str,
        scopes_source: Option<&ScopeSource>,
    ) -> Result<&mut Self> {
        let canonical = canonical_name(name);
        if canonical.is_empty() {
            return Err(ConsoleError::validation("Provider name cannot be empty"));
        }

        let endpoints = self
            .catalog
            .lookup(&canonical)
            .cloned()
            .ok_or_else(|| ConsoleError::UnsupportedService(name.trim().to_string()))?;

        let scopes = scopes_source
            .map(|source| source.resolve(&self.version_dir))
            .unwrap_or_default();

        let descriptor = Arc::new(ProviderDescriptor {
            name: canonical.clone(),
            display_name: name.trim().to_string(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            protocol_version: endpoints.protocol,
            scopes,
            endpoints,
        });

        let entry = RegistryEntry {
            descriptor,
            connection: OnceCell::new(),
        };

        match self
            .entries
            .iter_mut()
            .find(|e| e.descriptor.name == canonical)
        {
            Some(existing) => {
                tracing::debug!(provider = %canonical, "Replacing provider registration");
                *existing = entry;
            }
            None => self.entries.push(entry),
        }

        Ok(self)
    }

    /// Connection for a provider, created on first use
    pub fn get(&self, name: &str) -> Result<Arc<ProviderConnection>> {
        let canonical = canonical_name(name);
        let entry = self
            .entries
            .iter()
            .find(|e| e.descriptor.name == canonical)
            .ok_or_else(|| ConsoleError::ProviderNotFound(name.to_string()))?;

        entry
            .connection
            .get_or_try_init(|| {
                let redirect_uri = self.redirect_uri(&canonical);
                let service = self
                    .factory
                    .create(entry.descriptor.clone(), &redirect_uri)?;
                Ok(Arc::new(ProviderConnection::new(
                    entry.descriptor.clone(),
                    redirect_uri,
                    service,
                )))
            })
            .cloned()
    }

    /// Descriptor for a provider without creating its connection
    pub fn descriptor(&self, name: &str) -> Option<&ProviderDescriptor> {
        let canonical = canonical_name(name);
        self.entries
            .iter()
            .find(|e| e.descriptor.name == canonical)
            .map(|e| e.descriptor.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.descriptor(name).is_some()
    }

    /// Descriptors in registration order
    pub fn iter(&self) -> impl Iterator<Item = &ProviderDescriptor> {
        self.entries.iter().map(|e| e.descriptor.as_ref())
    }

    pub fn names(&self) -> Vec<String> {
        self.iter().map(|d| d.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Callback URI the provider redirects back to
    pub fn redirect_uri(&self, canonical: &str) -> String {
        format!("{}/{}/{}", self.callback_base, canonical, AUTHORIZE_SEGMENT)
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("version_dir", &self.version_dir)
            .field("providers", &self.names())
            .finish()
    }
}
