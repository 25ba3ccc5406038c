//! Console facade
//!
//! Ties the version resolver, the provider registry, the handshake and the
//! dispatcher together. A [`VersionConsole`] is opened per request for the
//! resolved version; its registry is rebuilt from configuration each time,
//! so providers always run against the library version being served.

use crate::auth::{AuthOutcome, AuthorizationFlow, CallbackParams};
use crate::config::{Config, ProviderConfig};
use crate::dispatch;
use crate::model::{AuthorizationState, DispatchResult, ProtocolVersion};
use crate::provider::{HttpServiceFactory, ServiceCatalog, ServiceFactory};
use crate::registry::ProviderRegistry;
use crate::token::{MemoryTokenStore, TokenStore};
use crate::version::{self, VersionLayout, VersionTag};
use crate::{ConsoleError, Result};
use chrono::Duration;
use serde::Serialize;
use std::sync::Arc;

/// Shared console state, one per process
pub struct Console {
    layout: VersionLayout,
    providers: Vec<ProviderConfig>,
    catalog: Arc<ServiceCatalog>,
    factory: Arc<dyn ServiceFactory>,
    store: Arc<dyn TokenStore>,
    base_url: String,
    pending_ttl: Option<Duration>,
}

impl Console {
    /// Build a console from configuration
    ///
    /// Fails with `UnsupportedService` when a provider names neither a
    /// catalog service nor its own endpoints.
    pub fn new(
        config: &Config,
        factory: Arc<dyn ServiceFactory>,
        store: Arc<dyn TokenStore>,
    ) -> Result<Self> {
        let catalog = build_catalog(&config.providers)?;

        Ok(Self {
            layout: config.versions.layout(),
            providers: config.providers.clone(),
            catalog: Arc::new(catalog),
            factory,
            store,
            base_url: config.http.public_base_url(),
            pending_ttl: config.auth.pending_ttl(),
        })
    }

    /// Console talking to real providers with in-memory token storage
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config,
            Arc::new(HttpServiceFactory::new()?),
            Arc::new(MemoryTokenStore::new()),
        )
    }

    pub fn layout(&self) -> &VersionLayout {
        &self.layout
    }

    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.store
    }

    pub fn installed_versions(&self) -> Result<Vec<VersionTag>> {
        self.layout.installed()
    }

    /// Resolve the version for a request from its path segment and cookie
    pub fn resolve_version(&self, path_segment: Option<&str>, cookie: Option<&str>) -> Result<VersionTag> {
        version::resolve(path_segment, cookie, &self.installed_versions()?)
    }

    /// Open an installed version with a freshly built registry
    pub fn open(&self, version: &VersionTag) -> Result<VersionConsole<'_>> {
        if !self.layout.is_installed(version) {
            return Err(ConsoleError::VersionNotInstalled(version.to_string()));
        }

        let mut registry = ProviderRegistry::new(
            self.layout.release_dir(version),
            format!("{}/{}", self.base_url, version),
            self.catalog.clone(),
            self.factory.clone(),
        );
        for provider in &self.providers {
            registry.register(
                &provider.name,
                &provider.client_id(),
                &provider.client_secret(),
                provider.scopes.as_ref(),
            )?;
        }

        Ok(VersionConsole {
            console: self,
            version: version.clone(),
            registry,
        })
    }
}

/// Built-in services plus those declared or aliased in configuration
fn build_catalog(providers: &[ProviderConfig]) -> Result<ServiceCatalog> {
    let builtin = ServiceCatalog::builtin();
    let mut catalog = ServiceCatalog::builtin();

    for provider in providers {
        let endpoints = match (&provider.endpoints, &provider.service) {
            (Some(endpoints), _) => endpoints.clone(),
            (None, Some(service)) => builtin
                .lookup(service)
                .cloned()
                .ok_or_else(|| ConsoleError::UnsupportedService(service.clone()))?,
            (None, None) if builtin.contains(&provider.name) => continue,
            (None, None) => return Err(ConsoleError::UnsupportedService(provider.name.clone())),
        };
        catalog.insert(&provider.name, endpoints);
    }

    Ok(catalog)
}

/// One provider as shown on the overview page
#[derive(Debug, Clone, Serialize)]
pub struct ProviderStatus {
    pub name: String,
    pub display_name: String,
    pub protocol: ProtocolVersion,
    pub state: &'static str,
    pub authenticated: bool,
    pub scopes: Vec<String>,
}

/// The console bound to one installed library version
pub struct VersionConsole<'a> {
    console: &'a Console,
    version: VersionTag,
    registry: ProviderRegistry,
}

impl<'a> VersionConsole<'a> {
    pub fn version(&self) -> &VersionTag {
        &self.version
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Handshake driver for a session
    pub fn flow<'s>(&'s self, session_id: &'s str) -> AuthorizationFlow<'s> {
        AuthorizationFlow::new(self.console.store.as_ref(), &self.version, session_id)
            .with_pending_ttl(self.console.pending_ttl)
    }

    /// Every provider in registration order with its state in the session
    pub async fn overview(&self, session_id: &str) -> Result<Vec<ProviderStatus>> {
        let flow = self.flow(session_id);
        let mut statuses = Vec::with_capacity(self.registry.len());

        for descriptor in self.registry.iter() {
            let state = flow.state(&descriptor.name).await?;
            statuses.push(ProviderStatus {
                name: descriptor.name.clone(),
                display_name: descriptor.display_name.clone(),
                protocol: descriptor.protocol_version,
                state: state.label(),
                authenticated: state.is_authenticated(),
                scopes: descriptor.scopes.clone(),
            });
        }

        Ok(statuses)
    }

    /// State of one provider; unknown providers are an error
    pub async fn provider_state(&self, session_id: &str, provider: &str) -> Result<AuthorizationState> {
        let connection = self.registry.get(provider)?;
        self.flow(session_id).state(connection.name()).await
    }

    /// Start or complete a handshake, depending on the callback parameters
    pub async fn authorize(
        &self,
        session_id: &str,
        provider: &str,
        params: &CallbackParams,
    ) -> Result<AuthOutcome> {
        let connection = self.registry.get(provider)?;
        self.flow(session_id).handle(&connection, params).await
    }

    /// Forward an API call through an authenticated provider
    pub async fn dispatch(
        &self,
        session_id: &str,
        provider: &str,
        method: &str,
        url: &str,
        params: Vec<(String, String)>,
    ) -> Result<DispatchResult> {
        let connection = self.registry.get(provider)?;
        let request = dispatch::build_request(method, url, params)?;
        dispatch::dispatch(&self.flow(session_id), &connection, &request).await
    }

    /// Reset every provider of one session
    pub async fn clear_tokens(&self, session_id: &str) -> Result<usize> {
        self.flow(session_id).clear_tokens().await
    }

    /// Reset every session of this version
    pub async fn clear_all_tokens(&self) -> Result<usize> {
        let cleared = self.console.store.clear_version(&self.version).await?;
        tracing::info!(version = %self.version, cleared, "Cleared all tokens");
        Ok(cleared)
    }

    /// Whether `provider` is registered, by any case variant
    pub fn has_provider(&self, provider: &str) -> bool {
        self.registry.contains(provider)
    }
}

#[cfg(test)]
mod console_test;
