//! Configuration management for the console
//!
//! Loads the console configuration from `console.config.json` (or a YAML
//! file, by extension). A missing file yields the defaults.

use crate::constants::{
    CONFIG_FILE_NAME, DEFAULT_ARCHIVE_PREFIX, DEFAULT_BRANCH, DEFAULT_HTTP_HOST,
    DEFAULT_HTTP_PORT, DEFAULT_PENDING_TTL_SECS, DEFAULT_REPOSITORY, DEFAULT_SESSION_TTL_HOURS,
    DEFAULT_SOURCE_API_URL, DEFAULT_USER_AGENT, DEFAULT_VERSIONS_DIR,
};
use crate::model::{ProtocolVersion, ProviderEndpoints};
use crate::registry::{ScopeSource, canonical_name};
use crate::utils::expand_env_value;
use crate::version::{VersionLayout, VersionTag};
use crate::{ConsoleError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Complete console configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    pub http: HttpConfig,

    /// Mirrored library versions
    #[serde(default)]
    pub versions: VersionsConfig,

    /// Provider credentials, in display order
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,

    /// Handshake settings
    #[serde(default)]
    pub auth: AuthConfig,

    /// Release mirror settings
    #[serde(default)]
    pub mirror: MirrorConfig,

    /// Logging configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log: Option<LogConfig>,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind to
    #[serde(default = "default_port")]
    pub port: u16,

    /// Always mark cookies Secure. Default: false for local development
    #[serde(default)]
    pub secure: bool,

    /// Trust `X-Forwarded-Proto` from a reverse proxy
    #[serde(default)]
    pub trust_proxy: bool,

    /// Public origin used to build OAuth callback URLs
    /// If not set, defaults to http://host:port
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Session lifetime in hours
    #[serde(default = "default_session_ttl_hours")]
    pub session_ttl_hours: i64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            secure: false,
            trust_proxy: false,
            base_url: None,
            session_ttl_hours: default_session_ttl_hours(),
        }
    }
}

impl HttpConfig {
    /// Public origin without trailing slash
    pub fn public_base_url(&self) -> String {
        match &self.base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("http://{}:{}", self.host, self.port),
        }
    }
}

fn default_host() -> String {
    DEFAULT_HTTP_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_HTTP_PORT
}

fn default_session_ttl_hours() -> i64 {
    DEFAULT_SESSION_TTL_HOURS
}

/// Location of the versions directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionsConfig {
    #[serde(default = "default_versions_dir")]
    pub dir: String,
}

impl Default for VersionsConfig {
    fn default() -> Self {
        Self {
            dir: default_versions_dir(),
        }
    }
}

impl VersionsConfig {
    pub fn layout(&self) -> VersionLayout {
        VersionLayout::new(&self.dir)
    }
}

fn default_versions_dir() -> String {
    DEFAULT_VERSIONS_DIR.to_string()
}

/// Credentials of one provider
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    pub name: String,

    /// Client id, or `$env:NAME`
    pub client_id: String,

    /// Client secret, or `$env:NAME`
    pub client_secret: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub scopes: Option<ScopeSource>,

    /// Catalog entry to use when it differs from `name`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,

    /// Endpoints of a service missing from the catalog
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoints: Option<ProviderEndpoints>,
}

impl ProviderConfig {
    /// Client id with `$env:` references expanded
    pub fn client_id(&self) -> String {
        expand_env_value(&self.client_id)
    }

    /// Client secret with `$env:` references expanded
    pub fn client_secret(&self) -> String {
        expand_env_value(&self.client_secret)
    }
}

/// Authorization handshake settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthConfig {
    /// Lifetime of a pending handshake; 0 keeps pending state forever
    #[serde(default = "default_pending_ttl_secs")]
    pub pending_ttl_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            pending_ttl_secs: default_pending_ttl_secs(),
        }
    }
}

impl AuthConfig {
    pub fn pending_ttl(&self) -> Option<chrono::Duration> {
        match self.pending_ttl_secs {
            0 => None,
            secs => chrono::Duration::try_seconds(secs as i64),
        }
    }
}

fn default_pending_ttl_secs() -> u64 {
    DEFAULT_PENDING_TTL_SECS
}

/// Release mirror settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MirrorConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// `owner/name` of the upstream repository
    #[serde(default = "default_repository")]
    pub repository: String,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Prefix of the top-level directory inside downloaded archives
    #[serde(default = "default_archive_prefix")]
    pub archive_prefix: String,

    /// Branch mirrored as a moving snapshot
    #[serde(default = "default_branch")]
    pub branch: String,

    /// Custom versions seeded from the branch snapshot
    #[serde(default)]
    pub custom_versions: Vec<String>,

    /// Cron expression (with seconds) for `mirror --watch`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule: Option<String>,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            repository: default_repository(),
            user_agent: default_user_agent(),
            archive_prefix: default_archive_prefix(),
            branch: default_branch(),
            custom_versions: Vec::new(),
            schedule: None,
        }
    }
}

fn default_api_url() -> String {
    DEFAULT_SOURCE_API_URL.to_string()
}

fn default_repository() -> String {
    DEFAULT_REPOSITORY.to_string()
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_archive_prefix() -> String {
    DEFAULT_ARCHIVE_PREFIX.to_string()
}

fn default_branch() -> String {
    DEFAULT_BRANCH.to_string()
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level (debug, info, warn, error)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
}

impl Config {
    /// Load configuration from the default file
    pub fn load() -> Result<Self> {
        Self::load_from_path(CONFIG_FILE_NAME)
    }

    /// Load configuration from specific path
    ///
    /// Supports both JSON and YAML formats based on file extension:
    /// - `.json` files are parsed as JSON
    /// - `.yaml` or `.yml` files are parsed as YAML
    /// - Files without extension default to JSON parsing
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = match path.extension().and_then(|s| s.to_str()) {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content).map_err(|e| {
                ConsoleError::config(format!("Failed to parse YAML config: {}", e))
            })?,
            _ => serde_json::from_str(&content).map_err(|e| {
                ConsoleError::config(format!("Failed to parse JSON config: {}", e))
            })?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.http.port == 0 {
            return Err(ConsoleError::config("http.port must be non-zero"));
        }
        if self.http.session_ttl_hours <= 0 {
            return Err(ConsoleError::config("http.sessionTtlHours must be positive"));
        }
        if let Some(base_url) = &self.http.base_url {
            let parsed = url::Url::parse(base_url).map_err(|e| {
                ConsoleError::config(format!("http.baseUrl '{}' is invalid: {}", base_url, e))
            })?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(ConsoleError::config("http.baseUrl must be an http(s) URL"));
            }
        }

        if self.versions.dir.trim().is_empty() {
            return Err(ConsoleError::config("versions.dir is required"));
        }

        let mut seen = HashSet::new();
        for provider in &self.providers {
            let canonical = canonical_name(&provider.name);
            if canonical.is_empty() {
                return Err(ConsoleError::config("providers[].name is required"));
            }
            if !seen.insert(canonical) {
                return Err(ConsoleError::config(format!(
                    "Provider '{}' is configured more than once",
                    provider.name
                )));
            }
            if provider.client_id.trim().is_empty() {
                return Err(ConsoleError::config(format!(
                    "Provider '{}' is missing clientId",
                    provider.name
                )));
            }
            if let Some(endpoints) = &provider.endpoints
                && endpoints.protocol == ProtocolVersion::OAuth1
                && endpoints.request_token_url.is_none()
            {
                return Err(ConsoleError::config(format!(
                    "Provider '{}' speaks OAuth1 but has no requestTokenUrl",
                    provider.name
                )));
            }
        }

        self.validate_mirror()
    }

    fn validate_mirror(&self) -> Result<()> {
        let mirror = &self.mirror;
        if mirror.repository.split('/').filter(|s| !s.is_empty()).count() != 2 {
            return Err(ConsoleError::config(format!(
                "mirror.repository '{}' must be owner/name",
                mirror.repository
            )));
        }

        let branch = VersionTag::parse(&mirror.branch)
            .map_err(|_| ConsoleError::config(format!("mirror.branch '{}' is not a valid version name", mirror.branch)))?;
        if branch.is_custom() {
            return Err(ConsoleError::config("mirror.branch cannot be a custom version"));
        }

        for tag in &mirror.custom_versions {
            if !VersionTag::parse(tag).is_ok_and(|t| t.is_custom()) {
                return Err(ConsoleError::config(format!(
                    "mirror.customVersions entry '{}' must look like c-<number>",
                    tag
                )));
            }
        }

        if let Some(schedule) = &mirror.schedule {
            crate::mirror::schedule::parse_schedule(schedule)?;
        }

        Ok(())
    }

    /// Log filter derived from `log.level`, if any
    pub fn log_filter(&self) -> Option<String> {
        self.log
            .as_ref()
            .and_then(|log| log.level.as_deref())
            .map(|level| format!("oauth_console={}", level))
    }
}

#[cfg(test)]
mod config_test;
