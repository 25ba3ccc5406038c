//! Error types for the OAuth console
//!
//! One error enum covers the console core (version resolution, provider
//! registry, authorization handshake, dispatch) and the release mirror.

use bytes::Bytes;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for console operations
#[derive(Error, Debug)]
pub enum ConsoleError {
    #[error("No library versions are installed")]
    NoVersionsAvailable,

    #[error("Library version '{0}' is not installed")]
    VersionNotInstalled(String),

    #[error("Invalid version tag: {0}")]
    InvalidVersion(String),

    #[error("Provider not found: {0}")]
    ProviderNotFound(String),

    #[error("Unsupported OAuth service: {0}")]
    UnsupportedService(String),

    #[error("Authorization failed for {provider}: {reason}")]
    AuthorizationFailed { provider: String, reason: String },

    #[error("CSRF state mismatch for {provider}")]
    CsrfMismatch { provider: String },

    #[error("Not authenticated with {provider}")]
    NotAuthenticated { provider: String },

    #[error("Upstream request failed: {message}")]
    UpstreamRequestFailed {
        message: String,
        status: Option<u16>,
        body: Option<Bytes>,
    },

    #[error("Archive extraction failed for {tag} (staged at {}): {reason}", staging.display())]
    ArchiveExtractionFailed {
        tag: String,
        staging: PathBuf,
        reason: String,
    },

    #[error("Directory conflict for {tag} at {}: {reason}", path.display())]
    DirectoryConflict {
        tag: String,
        path: PathBuf,
        reason: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Template rendering failed: {0}")]
    Template(#[from] minijinja::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl From<reqwest::Error> for ConsoleError {
    fn from(err: reqwest::Error) -> Self {
        ConsoleError::UpstreamRequestFailed {
            message: err.to_string(),
            status: err.status().map(|s| s.as_u16()),
            body: None,
        }
    }
}

/// Convenient result type for console operations
pub type Result<T> = std::result::Result<T, ConsoleError>;

impl ConsoleError {
    /// Create a validation error
    #[inline]
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        ConsoleError::Validation(msg.into())
    }

    /// Create a config error
    #[inline]
    pub fn config<S: Into<String>>(msg: S) -> Self {
        ConsoleError::Config(msg.into())
    }

    /// Create an authorization failure for a provider
    #[inline]
    pub fn authorization<P: Into<String>, S: Into<String>>(provider: P, reason: S) -> Self {
        ConsoleError::AuthorizationFailed {
            provider: provider.into(),
            reason: reason.into(),
        }
    }

    /// Create an upstream failure without a response
    #[inline]
    pub fn upstream<S: Into<String>>(msg: S) -> Self {
        ConsoleError::UpstreamRequestFailed {
            message: msg.into(),
            status: None,
            body: None,
        }
    }

    /// Whether the error belongs to the authorization handshake
    pub fn is_authorization(&self) -> bool {
        matches!(
            self,
            ConsoleError::AuthorizationFailed { .. }
                | ConsoleError::CsrfMismatch { .. }
                | ConsoleError::NotAuthenticated { .. }
        )
    }
}
