//! Core data types shared by the registry, the handshake and the dispatcher

use bytes::Bytes;
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::fmt;

/// OAuth protocol spoken by a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolVersion {
    #[serde(alias = "oauth1a")]
    OAuth1,
    OAuth2,
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolVersion::OAuth1 => write!(f, "OAuth 1.0a"),
            ProtocolVersion::OAuth2 => write!(f, "OAuth 2.0"),
        }
    }
}

/// Endpoints a provider exposes for the handshake
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderEndpoints {
    pub protocol: ProtocolVersion,

    /// OAuth1 only: where request tokens are acquired
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_token_url: Option<String>,

    pub authorization_url: String,

    pub access_token_url: String,

    /// Extra query parameters appended to the authorization URL
    /// (e.g. elevated permission requests)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authorization_params: Vec<(String, String)>,
}

/// Immutable description of one configured provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderDescriptor {
    /// Canonical (case-folded) identifier
    pub name: String,
    /// Name as it was registered, for display
    pub display_name: String,
    pub client_id: String,
    #[serde(skip_serializing)]
    pub client_secret: String,
    pub protocol_version: ProtocolVersion,
    /// Ordered, de-duplicated scope set
    pub scopes: Vec<String>,
    pub endpoints: ProviderEndpoints,
}

/// OAuth1 request token issued before user authorization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestToken {
    pub token: String,
    pub secret: String,
}

/// Credential obtained after a successful token exchange
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    /// OAuth1 only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    /// Bearer-style token without secret
    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            access_token: token.into(),
            access_token_secret: None,
            refresh_token: None,
            expires_at: None,
        }
    }

    /// OAuth1 token/secret pair
    pub fn with_secret(token: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            access_token: token.into(),
            access_token_secret: Some(secret.into()),
            refresh_token: None,
            expires_at: None,
        }
    }
}

/// Handshake state of one provider within one session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AuthorizationState {
    #[default]
    Unauthenticated,
    /// OAuth1: request token issued, waiting for the provider callback
    PendingAuthorization {
        request_token: String,
        request_token_secret: String,
    },
    /// OAuth2: redirected with a CSRF state value, waiting for the callback
    PendingAuthorization2 { csrf_state: String },
    Authenticated { token: AccessToken },
}

impl AuthorizationState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthorizationState::Authenticated { .. })
    }

    pub fn is_pending(&self) -> bool {
        matches!(
            self,
            AuthorizationState::PendingAuthorization { .. }
                | AuthorizationState::PendingAuthorization2 { .. }
        )
    }

    /// Short label for views and logs
    pub fn label(&self) -> &'static str {
        match self {
            AuthorizationState::Unauthenticated => "unauthenticated",
            AuthorizationState::PendingAuthorization { .. }
            | AuthorizationState::PendingAuthorization2 { .. } => "pending",
            AuthorizationState::Authenticated { .. } => "authenticated",
        }
    }
}

/// An ad-hoc API call issued through an authenticated connection
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub params: Vec<(String, String)>,
}

impl ApiRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            params: Vec::new(),
        }
    }

    pub fn with_params(mut self, params: Vec<(String, String)>) -> Self {
        self.params = params;
        self
    }

    /// Parameters travel in the query string for GET-like methods, in a form body otherwise
    pub fn params_in_query(&self) -> bool {
        matches!(self.method, Method::GET | Method::HEAD | Method::DELETE)
    }
}

/// Raw response as received from a provider
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Content type detected by parsing a response body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectedType {
    Json,
    Xml,
    Unknown,
}

impl DetectedType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectedType::Json => "json",
            DetectedType::Xml => "xml",
            DetectedType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for DetectedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a dispatched call: the body is always kept, whatever its type
#[derive(Debug, Clone)]
pub struct DispatchResult {
    pub status: u16,
    pub body: Bytes,
    pub detected_type: DetectedType,
}

#[cfg(test)]
#[path = "model_test.rs"]
mod model_test;
