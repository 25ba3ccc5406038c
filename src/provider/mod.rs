//! Provider connections and the OAuth capability abstraction
//!
//! A provider exposes exactly one handshake capability:
//! - **OAuth1**: request token → user authorization → access token + secret
//! - **OAuth2**: redirect with CSRF state → authorization code → access token
//!
//! Both capabilities share an [`AuthenticatedTransport`] used by the
//! dispatcher once a token exists. The handshake code only ever looks at
//! [`ProviderService::capability`]; it never inspects concrete types.

pub mod catalog;
pub mod oauth1;
pub mod oauth2;

pub use catalog::ServiceCatalog;
pub use oauth1::{OAuth1HttpService, OAuthParams, authorization_header};
pub use oauth2::OAuth2HttpService;

use crate::constants::DEFAULT_USER_AGENT;
use crate::model::{
    AccessToken, ApiRequest, ApiResponse, ProtocolVersion, ProviderDescriptor, RequestToken,
};
use crate::{ConsoleError, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// OAuth1 handshake operations
#[async_trait]
pub trait OAuth1Service: Send + Sync {
    /// Acquire a request token bound to the connection's callback URI
    async fn request_request_token(&self) -> Result<RequestToken>;

    /// URL the user is sent to in order to authorize the request token
    fn authorization_url(&self, request_token: &str) -> Result<String>;

    /// Exchange an authorized request token for an access token
    async fn request_access_token(
        &self,
        request_token: &RequestToken,
        verifier: &str,
    ) -> Result<AccessToken>;
}

/// OAuth2 handshake operations
#[async_trait]
pub trait OAuth2Service: Send + Sync {
    /// URL the user is sent to, carrying the configured scopes and `csrf_state`
    fn authorization_url(&self, csrf_state: &str) -> Result<String>;

    /// Exchange an authorization code for an access token
    async fn request_access_token(&self, code: &str) -> Result<AccessToken>;
}

/// Sends API calls authenticated with a previously obtained token
#[async_trait]
pub trait AuthenticatedTransport: Send + Sync {
    async fn send(&self, token: &AccessToken, request: &ApiRequest) -> Result<ApiResponse>;
}

/// Handshake capability exposed by a service
pub enum Capability<'a> {
    OAuth1(&'a dyn OAuth1Service),
    OAuth2(&'a dyn OAuth2Service),
}

/// A concrete provider implementation
pub trait ProviderService: AuthenticatedTransport {
    fn capability(&self) -> Capability<'_>;
}

/// Builds provider services from descriptors
pub trait ServiceFactory: Send + Sync {
    fn create(
        &self,
        descriptor: Arc<ProviderDescriptor>,
        redirect_uri: &str,
    ) -> Result<Arc<dyn ProviderService>>;
}

/// Live handle on one configured provider
pub struct ProviderConnection {
    descriptor: Arc<ProviderDescriptor>,
    redirect_uri: String,
    service: Arc<dyn ProviderService>,
}

impl ProviderConnection {
    pub fn new(
        descriptor: Arc<ProviderDescriptor>,
        redirect_uri: String,
        service: Arc<dyn ProviderService>,
    ) -> Self {
        Self {
            descriptor,
            redirect_uri,
            service,
        }
    }

    pub fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    /// Canonical provider name
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    pub fn capability(&self) -> Capability<'_> {
        self.service.capability()
    }

    pub async fn send(&self, token: &AccessToken, request: &ApiRequest) -> Result<ApiResponse> {
        self.service.send(token, request).await
    }
}

impl std::fmt::Debug for ProviderConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConnection")
            .field("name", &self.descriptor.name)
            .field("protocol", &self.descriptor.protocol_version)
            .field("redirect_uri", &self.redirect_uri)
            .finish()
    }
}

/// Factory producing HTTP-backed services for real providers
#[derive(Clone)]
pub struct HttpServiceFactory {
    client: reqwest::Client,
}

impl HttpServiceFactory {
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: build_http_client()?,
        })
    }
}

impl ServiceFactory for HttpServiceFactory {
    fn create(
        &self,
        descriptor: Arc<ProviderDescriptor>,
        redirect_uri: &str,
    ) -> Result<Arc<dyn ProviderService>> {
        let service: Arc<dyn ProviderService> = match descriptor.protocol_version {
            ProtocolVersion::OAuth1 => Arc::new(OAuth1HttpService::new(
                descriptor,
                redirect_uri.to_string(),
                self.client.clone(),
            )),
            ProtocolVersion::OAuth2 => Arc::new(OAuth2HttpService::new(
                descriptor,
                redirect_uri.to_string(),
                self.client.clone(),
            )),
        };
        Ok(service)
    }
}

/// HTTP client shared by all provider services
///
/// Redirects are not followed: token endpoints must answer directly and API
/// responses are shown exactly as the provider sent them.
pub fn build_http_client() -> Result<reqwest::Client> {
    reqwest::ClientBuilder::new()
        .redirect(reqwest::redirect::Policy::none())
        .user_agent(DEFAULT_USER_AGENT)
        .build()
        .map_err(|e| ConsoleError::config(format!("Failed to build HTTP client: {}", e)))
}

/// Collect a reqwest response into an [`ApiResponse`]
pub(crate) async fn read_response(response: reqwest::Response) -> Result<ApiResponse> {
    let status = response.status().as_u16();
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());
    let body = response.bytes().await?;

    Ok(ApiResponse {
        status,
        content_type,
        body,
    })
}

/// Turn a non-success token endpoint response into an upstream error carrying the body
pub(crate) fn ensure_success(response: ApiResponse, context: &str) -> Result<ApiResponse> {
    if response.is_success() {
        return Ok(response);
    }

    Err(ConsoleError::UpstreamRequestFailed {
        message: format!("{} returned HTTP {}", context, response.status),
        status: Some(response.status),
        body: Some(response.body),
    })
}
