//! OAuth 2.0 service built on the oauth2 crate

use super::{
    AuthenticatedTransport, Capability, OAuth2Service, ProviderService, read_response,
};
use crate::model::{AccessToken, ApiRequest, ApiResponse, ProviderDescriptor};
use crate::{ConsoleError, Result};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, RedirectUrl, Scope,
    TokenResponse, TokenUrl, basic::BasicClient,
};
use std::sync::Arc;

/// OAuth 2.0 provider backed by HTTP
pub struct OAuth2HttpService {
    descriptor: Arc<ProviderDescriptor>,
    redirect_uri: String,
    client: reqwest::Client,
}

impl OAuth2HttpService {
    pub fn new(
        descriptor: Arc<ProviderDescriptor>,
        redirect_uri: String,
        client: reqwest::Client,
    ) -> Self {
        Self {
            descriptor,
            redirect_uri,
            client,
        }
    }

    fn invalid(&self, what: &str, e: impl std::fmt::Display) -> ConsoleError {
        ConsoleError::config(format!(
            "Invalid {} for provider '{}': {}",
            what, self.descriptor.name, e
        ))
    }
}

#[async_trait]
impl OAuth2Service for OAuth2HttpService {
    fn authorization_url(&self, csrf_state: &str) -> Result<String> {
        let endpoints = &self.descriptor.endpoints;

        let client = BasicClient::new(ClientId::new(self.descriptor.client_id.clone()))
            .set_client_secret(ClientSecret::new(self.descriptor.client_secret.clone()))
            .set_auth_uri(
                AuthUrl::new(endpoints.authorization_url.clone())
                    .map_err(|e| self.invalid("auth URL", e))?,
            )
            .set_redirect_uri(
                RedirectUrl::new(self.redirect_uri.clone())
                    .map_err(|e| self.invalid("redirect URI", e))?,
            );

        let mut request = client
            .authorize_url(|| CsrfToken::new(csrf_state.to_string()))
            .add_scopes(self.descriptor.scopes.iter().map(|s| Scope::new(s.clone())));
        for (name, value) in &endpoints.authorization_params {
            request = request.add_extra_param(name.as_str(), value.as_str());
        }

        let (url, _) = request.url();
        Ok(url.to_string())
    }

    async fn request_access_token(&self, code: &str) -> Result<AccessToken> {
        let endpoints = &self.descriptor.endpoints;

        // Can't share the builder with authorization_url: oauth2's typestate differs per endpoint set
        let client = BasicClient::new(ClientId::new(self.descriptor.client_id.clone()))
            .set_client_secret(ClientSecret::new(self.descriptor.client_secret.clone()))
            .set_token_uri(
                TokenUrl::new(endpoints.access_token_url.clone())
                    .map_err(|e| self.invalid("token URL", e))?,
            )
            .set_redirect_uri(
                RedirectUrl::new(self.redirect_uri.clone())
                    .map_err(|e| self.invalid("redirect URI", e))?,
            );

        let token_result = client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .request_async(&self.client)
            .await
            .map_err(|e| {
                ConsoleError::authorization(
                    &self.descriptor.name,
                    format!("Token exchange failed: {}", e),
                )
            })?;

        let expires_at = token_result
            .expires_in()
            .map(|duration| Utc::now() + Duration::seconds(duration.as_secs() as i64));

        Ok(AccessToken {
            access_token: token_result.access_token().secret().clone(),
            access_token_secret: None,
            refresh_token: token_result.refresh_token().map(|t| t.secret().clone()),
            expires_at,
        })
    }
}

#[async_trait]
impl AuthenticatedTransport for OAuth2HttpService {
    async fn send(&self, token: &AccessToken, request: &ApiRequest) -> Result<ApiResponse> {
        let mut builder = self
            .client
            .request(request.method.clone(), &request.url)
            .bearer_auth(&token.access_token);

        if request.params_in_query() {
            builder = builder.query(&request.params);
        } else {
            builder = builder.form(&request.params);
        }

        read_response(builder.send().await?).await
    }
}

impl ProviderService for OAuth2HttpService {
    fn capability(&self) -> Capability<'_> {
        Capability::OAuth2(self)
    }
}

