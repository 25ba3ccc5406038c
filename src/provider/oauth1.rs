//! OAuth 1.0a service with HMAC-SHA1 request signing (RFC 5849)

use super::{
    AuthenticatedTransport, Capability, OAuth1Service, ProviderService, ensure_success,
    read_response,
};
use crate::model::{AccessToken, ApiRequest, ApiResponse, ProviderDescriptor, RequestToken};
use crate::{ConsoleError, Result};
use async_trait::async_trait;
use oauth1_request::{Builder, Credentials, HmacSha1, ParameterList};
use reqwest::Method;
use std::collections::HashMap;
use std::sync::Arc;
use url::Url;

/// Protocol values signed alongside the consumer credentials
#[derive(Debug, Default, Clone, Copy)]
pub struct OAuthParams<'a> {
    /// Request or access token and its secret
    pub token: Option<(&'a str, &'a str)>,
    pub callback: Option<&'a str>,
    pub verifier: Option<&'a str>,
    /// Random when unset
    pub nonce: Option<&'a str>,
    /// Current time when unset
    pub timestamp: Option<u64>,
}

impl<'a> OAuthParams<'a> {
    pub fn with_token(token: &'a str, secret: &'a str) -> Self {
        Self {
            token: Some((token, secret)),
            ..Default::default()
        }
    }
}

/// Build the `Authorization` header for a request
///
/// Query parameters are read from `url`. `body_params` are form fields
/// sent in the body; both are part of the signature.
pub fn authorization_header<'a>(
    consumer_key: &'a str,
    consumer_secret: &'a str,
    method: &Method,
    url: &Url,
    body_params: &[(String, String)],
    oauth: OAuthParams<'a>,
) -> String {
    let mut base = url.clone();
    base.set_query(None);
    base.set_fragment(None);

    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .into_owned()
        .chain(body_params.iter().cloned())
        .collect();
    params.sort();
    let request = ParameterList::new(params);

    let mut builder: Builder<'a, HmacSha1, &'a str> =
        Builder::new(Credentials::new(consumer_key, consumer_secret), HmacSha1::new());
    builder
        .token(oauth.token.map(|(token, secret)| Credentials::new(token, secret)))
        .callback(oauth.callback)
        .verifier(oauth.verifier)
        .nonce(oauth.nonce)
        .timestamp(oauth.timestamp.and_then(std::num::NonZeroU64::new))
        .version(true);

    builder.authorize(method.as_str(), &base, &request)
}

/// OAuth 1.0a provider backed by HTTP
pub struct OAuth1HttpService {
    descriptor: Arc<ProviderDescriptor>,
    callback: String,
    client: reqwest::Client,
}

impl OAuth1HttpService {
    pub fn new(descriptor: Arc<ProviderDescriptor>, callback: String, client: reqwest::Client) -> Self {
        Self {
            descriptor,
            callback,
            client,
        }
    }

    fn sign(
        &self,
        method: &Method,
        url: &Url,
        body_params: &[(String, String)],
        oauth: OAuthParams<'_>,
    ) -> String {
        authorization_header(
            &self.descriptor.client_id,
            &self.descriptor.client_secret,
            method,
            url,
            body_params,
            oauth,
        )
    }

    fn parse_url(&self, raw: &str) -> Result<Url> {
        Url::parse(raw).map_err(|e| {
            ConsoleError::config(format!(
                "Invalid URL '{}' for provider '{}': {}",
                raw, self.descriptor.name, e
            ))
        })
    }

    /// POST a signed token request and parse the form-encoded reply
    async fn token_request(
        &self,
        endpoint: &str,
        oauth: OAuthParams<'_>,
        context: &str,
    ) -> Result<HashMap<String, String>> {
        let url = self.parse_url(endpoint)?;
        let header = self.sign(&Method::POST, &url, &[], oauth);

        let response = self
            .client
            .post(url)
            .header(reqwest::header::AUTHORIZATION, header)
            .send()
            .await?;
        let response = ensure_success(read_response(response).await?, context)?;

        Ok(url::form_urlencoded::parse(&response.body)
            .into_owned()
            .collect())
    }

    fn token_pair(
        &self,
        fields: &HashMap<String, String>,
        context: &str,
    ) -> Result<(String, String)> {
        match (fields.get("oauth_token"), fields.get("oauth_token_secret")) {
            (Some(token), Some(secret)) if !token.is_empty() => Ok((token.clone(), secret.clone())),
            _ => Err(ConsoleError::authorization(
                &self.descriptor.name,
                format!("{} response did not contain a token", context),
            )),
        }
    }
}

#[async_trait]
impl OAuth1Service for OAuth1HttpService {
    async fn request_request_token(&self) -> Result<RequestToken> {
        let endpoint = self
            .descriptor
            .endpoints
            .request_token_url
            .as_deref()
            .ok_or_else(|| {
                ConsoleError::config(format!(
                    "Provider '{}' has no request token URL",
                    self.descriptor.name
                ))
            })?;

        let fields = self
            .token_request(
                endpoint,
                OAuthParams {
                    callback: Some(&self.callback),
                    ..Default::default()
                },
                "Request token endpoint",
            )
            .await?;

        if fields
            .get("oauth_callback_confirmed")
            .is_some_and(|v| v != "true")
        {
            return Err(ConsoleError::authorization(
                &self.descriptor.name,
                "Provider did not confirm the callback URL",
            ));
        }

        let (token, secret) = self.token_pair(&fields, "Request token")?;
        Ok(RequestToken { token, secret })
    }

    fn authorization_url(&self, request_token: &str) -> Result<String> {
        let mut url = self.parse_url(&self.descriptor.endpoints.authorization_url)?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("oauth_token", request_token);
            for (k, v) in &self.descriptor.endpoints.authorization_params {
                query.append_pair(k, v);
            }
        }
        Ok(url.to_string())
    }

    async fn request_access_token(
        &self,
        request_token: &RequestToken,
        verifier: &str,
    ) -> Result<AccessToken> {
        let oauth = OAuthParams {
            verifier: Some(verifier),
            ..OAuthParams::with_token(&request_token.token, &request_token.secret)
        };

        let fields = self
            .token_request(
                &self.descriptor.endpoints.access_token_url,
                oauth,
                "Access token endpoint",
            )
            .await?;

        let (token, secret) = self.token_pair(&fields, "Access token")?;
        Ok(AccessToken::with_secret(token, secret))
    }
}

#[async_trait]
impl AuthenticatedTransport for OAuth1HttpService {
    async fn send(&self, token: &AccessToken, request: &ApiRequest) -> Result<ApiResponse> {
        let secret = token.access_token_secret.as_deref().unwrap_or_default();
        let oauth = OAuthParams::with_token(&token.access_token, secret);

        let mut url = self.parse_url(&request.url)?;
        let builder = if request.params_in_query() {
            if !request.params.is_empty() {
                url.query_pairs_mut().extend_pairs(request.params.iter());
            }
            let header = self.sign(&request.method, &url, &[], oauth);
            self.client
                .request(request.method.clone(), url)
                .header(reqwest::header::AUTHORIZATION, header)
        } else {
            let header = self.sign(&request.method, &url, &request.params, oauth);
            self.client
                .request(request.method.clone(), url)
                .header(reqwest::header::AUTHORIZATION, header)
                .form(&request.params)
        };

        read_response(builder.send().await?).await
    }
}

impl ProviderService for OAuth1HttpService {
    fn capability(&self) -> Capability<'_> {
        Capability::OAuth1(self)
    }
}

