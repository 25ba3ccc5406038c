use super::{CallbackKind, CallbackParams};
use crate::model::{AccessToken, AuthorizationState, RequestToken};
use crate::provider::{Capability, ProviderConnection};
use crate::telemetry;
use crate::token::{StoredState, TokenKey, TokenStore};
use crate::utils::{generate_secure_token, tokens_match};
use crate::version::VersionTag;
use crate::{ConsoleError, Result};
use chrono::{Duration, Utc};

/// Result of a request on the authorize route
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// Send the user to the provider's authorization page
    Redirect(String),
    /// Token exchange succeeded
    Authenticated,
}

/// Handshake driver for one session within one library version
pub struct AuthorizationFlow<'a> {
    store: &'a dyn TokenStore,
    version: &'a VersionTag,
    session_id: &'a str,
    pending_ttl: Option<Duration>,
}

impl<'a> AuthorizationFlow<'a> {
    pub fn new(store: &'a dyn TokenStore, version: &'a VersionTag, session_id: &'a str) -> Self {
        Self {
            store,
            version,
            session_id,
            pending_ttl: None,
        }
    }

    /// Expire pending handshakes older than `ttl`
    pub fn with_pending_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.pending_ttl = ttl;
        self
    }

    fn key(&self, provider: &str) -> TokenKey {
        TokenKey::new(self.version, self.session_id, provider)
    }

    fn is_expired(&self, stored: &StoredState) -> bool {
        self.pending_ttl
            .is_some_and(|ttl| Utc::now() - stored.updated_at > ttl)
    }

    /// Current state of a provider, expiring stale pending handshakes
    pub async fn state(&self, provider: &str) -> Result<AuthorizationState> {
        let key = self.key(provider);
        let Some(stored) = self.store.load(&key).await? else {
            return Ok(AuthorizationState::Unauthenticated);
        };

        if stored.state.is_pending() && self.is_expired(&stored) {
            tracing::info!(provider, version = %self.version, "Pending authorization expired");
            self.store.remove(&key).await?;
            return Ok(AuthorizationState::Unauthenticated);
        }

        Ok(stored.state)
    }

    /// Access token of an authenticated provider
    pub async fn access_token(&self, provider: &str) -> Result<AccessToken> {
        match self.state(provider).await? {
            AuthorizationState::Authenticated { token } => Ok(token),
            _ => Err(ConsoleError::NotAuthenticated {
                provider: provider.to_string(),
            }),
        }
    }

    /// Handle a request on the authorize route
    pub async fn handle(
        &self,
        connection: &ProviderConnection,
        params: &CallbackParams,
    ) -> Result<AuthOutcome> {
        match params.kind() {
            CallbackKind::Start => self.authorize(connection).await.map(AuthOutcome::Redirect),
            CallbackKind::OAuth1 { token, verifier } => self
                .complete_oauth1(connection, token, verifier)
                .await
                .map(|_| AuthOutcome::Authenticated),
            CallbackKind::OAuth2 { code, state } => self
                .complete_oauth2(connection, code, state)
                .await
                .map(|_| AuthOutcome::Authenticated),
            CallbackKind::Denied { reason } => self.fail(connection.name(), reason).await,
        }
    }

    /// Begin a fresh handshake, returning the provider URL to redirect to
    ///
    /// Any previous state for the provider is discarded first.
    pub async fn authorize(&self, connection: &ProviderConnection) -> Result<String> {
        let provider = connection.name();
        let key = self.key(provider);
        self.store.remove(&key).await?;

        let result = self.start(connection, &key).await;
        match &result {
            Ok(_) => {
                telemetry::record_authorization(provider, "authorize", "redirect");
                tracing::info!(provider, version = %self.version, "Authorization started");
            }
            Err(e) => {
                telemetry::record_authorization(provider, "authorize", "error");
                tracing::warn!(provider, version = %self.version, error = %e, "Authorization could not start");
            }
        }
        result
    }

    async fn start(&self, connection: &ProviderConnection, key: &TokenKey) -> Result<String> {
        match connection.capability() {
            Capability::OAuth1(service) => {
                let request_token = service.request_request_token().await?;
                let url = service.authorization_url(&request_token.token)?;
                self.store
                    .save(
                        key,
                        AuthorizationState::PendingAuthorization {
                            request_token: request_token.token,
                            request_token_secret: request_token.secret,
                        },
                    )
                    .await?;
                Ok(url)
            }
            Capability::OAuth2(service) => {
                let csrf_state = generate_secure_token();
                let url = service.authorization_url(&csrf_state)?;
                self.store
                    .save(key, AuthorizationState::PendingAuthorization2 { csrf_state })
                    .await?;
                Ok(url)
            }
        }
    }

    /// Complete an OAuth1 handshake from the provider callback
    pub async fn complete_oauth1(
        &self,
        connection: &ProviderConnection,
        returned_token: &str,
        verifier: Option<&str>,
    ) -> Result<()> {
        let provider = connection.name();

        let Capability::OAuth1(service) = connection.capability() else {
            return self.fail(provider, "provider does not speak OAuth1").await;
        };

        let (token, secret) = match self.state(provider).await? {
            AuthorizationState::PendingAuthorization {
                request_token,
                request_token_secret,
            } => (request_token, request_token_secret),
            _ => return self.fail(provider, "no pending request token").await,
        };

        if !tokens_match(&token, returned_token) {
            return self.fail(provider, "request token mismatch").await;
        }

        let Some(verifier) = verifier else {
            return self.fail(provider, "missing oauth_verifier").await;
        };

        let request_token = RequestToken { token, secret };
        match service.request_access_token(&request_token, verifier).await {
            Ok(access) => self.authenticated(provider, access).await,
            Err(e) => self.fail(provider, failure_reason(e)).await,
        }
    }

    /// Complete an OAuth2 handshake from the provider callback
    pub async fn complete_oauth2(
        &self,
        connection: &ProviderConnection,
        code: &str,
        returned_state: Option<&str>,
    ) -> Result<()> {
        let provider = connection.name();

        let Capability::OAuth2(service) = connection.capability() else {
            return self.fail(provider, "provider does not speak OAuth2").await;
        };

        let csrf_state = match self.state(provider).await? {
            AuthorizationState::PendingAuthorization2 { csrf_state } => csrf_state,
            _ => return self.fail(provider, "no pending authorization").await,
        };

        if let Some(returned) = returned_state
            && !tokens_match(&csrf_state, returned)
        {
            telemetry::record_authorization(provider, "callback", "csrf_mismatch");
            tracing::warn!(provider, version = %self.version, "Rejected callback with mismatched state");
            return Err(ConsoleError::CsrfMismatch {
                provider: provider.to_string(),
            });
        }

        match service.request_access_token(code).await {
            Ok(access) => self.authenticated(provider, access).await,
            Err(e) => self.fail(provider, failure_reason(e)).await,
        }
    }

    /// Revert every provider of this session to `Unauthenticated`
    pub async fn clear_tokens(&self) -> Result<usize> {
        let cleared = self
            .store
            .clear_session(self.version, self.session_id)
            .await?;
        tracing::info!(version = %self.version, cleared, "Cleared session tokens");
        Ok(cleared)
    }

    async fn authenticated(&self, provider: &str, token: AccessToken) -> Result<()> {
        self.store
            .save(
                &self.key(provider),
                AuthorizationState::Authenticated { token },
            )
            .await?;
        telemetry::record_authorization(provider, "callback", "authenticated");
        tracing::info!(provider, version = %self.version, "Provider authenticated");
        Ok(())
    }

    /// Reset the provider and report the failure
    async fn fail<T>(&self, provider: &str, reason: impl Into<String>) -> Result<T> {
        let reason = reason.into();
        self.store.remove(&self.key(provider)).await?;
        telemetry::record_authorization(provider, "callback", "failed");
        tracing::warn!(provider, version = %self.version, %reason, "Authorization failed");
        Err(ConsoleError::authorization(provider, reason))
    }
}

fn failure_reason(err: ConsoleError) -> String {
    match err {
        ConsoleError::AuthorizationFailed { reason, .. } => reason,
        other => other.to_string(),
    }
}
