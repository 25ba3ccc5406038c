//! Classification of requests arriving on the authorize route

use serde::Deserialize;

/// Query parameters a provider may send back to the authorize route
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CallbackParams {
    pub oauth_token: Option<String>,
    pub oauth_verifier: Option<String>,
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Which handshake step a request on the authorize route represents
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackKind<'a> {
    /// No callback parameters: begin a fresh handshake
    Start,
    /// OAuth1 provider redirected back
    OAuth1 {
        token: &'a str,
        verifier: Option<&'a str>,
    },
    /// OAuth2 provider redirected back
    OAuth2 {
        code: &'a str,
        state: Option<&'a str>,
    },
    /// The user (or provider) refused the authorization
    Denied { reason: String },
}

impl CallbackParams {
    /// Disambiguate the handshake step from the parameters present
    pub fn kind(&self) -> CallbackKind<'_> {
        if let Some(error) = non_empty(&self.error) {
            let reason = non_empty(&self.error_description)
                .map(|d| format!("{}: {}", error, d))
                .unwrap_or_else(|| error.to_string());
            return CallbackKind::Denied { reason };
        }

        if let Some(token) = non_empty(&self.oauth_token) {
            return CallbackKind::OAuth1 {
                token,
                verifier: non_empty(&self.oauth_verifier),
            };
        }

        if let Some(code) = non_empty(&self.code) {
            return CallbackKind::OAuth2 {
                code,
                state: non_empty(&self.state),
            };
        }

        CallbackKind::Start
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}
