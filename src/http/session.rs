//! Browser sessions and console cookies
//!
//! Every visitor gets a `console_session` cookie; authorization state is keyed
//! by its id. Sessions expire after a TTL and a background task prunes both
//! the sessions and the token entries they left behind.

use super::AppState;
use crate::constants::{SESSION_COOKIE, VERSION_COOKIE, VERSION_COOKIE_MAX_AGE_SECS};
use crate::token::TokenStore;
use crate::utils::generate_secure_token;
use crate::version::VersionTag;
use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, header},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Interval between expired-session sweeps
const CLEANUP_INTERVAL_SECS: u64 = 300;

/// One browser session
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// In-memory session store with TTL
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Create a new session
    pub fn create_session(&self) -> Session {
        let now = Utc::now();
        let session = Session {
            id: generate_secure_token(),
            created_at: now,
            expires_at: now + self.ttl,
        };

        self.sessions
            .write()
            .insert(session.id.clone(), session.clone());
        session
    }

    /// Get a live session by id
    pub fn get_session(&self, session_id: &str) -> Option<Session> {
        let sessions = self.sessions.read();
        let session = sessions.get(session_id)?;

        if Utc::now() > session.expires_at {
            drop(sessions);
            self.sessions.write().remove(session_id);
            return None;
        }

        Some(session.clone())
    }

    pub fn delete_session(&self, session_id: &str) {
        self.sessions.write().remove(session_id);
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    /// Drop expired sessions, returning how many were removed
    pub fn cleanup_expired(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|_, session| now < session.expires_at);
        before - sessions.len()
    }

    /// Periodically drop expired sessions and the tokens they left behind
    pub fn spawn_cleanup(self: Arc<Self>, tokens: Arc<dyn TokenStore>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(tokio::time::Duration::from_secs(CLEANUP_INTERVAL_SECS)).await;

                let sessions = self.cleanup_expired();
                match tokens.prune_before(Utc::now() - self.ttl).await {
                    Ok(pruned) if sessions > 0 || pruned > 0 => {
                        tracing::debug!(sessions, pruned, "Expired sessions cleaned up");
                    }
                    Ok(_) => {}
                    Err(e) => tracing::warn!(error = %e, "Failed to prune expired tokens"),
                }
            }
        })
    }
}

/// Session id of the current request
#[derive(Clone, Debug)]
pub struct SessionId(pub String);

/// Attach a session to every request, issuing a cookie for new visitors
pub async fn session_middleware(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let existing = cookie_value(req.headers(), SESSION_COOKIE)
        .and_then(|id| state.sessions.get_session(id));

    let (session, issued) = match existing {
        Some(session) => (session, false),
        None => (state.sessions.create_session(), true),
    };
    let secure = state.is_secure(req.headers());
    req.extensions_mut().insert(SessionId(session.id.clone()));

    let mut response = next.run(req).await;

    if issued
        && let Ok(value) =
            HeaderValue::from_str(&set_session_cookie(&session.id, session.expires_at, secure))
    {
        response.headers_mut().append(header::SET_COOKIE, value);
    }
    response
}

/// Value of a request cookie
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .map(|cookie| cookie.trim())
        .find_map(|cookie| {
            let (key, value) = cookie.split_once('=')?;
            (key == name).then_some(value)
        })
}

/// Set a session cookie in the response with security flags
///
/// The `secure` parameter controls whether to set the Secure flag (requires HTTPS).
pub fn set_session_cookie(session_id: &str, expires_at: DateTime<Utc>, secure: bool) -> String {
    let secure_flag = if secure { " Secure;" } else { "" };
    format!(
        "{}={}; Path=/; Expires={}; HttpOnly;{} SameSite=Lax",
        SESSION_COOKIE,
        session_id,
        expires_at.to_rfc2822(),
        secure_flag
    )
}

/// Cookie pinning the browser to a library version for 30 days
pub fn set_version_cookie(version: &VersionTag, secure: bool) -> String {
    let secure_flag = if secure { " Secure;" } else { "" };
    format!(
        "{}={}; Path=/; Max-Age={}; HttpOnly;{} SameSite=Lax",
        VERSION_COOKIE, version, VERSION_COOKIE_MAX_AGE_SECS, secure_flag
    )
}
