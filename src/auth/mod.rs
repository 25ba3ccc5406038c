//! Authorization handshake
//!
//! Drives each (session, provider) pair through
//! `Unauthenticated → Pending → Authenticated`:
//! - **OAuth1**: request token stored as `PendingAuthorization`, validated
//!   against the callback's `oauth_token`, exchanged with the verifier
//! - **OAuth2**: CSRF state stored as `PendingAuthorization2`, compared with
//!   the callback's `state`, code exchanged for a token
//!
//! Failures are reported, never retried. A failed exchange resets the
//! provider to `Unauthenticated`; a CSRF mismatch leaves the pending state
//! untouched.

pub mod callback;
pub mod flow;

pub use callback::{CallbackKind, CallbackParams};
pub use flow::{AuthOutcome, AuthorizationFlow};
