//! Tests for session

use crate::http::session::{
    SessionStore, cookie_value, set_session_cookie, set_version_cookie,
};
use crate::version::VersionTag;
use axum::http::{HeaderMap, HeaderValue, header};
use chrono::{Duration, Utc};

#[test]
fn test_create_session() {
    let store = SessionStore::new(Duration::hours(1));
    let session = store.create_session();

    assert!(!session.id.is_empty());
    assert!(session.expires_at > Utc::now());
    assert_eq!(store.len(), 1);
}

#[test]
fn test_sessions_have_distinct_ids() {
    let store = SessionStore::new(Duration::hours(1));
    let first = store.create_session();
    let second = store.create_session();

    assert_ne!(first.id, second.id);
}

#[test]
fn test_get_session() {
    let store = SessionStore::new(Duration::hours(1));
    let session = store.create_session();

    let retrieved = store.get_session(&session.id).unwrap();
    assert_eq!(retrieved.id, session.id);
    assert!(store.get_session("unknown").is_none());
}

#[test]
fn test_delete_session() {
    let store = SessionStore::new(Duration::hours(1));
    let session = store.create_session();

    store.delete_session(&session.id);
    assert!(store.get_session(&session.id).is_none());
    assert!(store.is_empty());
}

#[test]
fn test_expired_session_is_dropped() {
    let store = SessionStore::new(Duration::seconds(-1));
    let session = store.create_session();

    assert!(store.get_session(&session.id).is_none());
    assert!(store.is_empty());
}

#[test]
fn test_cleanup_expired() {
    let expired = SessionStore::new(Duration::seconds(-1));
    expired.create_session();
    expired.create_session();
    assert_eq!(expired.cleanup_expired(), 2);

    let live = SessionStore::new(Duration::hours(1));
    live.create_session();
    assert_eq!(live.cleanup_expired(), 0);
    assert_eq!(live.len(), 1);
}

#[test]
fn test_cookie_value() {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::COOKIE,
        HeaderValue::from_static("version=v0.3.0; console_session=abc"),
    );
    headers.append(header::COOKIE, HeaderValue::from_static("theme=dark"));

    assert_eq!(cookie_value(&headers, "console_session"), Some("abc"));
    assert_eq!(cookie_value(&headers, "version"), Some("v0.3.0"));
    assert_eq!(cookie_value(&headers, "theme"), Some("dark"));
    assert_eq!(cookie_value(&headers, "missing"), None);
}

#[test]
fn test_session_cookie_flags() {
    let expires = Utc::now() + Duration::hours(1);

    let cookie = set_session_cookie("abc", expires, false);
    assert!(cookie.starts_with("console_session=abc; Path=/;"));
    assert!(cookie.contains("HttpOnly;"));
    assert!(cookie.ends_with("SameSite=Lax"));
    assert!(!cookie.contains("Secure"));

    assert!(set_session_cookie("abc", expires, true).contains(" Secure;"));
}

#[test]
fn test_version_cookie() {
    let tag = VersionTag::parse("v0.3.0").unwrap();

    assert_eq!(
        set_version_cookie(&tag, false),
        "version=v0.3.0; Path=/; Max-Age=2592000; HttpOnly; SameSite=Lax"
    );
    assert_eq!(
        set_version_cookie(&tag, true),
        "version=v0.3.0; Path=/; Max-Age=2592000; HttpOnly; Secure; SameSite=Lax"
    );
}
