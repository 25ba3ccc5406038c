use super::*;

#[test]
fn test_authorization_state_default_is_unauthenticated() {
    let state = AuthorizationState::default();
    assert_eq!(state, AuthorizationState::Unauthenticated);
    assert!(!state.is_authenticated());
    assert!(!state.is_pending());
}

#[test]
fn test_authorization_state_serialization() {
    let state = AuthorizationState::PendingAuthorization2 {
        csrf_state: "abc".to_string(),
    };
    let json = serde_json::to_value(&state).unwrap();
    assert_eq!(json["state"], "pending_authorization2");
    assert_eq!(json["csrf_state"], "abc");

    let parsed: AuthorizationState = serde_json::from_value(json).unwrap();
    assert_eq!(parsed, state);
    assert_eq!(parsed.label(), "pending");
}

#[test]
fn test_protocol_version_deserialize() {
    let v: ProtocolVersion = serde_json::from_str("\"oauth1\"").unwrap();
    assert_eq!(v, ProtocolVersion::OAuth1);
    let v: ProtocolVersion = serde_json::from_str("\"oauth1a\"").unwrap();
    assert_eq!(v, ProtocolVersion::OAuth1);
    let v: ProtocolVersion = serde_json::from_str("\"oauth2\"").unwrap();
    assert_eq!(v, ProtocolVersion::OAuth2);
}

#[test]
fn test_params_in_query() {
    assert!(ApiRequest::new(Method::GET, "https://x").params_in_query());
    assert!(!ApiRequest::new(Method::POST, "https://x").params_in_query());
}

#[test]
fn test_descriptor_never_serializes_secret() {
    let descriptor = ProviderDescriptor {
        name: "github".to_string(),
        display_name: "GitHub".to_string(),
        client_id: "id".to_string(),
        client_secret: "very-secret".to_string(),
        protocol_version: ProtocolVersion::OAuth2,
        scopes: vec![],
        endpoints: ProviderEndpoints {
            protocol: ProtocolVersion::OAuth2,
            request_token_url: None,
            authorization_url: "https://github.com/login/oauth/authorize".to_string(),
            access_token_url: "https://github.com/login/oauth/access_token".to_string(),
            authorization_params: vec![],
        },
    };
    let json = serde_json::to_string(&descriptor).unwrap();
    assert!(!json.contains("very-secret"));
}
