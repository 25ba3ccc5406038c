use super::*;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_default_config() {
    let config = Config::default();
    assert_eq!(config.http.port, 8080);
    assert_eq!(config.http.public_base_url(), "http://127.0.0.1:8080");
    assert_eq!(config.versions.dir, "versions");
    assert_eq!(config.mirror.repository, "Lusitanian/PHPoAuthLib");
    assert_eq!(config.mirror.branch, "master");
    assert_eq!(config.auth.pending_ttl(), chrono::Duration::try_seconds(900));
    assert!(config.providers.is_empty());
    assert!(config.validate().is_ok());
}

#[test]
fn test_missing_file_yields_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::load_from_path(temp_dir.path().join("absent.json")).unwrap();
    assert_eq!(config.http.port, 8080);
}

#[test]
fn test_load_json() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("console.config.json");
    fs::write(
        &path,
        r#"{
            "http": { "port": 9000, "baseUrl": "https://console.example.com/" },
            "versions": { "dir": "/srv/versions" },
            "providers": [
                { "name": "Twitter", "clientId": "key", "clientSecret": "secret" },
                {
                    "name": "GitHub",
                    "clientId": "id",
                    "clientSecret": "$env:GITHUB_SECRET",
                    "scopes": ["user", "repo"]
                },
                {
                    "name": "Google",
                    "clientId": "id",
                    "clientSecret": "s",
                    "scopes": "src/OAuth/OAuth2/Service/Google.php"
                }
            ],
            "auth": { "pendingTtlSecs": 0 },
            "mirror": { "customVersions": ["c-214"], "schedule": "0 0 3 * * *" }
        }"#,
    )
    .unwrap();

    let config = Config::load_from_path(&path).unwrap();
    assert_eq!(config.http.port, 9000);
    assert_eq!(config.http.public_base_url(), "https://console.example.com");
    assert_eq!(config.versions.layout().root(), Path::new("/srv/versions"));
    assert_eq!(config.providers.len(), 3);
    assert_eq!(
        config.providers[1].scopes,
        Some(ScopeSource::List(vec!["user".into(), "repo".into()]))
    );
    assert!(matches!(config.providers[2].scopes, Some(ScopeSource::File(_))));
    assert_eq!(config.auth.pending_ttl(), None);
    assert_eq!(config.mirror.custom_versions, vec!["c-214"]);
}

#[test]
fn test_load_yaml() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("console.config.yaml");
    fs::write(
        &path,
        "http:\n  port: 9001\nproviders:\n  - name: Internal\n    clientId: id\n    clientSecret: s\n    endpoints:\n      protocol: oauth2\n      authorizationUrl: https://sso.example.com/authorize\n      accessTokenUrl: https://sso.example.com/token\nlog:\n  level: debug\n",
    )
    .unwrap();

    let config = Config::load_from_path(&path).unwrap();
    assert_eq!(config.http.port, 9001);
    let endpoints = config.providers[0].endpoints.as_ref().unwrap();
    assert_eq!(endpoints.protocol, ProtocolVersion::OAuth2);
    assert_eq!(config.log_filter().as_deref(), Some("oauth_console=debug"));
}

#[test]
fn test_invalid_json_is_config_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("console.config.json");
    fs::write(&path, "{ not json").unwrap();

    assert!(matches!(
        Config::load_from_path(&path),
        Err(ConsoleError::Config(_))
    ));
}

#[test]
fn test_config_validation() {
    let provider = |name: &str| ProviderConfig {
        name: name.to_string(),
        client_id: "id".to_string(),
        client_secret: "secret".to_string(),
        scopes: None,
        service: None,
        endpoints: None,
    };

    let mut config = Config::default();
    config.providers = vec![provider("GitHub"), provider("github ")];
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.providers = vec![provider("")];
    assert!(config.validate().is_err());

    let mut config = Config::default();
    let mut oauth1 = provider("Legacy");
    oauth1.endpoints = Some(ProviderEndpoints {
        protocol: ProtocolVersion::OAuth1,
        request_token_url: None,
        authorization_url: "https://legacy.example.com/authorize".into(),
        access_token_url: "https://legacy.example.com/access".into(),
        authorization_params: vec![],
    });
    config.providers = vec![oauth1];
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.mirror.branch = "c-1".to_string();
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.mirror.custom_versions = vec!["v1.0.0".to_string()];
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.mirror.schedule = Some("whenever".to_string());
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.http.base_url = Some("ftp://example.com".to_string());
    assert!(config.validate().is_err());
}

#[test]
fn test_provider_credentials_expand_env() {
    unsafe {
        std::env::set_var("CONSOLE_TEST_CLIENT_SECRET", "from-env");
    }
    let provider = ProviderConfig {
        name: "GitHub".to_string(),
        client_id: "plain-id".to_string(),
        client_secret: "$env:CONSOLE_TEST_CLIENT_SECRET".to_string(),
        scopes: None,
        service: None,
        endpoints: None,
    };
    assert_eq!(provider.client_id(), "plain-id");
    assert_eq!(provider.client_secret(), "from-env");
}
