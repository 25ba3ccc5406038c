use super::*;
use crate::model::DetectedType;
use crate::registry::ScopeSource;
use crate::testing::{ScriptedFactory, VersionFixture};

const SESSION: &str = "session-1";

fn provider(name: &str) -> ProviderConfig {
    ProviderConfig {
        name: name.to_string(),
        client_id: format!("{}-id", name),
        client_secret: format!("{}-secret", name),
        scopes: None,
        service: None,
        endpoints: None,
    }
}

fn config(fixture: &VersionFixture, providers: Vec<ProviderConfig>) -> Config {
    let mut config = Config::default();
    config.versions.dir = fixture.root().to_string_lossy().into_owned();
    config.http.base_url = Some("https://console.example.com".to_string());
    config.providers = providers;
    config
}

fn console(fixture: &VersionFixture, factory: &ScriptedFactory) -> Console {
    let config = config(fixture, vec![provider("Twitter"), provider("GitHub")]);
    Console::new(
        &config,
        Arc::new(factory.clone()),
        Arc::new(MemoryTokenStore::new()),
    )
    .unwrap()
}

#[test]
fn test_resolve_version_prefers_most_recent_release() {
    let fixture = VersionFixture::with_versions(&["v0.2.0", "v0.3.0", "master", "c-214"]).unwrap();
    let console = console(&fixture, &ScriptedFactory::new());

    assert_eq!(console.resolve_version(None, None).unwrap().as_str(), "v0.3.0");
    assert_eq!(
        console.resolve_version(Some("favicon.ico"), Some("v0.2.0")).unwrap().as_str(),
        "v0.2.0"
    );
    assert_eq!(
        console.resolve_version(Some("v9.9.9"), None).unwrap().as_str(),
        "v9.9.9"
    );
}

#[test]
fn test_resolve_version_without_installs() {
    let fixture = VersionFixture::new().unwrap();
    let console = console(&fixture, &ScriptedFactory::new());

    assert!(matches!(
        console.resolve_version(None, None),
        Err(ConsoleError::NoVersionsAvailable)
    ));
}

#[test]
fn test_open_requires_installed_version() {
    let fixture = VersionFixture::with_versions(&["v0.3.0"]).unwrap();
    let console = console(&fixture, &ScriptedFactory::new());

    let missing = VersionTag::parse("v9.9.9").unwrap();
    assert!(matches!(
        console.open(&missing),
        Err(ConsoleError::VersionNotInstalled(_))
    ));

    let opened = console.open(&VersionTag::parse("v0.3.0").unwrap()).unwrap();
    assert_eq!(opened.registry().names(), vec!["twitter", "github"]);
    assert_eq!(
        opened.registry().redirect_uri("github"),
        "https://console.example.com/v0.3.0/github/authorize"
    );
}

#[test]
fn test_unknown_service_is_rejected() {
    let fixture = VersionFixture::new().unwrap();
    let config = config(&fixture, vec![provider("MySpace")]);

    assert!(matches!(
        Console::new(
            &config,
            Arc::new(ScriptedFactory::new()),
            Arc::new(MemoryTokenStore::new())
        ),
        Err(ConsoleError::UnsupportedService(_))
    ));
}

#[test]
fn test_service_alias_uses_catalog_endpoints() {
    let fixture = VersionFixture::with_versions(&["v0.3.0"]).unwrap();
    let mut enterprise = provider("GitHubEnterprise");
    enterprise.service = Some("github".to_string());
    let config = config(&fixture, vec![enterprise]);

    let console = Console::new(
        &config,
        Arc::new(ScriptedFactory::new()),
        Arc::new(MemoryTokenStore::new()),
    )
    .unwrap();
    let opened = console.open(&VersionTag::parse("v0.3.0").unwrap()).unwrap();
    let descriptor = opened.registry().descriptor("githubenterprise").unwrap();
    assert_eq!(descriptor.protocol_version, ProtocolVersion::OAuth2);
    assert_eq!(descriptor.display_name, "GitHubEnterprise");
}

#[test]
fn test_scopes_introspected_per_version() {
    let fixture = VersionFixture::with_versions(&["v0.3.0"]).unwrap();
    fixture
        .install(
            "v0.3.0",
            &[(
                "src/OAuth/OAuth2/Service/GitHub.php",
                b"<?php\nclass GitHub {\n    const SCOPE_USER = 'user';\n    const SCOPE_REPO = \"repo\";\n}\n",
            )],
        )
        .unwrap();
    let mut github = provider("GitHub");
    github.scopes = Some(ScopeSource::File("src/OAuth/OAuth2/Service/GitHub.php".into()));
    let config = config(&fixture, vec![github]);

    let console = Console::new(
        &config,
        Arc::new(ScriptedFactory::new()),
        Arc::new(MemoryTokenStore::new()),
    )
    .unwrap();
    let opened = console.open(&VersionTag::parse("v0.3.0").unwrap()).unwrap();
    assert_eq!(
        opened.registry().descriptor("GitHub").unwrap().scopes,
        vec!["user", "repo"]
    );
}

#[tokio::test]
async fn test_overview_reports_state_in_order() {
    let fixture = VersionFixture::with_versions(&["v0.3.0"]).unwrap();
    let factory = ScriptedFactory::new();
    let console = console(&fixture, &factory);
    let opened = console.open(&VersionTag::parse("v0.3.0").unwrap()).unwrap();

    opened
        .authorize(SESSION, "twitter", &CallbackParams::default())
        .await
        .unwrap();

    let overview = opened.overview(SESSION).await.unwrap();
    assert_eq!(overview.len(), 2);
    assert_eq!(overview[0].name, "twitter");
    assert_eq!(overview[0].state, "pending");
    assert_eq!(overview[1].display_name, "GitHub");
    assert_eq!(overview[1].state, "unauthenticated");
}

#[tokio::test]
async fn test_dispatch_end_to_end() {
    let fixture = VersionFixture::with_versions(&["v0.3.0"]).unwrap();
    let factory = ScriptedFactory::new();
    factory.respond_with(200, Some("application/json"), br#"{"id":42}"#);
    let console = console(&fixture, &factory);
    let opened = console.open(&VersionTag::parse("v0.3.0").unwrap()).unwrap();

    let outcome = opened
        .authorize(SESSION, "Twitter", &CallbackParams::default())
        .await
        .unwrap();
    assert!(matches!(outcome, AuthOutcome::Redirect(_)));

    let callback = CallbackParams {
        oauth_token: Some("request-token".to_string()),
        oauth_verifier: Some("verifier".to_string()),
        ..Default::default()
    };
    let outcome = opened.authorize(SESSION, "TWITTER", &callback).await.unwrap();
    assert_eq!(outcome, AuthOutcome::Authenticated);

    let result = opened
        .dispatch(
            SESSION,
            "Twitter",
            "GET",
            "https://api.twitter.com/1.1/account/verify_credentials.json",
            vec![],
        )
        .await
        .unwrap();
    assert_eq!(result.detected_type, DetectedType::Json);
    assert_eq!(&result.body[..], br#"{"id":42}"#);
}

#[tokio::test]
async fn test_clear_all_tokens_requires_reauthorization() {
    let fixture = VersionFixture::with_versions(&["v0.3.0"]).unwrap();
    let factory = ScriptedFactory::new();
    let console = console(&fixture, &factory);
    let opened = console.open(&VersionTag::parse("v0.3.0").unwrap()).unwrap();

    for session in ["a", "b"] {
        opened
            .authorize(session, "twitter", &CallbackParams::default())
            .await
            .unwrap();
        let callback = CallbackParams {
            oauth_token: Some("request-token".to_string()),
            oauth_verifier: Some("verifier".to_string()),
            ..Default::default()
        };
        opened.authorize(session, "twitter", &callback).await.unwrap();
    }

    assert_eq!(opened.clear_all_tokens().await.unwrap(), 2);

    for session in ["a", "b"] {
        let err = opened
            .dispatch(session, "twitter", "GET", "https://api.twitter.com/1.1/x.json", vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, ConsoleError::NotAuthenticated { .. }));
    }
}

#[tokio::test]
async fn test_unknown_provider_is_not_found() {
    let fixture = VersionFixture::with_versions(&["v0.3.0"]).unwrap();
    let console = console(&fixture, &ScriptedFactory::new());
    let opened = console.open(&VersionTag::parse("v0.3.0").unwrap()).unwrap();

    assert!(!opened.has_provider("dropbox"));
    assert!(matches!(
        opened.provider_state(SESSION, "dropbox").await,
        Err(ConsoleError::ProviderNotFound(_))
    ));
}
