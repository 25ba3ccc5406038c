//! Integration tests for the OAuth console
//!
//! Mirror a library version from a fake source host, then drive a real OAuth2
//! handshake and an API call through the console against fake provider
//! endpoints.

use oauth_console::auth::CallbackParams;
use oauth_console::config::Config;
use oauth_console::console::Console;
use oauth_console::mirror::{JobScope, Mirror, MirrorJobRecord};
use oauth_console::testing::zip_archive;
use oauth_console::auth::AuthOutcome;
use oauth_console::{ConsoleError, DetectedType};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SESSION: &str = "integration-session";

fn write_config(dir: &TempDir, server: &MockServer) -> std::path::PathBuf {
    let yaml = format!(
        r#"
http:
  baseUrl: http://localhost:8080
versions:
  dir: {versions}
providers:
  - name: Internal
    clientId: internal-id
    clientSecret: $env:INTEGRATION_INTERNAL_SECRET
    scopes: [profile, email]
    endpoints:
      protocol: oauth2
      authorizationUrl: {uri}/oauth/authorize
      accessTokenUrl: {uri}/oauth/token
mirror:
  apiUrl: {uri}
  repository: owner/lib
  archivePrefix: owner-lib-
log:
  level: debug
"#,
        versions = dir.path().join("versions").display(),
        uri = server.uri(),
    );
    let config_path = dir.path().join("console.config.yaml");
    std::fs::write(&config_path, yaml).unwrap();
    config_path
}

async fn mount_source_host(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/repos/owner/lib/tags"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "name": "v1.0.0",
                "zipball_url": format!("{}/repos/owner/lib/zipball/v1.0.0", server.uri()),
            },
            {
                "name": "nightly",
                "zipball_url": format!("{}/repos/owner/lib/zipball/nightly", server.uri()),
            }
        ])))
        .mount(server)
        .await;

    for name in ["v1.0.0", "master"] {
        let archive = zip_archive(
            &format!("owner-lib-{}", name),
            &[("README.md", name.as_bytes())],
        )
        .unwrap();
        Mock::given(method("GET"))
            .and(path(format!("/repos/owner/lib/zipball/{}", name)))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(archive))
            .mount(server)
            .await;
    }
}

async fn mount_provider(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_string_contains("code=integration-code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "integration-token",
            "token_type": "bearer",
        })))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/me"))
        .and(header("authorization", "Bearer integration-token"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/json")
                .set_body_string(r#"{"login":"console"}"#),
        )
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/forbidden"))
        .respond_with(ResponseTemplate::new(403).set_body_string("<error>forbidden</error>"))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_mirror_then_authorize_and_dispatch() {
    unsafe {
        std::env::set_var("INTEGRATION_INTERNAL_SECRET", "integration-secret");
    }
    let server = MockServer::start().await;
    mount_source_host(&server).await;
    mount_provider(&server).await;

    let dir = TempDir::new().unwrap();
    let config = Config::load_from_path(write_config(&dir, &server)).unwrap();

    // Mirror
    let mirror = Mirror::from_config(&config).unwrap();
    let report = mirror.run_job(JobScope::All).await.unwrap();
    assert!(report.is_success(), "{}", report);
    assert_eq!(report.installed.len(), 2);

    let record = MirrorJobRecord::load(&mirror.layout().record_path())
        .await
        .unwrap();
    assert!(record.versions.contains_key("v1.0.0"));
    assert!(record.versions.contains_key("master"));
    assert!(record.last_run.is_some());

    // Console
    let console = Console::from_config(&config).unwrap();
    let version = console.resolve_version(None, None).unwrap();
    assert_eq!(version.as_str(), "v1.0.0");
    let opened = console.open(&version).unwrap();

    let outcome = opened
        .authorize(SESSION, "internal", &CallbackParams::default())
        .await
        .unwrap();
    let AuthOutcome::Redirect(redirect) = outcome else {
        panic!("expected a redirect to the provider");
    };
    let redirect = url::Url::parse(&redirect).unwrap();
    let query: std::collections::HashMap<String, String> =
        redirect.query_pairs().into_owned().collect();
    assert_eq!(query["client_id"], "internal-id");
    assert_eq!(query["scope"], "profile email");
    assert_eq!(
        query["redirect_uri"],
        "http://localhost:8080/v1.0.0/internal/authorize"
    );

    let callback = CallbackParams {
        code: Some("integration-code".to_string()),
        state: Some(query["state"].clone()),
        ..Default::default()
    };
    let outcome = opened.authorize(SESSION, "Internal", &callback).await.unwrap();
    assert_eq!(outcome, AuthOutcome::Authenticated);

    let result = opened
        .dispatch(
            SESSION,
            "internal",
            "get",
            &format!("{}/api/me", server.uri()),
            vec![],
        )
        .await
        .unwrap();
    assert_eq!(result.status, 200);
    assert_eq!(result.detected_type, DetectedType::Json);
    assert_eq!(&result.body[..], br#"{"login":"console"}"#);

    let err = opened
        .dispatch(
            SESSION,
            "internal",
            "GET",
            &format!("{}/api/forbidden", server.uri()),
            vec![],
        )
        .await
        .unwrap_err();
    match err {
        ConsoleError::UpstreamRequestFailed { status, body, .. } => {
            assert_eq!(status, Some(403));
            assert_eq!(body.as_deref(), Some(&b"<error>forbidden</error>"[..]));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_rerun_is_a_noop_for_releases() {
    let server = MockServer::start().await;
    mount_source_host(&server).await;

    let dir = TempDir::new().unwrap();
    let config = Config::load_from_path(write_config(&dir, &server)).unwrap();
    let mirror = Mirror::from_config(&config).unwrap();

    let first = mirror.run_job(JobScope::ReleasesOnly).await.unwrap();
    assert_eq!(first.installed.len(), 1);

    let second = mirror.run_job(JobScope::ReleasesOnly).await.unwrap();
    assert!(second.installed.is_empty());
    assert_eq!(second.skipped.len(), 1);

    let installed = mirror.layout().installed().unwrap();
    assert_eq!(installed.len(), 1);
    assert_eq!(installed[0].as_str(), "v1.0.0");
}

#[tokio::test]
async fn test_console_without_versions_reports_unavailable() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = Config::load_from_path(write_config(&dir, &server)).unwrap();

    let console = Console::from_config(&config).unwrap();
    assert!(matches!(
        console.resolve_version(None, None),
        Err(ConsoleError::NoVersionsAvailable)
    ));
}
