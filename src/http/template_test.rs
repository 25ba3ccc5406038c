//! Tests for template

use crate::http::template::TemplateRenderer;
use serde_json::json;

fn provider_context(body: &str) -> serde_json::Value {
    json!({
        "version": "v0.3.0",
        "provider": {
            "name": "github",
            "display_name": "GitHub",
            "protocol": "OAuth2",
            "scopes": ["user", "repo"],
        },
        "form": { "method": "GET", "url": "", "params": "" },
        "result": { "status": 200, "detected_type": "json", "body": body },
    })
}

#[test]
fn test_overview_renders_providers() {
    let renderer = TemplateRenderer::new().unwrap();
    let html = renderer
        .render(
            "overview.html",
            json!({
                "version": "v0.3.0",
                "versions": ["v0.2.0", "v0.3.0"],
                "providers": [{
                    "name": "github",
                    "display_name": "GitHub",
                    "protocol": "OAuth2",
                    "state": "unauthenticated",
                    "authenticated": false,
                    "scopes": [],
                }],
            }),
        )
        .unwrap();

    assert!(html.contains("GitHub"));
    assert!(html.contains("/v0.3.0/github/authorize"));
    assert!(html.contains("/v0.3.0/clearAllTokens"));
    assert!(html.contains(r#"<a href="/v0.2.0">"#));
}

#[test]
fn test_provider_page_renders_result() {
    let renderer = TemplateRenderer::new().unwrap();
    let html = renderer
        .render("provider.html", provider_context("plain"))
        .unwrap();

    assert!(html.contains("HTTP 200"));
    assert!(html.contains("user, repo"));
    assert!(html.contains(r#"action="/v0.3.0/github""#));
}

#[test]
fn test_provider_body_is_escaped() {
    let renderer = TemplateRenderer::new().unwrap();
    let html = renderer
        .render("provider.html", provider_context("<script>alert(1)</script>"))
        .unwrap();

    assert!(!html.contains("<script>alert(1)</script>"));
    assert!(html.contains("&lt;script&gt;"));
}

#[test]
fn test_unknown_template() {
    let renderer = TemplateRenderer::new().unwrap();
    assert!(renderer.render("missing.html", json!({})).is_err());
}
