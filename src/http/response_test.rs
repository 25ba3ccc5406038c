//! Tests for response

use crate::ConsoleError;
use crate::http::response::{DispatchView, parse_params, render_body};
use crate::model::DetectedType;
use bytes::Bytes;

#[test]
fn test_parse_params() {
    let params = parse_params("count=5\n\n  screen_name = console \nflag\nq=a=b\r\n");

    assert_eq!(
        params,
        vec![
            ("count".to_string(), "5".to_string()),
            ("screen_name".to_string(), "console".to_string()),
            ("flag".to_string(), String::new()),
            ("q".to_string(), "a=b".to_string()),
        ]
    );
    assert!(parse_params("").is_empty());
}

#[test]
fn test_render_body_pretty_prints_json() {
    let rendered = render_body(br#"{"id":42}"#, DetectedType::Json);
    assert_eq!(rendered, "{\n  \"id\": 42\n}");

    let xml = "<user><id>42</id></user>";
    assert_eq!(render_body(xml.as_bytes(), DetectedType::Xml), xml);
}

#[test]
fn test_from_error_shows_provider_body() {
    let err = ConsoleError::UpstreamRequestFailed {
        message: "GET https://api.example.com/x returned HTTP 401".to_string(),
        status: Some(401),
        body: Some(Bytes::from_static(br#"{"error":"expired"}"#)),
    };

    let view = DispatchView::from_error(&err);
    assert_eq!(view.status, Some(401));
    assert_eq!(view.detected_type, DetectedType::Json);
    assert!(view.body.contains("expired"));
    assert!(view.error.unwrap().contains("HTTP 401"));
}

#[test]
fn test_from_error_without_body() {
    let view = DispatchView::from_error(&ConsoleError::validation("Invalid HTTP method 'FETCH'"));

    assert_eq!(view.status, None);
    assert_eq!(view.detected_type, DetectedType::Unknown);
    assert!(view.body.is_empty());
    assert!(view.error.unwrap().contains("FETCH"));
}
