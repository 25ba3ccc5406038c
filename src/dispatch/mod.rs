//! Request dispatcher
//!
//! Forwards ad-hoc API calls through an authenticated provider connection
//! and classifies the response body. No retries, no timeouts of its own.

use crate::auth::AuthorizationFlow;
use crate::model::{ApiRequest, DetectedType, DispatchResult};
use crate::provider::ProviderConnection;
use crate::telemetry;
use crate::{ConsoleError, Result};
use quick_xml::Reader;
use quick_xml::events::Event;
use reqwest::Method;
use std::time::Instant;

/// Build a request from raw form input
///
/// The method is case-insensitive; the URL must be absolute http(s).
pub fn build_request(
    method: &str,
    url: &str,
    params: Vec<(String, String)>,
) -> Result<ApiRequest> {
    let method = method.trim().to_ascii_uppercase();
    let method = Method::from_bytes(method.as_bytes())
        .map_err(|_| ConsoleError::validation(format!("Invalid HTTP method '{}'", method)))?;

    let url = url.trim();
    let parsed = url::Url::parse(url)
        .map_err(|e| ConsoleError::validation(format!("Invalid URL '{}': {}", url, e)))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConsoleError::validation(format!(
            "Unsupported URL scheme '{}'",
            parsed.scheme()
        )));
    }

    Ok(ApiRequest::new(method, url).with_params(params))
}

/// Send `request` through `connection`
///
/// The provider must be authenticated in `flow`'s session. Non-success
/// responses become `UpstreamRequestFailed` carrying status and body.
pub async fn dispatch(
    flow: &AuthorizationFlow<'_>,
    connection: &ProviderConnection,
    request: &ApiRequest,
) -> Result<DispatchResult> {
    let provider = connection.name();
    let token = flow.access_token(provider).await?;

    tracing::debug!(provider, method = %request.method, url = %request.url, "Dispatching API call");

    let start = Instant::now();
    let response = match connection.send(&token, request).await {
        Ok(response) => response,
        Err(e) => {
            telemetry::record_dispatch(provider, "transport_error", start.elapsed().as_secs_f64());
            return Err(e);
        }
    };
    let elapsed = start.elapsed().as_secs_f64();

    if !response.is_success() {
        telemetry::record_dispatch(provider, "upstream_error", elapsed);
        tracing::debug!(provider, status = response.status, "Provider returned an error status");
        return Err(ConsoleError::UpstreamRequestFailed {
            message: format!("{} {} returned HTTP {}", request.method, request.url, response.status),
            status: Some(response.status),
            body: Some(response.body),
        });
    }

    telemetry::record_dispatch(provider, "ok", elapsed);
    let detected_type = detect_type(&response.body);

    Ok(DispatchResult {
        status: response.status,
        body: response.body,
        detected_type,
    })
}

/// Classify a body: JSON first, then XML, otherwise unknown
pub fn detect_type(body: &[u8]) -> DetectedType {
    if serde_json::from_slice::<serde::de::IgnoredAny>(body).is_ok() {
        DetectedType::Json
    } else if is_xml(body) {
        DetectedType::Xml
    } else {
        DetectedType::Unknown
    }
}

/// Well-formed document with exactly one root element
fn is_xml(body: &[u8]) -> bool {
    let mut reader = Reader::from_reader(body);
    let mut buf = Vec::new();
    let mut depth = 0usize;
    let mut seen_root = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(_)) => {
                if depth == 0 {
                    if seen_root {
                        return false;
                    }
                    seen_root = true;
                }
                depth += 1;
            }
            Ok(Event::End(_)) => {
                if depth == 0 {
                    return false;
                }
                depth -= 1;
            }
            Ok(Event::Empty(_)) => {
                if depth == 0 {
                    if seen_root {
                        return false;
                    }
                    seen_root = true;
                }
            }
            Ok(Event::Text(text)) => {
                if depth == 0 && !text.iter().all(|b| b.is_ascii_whitespace()) {
                    return false;
                }
            }
            Ok(Event::CData(_)) if depth == 0 => return false,
            Ok(Event::Eof) => return seen_root && depth == 0,
            Ok(_) => {}
            Err(_) => return false,
        }
        buf.clear();
    }
}
