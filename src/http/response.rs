//! Console page view models
//!
//! Turns dispatch results (and dispatch failures that carry a provider
//! response) into what the console page displays.

use crate::ConsoleError;
use crate::dispatch::detect_type;
use crate::model::{DetectedType, DispatchResult};
use serde::Serialize;

/// Response panel of the console page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    pub detected_type: DetectedType,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DispatchView {
    pub fn from_result(result: &DispatchResult) -> Self {
        Self {
            status: Some(result.status),
            detected_type: result.detected_type,
            body: render_body(&result.body, result.detected_type),
            error: None,
        }
    }

    /// Failed call; the provider's response body is shown when there is one
    pub fn from_error(err: &ConsoleError) -> Self {
        match err {
            ConsoleError::UpstreamRequestFailed {
                message,
                status,
                body: Some(body),
            } => {
                let detected_type = detect_type(body);
                Self {
                    status: *status,
                    detected_type,
                    body: render_body(body, detected_type),
                    error: Some(message.clone()),
                }
            }
            other => Self {
                status: None,
                detected_type: DetectedType::Unknown,
                body: String::new(),
                error: Some(other.to_string()),
            },
        }
    }
}

/// Body as text, pretty-printed when it is JSON
pub fn render_body(body: &[u8], detected_type: DetectedType) -> String {
    if detected_type == DetectedType::Json
        && let Ok(value) = serde_json::from_slice::<serde_json::Value>(body)
        && let Ok(pretty) = serde_json::to_string_pretty(&value)
    {
        return pretty;
    }
    String::from_utf8_lossy(body).into_owned()
}

/// Parse the `key=value` per line parameter field
///
/// Blank lines are skipped; a line without `=` is a key with an empty value.
pub fn parse_params(text: &str) -> Vec<(String, String)> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| match line.split_once('=') {
            Some((key, value)) => (key.trim().to_string(), value.trim().to_string()),
            None => (line.to_string(), String::new()),
        })
        .collect()
}
