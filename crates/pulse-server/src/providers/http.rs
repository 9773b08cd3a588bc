//! Response handling shared by the HTTP-backed providers.

use std::time::Duration;

use pulse_core::{PulseError, PulseResult};
use reqwest::{Client, Response};
use serde_json::Value;

pub(crate) fn build_client(timeout: Duration) -> reqwest::Result<Client> {
    Client::builder().timeout(timeout).build()
}

/// Classify a transport-level failure.
pub(crate) fn transport_error(provider: &str, timeout: Duration, err: reqwest::Error) -> PulseError {
    if err.is_timeout() {
        tracing::warn!(provider = %provider, timeout_ms = %timeout.as_millis(), "Provider request timed out");
        PulseError::ProviderTimeout {
            provider: provider.to_string(),
            after_ms: timeout.as_millis() as u64,
        }
    } else {
        tracing::error!(provider = %provider, error = %err, "Provider request failed");
        PulseError::unavailable(provider, format!("request failed: {}", err))
    }
}

/// Check the status and parse the body as JSON.
pub(crate) async fn read_json(provider: &str, timeout: Duration, response: Response) -> PulseResult<Value> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| transport_error(provider, timeout, e))?;

    if !status.is_success() {
        tracing::error!(
            provider = %provider,
            status = %status,
            body = %truncate(&body, 200),
            "Provider API error"
        );
        return Err(PulseError::unavailable(
            provider,
            format!("HTTP {}: {}", status, truncate(&body, 200)),
        ));
    }

    serde_json::from_str(&body).map_err(|e| {
        tracing::error!(provider = %provider, error = %e, "Failed to parse provider response");
        PulseError::malformed(provider, format!("invalid JSON: {}", e))
    })
}

/// Extract a record list from either a bare array or `{"<key>": [...]}`.
///
/// A `null` or absent list is an empty result; any other shape is malformed.
pub(crate) fn record_list(provider: &str, body: Value, key: &str) -> PulseResult<Vec<Value>> {
    match body {
        Value::Array(items) => Ok(items),
        Value::Object(mut obj) => match obj.remove(key) {
            Some(Value::Array(items)) => Ok(items),
            Some(Value::Null) | None => Ok(Vec::new()),
            Some(other) => Err(PulseError::malformed(
                provider,
                format!("\"{}\" is {} instead of an array", key, json_type(&other)),
            )),
        },
        other => Err(PulseError::malformed(
            provider,
            format!("expected an object or array, got {}", json_type(&other)),
        )),
    }
}

pub(crate) fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
