//! Response envelope builder.
//!
//! # Responsibilities
//! - Assemble the uniform top-level JSON wrapper for every endpoint
//! - Strip null/empty values from success payloads, recursively
//! - Derive the HTTP status from the error object or the explicit override
//! - Handle the legacy JSONP compatibility path
//!
//! # Design Decisions
//! - Keys are emitted in lexicographic order: `serde_json`'s default map is
//!   a BTreeMap, so ordering is deterministic without extra work
//! - Empty-stripping is idempotent and applies to success payloads only;
//!   an error object's required fields are never stripped
//! - JSONP switches the content type to a script MIME type but must not
//!   affect status-code logic

use axum::body::Body;
use axum::http::{header, HeaderName, HeaderValue, StatusCode};
use axum::response::Response;
use serde_json::{Map, Value};

use crate::context::translator::Translator;
use crate::error::ApiError;

/// Envelope schema version, distinct from the deployed package revision.
pub const API_VERSION: u64 = 1;

/// Response header carrying the deployed revision.
pub const X_API_VERSION: &str = "x-api-version";

/// Per-request inputs echoed into every envelope.
pub struct EnvelopeSeed {
    pub method: String,
    pub url: String,
    /// Client-supplied correlation token.
    pub context: Option<Value>,
    /// Echo of the request input (body or query map).
    pub params: Option<Value>,
}

/// Build the complete HTTP response for a handler outcome.
pub fn respond(
    translator: &Translator,
    debug: bool,
    seed: EnvelopeSeed,
    outcome: Result<Value, ApiError>,
    code: Option<StatusCode>,
    jsonp: Option<&str>,
    extra_headers: &[(HeaderName, HeaderValue)],
) -> Response {
    let mut envelope = Map::new();
    envelope.insert("apiVersion".to_string(), Value::from(API_VERSION));
    if let Some(context) = seed.context {
        envelope.insert("context".to_string(), context);
    }
    envelope.insert("method".to_string(), Value::String(seed.method));
    envelope.insert("url".to_string(), Value::String(seed.url));
    if let Some(params) = seed.params {
        envelope.insert("params".to_string(), params);
    }

    let status = match outcome {
        Ok(payload) => {
            if let Value::Object(entries) = payload {
                for (key, value) in entries {
                    envelope.insert(key, value);
                }
            } else {
                envelope.insert("value".to_string(), payload);
            }
            envelope = match strip_empty(Value::Object(envelope)) {
                Some(Value::Object(stripped)) => stripped,
                _ => Map::new(),
            };
            code.unwrap_or(StatusCode::OK)
        }
        Err(error) => {
            // The envelope echo is stripped, the error object is not: its
            // required fields must survive even when empty-equivalent.
            envelope = match strip_empty(Value::Object(envelope)) {
                Some(Value::Object(stripped)) => stripped,
                _ => Map::new(),
            };
            envelope.insert("error".to_string(), error.body(translator, debug));
            code.unwrap_or_else(|| error.status())
        }
    };

    let text = Value::Object(envelope).to_string();
    let (body, content_type) = match jsonp {
        Some(callback) => (
            format!("{callback}({text})"),
            HeaderValue::from_static("application/javascript; charset=utf-8"),
        ),
        None => (text, HeaderValue::from_static("application/json; charset=utf-8")),
    };

    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, content_type);
    headers.insert(
        HeaderName::from_static(X_API_VERSION),
        HeaderValue::from_static(env!("CARGO_PKG_VERSION")),
    );
    for (name, value) in extra_headers {
        headers.insert(name.clone(), value.clone());
    }
    response
}

/// Recursively drop null values, empty arrays and empty objects.
///
/// Returns `None` when the value itself is empty-equivalent. Applying the
/// function twice is equivalent to applying it once.
pub fn strip_empty(value: Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::Array(items) => {
            let stripped: Vec<Value> = items.into_iter().filter_map(strip_empty).collect();
            if stripped.is_empty() {
                None
            } else {
                Some(Value::Array(stripped))
            }
        }
        Value::Object(entries) => {
            let stripped: Map<String, Value> = entries
                .into_iter()
                .filter_map(|(key, value)| strip_empty(value).map(|value| (key, value)))
                .collect();
            if stripped.is_empty() {
                None
            } else {
                Some(Value::Object(stripped))
            }
        }
        other => Some(other),
    }
}
