//! Request-scoped state handed to handlers.
//!
//! # Responsibilities
//! - Carry the parsed query string, route variables and JSON body
//! - Own the request's context chain node
//! - Seed the response envelope (method, url, params echo, correlation
//!   token)
//!
//! # Design Decisions
//! - Built once by the dispatch pipeline after CORS and routing; handlers
//!   never touch the raw hyper request
//! - The params echo is the body for POST requests and the query map
//!   otherwise

use std::collections::HashMap;

use axum::http::Method;
use serde_json::{Map, Value};

use crate::context::Ctx;
use crate::error::ApiError;
use crate::http::envelope::EnvelopeSeed;

/// Everything a handler may read from the request, plus its context node.
pub struct RequestEnv {
    pub method: Method,
    /// Full request URL as received.
    pub url: String,
    pub path: String,
    pub query: HashMap<String, String>,
    /// Named captures and static extras from the matched route.
    pub vars: HashMap<String, String>,
    /// Parsed JSON body, present for requests that carried one.
    pub body: Option<Value>,
    pub ctx: Ctx,
}

impl RequestEnv {
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    pub fn var(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// The body as a JSON object, or a 400 naming what is missing.
    pub fn body_object(&self) -> Result<&Map<String, Value>, ApiError> {
        self.body
            .as_ref()
            .and_then(Value::as_object)
            .ok_or_else(|| ApiError::Malformed("expected a JSON object body".to_string()))
    }

    /// Client-supplied correlation token, echoed back in the envelope.
    pub fn correlation_token(&self) -> Option<Value> {
        if let Some(Value::Object(body)) = &self.body {
            if let Some(token) = body.get("context") {
                if !token.is_null() {
                    return Some(token.clone());
                }
            }
        }
        self.query
            .get("context")
            .map(|token| Value::String(token.clone()))
    }

    /// Legacy JSONP compatibility: callback name from the query string.
    ///
    /// Only plain identifiers (letters, digits, `_`, `.`) are honored; any
    /// other callback is ignored and the response stays plain JSON.
    pub fn jsonp_callback(&self) -> Option<&str> {
        let callback = self.query_param("callback")?;
        let valid = !callback.is_empty()
            && callback
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
        valid.then_some(callback)
    }

    pub fn envelope_seed(&self) -> EnvelopeSeed {
        let params = if let Some(body) = &self.body {
            Some(body.clone())
        } else if self.query.is_empty() {
            None
        } else {
            Some(Value::Object(
                self.query
                    .iter()
                    .map(|(name, value)| (name.clone(), Value::String(value.clone())))
                    .collect(),
            ))
        };
        EnvelopeSeed {
            method: self.method.to_string(),
            url: self.url.clone(),
            context: self.correlation_token(),
            params,
        }
    }
}

/// Parse a raw query string into a flat map (last value wins).
pub fn parse_query(raw: Option<&str>) -> HashMap<String, String> {
    let Some(raw) = raw else {
        return HashMap::new();
    };
    url::form_urlencoded::parse(raw.as_bytes())
        .map(|(name, value)| (name.into_owned(), value.into_owned()))
        .collect()
}

/// Language tags from an `Accept-Language` header, in header order, with
/// primary subtags appended as fallbacks.
pub fn languages_from_accept(header: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for part in header.split(',') {
        let tag = part.split(';').next().unwrap_or("").trim();
        if tag.is_empty() || tag == "*" {
            continue;
        }
        if !tags.iter().any(|existing| existing == tag) {
            tags.push(tag.to_string());
        }
        if let Some((primary, _)) = tag.split_once('-') {
            if !tags.iter().any(|existing| existing == primary) {
                tags.push(primary.to_string());
            }
        }
    }
    tags
}
