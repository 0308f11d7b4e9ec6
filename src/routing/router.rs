//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Store the compiled rule table
//! - Guard against malformed paths before any matching
//! - Find the first structural match and enforce its method set
//! - Extract named captures and static extras into the variable bag
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) scan in declaration order (acceptable for typical route counts)
//! - First structural match is authoritative: a method mismatch on it
//!   returns 405 naming that rule's methods, with no fallthrough to later
//!   rules sharing the path
//! - The matched prefix is consumed so nested dispatch sees the remainder

use std::collections::HashMap;

use axum::http::Method;

use crate::error::ApiError;
use crate::routing::rules::RouteRule;

/// Immutable ordered rule table.
pub struct Router {
    rules: Vec<RouteRule>,
}

/// A successful dispatch: the rule plus its per-request variable bag.
#[derive(Debug)]
pub struct RouteMatch<'r> {
    pub rule: &'r RouteRule,
    /// Named captures merged with the rule's static extras.
    pub vars: HashMap<String, String>,
    /// Path remainder after the matched prefix, for nested dispatch.
    pub remainder: String,
}

impl Router {
    pub fn new(rules: Vec<RouteRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[RouteRule] {
        &self.rules
    }

    /// Match a request against the rule table.
    ///
    /// A path without a leading slash is rejected outright: it is the
    /// signature of a malformed proxy-rewritten URL (e.g. a doubled
    /// scheme), not something worth sanitizing.
    pub fn dispatch(&self, method: &Method, path: &str) -> Result<RouteMatch<'_>, ApiError> {
        if !path.starts_with('/') {
            return Err(ApiError::Malformed(format!(
                "invalid path {path:?}: expected a path starting with \"/\""
            )));
        }

        for rule in &self.rules {
            let Some(captures) = rule.pattern.captures(path) else {
                continue;
            };

            if let Some(allowed) = &rule.methods {
                if !allowed.contains(method) {
                    return Err(ApiError::MethodNotAllowed {
                        allowed: allowed.clone(),
                    });
                }
            }

            let mut vars = HashMap::new();
            for name in rule.pattern.capture_names().flatten() {
                if let Some(value) = captures.name(name) {
                    vars.insert(name.to_string(), value.as_str().to_string());
                }
            }
            for (name, value) in &rule.extra_vars {
                vars.entry((*name).to_string())
                    .or_insert_with(|| (*value).to_string());
            }

            let consumed = captures.get(0).map_or(0, |whole| whole.end());
            return Ok(RouteMatch {
                rule,
                vars,
                remainder: path[consumed..].to_string(),
            });
        }

        Err(ApiError::NotFound(format!("path not found: {path}")))
    }
}
