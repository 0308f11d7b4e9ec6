//! API error taxonomy.
//!
//! # Responsibilities
//! - One variant per failure class the facade can produce
//! - Map each variant to its HTTP status code
//! - Render the `error` object of the response envelope
//!
//! # Design Decisions
//! - Handler failures are data, not exceptions: handlers return
//!   `Result<_, ApiError>` and every variant flows through the same
//!   envelope builder
//! - Validation errors carry a nested structure mirroring the offending
//!   input's shape (field name -> message, recursively)
//! - Internal errors hide their detail from clients unless debug mode is on

use axum::http::{Method, StatusCode};
use serde_json::{json, Value};
use thiserror::Error;

use crate::context::translator::Translator;

/// Everything a handler or the dispatch layer can fail with.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad content type, unparsable JSON body, non-leading-slash path.
    #[error("{0}")]
    Malformed(String),

    /// Structured field-level constraint violations.
    #[error("validation failed")]
    Validation {
        /// Optional top-level message; defaults to the localized status title.
        message: Option<String>,
        /// Nested structure mirroring the input's shape.
        errors: Value,
    },

    /// Unknown route or resource.
    #[error("{0}")]
    NotFound(String),

    /// Structural route match with a disallowed method.
    #[error("method not allowed")]
    MethodNotAllowed {
        /// Methods permitted by the matched rule.
        allowed: Vec<Method>,
    },

    /// Syntactically valid but semantically inapplicable request.
    #[error("{0}")]
    Unprocessable(String),

    /// Load-average admission control tripped.
    #[error("service overloaded")]
    Overloaded,

    /// Unexpected failure from a handler or the computation engine.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// HTTP status code for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Malformed(_) | ApiError::Validation { .. } => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Overloaded => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Build the `error` object for the response envelope.
    ///
    /// The `code` and `message` keys are always present; `errors` only for
    /// validation failures. These required fields are exempt from the
    /// envelope's empty-value stripping.
    pub fn body(&self, translator: &Translator, debug: bool) -> Value {
        let status = self.status();
        let mut error = json!({
            "code": status.as_u16(),
            "message": self.message(translator, debug),
        });
        if let ApiError::Validation { errors, .. } = self {
            if let Some(map) = error.as_object_mut() {
                map.insert("errors".to_string(), errors.clone());
            }
        }
        error
    }

    fn message(&self, translator: &Translator, debug: bool) -> String {
        match self {
            ApiError::Malformed(msg)
            | ApiError::NotFound(msg)
            | ApiError::Unprocessable(msg) => msg.clone(),
            ApiError::Validation { message, .. } => message
                .clone()
                .unwrap_or_else(|| status_title(self.status(), translator)),
            ApiError::MethodNotAllowed { allowed } => {
                let names: Vec<&str> = allowed.iter().map(Method::as_str).collect();
                format!(
                    "{}: {}",
                    translator.translate("Method not allowed, expected one of"),
                    names.join(", ")
                )
            }
            ApiError::Overloaded => status_title(self.status(), translator),
            ApiError::Internal(detail) => {
                if debug {
                    detail.clone()
                } else {
                    status_title(self.status(), translator)
                }
            }
        }
    }
}

/// Localized title for an HTTP status, falling back to the protocol's
/// standard reason phrase when no message is registered for it.
pub fn status_title(status: StatusCode, translator: &Translator) -> String {
    let reason = status.canonical_reason().unwrap_or("Unknown Error");
    translator.translate(reason).to_string()
}
