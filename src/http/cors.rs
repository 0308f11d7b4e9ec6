//! Cross-origin negotiation.
//!
//! # Responsibilities
//! - Detect CORS requests by the presence of an `Origin` header
//! - Short-circuit preflights with a synthesized 204
//! - Attach allow/expose headers to ordinary cross-origin responses
//!
//! # Design Decisions
//! - Explicit decision enum checked by the dispatch pipeline; no
//!   exceptions for expected, frequent control flow
//! - Runs before body validation so a malformed body never blocks a
//!   preflight from succeeding
//! - A long max-age keeps browsers from preflighting every call

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use axum::response::Response;

/// Multi-day preflight cache to reduce preflight frequency.
pub const PREFLIGHT_MAX_AGE_SECS: u64 = 3 * 24 * 60 * 60;

/// Outcome of CORS negotiation for one request.
pub enum CorsDecision {
    /// No `Origin` header: not a CORS request.
    NotCors,
    /// Cross-origin request; attach these headers to whatever response the
    /// handler produces and continue.
    Continue(Vec<(HeaderName, HeaderValue)>),
    /// Preflight; respond immediately, bypassing the handler.
    Preflight(Box<Response>),
}

/// Negotiate CORS from the request line and headers.
pub fn negotiate(method: &Method, headers: &HeaderMap) -> CorsDecision {
    let Some(origin) = headers.get(header::ORIGIN) else {
        return CorsDecision::NotCors;
    };

    if method == Method::OPTIONS {
        // OPTIONS without Access-Control-Request-Method is an ordinary
        // OPTIONS request, not a preflight.
        if let Some(requested_method) = headers.get(header::ACCESS_CONTROL_REQUEST_METHOD) {
            return CorsDecision::Preflight(Box::new(preflight_response(
                origin,
                requested_method,
                headers.get(header::ACCESS_CONTROL_REQUEST_HEADERS),
            )));
        }
    }

    CorsDecision::Continue(vec![
        (header::ACCESS_CONTROL_ALLOW_ORIGIN, origin.clone()),
        (
            header::ACCESS_CONTROL_EXPOSE_HEADERS,
            HeaderValue::from_static("WWW-Authenticate"),
        ),
    ])
}

fn preflight_response(
    origin: &HeaderValue,
    requested_method: &HeaderValue,
    requested_headers: Option<&HeaderValue>,
) -> Response {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = StatusCode::NO_CONTENT;
    let headers = response.headers_mut();
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin.clone());
    headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, requested_method.clone());
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        requested_headers
            .cloned()
            .unwrap_or_else(|| HeaderValue::from_static("")),
    );
    if let Ok(max_age) = HeaderValue::from_str(&PREFLIGHT_MAX_AGE_SECS.to_string()) {
        headers.insert(header::ACCESS_CONTROL_MAX_AGE, max_age);
    }
    response
}
