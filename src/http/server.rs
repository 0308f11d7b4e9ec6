//! HTTP server setup and request dispatch pipeline.
//!
//! # Responsibilities
//! - Create the Axum router funneling every request into the dispatch
//!   pipeline
//! - Wire up middleware (tracing, timeout, body limit, request ID)
//! - Run CORS negotiation, routing, admission control, body validation
//! - Build the per-request context chain and invoke the matched handler
//! - Serialize the outcome through the response envelope builder
//!
//! # Design Decisions
//! - One catch-all Axum route; the ordered rule table in
//!   `handlers::routes` is the real router
//! - CORS runs before body validation so a malformed body never blocks a
//!   preflight
//! - Every failure past this point is an `ApiError` value flowing through
//!   the envelope builder; the `Internal` variant is the single boundary
//!   where unexpected engine failures become user-visible JSON

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{header, Method, Request},
    response::Response,
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::admission::{AdmissionControl, LoadSampler, ProcLoadSampler};
use crate::cache::ScenarioCache;
use crate::config::ApiConfig;
use crate::context::translator::{TranslationDomain, TranslatorRegistry};
use crate::context::{Ctx, DEFAULT_LANGUAGES};
use crate::engine::ComputationEngine;
use crate::error::ApiError;
use crate::handlers;
use crate::http::cors::{self, CorsDecision};
use crate::http::envelope;
use crate::http::request::{languages_from_accept, parse_query, RequestEnv};
use crate::observability::metrics;
use crate::routing::Router as RuleRouter;

/// Application state injected into the dispatch pipeline.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ApiConfig>,
    pub engine: Arc<dyn ComputationEngine>,
    pub rules: Arc<RuleRouter>,
    pub translators: Arc<TranslatorRegistry>,
    pub null_ctx: Arc<Ctx>,
    pub admission: Arc<AdmissionControl>,
    pub scenarios: Arc<ScenarioCache>,
}

impl AppState {
    pub fn new(
        config: ApiConfig,
        engine: Arc<dyn ComputationEngine>,
        sampler: Arc<dyn LoadSampler>,
    ) -> Self {
        let translators = Arc::new(TranslatorRegistry::new(
            config
                .translations
                .domains
                .iter()
                .map(|domain| TranslationDomain {
                    name: domain.name.clone(),
                    dir: domain.dir.clone().into(),
                })
                .collect(),
        ));
        Self {
            rules: Arc::new(handlers::routes()),
            null_ctx: Ctx::null(translators.clone()),
            translators,
            admission: Arc::new(AdmissionControl::new(
                sampler,
                config.admission.enabled,
                config.admission.max_load_per_core,
            )),
            scenarios: Arc::new(ScenarioCache::new(config.scenario_cache.capacity)),
            engine,
            config: Arc::new(config),
        }
    }
}

/// HTTP server for the API facade.
pub struct HttpServer {
    router: Router,
    config: ApiConfig,
}

impl HttpServer {
    /// Create a server sampling the real OS load average.
    pub fn new(config: ApiConfig, engine: Arc<dyn ComputationEngine>) -> Self {
        Self::with_sampler(config, engine, Arc::new(ProcLoadSampler))
    }

    /// Create a server with an injected load sampler (tests).
    pub fn with_sampler(
        config: ApiConfig,
        engine: Arc<dyn ComputationEngine>,
        sampler: Arc<dyn LoadSampler>,
    ) -> Self {
        let state = AppState::new(config.clone(), engine, sampler);
        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &ApiConfig, state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(api_handler))
            .route("/", any(api_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
    }

    /// The composed router, for in-process testing.
    pub fn app(&self) -> Router {
        self.router.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// The dispatch pipeline: CORS, routing, admission, body validation,
/// handler, envelope.
async fn api_handler(State(state): State<AppState>, mut request: Request<Body>) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let url = request.uri().to_string();
    let query = parse_query(request.uri().query());
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown")
        .to_string();
    let debug = state.config.engine.debug;

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        path = %path,
        "Dispatching request"
    );

    // 1. CORS, before any validation: a malformed body must never block a
    // preflight.
    let cors_headers = match cors::negotiate(&method, request.headers()) {
        CorsDecision::Preflight(response) => {
            metrics::record_request("preflight", response.status().as_u16(), start);
            return *response;
        }
        CorsDecision::Continue(headers) => headers,
        CorsDecision::NotCors => Vec::new(),
    };

    // 2. Request context: locale from Accept-Language, falling back to the
    // configured default tags.
    let mut ctx = Ctx::child(&state.null_ctx);
    let accepted = request
        .headers()
        .get(header::ACCEPT_LANGUAGE)
        .and_then(|value| value.to_str().ok())
        .map(languages_from_accept)
        .unwrap_or_default();
    let configured_default = state
        .config
        .translations
        .languages
        .iter()
        .map(String::as_str)
        .eq(DEFAULT_LANGUAGES.iter().copied());
    if !accepted.is_empty() {
        ctx.set_languages(accepted);
    } else if !configured_default {
        ctx.set_languages(state.config.translations.languages.clone());
    }
    // Round-trip the resolved locale into the request's ambient store so
    // nested requests observe it without re-resolving.
    request.extensions_mut().insert(ctx.ambient());

    let mut env = RequestEnv {
        method: method.clone(),
        url,
        path: path.clone(),
        query,
        vars: HashMap::new(),
        body: None,
        ctx,
    };

    let fail = |env: &RequestEnv, error: ApiError| -> Response {
        envelope::respond(
            &env.ctx.translator(),
            debug,
            env.envelope_seed(),
            Err(error),
            None,
            env.jsonp_callback(),
            &cors_headers,
        )
    };

    // 3. Route lookup: first structural match is authoritative.
    let matched = match state.rules.dispatch(&method, &path) {
        Ok(matched) => matched,
        Err(error) => {
            let status = error.status().as_u16();
            tracing::debug!(request_id = %request_id, path = %path, status, "No route");
            let response = fail(&env, error);
            metrics::record_request("none", status, start);
            return response;
        }
    };
    let endpoint = matched.rule.name;
    env.vars = matched.vars;

    // 4. Admission control, before any expensive work.
    if matched.rule.compute_heavy {
        if let Err(error) = state.admission.admit() {
            metrics::record_admission_rejected(endpoint);
            let response = fail(&env, error);
            metrics::record_request(endpoint, response.status().as_u16(), start);
            return response;
        }
    }

    // 5. Body validation for methods that carry one.
    if method != Method::GET && method != Method::HEAD && method != Method::OPTIONS {
        match read_json_body(&mut request).await {
            Ok(body) => env.body = body,
            Err(error) => {
                let response = fail(&env, error);
                metrics::record_request(endpoint, response.status().as_u16(), start);
                return response;
            }
        }
    }

    // 6. Handler, then envelope.
    let result = (matched.rule.handler)(&mut env, &state);
    let response = envelope::respond(
        &env.ctx.translator(),
        debug,
        env.envelope_seed(),
        result,
        None,
        env.jsonp_callback(),
        &cors_headers,
    );

    let status = response.status().as_u16();
    tracing::info!(
        request_id = %request_id,
        method = %method,
        path = %path,
        endpoint = %endpoint,
        status,
        "Request handled"
    );
    metrics::record_request(endpoint, status, start);
    response
}

/// Enforce the JSON content type and parse the body.
async fn read_json_body(request: &mut Request<Body>) -> Result<Option<serde_json::Value>, ApiError> {
    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("")
        .to_string();
    if !content_type.starts_with("application/json") {
        return Err(ApiError::Malformed(format!(
            "expected Content-Type application/json, got {content_type:?}"
        )));
    }

    let body = std::mem::replace(request.body_mut(), Body::empty());
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .map_err(|error| ApiError::Malformed(format!("unreadable request body: {error}")))?;
    if bytes.is_empty() {
        return Ok(None);
    }
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|error| ApiError::Malformed(format!("invalid JSON body: {error}")))
}

/// Wait for shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %error, "Failed to install Ctrl+C handler");
        return;
    }
    tracing::info!("Shutdown signal received");
}
