//! Integration tests for the dispatch pipeline and API surface.
//!
//! Drives the composed Axum router in-process with `tower::ServiceExt`;
//! no sockets involved.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use serde_json::{json, Value};
use tower::ServiceExt;

use tax_benefit_api::admission::{LoadSample, LoadSampler};
use tax_benefit_api::config::{ApiConfig, TranslationDomainConfig};
use tax_benefit_api::engine::demo::DemoEngine;
use tax_benefit_api::http::HttpServer;

struct FixedLoadSampler(LoadSample);

impl LoadSampler for FixedLoadSampler {
    fn sample(&self) -> Option<LoadSample> {
        Some(self.0)
    }
}

fn idle_sampler() -> Arc<dyn LoadSampler> {
    Arc::new(FixedLoadSampler(LoadSample {
        one_minute: 0.0,
        cores: 4,
    }))
}

fn server_with(sampler: Arc<dyn LoadSampler>) -> HttpServer {
    HttpServer::with_sampler(
        ApiConfig::default(),
        Arc::new(DemoEngine::new(Vec::new())),
        sampler,
    )
}

fn server() -> HttpServer {
    server_with(idle_sampler())
}

/// A config with an English catalog translating the 405 message prefix.
fn localized_config(dir: &std::path::Path, languages: &[&str]) -> ApiConfig {
    std::fs::write(
        dir.join("en.json"),
        json!({"messages": {"Method not allowed, expected one of": "Allowed methods"}})
            .to_string(),
    )
    .unwrap();

    let mut config = ApiConfig::default();
    config.translations.languages = languages.iter().map(|tag| (*tag).to_string()).collect();
    config.translations.domains.push(TranslationDomainConfig {
        name: "api".to_string(),
        dir: dir.display().to_string(),
    });
    config
}

fn localized_server(config: ApiConfig) -> HttpServer {
    HttpServer::with_sampler(config, Arc::new(DemoEngine::new(Vec::new())), idle_sampler())
}

async fn send(server: &HttpServer, request: Request<Body>) -> Response {
    server.app().oneshot(request).await.unwrap()
}

async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn get(path: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(path)
        .body(Body::empty())
        .unwrap()
}

fn post_json(path: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_unknown_path_is_404_echoing_path() {
    let server = server();
    let response = send(&server, get("/doesnotexist")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], 404);
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("/doesnotexist"));
}

#[tokio::test]
async fn test_wrong_method_is_405_listing_allowed() {
    let server = server();
    let response = send(&server, get("/api/1/calculate")).await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);

    let body = body_json(response).await;
    let message = body["error"]["message"].as_str().unwrap();
    assert!(message.contains("POST"));
    assert!(!message.contains("GET,"));
}

#[tokio::test]
async fn test_bad_content_type_is_400() {
    let server = server();
    let request = Request::builder()
        .method("POST")
        .uri("/api/1/calculate")
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from("scenarios"))
        .unwrap();
    let response = send(&server, request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert!(body["error"]["message"].as_str().unwrap().contains("text/plain"));
}

#[tokio::test]
async fn test_unparsable_json_body_is_400() {
    let server = server();
    let request = Request::builder()
        .method("POST")
        .uri("/api/1/calculate")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("not-json"))
        .unwrap();
    let response = send(&server, request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("invalid JSON"));
}

#[tokio::test]
async fn test_preflight_short_circuits_even_on_unknown_path() {
    let server = server();
    let request = Request::builder()
        .method("OPTIONS")
        .uri("/no/such/route")
        .header(header::ORIGIN, "http://ui.example")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();
    let response = send(&server, request).await;

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://ui.example"
    );
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_METHODS], "POST");
}

#[tokio::test]
async fn test_cross_origin_request_carries_allow_origin_on_any_status() {
    let server = server();

    // Success path.
    let request = Request::builder()
        .method("GET")
        .uri("/api/1/entities")
        .header(header::ORIGIN, "http://ui.example")
        .body(Body::empty())
        .unwrap();
    let response = send(&server, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://ui.example"
    );

    // Error path keeps the headers too.
    let request = Request::builder()
        .method("GET")
        .uri("/doesnotexist")
        .header(header::ORIGIN, "http://ui.example")
        .body(Body::empty())
        .unwrap();
    let response = send(&server, request).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://ui.example"
    );
}

#[tokio::test]
async fn test_overload_rejects_compute_heavy_before_computation() {
    // Load average of 2x the core count.
    let server = server_with(Arc::new(FixedLoadSampler(LoadSample {
        one_minute: 8.0,
        cores: 4,
    })));

    let response = send(
        &server,
        post_json(
            "/api/1/calculate",
            json!({
                "scenarios": [{"period": "2014", "individus": [{"salaire_brut": 1000.0}]}],
                "variables": ["salaire_net"],
            }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], 503);

    // Metadata endpoints are not gated.
    let response = send(&server, get("/api/1/entities")).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_calculate_end_to_end() {
    let server = server();
    let response = send(
        &server,
        post_json(
            "/api/1/calculate",
            json!({
                "context": "req-42",
                "scenarios": [{"period": "2014", "individus": [{"salaire_brut": 1000.0}]}],
                "variables": ["salaire_net"],
            }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["x-api-version"],
        env!("CARGO_PKG_VERSION")
    );

    let body = body_json(response).await;
    assert_eq!(body["apiVersion"], 1);
    assert_eq!(body["context"], "req-42");
    assert_eq!(body["method"], "POST");
    assert_eq!(body["value"][0]["salaire_net"], json!([780.0]));
    // The params echo preserves the input.
    assert_eq!(body["params"]["variables"], json!(["salaire_net"]));
}

#[tokio::test]
async fn test_success_body_never_contains_empty_values() {
    fn assert_no_empties(value: &Value, path: &str) {
        match value {
            Value::Null => panic!("null at {path}"),
            Value::Array(items) => {
                assert!(!items.is_empty(), "empty array at {path}");
                for (index, item) in items.iter().enumerate() {
                    assert_no_empties(item, &format!("{path}[{index}]"));
                }
            }
            Value::Object(entries) => {
                assert!(!entries.is_empty(), "empty object at {path}");
                for (key, entry) in entries {
                    assert_no_empties(entry, &format!("{path}.{key}"));
                }
            }
            _ => {}
        }
    }

    let server = server();
    for path in ["/", "/api/1/entities", "/api/1/fields", "/api/1/variables", "/api/1/swagger"] {
        let response = send(&server, get(path)).await;
        assert_eq!(response.status(), StatusCode::OK, "{path}");
        let body = body_json(response).await;
        assert_no_empties(&body, path);
    }
}

#[tokio::test]
async fn test_formula_endpoints() {
    let server = server();

    let response = send(&server, get("/api/1/formula/salaire_net?salaire_brut=2000")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["value"], 1560.0);
    assert_eq!(body["params"]["salaire_brut"], "2000");

    // Input-only variable is semantically inapplicable.
    let response = send(&server, get("/api/1/formula/salaire_brut")).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = send(
        &server,
        get("/api/2/formula/2014-01/salaire_net+revenu_disponible?salaire_brut=1000"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["values"]["salaire_net"], 780.0);
    assert_eq!(body["period"], "2014-01");
}

#[tokio::test]
async fn test_simulate_returns_decomposition() {
    let server = server();
    let response = send(
        &server,
        post_json(
            "/api/1/simulate",
            json!({"scenarios": [{"period": "2014", "individus": [{"salaire_brut": 1000.0, "nb_enfants": 2}]}]}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["value"]["code"], "revenu_disponible");
    assert_eq!(body["value"]["values"], json!([[1020.0]]));
}

#[tokio::test]
async fn test_validation_errors_mirror_scenario_shape() {
    let server = server();
    let response = send(
        &server,
        post_json(
            "/api/1/calculate",
            json!({"scenarios": [{"individus": []}], "variables": ["salaire_net"]}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"]["errors"]["scenarios"]["0"]["period"].is_string());
}

#[tokio::test]
async fn test_welcome_on_root_and_api() {
    let server = server();
    for path in ["/", "/api"] {
        let response = send(&server, get(path)).await;
        assert_eq!(response.status(), StatusCode::OK, "{path}");
        let body = body_json(response).await;
        assert_eq!(body["value"]["package"], "demo-fr");
        assert!(body["value"]["endpoints"]
            .as_array()
            .unwrap()
            .contains(&json!("/api/1/calculate")));
    }
}

#[tokio::test]
async fn test_accept_language_seeds_request_locale() {
    let dir = tempfile::tempdir().unwrap();
    // Default language tags stay fr-FR/fr; only the header selects English.
    let server = localized_server(localized_config(dir.path(), &["fr-FR", "fr"]));

    let request = Request::builder()
        .method("GET")
        .uri("/api/1/calculate")
        .header(header::ACCEPT_LANGUAGE, "en")
        .body(Body::empty())
        .unwrap();
    let response = send(&server, request).await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    let body = body_json(response).await;
    assert_eq!(body["error"]["message"], "Allowed methods: POST");

    // Without the header the default tags apply and no catalog matches.
    let response = send(&server, get("/api/1/calculate")).await;
    let body = body_json(response).await;
    assert_eq!(
        body["error"]["message"],
        "Method not allowed, expected one of: POST"
    );
}

#[tokio::test]
async fn test_configured_languages_apply_without_accept_header() {
    let dir = tempfile::tempdir().unwrap();
    let server = localized_server(localized_config(dir.path(), &["en"]));

    let response = send(&server, get("/api/1/calculate")).await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    let body = body_json(response).await;
    assert_eq!(body["error"]["message"], "Allowed methods: POST");
}

#[tokio::test]
async fn test_jsonp_callback_wraps_body() {
    let server = server();
    let response = send(&server, get("/api/1/entities?callback=cb")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("application/javascript"));

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.starts_with("cb("));
    assert!(text.ends_with(')'));

    // A callback that is not a plain identifier is ignored.
    let response = send(&server, get("/api/1/entities?callback=window.alert(1)")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("application/json"));
}

#[tokio::test]
async fn test_legislations_alias_matches_parameters() {
    let server = server();
    let parameters = body_json(send(&server, get("/api/1/parameters")).await).await;
    let legislations = body_json(send(&server, get("/api/1/legislations")).await).await;
    assert_eq!(parameters["value"], legislations["value"]);
}
