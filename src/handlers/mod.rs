//! Request handlers.
//!
//! # Data Flow
//! ```text
//! dispatch pipeline (http::server)
//!     → route table below picks the handler
//!     → handler reads RequestEnv (query, vars, body, ctx)
//!     → calls the computation engine through AppState
//!     → returns envelope payload entries or an ApiError value
//! ```
//!
//! # Design Decisions
//! - Handlers are synchronous and pure with respect to the HTTP layer:
//!   no status codes, no headers, just payload-or-error
//! - The route table is the single source of truth for the API surface;
//!   the welcome and swagger endpoints derive their listings from it

pub mod calculate;
pub mod formula;
pub mod metadata;
pub mod simulate;

use axum::http::Method;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::http::request::RequestEnv;
use crate::http::server::AppState;
use crate::routing::{RouteRule, Router};

/// The complete ordered route table of the API.
pub fn routes() -> Router {
    Router::new(vec![
        RouteRule::new("welcome", r"/(api/?)?$", welcome)
            .methods(&[Method::GET])
            .template("/"),
        RouteRule::new("calculate", r"/api/1/calculate$", calculate::calculate)
            .methods(&[Method::POST])
            .template("/api/1/calculate")
            .compute_heavy(),
        RouteRule::new("entities", r"/api/1/entities$", metadata::entities)
            .methods(&[Method::GET])
            .template("/api/1/entities"),
        RouteRule::new("field", r"/api/1/field$", metadata::field)
            .methods(&[Method::GET])
            .template("/api/1/field"),
        RouteRule::new("fields", r"/api/1/fields$", metadata::fields)
            .methods(&[Method::GET])
            .template("/api/1/fields"),
        RouteRule::new("formula", r"/api/1/formula/(?P<name>[^/]+)$", formula::formula_v1)
            .methods(&[Method::GET])
            .template("/api/1/formula/{name}")
            .compute_heavy(),
        RouteRule::new(
            "formula-v2",
            r"/api/2/formula/(?P<period>[^/]+)/(?P<names>[^/]+)$",
            formula::formula_v2,
        )
        .methods(&[Method::GET])
        .template("/api/2/formula/{period}/{names}")
        .compute_heavy(),
        RouteRule::new("graph", r"/api/1/graph$", metadata::graph)
            .methods(&[Method::GET])
            .template("/api/1/graph"),
        RouteRule::new("parameters", r"/api/1/parameters$", metadata::parameters)
            .methods(&[Method::GET, Method::POST])
            .template("/api/1/parameters"),
        RouteRule::new("legislations", r"/api/1/legislations$", metadata::parameters)
            .methods(&[Method::GET, Method::POST])
            .template("/api/1/legislations"),
        RouteRule::new("reforms", r"/api/1/reforms$", metadata::reforms)
            .methods(&[Method::GET])
            .template("/api/1/reforms"),
        RouteRule::new("simulate", r"/api/1/simulate$", simulate::simulate)
            .methods(&[Method::POST])
            .template("/api/1/simulate")
            .compute_heavy(),
        RouteRule::new("swagger", r"/api/1/swagger$", swagger)
            .methods(&[Method::GET])
            .template("/api/1/swagger"),
        RouteRule::new("variables", r"/api/1/variables$", metadata::variables)
            .methods(&[Method::GET])
            .template("/api/1/variables"),
    ])
}

/// Liveness/welcome payload listing the API surface.
fn welcome(_env: &mut RequestEnv, state: &AppState) -> Result<Value, ApiError> {
    let endpoints: Vec<Value> = state
        .rules
        .rules()
        .iter()
        .filter_map(|rule| rule.template.map(|template| json!(template)))
        .collect();
    Ok(json!({
        "value": {
            "message": "Welcome, this is the tax and benefit system web API.",
            "package": state.engine.identity(),
            "endpoints": endpoints,
        }
    }))
}

/// Machine-readable API description derived from the route table.
fn swagger(_env: &mut RequestEnv, state: &AppState) -> Result<Value, ApiError> {
    let mut paths = serde_json::Map::new();
    for rule in state.rules.rules() {
        let Some(template) = rule.template else {
            continue;
        };
        let methods: Vec<Method> = rule
            .methods
            .clone()
            .unwrap_or_else(|| vec![Method::GET, Method::POST]);
        let mut operations = serde_json::Map::new();
        for method in methods {
            operations.insert(
                method.as_str().to_lowercase(),
                json!({"operationId": rule.name, "produces": ["application/json"]}),
            );
        }
        paths.insert(template.to_string(), Value::Object(operations));
    }
    Ok(json!({
        "value": {
            "swagger": "2.0",
            "info": {
                "title": "Tax and benefit system web API",
                "version": env!("CARGO_PKG_VERSION"),
            },
            "basePath": "/",
            "paths": paths,
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_table_covers_api_surface() {
        let router = routes();
        let matched = |method: &Method, path: &str| -> &'static str {
            router.dispatch(method, path).map(|m| m.rule.name).unwrap()
        };

        assert_eq!(matched(&Method::GET, "/"), "welcome");
        assert_eq!(matched(&Method::GET, "/api"), "welcome");
        assert_eq!(matched(&Method::POST, "/api/1/calculate"), "calculate");
        assert_eq!(matched(&Method::GET, "/api/1/entities"), "entities");
        assert_eq!(matched(&Method::GET, "/api/1/field"), "field");
        assert_eq!(matched(&Method::GET, "/api/1/fields"), "fields");
        assert_eq!(matched(&Method::GET, "/api/1/formula/salaire_net"), "formula");
        assert_eq!(
            matched(&Method::GET, "/api/2/formula/2014-01/salaire_net+revenu_disponible"),
            "formula-v2"
        );
        assert_eq!(matched(&Method::GET, "/api/1/graph"), "graph");
        assert_eq!(matched(&Method::GET, "/api/1/parameters"), "parameters");
        assert_eq!(matched(&Method::POST, "/api/1/legislations"), "legislations");
        assert_eq!(matched(&Method::GET, "/api/1/reforms"), "reforms");
        assert_eq!(matched(&Method::POST, "/api/1/simulate"), "simulate");
        assert_eq!(matched(&Method::GET, "/api/1/swagger"), "swagger");
        assert_eq!(matched(&Method::GET, "/api/1/variables"), "variables");
    }

    #[test]
    fn test_compute_heavy_routes_are_flagged() {
        let router = routes();
        for (path, heavy) in [
            ("/api/1/entities", false),
            ("/api/1/swagger", false),
            ("/api/1/formula/salaire_net", true),
        ] {
            let matched = router.dispatch(&Method::GET, path).unwrap();
            assert_eq!(matched.rule.compute_heavy, heavy, "{path}");
        }
        let calculate = router.dispatch(&Method::POST, "/api/1/calculate").unwrap();
        assert!(calculate.rule.compute_heavy);
        let simulate = router.dispatch(&Method::POST, "/api/1/simulate").unwrap();
        assert!(simulate.rule.compute_heavy);
    }
}
