//! Introspection endpoints: entities, variables, parameters, reforms,
//! dependency graph.

use serde_json::{json, Value};

use crate::error::ApiError;
use crate::handlers::calculate::engine_error;
use crate::http::request::RequestEnv;
use crate::http::server::AppState;

/// GET /api/1/entities: entity types and their roles.
pub fn entities(_env: &mut RequestEnv, state: &AppState) -> Result<Value, ApiError> {
    Ok(json!({"value": state.engine.entities()}))
}

/// GET /api/1/field?variable=...: one variable's metadata.
pub fn field(env: &mut RequestEnv, state: &AppState) -> Result<Value, ApiError> {
    let Some(name) = env.query_param("variable") else {
        return Err(ApiError::Validation {
            message: None,
            errors: json!({"variable": "required query parameter"}),
        });
    };
    match state.engine.variable(name) {
        Some(metadata) => Ok(json!({"value": metadata})),
        None => Err(ApiError::NotFound(format!("unknown variable: {name}"))),
    }
}

/// GET /api/1/fields: every variable's metadata, keyed by name.
pub fn fields(_env: &mut RequestEnv, state: &AppState) -> Result<Value, ApiError> {
    Ok(json!({"value": state.engine.variables()}))
}

/// GET /api/1/variables: every variable's metadata as a list.
pub fn variables(_env: &mut RequestEnv, state: &AppState) -> Result<Value, ApiError> {
    let mut list = Vec::new();
    if let Value::Object(by_name) = state.engine.variables() {
        for (name, metadata) in by_name {
            let mut entry = metadata;
            if let Some(object) = entry.as_object_mut() {
                object.insert("name".to_string(), Value::String(name));
            }
            list.push(entry);
        }
    }
    Ok(json!({"variables": list}))
}

/// GET /api/1/graph?variable=...: dependency graph of a variable.
pub fn graph(env: &mut RequestEnv, state: &AppState) -> Result<Value, ApiError> {
    let Some(name) = env.query_param("variable") else {
        return Err(ApiError::Validation {
            message: None,
            errors: json!({"variable": "required query parameter"}),
        });
    };
    match state.engine.dependency_graph(name) {
        Some(graph) => Ok(json!({"value": graph})),
        None => Err(ApiError::NotFound(format!("unknown variable: {name}"))),
    }
}

/// GET|POST /api/1/parameters (and /api/1/legislations): legislation
/// parameter retrieval, all of them or a named subset.
pub fn parameters(env: &mut RequestEnv, state: &AppState) -> Result<Value, ApiError> {
    let names: Option<Vec<String>> = if let Some(Value::Object(body)) = &env.body {
        body.get("names").and_then(Value::as_array).map(|list| {
            list.iter()
                .filter_map(|name| name.as_str().map(str::to_string))
                .collect()
        })
    } else {
        env.query_param("name").map(|name| vec![name.to_string()])
    };

    let value = state
        .engine
        .parameters(names.as_deref())
        .map_err(|error| match error {
            crate::engine::EngineError::UnknownVariable(name) => {
                ApiError::NotFound(format!("unknown parameter: {name}"))
            }
            other => engine_error(other),
        })?;
    Ok(json!({"value": value}))
}

/// GET /api/1/reforms: declared reform identifiers.
pub fn reforms(_env: &mut RequestEnv, state: &AppState) -> Result<Value, ApiError> {
    Ok(json!({"value": state.engine.reforms()}))
}
