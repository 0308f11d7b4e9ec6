//! Variable calculation endpoint.
//!
//! POST /api/1/calculate: validate the submitted scenarios (through the
//! bounded cache), delegate computation to the engine, and shape the
//! per-scenario results.

use std::sync::Arc;

use serde_json::{json, Map, Value};

use crate::cache::ScenarioKey;
use crate::engine::{EngineError, ValidatedScenario};
use crate::error::ApiError;
use crate::http::request::RequestEnv;
use crate::http::server::AppState;

pub fn calculate(env: &mut RequestEnv, state: &AppState) -> Result<Value, ApiError> {
    let body = env.body_object()?;

    let variables = requested_variables(body)?;
    let trace = body.get("trace").and_then(Value::as_bool).unwrap_or(false);
    let repair = body.get("repair").and_then(Value::as_bool).unwrap_or(false);

    let scenarios = validated_scenarios(env, state, repair)?;
    let result = state
        .engine
        .calculate(&scenarios, &variables, trace)
        .map_err(engine_error)?;

    let mut payload = Map::new();
    payload.insert("value".to_string(), Value::Array(result.values));
    if let Some(tracebacks) = result.tracebacks {
        payload.insert("tracebacks".to_string(), tracebacks);
    }
    Ok(Value::Object(payload))
}

/// Variable name list from the request body.
fn requested_variables(body: &Map<String, Value>) -> Result<Vec<String>, ApiError> {
    let names: Option<Vec<String>> = body.get("variables").and_then(Value::as_array).map(|list| {
        list.iter()
            .filter_map(|name| name.as_str().map(str::to_string))
            .collect()
    });
    match names {
        Some(names) if !names.is_empty() => Ok(names),
        _ => Err(ApiError::Validation {
            message: None,
            errors: json!({"variables": "expected a non-empty array of variable names"}),
        }),
    }
}

/// Validate every submitted scenario, going through the bounded cache.
///
/// Validation failures are aggregated into a structure mirroring the
/// input: `{"scenarios": {"<index>": <engine errors>}}`.
pub fn validated_scenarios(
    env: &RequestEnv,
    state: &AppState,
    repair: bool,
) -> Result<Vec<Arc<ValidatedScenario>>, ApiError> {
    let body = env.body_object()?;
    let Some(raw_scenarios) = body.get("scenarios").and_then(Value::as_array) else {
        return Err(ApiError::Validation {
            message: None,
            errors: json!({"scenarios": "expected a non-empty array of scenarios"}),
        });
    };
    if raw_scenarios.is_empty() {
        return Err(ApiError::Validation {
            message: None,
            errors: json!({"scenarios": "expected a non-empty array of scenarios"}),
        });
    }

    let locale = env.ctx.languages();
    let identity = state.engine.identity();
    let mut scenarios = Vec::with_capacity(raw_scenarios.len());
    let mut errors = Map::new();

    for (index, raw) in raw_scenarios.iter().enumerate() {
        let key = ScenarioKey::new(&locale, raw, repair, &identity);
        if let Some(cached) = state.scenarios.get(&key) {
            scenarios.push(cached);
            continue;
        }
        match state.engine.validate_scenario(raw, repair) {
            Ok(validated) => {
                let validated = Arc::new(validated);
                state.scenarios.insert(key, validated.clone());
                scenarios.push(validated);
            }
            Err(scenario_errors) => {
                errors.insert(index.to_string(), scenario_errors);
            }
        }
    }

    if !errors.is_empty() {
        return Err(ApiError::Validation {
            message: None,
            errors: json!({"scenarios": errors}),
        });
    }
    Ok(scenarios)
}

/// Map engine failures onto the error taxonomy.
pub fn engine_error(error: EngineError) -> ApiError {
    match error {
        EngineError::UnknownVariable(name) => ApiError::Validation {
            message: None,
            errors: json!({"variables": {name: "unknown variable"}}),
        },
        EngineError::Computation(detail) => ApiError::Internal(detail),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::server::test_support::{request_env, test_state};
    use axum::http::Method;

    fn calculate_body(scenarios: Value, variables: Value) -> Value {
        json!({"scenarios": scenarios, "variables": variables})
    }

    #[test]
    fn test_calculate_returns_values_per_scenario() {
        let state = test_state();
        let mut env = request_env(
            &state,
            Method::POST,
            "/api/1/calculate",
            Some(calculate_body(
                json!([{"period": "2014", "individus": [{"salaire_brut": 1000.0}]}]),
                json!(["salaire_net"]),
            )),
        );
        let payload = calculate(&mut env, &state).unwrap();
        assert_eq!(payload["value"][0]["salaire_net"], json!([780.0]));
        assert!(payload.get("tracebacks").is_none());
    }

    #[test]
    fn test_trace_adds_tracebacks() {
        let state = test_state();
        let mut env = request_env(
            &state,
            Method::POST,
            "/api/1/calculate",
            Some(json!({
                "scenarios": [{"period": "2014", "individus": [{"salaire_brut": 1000.0}]}],
                "variables": ["salaire_net"],
                "trace": true,
            })),
        );
        let payload = calculate(&mut env, &state).unwrap();
        assert_eq!(payload["tracebacks"][0]["name"], "salaire_net");
    }

    #[test]
    fn test_invalid_scenarios_mirror_input_shape() {
        let state = test_state();
        let mut env = request_env(
            &state,
            Method::POST,
            "/api/1/calculate",
            Some(calculate_body(json!([{"individus": []}]), json!(["salaire_net"]))),
        );
        let err = calculate(&mut env, &state).unwrap_err();
        let ApiError::Validation { errors, .. } = err else {
            panic!("expected validation failure");
        };
        assert!(errors["scenarios"]["0"]["period"].is_string());
    }

    #[test]
    fn test_missing_variables_rejected() {
        let state = test_state();
        let mut env = request_env(
            &state,
            Method::POST,
            "/api/1/calculate",
            Some(json!({"scenarios": [{"period": "2014", "individus": [{}]}]})),
        );
        assert!(matches!(
            calculate(&mut env, &state),
            Err(ApiError::Validation { .. })
        ));
    }

    #[test]
    fn test_repeated_request_hits_scenario_cache() {
        let state = test_state();
        let body = calculate_body(
            json!([{"period": "2014", "individus": [{"salaire_brut": 500.0}]}]),
            json!(["salaire_net"]),
        );
        let mut env = request_env(&state, Method::POST, "/api/1/calculate", Some(body.clone()));
        calculate(&mut env, &state).unwrap();
        assert_eq!(state.scenarios.len(), 1);

        let mut env = request_env(&state, Method::POST, "/api/1/calculate", Some(body));
        calculate(&mut env, &state).unwrap();
        assert_eq!(state.scenarios.len(), 1);
    }
}
