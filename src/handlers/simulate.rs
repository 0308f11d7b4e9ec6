//! Decomposition endpoint.
//!
//! POST /api/1/simulate: validate the submitted scenarios and return the
//! engine's decomposition tree.

use serde_json::{json, Value};

use crate::error::ApiError;
use crate::handlers::calculate::{engine_error, validated_scenarios};
use crate::http::request::RequestEnv;
use crate::http::server::AppState;

pub fn simulate(env: &mut RequestEnv, state: &AppState) -> Result<Value, ApiError> {
    let repair = env
        .body_object()?
        .get("repair")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let scenarios = validated_scenarios(env, state, repair)?;
    let tree = state.engine.simulate(&scenarios).map_err(engine_error)?;
    Ok(json!({"value": tree}))
}
