//! Single-formula evaluation endpoints.
//!
//! GET /api/1/formula/{name}: one variable, scalar inputs from the query
//! string. GET /api/2/formula/{period}/{names}: the period-scoped variant,
//! several variables joined with `+`.

use serde_json::{json, Map, Value};

use crate::engine::FormulaError;
use crate::error::ApiError;
use crate::http::request::RequestEnv;
use crate::http::server::AppState;

/// Query parameters that steer the envelope rather than the formula.
const CONTROL_PARAMS: &[&str] = &["callback", "context", "period"];

pub fn formula_v1(env: &mut RequestEnv, state: &AppState) -> Result<Value, ApiError> {
    let name = env
        .var("name")
        .ok_or_else(|| ApiError::Internal("formula route missing name capture".to_string()))?
        .to_string();
    let period = env.query_param("period").map(str::to_string);
    let inputs = formula_inputs(env);

    let result = state
        .engine
        .formula(&name, period.as_deref(), &inputs)
        .map_err(formula_error)?;
    Ok(result)
}

pub fn formula_v2(env: &mut RequestEnv, state: &AppState) -> Result<Value, ApiError> {
    let period = env
        .var("period")
        .ok_or_else(|| ApiError::Internal("formula route missing period capture".to_string()))?
        .to_string();
    let names: Vec<String> = env
        .var("names")
        .ok_or_else(|| ApiError::Internal("formula route missing names capture".to_string()))?
        .split('+')
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect();
    if names.is_empty() {
        return Err(ApiError::Malformed("expected at least one variable name".to_string()));
    }

    let inputs = formula_inputs(env);
    let mut values = Map::new();
    for name in &names {
        let result = state
            .engine
            .formula(name, Some(&period), &inputs)
            .map_err(formula_error)?;
        values.insert(name.clone(), result.get("value").cloned().unwrap_or(Value::Null));
    }
    Ok(json!({"values": values, "period": period}))
}

/// Scalar formula inputs: every query parameter that is not a control one.
fn formula_inputs(env: &RequestEnv) -> Map<String, Value> {
    env.query
        .iter()
        .filter(|(name, _)| !CONTROL_PARAMS.contains(&name.as_str()))
        .map(|(name, value)| (name.clone(), Value::String(value.clone())))
        .collect()
}

/// Map formula failures onto the error taxonomy.
fn formula_error(error: FormulaError) -> ApiError {
    match error {
        FormulaError::UnknownVariable(name) => {
            ApiError::NotFound(format!("unknown variable: {name}"))
        }
        FormulaError::NotComputable(name) => ApiError::Unprocessable(format!(
            "variable {name} is an input, not a formula, and cannot be computed"
        )),
        FormulaError::BadInput { name, message } => ApiError::Validation {
            message: None,
            errors: json!({ name: message }),
        },
    }
}
