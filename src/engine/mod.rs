//! Computation engine boundary.
//!
//! # Data Flow
//! ```text
//! handler input (raw scenarios, variable names, periods)
//!     → validate_scenario (typed value or error mirroring input shape)
//!     → calculate / simulate / formula (delegated computation)
//!     → JSON results serialized by the envelope builder
//! ```
//!
//! # Design Decisions
//! - The engine is an external collaborator behind one object-safe trait;
//!   the facade never sees tax/benefit semantics
//! - Validation failures are data (a JSON structure mirroring the input),
//!   not errors of the engine itself
//! - Engine identity feeds cache keys so a reform set change can never
//!   serve stale validated scenarios

pub mod demo;

use std::sync::Arc;

use serde_json::{Map, Value};
use thiserror::Error;

/// A scenario accepted by the engine, in its normalized form.
#[derive(Debug, Clone)]
pub struct ValidatedScenario {
    pub normalized: Value,
}

/// Result of a calculation over one or more scenarios.
#[derive(Debug)]
pub struct CalculationResult {
    /// One entry per scenario: variable name -> computed values.
    pub values: Vec<Value>,
    /// Present when tracing was requested.
    pub tracebacks: Option<Value>,
}

/// Failures of delegated computation.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unknown variable: {0}")]
    UnknownVariable(String),
    #[error("{0}")]
    Computation(String),
}

/// Failures of single-formula evaluation.
#[derive(Debug, Error)]
pub enum FormulaError {
    #[error("unknown variable: {0}")]
    UnknownVariable(String),
    /// The variable exists but is an input, not a formula.
    #[error("variable is not computable: {0}")]
    NotComputable(String),
    #[error("invalid input {name}: {message}")]
    BadInput { name: String, message: String },
}

/// Narrow interface to the external tax/benefit computation service.
pub trait ComputationEngine: Send + Sync {
    /// Country package identity plus active reforms; part of cache keys.
    fn identity(&self) -> String;

    /// Entity types and their roles.
    fn entities(&self) -> Value;

    /// Metadata for every variable, keyed by name.
    fn variables(&self) -> Value;

    /// Metadata for one variable.
    fn variable(&self, name: &str) -> Option<Value>;

    /// Legislation parameters, all of them or a named subset.
    fn parameters(&self, names: Option<&[String]>) -> Result<Value, EngineError>;

    /// Declared reforms (identifier -> label).
    fn reforms(&self) -> Value;

    /// Convert a raw scenario into its validated form, or report a
    /// structure mirroring the offending input's shape.
    fn validate_scenario(&self, raw: &Value, repair: bool) -> Result<ValidatedScenario, Value>;

    /// Compute named variables for validated scenarios.
    fn calculate(
        &self,
        scenarios: &[Arc<ValidatedScenario>],
        variables: &[String],
        trace: bool,
    ) -> Result<CalculationResult, EngineError>;

    /// Compute the decomposition tree for validated scenarios.
    fn simulate(&self, scenarios: &[Arc<ValidatedScenario>]) -> Result<Value, EngineError>;

    /// Evaluate a single formula from scalar inputs.
    fn formula(
        &self,
        name: &str,
        period: Option<&str>,
        inputs: &Map<String, Value>,
    ) -> Result<Value, FormulaError>;

    /// Dependency graph (nodes and edges) of a variable.
    fn dependency_graph(&self, variable: &str) -> Option<Value>;
}
