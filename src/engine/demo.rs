//! Built-in demonstration country package.
//!
//! A deliberately small tax/benefit system used by tests and local runs.
//! Production deployments embed a real country package behind the same
//! trait; nothing outside this file knows the difference.

use std::sync::Arc;

use serde_json::{json, Map, Value};

use crate::engine::{
    CalculationResult, ComputationEngine, EngineError, FormulaError, ValidatedScenario,
};

/// Employee contribution rate applied by `salaire_net`.
const CONTRIBUTION_RATE: f64 = 0.22;

/// Flat benefit granted per child by `revenu_disponible`.
const CHILD_BENEFIT: f64 = 120.0;

/// Period assumed when a scenario omits one and repair is requested.
const DEFAULT_PERIOD: &str = "2014";

pub struct DemoEngine {
    reforms: Vec<String>,
}

impl DemoEngine {
    pub fn new(reforms: Vec<String>) -> Self {
        Self { reforms }
    }

    fn is_formula(name: &str) -> bool {
        matches!(name, "salaire_net" | "revenu_disponible")
    }

    fn is_input(name: &str) -> bool {
        matches!(name, "salaire_brut" | "nb_enfants")
    }

    fn net_from_gross(gross: f64) -> f64 {
        gross * (1.0 - CONTRIBUTION_RATE)
    }

    /// Compute one variable for every individu of a validated scenario.
    fn compute(scenario: &ValidatedScenario, variable: &str) -> Result<Value, EngineError> {
        let individus = scenario.normalized["individus"]
            .as_array()
            .cloned()
            .unwrap_or_default();
        let values: Vec<Value> = individus
            .iter()
            .map(|individu| {
                let gross = individu["salaire_brut"].as_f64().unwrap_or(0.0);
                let children = individu["nb_enfants"].as_f64().unwrap_or(0.0);
                match variable {
                    "salaire_brut" => json!(gross),
                    "nb_enfants" => json!(children),
                    "salaire_net" => json!(Self::net_from_gross(gross)),
                    "revenu_disponible" => {
                        json!(Self::net_from_gross(gross) + children * CHILD_BENEFIT)
                    }
                    _ => Value::Null,
                }
            })
            .collect();
        if values.iter().any(Value::is_null) {
            return Err(EngineError::UnknownVariable(variable.to_string()));
        }
        Ok(Value::Array(values))
    }
}

impl ComputationEngine for DemoEngine {
    fn identity(&self) -> String {
        if self.reforms.is_empty() {
            "demo-fr".to_string()
        } else {
            format!("demo-fr+{}", self.reforms.join("+"))
        }
    }

    fn entities(&self) -> Value {
        json!({
            "individus": {"label": "Individu", "roles": []},
            "menages": {
                "label": "Ménage",
                "roles": ["personne_de_reference", "conjoint", "enfants"],
            },
            "familles": {"label": "Famille", "roles": ["parents", "enfants"]},
        })
    }

    fn variables(&self) -> Value {
        json!({
            "salaire_brut": {
                "entity": "individus",
                "label": "Salaire brut",
                "value_type": "float",
                "formula": false,
            },
            "nb_enfants": {
                "entity": "individus",
                "label": "Nombre d'enfants à charge",
                "value_type": "int",
                "formula": false,
            },
            "salaire_net": {
                "entity": "individus",
                "label": "Salaire net",
                "value_type": "float",
                "formula": true,
            },
            "revenu_disponible": {
                "entity": "individus",
                "label": "Revenu disponible",
                "value_type": "float",
                "formula": true,
            },
        })
    }

    fn variable(&self, name: &str) -> Option<Value> {
        self.variables().get(name).cloned()
    }

    fn parameters(&self, names: Option<&[String]>) -> Result<Value, EngineError> {
        let all = json!({
            "cotisations.taux": {
                "description": "Taux de cotisations salariales",
                "value": CONTRIBUTION_RATE,
            },
            "prestations.enfant": {
                "description": "Prestation forfaitaire par enfant",
                "value": CHILD_BENEFIT,
            },
        });
        let Some(names) = names else {
            return Ok(all);
        };
        let mut subset = Map::new();
        for name in names {
            match all.get(name) {
                Some(parameter) => {
                    subset.insert(name.clone(), parameter.clone());
                }
                None => return Err(EngineError::UnknownVariable(name.clone())),
            }
        }
        Ok(Value::Object(subset))
    }

    fn reforms(&self) -> Value {
        Value::Object(
            self.reforms
                .iter()
                .map(|name| (name.clone(), Value::String(name.clone())))
                .collect(),
        )
    }

    fn validate_scenario(&self, raw: &Value, repair: bool) -> Result<ValidatedScenario, Value> {
        let mut errors = Map::new();
        let Some(scenario) = raw.as_object() else {
            return Err(json!("expected an object"));
        };

        let period = match scenario.get("period").and_then(Value::as_str) {
            Some(period) => period.to_string(),
            None if repair => DEFAULT_PERIOD.to_string(),
            None => {
                errors.insert("period".to_string(), json!("missing or not a string"));
                String::new()
            }
        };

        let mut individus = Vec::new();
        match scenario.get("individus").and_then(Value::as_array) {
            Some(raw_individus) if !raw_individus.is_empty() => {
                let mut individu_errors = Map::new();
                for (index, individu) in raw_individus.iter().enumerate() {
                    if individu.is_object() {
                        individus.push(individu.clone());
                    } else {
                        individu_errors.insert(index.to_string(), json!("expected an object"));
                    }
                }
                if !individu_errors.is_empty() {
                    errors.insert("individus".to_string(), Value::Object(individu_errors));
                }
            }
            _ => {
                errors.insert("individus".to_string(), json!("expected a non-empty array"));
            }
        }

        if !errors.is_empty() {
            return Err(Value::Object(errors));
        }
        Ok(ValidatedScenario {
            normalized: json!({"period": period, "individus": individus}),
        })
    }

    fn calculate(
        &self,
        scenarios: &[Arc<ValidatedScenario>],
        variables: &[String],
        trace: bool,
    ) -> Result<CalculationResult, EngineError> {
        let mut values = Vec::with_capacity(scenarios.len());
        for scenario in scenarios {
            let mut per_variable = Map::new();
            for variable in variables {
                per_variable.insert(variable.clone(), Self::compute(scenario, variable)?);
            }
            values.push(Value::Object(per_variable));
        }
        let tracebacks = trace.then(|| {
            Value::Array(
                variables
                    .iter()
                    .map(|variable| {
                        json!({
                            "name": variable,
                            "is_formula": Self::is_formula(variable),
                        })
                    })
                    .collect(),
            )
        });
        Ok(CalculationResult { values, tracebacks })
    }

    fn simulate(&self, scenarios: &[Arc<ValidatedScenario>]) -> Result<Value, EngineError> {
        let nets: Vec<Value> = scenarios
            .iter()
            .map(|scenario| Self::compute(scenario, "salaire_net"))
            .collect::<Result<_, _>>()?;
        let disposables: Vec<Value> = scenarios
            .iter()
            .map(|scenario| Self::compute(scenario, "revenu_disponible"))
            .collect::<Result<_, _>>()?;
        Ok(json!({
            "code": "revenu_disponible",
            "label": "Revenu disponible",
            "values": disposables,
            "children": [
                {"code": "salaire_net", "label": "Salaire net", "values": nets},
            ],
        }))
    }

    fn formula(
        &self,
        name: &str,
        period: Option<&str>,
        inputs: &Map<String, Value>,
    ) -> Result<Value, FormulaError> {
        if Self::is_input(name) {
            return Err(FormulaError::NotComputable(name.to_string()));
        }
        if !Self::is_formula(name) {
            return Err(FormulaError::UnknownVariable(name.to_string()));
        }

        let scalar = |input: &str| -> Result<f64, FormulaError> {
            match inputs.get(input) {
                None => Ok(0.0),
                Some(Value::Number(number)) => Ok(number.as_f64().unwrap_or(0.0)),
                Some(Value::String(text)) => {
                    text.parse().map_err(|_| FormulaError::BadInput {
                        name: input.to_string(),
                        message: format!("expected a number, got {text:?}"),
                    })
                }
                Some(other) => Err(FormulaError::BadInput {
                    name: input.to_string(),
                    message: format!("expected a number, got {other}"),
                }),
            }
        };

        let gross = scalar("salaire_brut")?;
        let value = match name {
            "salaire_net" => Self::net_from_gross(gross),
            _ => Self::net_from_gross(gross) + scalar("nb_enfants")? * CHILD_BENEFIT,
        };
        Ok(json!({
            "value": value,
            "period": period.unwrap_or(DEFAULT_PERIOD),
        }))
    }

    fn dependency_graph(&self, variable: &str) -> Option<Value> {
        let edges = match variable {
            "salaire_net" => json!([{"from": "salaire_brut", "to": "salaire_net"}]),
            "revenu_disponible" => json!([
                {"from": "salaire_brut", "to": "salaire_net"},
                {"from": "salaire_net", "to": "revenu_disponible"},
                {"from": "nb_enfants", "to": "revenu_disponible"},
            ]),
            name if Self::is_input(name) => json!([]),
            _ => return None,
        };
        Some(json!({"variable": variable, "edges": edges}))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> DemoEngine {
        DemoEngine::new(Vec::new())
    }

    fn scenario(gross: f64, children: u32) -> Arc<ValidatedScenario> {
        let raw = json!({
            "period": "2014",
            "individus": [{"salaire_brut": gross, "nb_enfants": children}],
        });
        Arc::new(engine().validate_scenario(&raw, false).unwrap())
    }

    #[test]
    fn test_identity_includes_reforms() {
        assert_eq!(engine().identity(), "demo-fr");
        let reformed = DemoEngine::new(vec!["plf2015".to_string()]);
        assert_eq!(reformed.identity(), "demo-fr+plf2015");
    }

    #[test]
    fn test_validate_reports_shape_mirroring_errors() {
        let raw = json!({"individus": [42]});
        let errors = engine().validate_scenario(&raw, false).unwrap_err();
        assert_eq!(errors["period"], "missing or not a string");
        assert_eq!(errors["individus"]["0"], "expected an object");
    }

    #[test]
    fn test_repair_fills_missing_period() {
        let raw = json!({"individus": [{"salaire_brut": 100.0}]});
        assert!(engine().validate_scenario(&raw, false).is_err());
        let validated = engine().validate_scenario(&raw, true).unwrap();
        assert_eq!(validated.normalized["period"], DEFAULT_PERIOD);
    }

    #[test]
    fn test_calculate_known_variables() {
        let result = engine()
            .calculate(&[scenario(1000.0, 2)], &["salaire_net".to_string()], false)
            .unwrap();
        assert_eq!(result.values[0]["salaire_net"], json!([780.0]));
        assert!(result.tracebacks.is_none());
    }

    #[test]
    fn test_calculate_unknown_variable() {
        let err = engine()
            .calculate(&[scenario(1000.0, 0)], &["impot_fictif".to_string()], false)
            .unwrap_err();
        assert!(matches!(err, EngineError::UnknownVariable(name) if name == "impot_fictif"));
    }

    #[test]
    fn test_formula_rejects_input_variable() {
        let err = engine()
            .formula("salaire_brut", None, &Map::new())
            .unwrap_err();
        assert!(matches!(err, FormulaError::NotComputable(_)));
    }

    #[test]
    fn test_formula_computes_from_scalars() {
        let mut inputs = Map::new();
        inputs.insert("salaire_brut".to_string(), json!("2000"));
        let result = engine().formula("salaire_net", Some("2014-01"), &inputs).unwrap();
        assert_eq!(result["value"], 1560.0);
        assert_eq!(result["period"], "2014-01");
    }

    #[test]
    fn test_formula_bad_scalar_input() {
        let mut inputs = Map::new();
        inputs.insert("salaire_brut".to_string(), json!("beaucoup"));
        let err = engine().formula("salaire_net", None, &inputs).unwrap_err();
        assert!(matches!(err, FormulaError::BadInput { name, .. } if name == "salaire_brut"));
    }

    #[test]
    fn test_dependency_graph() {
        let graph = engine().dependency_graph("revenu_disponible").unwrap();
        assert_eq!(graph["edges"].as_array().unwrap().len(), 3);
        assert!(engine().dependency_graph("inconnu").is_none());
    }
}
