//! Scenario comparison on a single outcome state.
//!
//! A scenario fixes some variables by conditioning, not by graph surgery, so
//! "interventions" here are evidence assignments compared side by side.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

use crate::error::ModelError;
use crate::model::{Distribution, Evidence};
use crate::network::DiscreteCausalModel;

/// A named set of fixed conditions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    #[serde(default)]
    pub evidence: Evidence,
}

impl Scenario {
    pub fn new(name: impl Into<String>, evidence: Evidence) -> Self {
        Self {
            name: name.into(),
            evidence,
        }
    }

    pub fn is_baseline(&self) -> bool {
        self.evidence.is_empty()
    }
}

/// Variable/state pair whose probability scenarios are ranked by.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeTarget {
    pub variable: String,
    pub state: String,
}

impl OutcomeTarget {
    pub fn new(variable: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            variable: variable.into(),
            state: state.into(),
        }
    }
}

/// Predicted outcome under one scenario.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioImpact {
    pub scenario: String,
    pub probability: f64,
    pub distribution: Distribution,
}

impl DiscreteCausalModel {
    /// Probability of `outcome` under each scenario, in input order.
    pub fn predict_intervention_impact(
        &self,
        outcome: &OutcomeTarget,
        scenarios: &[Scenario],
    ) -> Result<Vec<ScenarioImpact>, ModelError> {
        let variable = self
            .variable(&outcome.variable)
            .ok_or_else(|| ModelError::UnknownVariable {
                name: outcome.variable.clone(),
            })?;
        if variable.state_index(&outcome.state).is_none() {
            return Err(ModelError::InvalidState {
                variable: outcome.variable.clone(),
                state: outcome.state.clone(),
            });
        }

        let mut seen = HashSet::with_capacity(scenarios.len());
        for scenario in scenarios {
            if !seen.insert(scenario.name.as_str()) {
                return Err(ModelError::DuplicateScenario {
                    name: scenario.name.clone(),
                });
            }
        }

        let target = [outcome.variable.as_str()];
        let mut impacts = Vec::with_capacity(scenarios.len());
        for scenario in scenarios {
            let distribution = self
                .query(&target, &scenario.evidence)?
                .into_distributions()
                .into_iter()
                .next()
                .ok_or(ModelError::EmptyTargets)?;
            let probability = distribution.probability(&outcome.state).unwrap_or(0.0);
            debug!(
                scenario = %scenario.name,
                outcome = %outcome.variable,
                state = %outcome.state,
                probability,
                "scenario evaluated"
            );
            impacts.push(ScenarioImpact {
                scenario: scenario.name.clone(),
                probability,
                distribution,
            });
        }
        Ok(impacts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::NetworkBuilder;

    fn chain() -> DiscreteCausalModel {
        NetworkBuilder::new()
            .variable("Funding", ["No", "Yes"])
            .variable("Coverage", ["Low", "High"])
            .edge("Funding", "Coverage")
            .prior("Funding", vec![0.5, 0.5])
            .table("Coverage", ["Funding"], vec![vec![0.8, 0.2], vec![0.4, 0.6]])
            .build()
            .expect("valid network")
    }

    #[test]
    fn preserves_scenario_order() {
        let model = chain();
        let outcome = OutcomeTarget::new("Coverage", "High");
        let scenarios = vec![
            Scenario::new("funded", Evidence::new().with("Funding", "Yes")),
            Scenario::new("baseline", Evidence::new()),
        ];
        let impacts = model
            .predict_intervention_impact(&outcome, &scenarios)
            .expect("impacts");
        assert_eq!(impacts[0].scenario, "funded");
        assert!((impacts[0].probability - 0.6).abs() < 1e-12);
        assert_eq!(impacts[1].scenario, "baseline");
        assert!((impacts[1].probability - 0.4).abs() < 1e-12);
        assert!(scenarios[1].is_baseline());
    }

    #[test]
    fn rejects_bad_outcome_and_duplicate_names() {
        let model = chain();
        let baseline = vec![Scenario::new("baseline", Evidence::new())];

        let err = model
            .predict_intervention_impact(&OutcomeTarget::new("Coverage", "Medium"), &baseline)
            .expect_err("unknown state");
        assert!(matches!(err, ModelError::InvalidState { .. }));

        let err = model
            .predict_intervention_impact(&OutcomeTarget::new("Speed", "High"), &baseline)
            .expect_err("unknown variable");
        assert!(matches!(err, ModelError::UnknownVariable { name } if name == "Speed"));

        let twice = vec![baseline[0].clone(), baseline[0].clone()];
        let err = model
            .predict_intervention_impact(&OutcomeTarget::new("Coverage", "High"), &twice)
            .expect_err("duplicate");
        assert!(matches!(err, ModelError::DuplicateScenario { .. }));
    }

    #[test]
    fn scenario_fixing_the_outcome_conflicts() {
        let model = chain();
        let scenarios = vec![Scenario::new(
            "forced",
            Evidence::new().with("Coverage", "High"),
        )];
        let err = model
            .predict_intervention_impact(&OutcomeTarget::new("Coverage", "High"), &scenarios)
            .expect_err("conflict");
        assert!(matches!(err, ModelError::ConflictingEvidence { .. }));
    }
}
