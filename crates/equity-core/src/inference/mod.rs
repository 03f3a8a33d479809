//! Exact and approximate inference over a [`DiscreteCausalModel`].
//!
//! Exact queries enumerate every joint assignment of the unobserved variables
//! and sum the chain-rule product of the local tables. At the sizes this crate
//! accepts (see [`MAX_JOINT_ASSIGNMENTS`](crate::network::MAX_JOINT_ASSIGNMENTS))
//! that is both simpler and fast enough compared with variable elimination.
//!
//! - `intervention`: named evidence scenarios compared on a single outcome state.
//! - `sampling`: seeded likelihood-weighting estimates used as a cross-check.

pub mod intervention;
pub mod sampling;

pub use intervention::{OutcomeTarget, Scenario, ScenarioImpact};
pub use sampling::{LikelihoodWeighting, SampledEstimate};

use serde::Serialize;
use tracing::debug;

use crate::error::ModelError;
use crate::model::{Distribution, Evidence};
use crate::network::DiscreteCausalModel;

/// Posterior distributions for a set of query targets.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InferenceResult {
    evidence: Evidence,
    posteriors: Vec<Distribution>,
}

impl InferenceResult {
    pub fn evidence(&self) -> &Evidence {
        &self.evidence
    }

    pub fn get(&self, variable: &str) -> Option<&Distribution> {
        self.posteriors
            .iter()
            .find(|dist| dist.variable() == variable)
    }

    /// Posteriors in the order the targets were requested.
    pub fn iter(&self) -> impl Iterator<Item = &Distribution> {
        self.posteriors.iter()
    }

    pub fn len(&self) -> usize {
        self.posteriors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posteriors.is_empty()
    }

    pub fn into_distributions(self) -> Vec<Distribution> {
        self.posteriors
    }
}

impl DiscreteCausalModel {
    /// Exact posterior marginals of `targets` given `evidence`.
    pub fn query<S>(
        &self,
        targets: &[S],
        evidence: &Evidence,
    ) -> Result<InferenceResult, ModelError>
    where
        S: AsRef<str>,
    {
        let targets = self.resolve_targets(targets)?;
        let clamped = self.resolve_evidence(evidence)?;
        if let Some(conflict) = targets.iter().find(|idx| clamped[**idx].is_some()) {
            return Err(ModelError::ConflictingEvidence {
                variable: self.variables()[*conflict].name().to_string(),
            });
        }

        let mut mass: Vec<Vec<f64>> = targets
            .iter()
            .map(|idx| vec![0.0; self.variables()[*idx].cardinality()])
            .collect();
        let mut total = 0.0;
        self.enumerate(&clamped, |assignment, weight| {
            total += weight;
            for (slot, idx) in targets.iter().enumerate() {
                mass[slot][assignment[*idx]] += weight;
            }
        });

        if total <= 0.0 {
            return Err(ModelError::ImpossibleEvidence);
        }

        let posteriors = targets
            .iter()
            .zip(&mut mass)
            .map(|(idx, weights)| {
                weights.iter_mut().for_each(|w| *w /= total);
                let var = &self.variables()[*idx];
                Distribution::from_parts(var.name(), var.states(), weights)
            })
            .collect();

        debug!(
            targets = targets.len(),
            evidence = evidence.len(),
            evidence_probability = total,
            "exact query complete"
        );

        Ok(InferenceResult {
            evidence: evidence.clone(),
            posteriors,
        })
    }

    /// Unconditional distribution of every variable, in topological order.
    pub fn marginals(&self) -> Result<InferenceResult, ModelError> {
        let names: Vec<&str> = self.variables().iter().map(|var| var.name()).collect();
        self.query(names.as_slice(), &Evidence::new())
    }

    /// Joint probability of the observations in `evidence`.
    pub fn probability_of_evidence(&self, evidence: &Evidence) -> Result<f64, ModelError> {
        let clamped = self.resolve_evidence(evidence)?;
        let mut total = 0.0;
        self.enumerate(&clamped, |_, weight| total += weight);
        Ok(total)
    }

    /// Resolves target names, dropping repeats while keeping first-seen order.
    pub(crate) fn resolve_targets<S>(&self, targets: &[S]) -> Result<Vec<usize>, ModelError>
    where
        S: AsRef<str>,
    {
        if targets.is_empty() {
            return Err(ModelError::EmptyTargets);
        }
        let mut resolved = Vec::with_capacity(targets.len());
        for name in targets {
            let idx = self.index_of(name.as_ref())?;
            if !resolved.contains(&idx) {
                resolved.push(idx);
            }
        }
        Ok(resolved)
    }

    /// Maps evidence onto a per-variable clamp in topological order.
    pub(crate) fn resolve_evidence(
        &self,
        evidence: &Evidence,
    ) -> Result<Vec<Option<usize>>, ModelError> {
        let mut clamped = vec![None; self.len()];
        for (name, state) in evidence.iter() {
            let idx = self.index_of(name)?;
            let state_idx = self.variables()[idx].state_index(state).ok_or_else(|| {
                ModelError::InvalidState {
                    variable: name.to_string(),
                    state: state.to_string(),
                }
            })?;
            clamped[idx] = Some(state_idx);
        }
        Ok(clamped)
    }

    /// Visits every assignment consistent with `clamped` with its joint probability.
    fn enumerate<F>(&self, clamped: &[Option<usize>], mut visit: F)
    where
        F: FnMut(&[usize], f64),
    {
        let mut assignment: Vec<usize> = clamped.iter().map(|c| c.unwrap_or(0)).collect();
        let free: Vec<usize> = (0..self.len()).filter(|idx| clamped[*idx].is_none()).collect();

        loop {
            let weight = (0..self.len())
                .map(|idx| self.local_probability(idx, &assignment))
                .product::<f64>();
            if weight > 0.0 {
                visit(&assignment, weight);
            }

            // Odometer increment over the free variables.
            let mut advanced = false;
            for idx in free.iter().rev() {
                assignment[*idx] += 1;
                if assignment[*idx] < self.variables()[*idx].cardinality() {
                    advanced = true;
                    break;
                }
                assignment[*idx] = 0;
            }
            if !advanced {
                break;
            }
        }
    }
}
