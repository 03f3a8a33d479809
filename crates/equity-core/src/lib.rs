//! Discrete causal model for digital-equity analysis.
//!
//! A [`DiscreteCausalModel`] is a Bayesian network over named discrete
//! variables. It answers exact posterior queries, compares named evidence
//! scenarios on an outcome state, and offers a seeded likelihood-weighting
//! estimator for cross-checks.

pub mod digital_divide;
pub mod error;
pub mod inference;
pub mod model;
pub mod network;

pub use error::{ModelError, ValidationError};
pub use inference::{
    InferenceResult, LikelihoodWeighting, OutcomeTarget, SampledEstimate, Scenario,
    ScenarioImpact,
};
pub use model::{ConditionalProbabilityTable, Distribution, Evidence, StateProbability, Variable};
pub use network::{DiscreteCausalModel, Edge, NetworkBuilder, NetworkSpec};
