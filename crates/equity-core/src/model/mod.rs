//! Plain data types describing variables, tables, evidence and posteriors.

pub mod cpt;
pub mod distribution;
pub mod evidence;
pub mod variable;

pub use cpt::ConditionalProbabilityTable;
pub use distribution::{Distribution, StateProbability};
pub use evidence::Evidence;
pub use variable::Variable;

/// Tolerance used when checking that a distribution sums to one.
pub const PROBABILITY_TOLERANCE: f64 = 1e-6;
