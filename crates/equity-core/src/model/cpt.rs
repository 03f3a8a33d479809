use serde::{Deserialize, Serialize};

/// Conditional distribution of one variable given its parents.
///
/// Rows enumerate parent-state combinations in row-major order over
/// `parents` (the last parent varies fastest); each row is a distribution
/// over the variable's own states. A root variable has no parents and a
/// single row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionalProbabilityTable {
    variable: String,
    #[serde(default)]
    parents: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl ConditionalProbabilityTable {
    pub fn new<P>(
        variable: impl Into<String>,
        parents: impl IntoIterator<Item = P>,
        rows: Vec<Vec<f64>>,
    ) -> Self
    where
        P: Into<String>,
    {
        Self {
            variable: variable.into(),
            parents: parents.into_iter().map(Into::into).collect(),
            rows,
        }
    }

    /// Unconditional table for a root variable.
    pub fn prior(variable: impl Into<String>, probabilities: Vec<f64>) -> Self {
        Self {
            variable: variable.into(),
            parents: Vec::new(),
            rows: vec![probabilities],
        }
    }

    pub fn variable(&self) -> &str {
        &self.variable
    }

    pub fn parents(&self) -> &[String] {
        &self.parents
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }
}
