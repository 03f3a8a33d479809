//! The immutable discrete causal model and its construction.
//!
//! - `builder`: declarative network description (`NetworkSpec`) and the fluent
//!   `NetworkBuilder`, both validated into a [`DiscreteCausalModel`].
//!
//! Once built, variables are stored in topological order so that every parent
//! precedes its children; inference and sampling rely on that ordering.

mod builder;

pub use builder::{Edge, NetworkBuilder, NetworkSpec};

use std::collections::HashMap;

use crate::error::ModelError;
use crate::model::Variable;

/// Upper bound on the number of joint assignments the exact engine enumerates.
pub const MAX_JOINT_ASSIGNMENTS: usize = 1 << 20;

/// Conditional table resolved against variable indices.
#[derive(Debug, Clone)]
pub(crate) struct ResolvedTable {
    parents: Vec<usize>,
    strides: Vec<usize>,
    cardinality: usize,
    probabilities: Vec<f64>,
}

impl ResolvedTable {
    pub(crate) fn new(
        parents: Vec<usize>,
        parent_cards: &[usize],
        cardinality: usize,
        probabilities: Vec<f64>,
    ) -> Self {
        let mut strides = vec![1; parents.len()];
        for idx in (0..parents.len().saturating_sub(1)).rev() {
            strides[idx] = strides[idx + 1] * parent_cards[idx + 1];
        }
        Self {
            parents,
            strides,
            cardinality,
            probabilities,
        }
    }

    fn row_offset(&self, assignment: &[usize]) -> usize {
        let row: usize = self
            .parents
            .iter()
            .zip(&self.strides)
            .map(|(parent, stride)| assignment[*parent] * stride)
            .sum();
        row * self.cardinality
    }

    /// Distribution over the variable's states given the parents in `assignment`.
    pub(crate) fn row(&self, assignment: &[usize]) -> &[f64] {
        let offset = self.row_offset(assignment);
        &self.probabilities[offset..offset + self.cardinality]
    }
}

/// Discrete Bayesian network with fixed structure and tables.
///
/// Instances are immutable after construction, so shared references can be
/// queried from several threads at once.
#[derive(Debug, Clone)]
pub struct DiscreteCausalModel {
    variables: Vec<Variable>,
    index: HashMap<String, usize>,
    tables: Vec<ResolvedTable>,
    joint_assignments: usize,
}

impl DiscreteCausalModel {
    pub(crate) fn from_parts(
        variables: Vec<Variable>,
        tables: Vec<ResolvedTable>,
        joint_assignments: usize,
    ) -> Self {
        let index = variables
            .iter()
            .enumerate()
            .map(|(idx, var)| (var.name().to_string(), idx))
            .collect();
        Self {
            variables,
            index,
            tables,
            joint_assignments,
        }
    }

    /// Variables in topological order.
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.index.get(name).map(|idx| &self.variables[*idx])
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Size of the full joint state space.
    pub fn joint_assignments(&self) -> usize {
        self.joint_assignments
    }

    /// Parent names of `name`, in the order its table is conditioned on.
    pub fn parents(&self, name: &str) -> Result<Vec<&str>, ModelError> {
        let idx = self.index_of(name)?;
        Ok(self.tables[idx]
            .parents
            .iter()
            .map(|parent| self.variables[*parent].name())
            .collect())
    }

    /// Names of variables that list `name` as a parent.
    pub fn children(&self, name: &str) -> Result<Vec<&str>, ModelError> {
        let idx = self.index_of(name)?;
        Ok(self
            .tables
            .iter()
            .enumerate()
            .filter(|(_, table)| table.parents.contains(&idx))
            .map(|(child, _)| self.variables[child].name())
            .collect())
    }

    pub(crate) fn index_of(&self, name: &str) -> Result<usize, ModelError> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| ModelError::UnknownVariable {
                name: name.to_string(),
            })
    }

    pub(crate) fn table(&self, idx: usize) -> &ResolvedTable {
        &self.tables[idx]
    }

    /// P(variable = assignment[variable] | parents as in assignment).
    pub(crate) fn local_probability(&self, idx: usize, assignment: &[usize]) -> f64 {
        self.tables[idx].row(assignment)[assignment[idx]]
    }
}
