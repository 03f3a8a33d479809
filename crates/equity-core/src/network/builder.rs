//! Declarative network descriptions and their validation.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::debug;

use super::{DiscreteCausalModel, MAX_JOINT_ASSIGNMENTS, ResolvedTable};
use crate::error::{ModelError, ValidationError};
use crate::model::{ConditionalProbabilityTable, PROBABILITY_TOLERANCE, Variable};

/// Directed dependency `parent -> child`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub parent: String,
    pub child: String,
}

impl Edge {
    pub fn new(parent: impl Into<String>, child: impl Into<String>) -> Self {
        Self {
            parent: parent.into(),
            child: child.into(),
        }
    }
}

/// Plain-data description of a network, suitable for loading from configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkSpec {
    pub variables: Vec<Variable>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    pub tables: Vec<ConditionalProbabilityTable>,
}

impl NetworkSpec {
    /// Validates the description and builds the immutable model.
    pub fn build(&self) -> Result<DiscreteCausalModel, ModelError> {
        let declared = index_variables(&self.variables)?;
        let graph_parents = resolve_edges(&self.edges, &declared, self.variables.len())?;
        let order = topological_order(&graph_parents, &self.variables)?;
        // Bounds every table's row count, so it must run before the tables are sized.
        let joint_assignments = joint_size(&self.variables)?;
        let tables = resolve_tables(&self.tables, &self.variables, &declared, &graph_parents)?;

        // Re-index everything so parents precede children.
        let mut position = vec![0usize; order.len()];
        for (pos, original) in order.iter().enumerate() {
            position[*original] = pos;
        }

        let mut variables = Vec::with_capacity(order.len());
        let mut resolved = Vec::with_capacity(order.len());
        for original in &order {
            let (parents, probabilities) = &tables[*original];
            let parent_cards: Vec<usize> = parents
                .iter()
                .map(|parent| self.variables[*parent].cardinality())
                .collect();
            let remapped = parents.iter().map(|parent| position[*parent]).collect();
            let cardinality = self.variables[*original].cardinality();
            resolved.push(ResolvedTable::new(
                remapped,
                &parent_cards,
                cardinality,
                probabilities.clone(),
            ));
            variables.push(self.variables[*original].clone());
        }

        debug!(
            variables = variables.len(),
            edges = self.edges.len(),
            joint_assignments,
            "built discrete causal model"
        );

        Ok(DiscreteCausalModel::from_parts(
            variables,
            resolved,
            joint_assignments,
        ))
    }
}

/// Fluent construction of a [`NetworkSpec`].
#[derive(Debug, Clone, Default)]
pub struct NetworkBuilder {
    spec: NetworkSpec,
}

impl NetworkBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_spec(spec: NetworkSpec) -> Self {
        Self { spec }
    }

    pub fn variable<S>(
        mut self,
        name: impl Into<String>,
        states: impl IntoIterator<Item = S>,
    ) -> Self
    where
        S: Into<String>,
    {
        self.spec.variables.push(Variable::new(name, states));
        self
    }

    pub fn edge(mut self, parent: impl Into<String>, child: impl Into<String>) -> Self {
        self.spec.edges.push(Edge::new(parent, child));
        self
    }

    pub fn prior(mut self, variable: impl Into<String>, probabilities: Vec<f64>) -> Self {
        self.spec
            .tables
            .push(ConditionalProbabilityTable::prior(variable, probabilities));
        self
    }

    pub fn table<P>(
        mut self,
        variable: impl Into<String>,
        parents: impl IntoIterator<Item = P>,
        rows: Vec<Vec<f64>>,
    ) -> Self
    where
        P: Into<String>,
    {
        self.spec
            .tables
            .push(ConditionalProbabilityTable::new(variable, parents, rows));
        self
    }

    pub fn spec(&self) -> &NetworkSpec {
        &self.spec
    }

    pub fn into_spec(self) -> NetworkSpec {
        self.spec
    }

    pub fn build(self) -> Result<DiscreteCausalModel, ModelError> {
        self.spec.build()
    }
}

fn index_variables(variables: &[Variable]) -> Result<HashMap<&str, usize>, ValidationError> {
    if variables.is_empty() {
        return Err(ValidationError::EmptyNetwork);
    }

    let mut declared = HashMap::with_capacity(variables.len());
    for (idx, var) in variables.iter().enumerate() {
        var.validate()?;
        if declared.insert(var.name(), idx).is_some() {
            return Err(ValidationError::DuplicateVariable {
                name: var.name().to_string(),
            });
        }
    }
    Ok(declared)
}

fn resolve_edges(
    edges: &[Edge],
    declared: &HashMap<&str, usize>,
    count: usize,
) -> Result<Vec<BTreeSet<usize>>, ValidationError> {
    let mut parents = vec![BTreeSet::new(); count];
    for edge in edges {
        let (Some(parent), Some(child)) = (
            declared.get(edge.parent.as_str()),
            declared.get(edge.child.as_str()),
        ) else {
            return Err(ValidationError::UnknownEdgeEndpoint {
                parent: edge.parent.clone(),
                child: edge.child.clone(),
            });
        };
        if !parents[*child].insert(*parent) {
            return Err(ValidationError::DuplicateEdge {
                parent: edge.parent.clone(),
                child: edge.child.clone(),
            });
        }
    }
    Ok(parents)
}

/// Kahn's algorithm, releasing ready variables in declaration order.
fn topological_order(
    parents: &[BTreeSet<usize>],
    variables: &[Variable],
) -> Result<Vec<usize>, ValidationError> {
    let mut pending: Vec<usize> = parents.iter().map(BTreeSet::len).collect();
    let mut children = vec![Vec::new(); parents.len()];
    for (child, set) in parents.iter().enumerate() {
        for parent in set {
            children[*parent].push(child);
        }
    }

    let mut ready: BTreeSet<usize> = pending
        .iter()
        .enumerate()
        .filter(|(_, count)| **count == 0)
        .map(|(idx, _)| idx)
        .collect();
    let mut order = Vec::with_capacity(parents.len());

    while let Some(next) = ready.pop_first() {
        order.push(next);
        for child in &children[next] {
            pending[*child] -= 1;
            if pending[*child] == 0 {
                ready.insert(*child);
            }
        }
    }

    if order.len() != parents.len() {
        let members = cycle_members(parents, &pending);
        return Err(ValidationError::Cycle {
            variables: members
                .into_iter()
                .map(|idx| variables[idx].name().to_string())
                .collect(),
        });
    }
    Ok(order)
}

/// Walks parent links among unresolved variables until one repeats.
///
/// Every unresolved variable keeps at least one unresolved parent, so the walk
/// always closes a loop. Descendants of the cycle are left out.
fn cycle_members(parents: &[BTreeSet<usize>], pending: &[usize]) -> Vec<usize> {
    let Some(start) = pending.iter().position(|count| *count > 0) else {
        return Vec::new();
    };

    let mut visited_at: Vec<Option<usize>> = vec![None; parents.len()];
    let mut path = Vec::new();
    let mut current = start;
    while visited_at[current].is_none() {
        visited_at[current] = Some(path.len());
        path.push(current);
        match parents[current].iter().find(|p| pending[**p] > 0) {
            Some(parent) => current = *parent,
            None => return Vec::new(),
        }
    }

    let loop_start = visited_at[current].unwrap_or(0);
    let mut members = path.split_off(loop_start);
    members.sort_unstable();
    members
}

type ResolvedRows = (Vec<usize>, Vec<f64>);

fn resolve_tables(
    tables: &[ConditionalProbabilityTable],
    variables: &[Variable],
    declared: &HashMap<&str, usize>,
    graph_parents: &[BTreeSet<usize>],
) -> Result<Vec<ResolvedRows>, ValidationError> {
    let mut resolved: Vec<Option<ResolvedRows>> = vec![None; variables.len()];

    for table in tables {
        let Some(&idx) = declared.get(table.variable()) else {
            return Err(ValidationError::TableForUnknownVariable {
                variable: table.variable().to_string(),
            });
        };
        if resolved[idx].is_some() {
            return Err(ValidationError::DuplicateTable {
                variable: table.variable().to_string(),
            });
        }

        let mut parents = Vec::with_capacity(table.parents().len());
        for parent in table.parents() {
            let parent_idx =
                declared
                    .get(parent.as_str())
                    .ok_or_else(|| ValidationError::UnknownParent {
                        variable: table.variable().to_string(),
                        parent: parent.clone(),
                    })?;
            parents.push(*parent_idx);
        }

        let unique: HashSet<usize> = parents.iter().copied().collect();
        let graph = &graph_parents[idx];
        let matches_graph = unique.len() == parents.len()
            && unique.len() == graph.len()
            && graph.iter().all(|p| unique.contains(p));
        if !matches_graph {
            return Err(ValidationError::ParentMismatch {
                variable: table.variable().to_string(),
                graph: graph
                    .iter()
                    .map(|p| variables[*p].name().to_string())
                    .collect(),
                table: table.parents().to_vec(),
            });
        }

        let expected_rows: usize = parents
            .iter()
            .map(|p| variables[*p].cardinality())
            .product();
        let cardinality = variables[idx].cardinality();
        let probabilities = check_rows(table, expected_rows, cardinality)?;
        resolved[idx] = Some((parents, probabilities));
    }

    resolved
        .into_iter()
        .enumerate()
        .map(|(idx, entry)| {
            entry.ok_or_else(|| ValidationError::MissingTable {
                variable: variables[idx].name().to_string(),
            })
        })
        .collect()
}

fn check_rows(
    table: &ConditionalProbabilityTable,
    expected_rows: usize,
    cardinality: usize,
) -> Result<Vec<f64>, ValidationError> {
    let variable = table.variable().to_string();
    if table.rows().len() != expected_rows {
        return Err(ValidationError::RowCount {
            variable,
            expected: expected_rows,
            found: table.rows().len(),
        });
    }

    let mut flat = Vec::with_capacity(expected_rows * cardinality);
    for (row_idx, row) in table.rows().iter().enumerate() {
        if row.len() != cardinality {
            return Err(ValidationError::RowWidth {
                variable,
                row: row_idx,
                expected: cardinality,
                found: row.len(),
            });
        }
        if let Some(bad) = row.iter().find(|p| !p.is_finite() || **p < 0.0) {
            return Err(ValidationError::InvalidProbability {
                variable,
                row: row_idx,
                value: *bad,
            });
        }
        let sum: f64 = row.iter().sum();
        if (sum - 1.0).abs() > PROBABILITY_TOLERANCE {
            return Err(ValidationError::RowSum {
                variable,
                row: row_idx,
                sum,
            });
        }
        flat.extend_from_slice(row);
    }
    Ok(flat)
}

fn joint_size(variables: &[Variable]) -> Result<usize, ValidationError> {
    variables
        .iter()
        .try_fold(1usize, |acc, var| acc.checked_mul(var.cardinality()))
        .filter(|size| *size <= MAX_JOINT_ASSIGNMENTS)
        .ok_or(ValidationError::StateSpaceTooLarge {
            limit: MAX_JOINT_ASSIGNMENTS,
        })
}
