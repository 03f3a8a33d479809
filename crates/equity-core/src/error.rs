//! Error types shared by network construction and inference.

use std::fmt;

/// Problems detected while turning a network description into a model.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    EmptyNetwork,
    DuplicateVariable {
        name: String,
    },
    TooFewStates {
        variable: String,
        found: usize,
    },
    DuplicateState {
        variable: String,
        state: String,
    },
    UnknownEdgeEndpoint {
        parent: String,
        child: String,
    },
    DuplicateEdge {
        parent: String,
        child: String,
    },
    Cycle {
        variables: Vec<String>,
    },
    TableForUnknownVariable {
        variable: String,
    },
    DuplicateTable {
        variable: String,
    },
    MissingTable {
        variable: String,
    },
    UnknownParent {
        variable: String,
        parent: String,
    },
    ParentMismatch {
        variable: String,
        graph: Vec<String>,
        table: Vec<String>,
    },
    RowCount {
        variable: String,
        expected: usize,
        found: usize,
    },
    RowWidth {
        variable: String,
        row: usize,
        expected: usize,
        found: usize,
    },
    InvalidProbability {
        variable: String,
        row: usize,
        value: f64,
    },
    RowSum {
        variable: String,
        row: usize,
        sum: f64,
    },
    StateSpaceTooLarge {
        limit: usize,
    },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyNetwork => write!(f, "network declares no variables"),
            ValidationError::DuplicateVariable { name } => {
                write!(f, "variable '{name}' is declared more than once")
            }
            ValidationError::TooFewStates { variable, found } => write!(
                f,
                "variable '{variable}' needs at least two states but declares {found}"
            ),
            ValidationError::DuplicateState { variable, state } => {
                write!(f, "variable '{variable}' declares state '{state}' twice")
            }
            ValidationError::UnknownEdgeEndpoint { parent, child } => {
                write!(f, "edge {parent} -> {child} references an undeclared variable")
            }
            ValidationError::DuplicateEdge { parent, child } => {
                write!(f, "edge {parent} -> {child} is declared more than once")
            }
            ValidationError::Cycle { variables } => write!(
                f,
                "dependency graph contains a cycle through {}",
                variables.join(", ")
            ),
            ValidationError::TableForUnknownVariable { variable } => {
                write!(f, "probability table given for undeclared variable '{variable}'")
            }
            ValidationError::DuplicateTable { variable } => {
                write!(f, "variable '{variable}' has more than one probability table")
            }
            ValidationError::MissingTable { variable } => {
                write!(f, "variable '{variable}' has no probability table")
            }
            ValidationError::UnknownParent { variable, parent } => write!(
                f,
                "table for '{variable}' references parent '{parent}' which is not in the graph"
            ),
            ValidationError::ParentMismatch {
                variable,
                graph,
                table,
            } => write!(
                f,
                "table for '{variable}' is conditioned on [{}] but the graph parents are [{}]",
                table.join(", "),
                graph.join(", ")
            ),
            ValidationError::RowCount {
                variable,
                expected,
                found,
            } => write!(
                f,
                "table for '{variable}' has {found} rows, expected {expected}"
            ),
            ValidationError::RowWidth {
                variable,
                row,
                expected,
                found,
            } => write!(
                f,
                "row {row} of '{variable}' has {found} entries, expected {expected}"
            ),
            ValidationError::InvalidProbability {
                variable,
                row,
                value,
            } => write!(f, "row {row} of '{variable}' contains invalid probability {value}"),
            ValidationError::RowSum { variable, row, sum } => {
                write!(f, "row {row} of '{variable}' sums to {sum}, expected 1")
            }
            ValidationError::StateSpaceTooLarge { limit } => write!(
                f,
                "joint state space exceeds the enumeration limit of {limit} assignments"
            ),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Errors returned by model construction and queries.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    Validation(ValidationError),
    UnknownVariable { name: String },
    InvalidState { variable: String, state: String },
    ConflictingEvidence { variable: String },
    EmptyTargets,
    ImpossibleEvidence,
    DuplicateScenario { name: String },
    NoSamples,
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::Validation(err) => write!(f, "invalid network: {err}"),
            ModelError::UnknownVariable { name } => write!(f, "unknown variable '{name}'"),
            ModelError::InvalidState { variable, state } => {
                write!(f, "'{state}' is not a state of variable '{variable}'")
            }
            ModelError::ConflictingEvidence { variable } => write!(
                f,
                "variable '{variable}' is both a query target and observed evidence"
            ),
            ModelError::EmptyTargets => write!(f, "query requires at least one target variable"),
            ModelError::ImpossibleEvidence => {
                write!(f, "evidence has zero probability under the model")
            }
            ModelError::DuplicateScenario { name } => {
                write!(f, "scenario '{name}' is listed more than once")
            }
            ModelError::NoSamples => write!(f, "sample count must be greater than zero"),
        }
    }
}

impl std::error::Error for ModelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ModelError::Validation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for ModelError {
    fn from(err: ValidationError) -> Self {
        ModelError::Validation(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_surface_through_model_error() {
        let err: ModelError = ValidationError::MissingTable {
            variable: "Income".into(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "invalid network: variable 'Income' has no probability table"
        );
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn cycle_lists_participants() {
        let err = ValidationError::Cycle {
            variables: vec!["A".into(), "B".into()],
        };
        assert_eq!(err.to_string(), "dependency graph contains a cycle through A, B");
    }
}
