use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::ValidationError;

/// A named discrete random variable with an ordered set of states.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    name: String,
    states: Vec<String>,
}

impl Variable {
    pub fn new<S>(name: impl Into<String>, states: impl IntoIterator<Item = S>) -> Self
    where
        S: Into<String>,
    {
        Self {
            name: name.into(),
            states: states.into_iter().map(Into::into).collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn states(&self) -> &[String] {
        &self.states
    }

    pub fn cardinality(&self) -> usize {
        self.states.len()
    }

    /// Position of `state` in the declared ordering.
    pub fn state_index(&self, state: &str) -> Option<usize> {
        self.states.iter().position(|candidate| candidate == state)
    }

    pub fn state(&self, index: usize) -> Option<&str> {
        self.states.get(index).map(String::as_str)
    }

    pub(crate) fn validate(&self) -> Result<(), ValidationError> {
        if self.states.len() < 2 {
            return Err(ValidationError::TooFewStates {
                variable: self.name.clone(),
                found: self.states.len(),
            });
        }

        let mut seen = HashSet::new();
        for state in &self.states {
            if !seen.insert(state.as_str()) {
                return Err(ValidationError::DuplicateState {
                    variable: self.name.clone(),
                    state: state.clone(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_lookup_follows_declaration_order() {
        let var = Variable::new("Services", ["Weak", "Strong"]);
        assert_eq!(var.cardinality(), 2);
        assert_eq!(var.state_index("Strong"), Some(1));
        assert_eq!(var.state_index("strong"), None);
        assert_eq!(var.state(0), Some("Weak"));
        assert_eq!(var.state(2), None);
    }

    #[test]
    fn rejects_single_state_and_duplicates() {
        let single = Variable::new("Flag", ["On"]);
        assert!(matches!(
            single.validate(),
            Err(ValidationError::TooFewStates { found: 1, .. })
        ));

        let dup = Variable::new("Flag", ["On", "On"]);
        assert!(matches!(
            dup.validate(),
            Err(ValidationError::DuplicateState { state, .. }) if state == "On"
        ));
    }
}
