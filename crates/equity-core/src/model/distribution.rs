use serde::Serialize;

/// Probability mass assigned to a single state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateProbability {
    pub state: String,
    pub probability: f64,
}

/// Distribution over the states of one variable, in declared state order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Distribution {
    variable: String,
    states: Vec<StateProbability>,
}

impl Distribution {
    pub(crate) fn from_parts(variable: &str, states: &[String], mass: &[f64]) -> Self {
        Self {
            variable: variable.to_string(),
            states: states
                .iter()
                .zip(mass)
                .map(|(state, probability)| StateProbability {
                    state: state.clone(),
                    probability: *probability,
                })
                .collect(),
        }
    }

    pub fn variable(&self) -> &str {
        &self.variable
    }

    pub fn probability(&self, state: &str) -> Option<f64> {
        self.states
            .iter()
            .find(|entry| entry.state == state)
            .map(|entry| entry.probability)
    }

    pub fn iter(&self) -> impl Iterator<Item = &StateProbability> {
        self.states.iter()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.states.iter().map(|entry| entry.probability).sum()
    }

    /// State with the highest probability; ties resolve to the earliest state.
    pub fn most_likely(&self) -> Option<&StateProbability> {
        self.states.iter().fold(None, |best, entry| match best {
            Some(current) if current.probability >= entry.probability => Some(current),
            _ => Some(entry),
        })
    }
}
