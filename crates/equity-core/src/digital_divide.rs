//! The digital-divide network: infrastructure, income and education drive
//! availability, affordability and aspiration, which together determine
//! internet access; access and support services determine digital inclusion.

use crate::error::ModelError;
use crate::inference::{OutcomeTarget, Scenario};
use crate::model::Evidence;
use crate::network::{DiscreteCausalModel, NetworkBuilder, NetworkSpec};

pub const INFRASTRUCTURE: &str = "Infrastructure";
pub const AVAILABILITY: &str = "Availability";
pub const INCOME: &str = "Income";
pub const AFFORDABILITY: &str = "Affordability";
pub const EDUCATION: &str = "Education";
pub const ASPIRATION: &str = "Aspiration";
pub const INTERNET_ACCESS: &str = "InternetAccess";
pub const SERVICES: &str = "Services";
pub const DIGITAL_INCLUSION: &str = "DigitalInclusion";

/// Network description with the reference tables.
pub fn network_spec() -> NetworkSpec {
    NetworkBuilder::new()
        .variable(INFRASTRUCTURE, ["Absent", "Present"])
        .variable(AVAILABILITY, ["Low", "High"])
        .variable(INCOME, ["Low", "High"])
        .variable(AFFORDABILITY, ["Low", "High"])
        .variable(EDUCATION, ["Low", "High"])
        .variable(ASPIRATION, ["Low", "High"])
        .variable(INTERNET_ACCESS, ["No", "Yes"])
        .variable(SERVICES, ["Weak", "Strong"])
        .variable(DIGITAL_INCLUSION, ["Low", "High"])
        .edge(INFRASTRUCTURE, AVAILABILITY)
        .edge(INCOME, AFFORDABILITY)
        .edge(EDUCATION, ASPIRATION)
        .edge(AVAILABILITY, INTERNET_ACCESS)
        .edge(AFFORDABILITY, INTERNET_ACCESS)
        .edge(ASPIRATION, INTERNET_ACCESS)
        .edge(INTERNET_ACCESS, DIGITAL_INCLUSION)
        .edge(SERVICES, DIGITAL_INCLUSION)
        .prior(INFRASTRUCTURE, vec![0.7, 0.3])
        .table(
            AVAILABILITY,
            [INFRASTRUCTURE],
            vec![vec![0.9, 0.1], vec![0.2, 0.8]],
        )
        .prior(INCOME, vec![0.6, 0.4])
        .table(AFFORDABILITY, [INCOME], vec![vec![0.8, 0.2], vec![0.2, 0.8]])
        .prior(EDUCATION, vec![0.5, 0.5])
        .table(ASPIRATION, [EDUCATION], vec![vec![0.7, 0.3], vec![0.3, 0.7]])
        .table(
            INTERNET_ACCESS,
            [AVAILABILITY, AFFORDABILITY, ASPIRATION],
            vec![
                vec![0.95, 0.05],
                vec![0.8, 0.2],
                vec![0.8, 0.2],
                vec![0.6, 0.4],
                vec![0.8, 0.2],
                vec![0.6, 0.4],
                vec![0.6, 0.4],
                vec![0.3, 0.7],
            ],
        )
        .prior(SERVICES, vec![0.6, 0.4])
        .table(
            DIGITAL_INCLUSION,
            [INTERNET_ACCESS, SERVICES],
            vec![
                vec![0.9, 0.1],
                vec![0.7, 0.3],
                vec![0.6, 0.4],
                vec![0.3, 0.7],
            ],
        )
        .into_spec()
}

pub fn build() -> Result<DiscreteCausalModel, ModelError> {
    network_spec().build()
}

/// High digital inclusion.
pub fn default_outcome() -> OutcomeTarget {
    OutcomeTarget::new(DIGITAL_INCLUSION, "High")
}

/// The five reference scenarios: baseline, each single lever, and the
/// infrastructure + navigator combination.
pub fn standard_scenarios() -> Vec<Scenario> {
    vec![
        Scenario::new("baseline", Evidence::new()),
        Scenario::new(
            "infrastructure",
            Evidence::new().with(INFRASTRUCTURE, "Present"),
        ),
        Scenario::new(
            "affordability_subsidy",
            Evidence::new().with(INCOME, "High"),
        ),
        Scenario::new(
            "digital_navigator",
            Evidence::new().with(SERVICES, "Strong"),
        ),
        Scenario::new(
            "combined",
            Evidence::new()
                .with(INFRASTRUCTURE, "Present")
                .with(SERVICES, "Strong"),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_network_builds() {
        let model = build().expect("reference tables are valid");
        assert_eq!(model.len(), 9);
        assert_eq!(model.joint_assignments(), 512);
        assert_eq!(
            model.parents(INTERNET_ACCESS).expect("known"),
            vec![AVAILABILITY, AFFORDABILITY, ASPIRATION]
        );
    }

    #[test]
    fn standard_scenarios_are_valid_evidence() {
        let model = build().expect("model");
        for scenario in standard_scenarios() {
            model
                .probability_of_evidence(&scenario.evidence)
                .expect("scenario evidence resolves");
        }
    }
}
