use equity_core::digital_divide::{
    self, AFFORDABILITY, ASPIRATION, AVAILABILITY, DIGITAL_INCLUSION, EDUCATION, INCOME,
    INFRASTRUCTURE, INTERNET_ACCESS, SERVICES,
};
use equity_core::{
    DiscreteCausalModel, Evidence, LikelihoodWeighting, ModelError, NetworkSpec, Scenario,
};
use rand::SeedableRng;
use rand::rngs::StdRng;

const EPS: f64 = 1e-6;

fn model() -> DiscreteCausalModel {
    digital_divide::build().expect("digital-divide network is valid")
}

fn probability(model: &DiscreteCausalModel, target: &str, state: &str, evidence: &Evidence) -> f64 {
    model
        .query(&[target], evidence)
        .expect("query")
        .get(target)
        .and_then(|dist| dist.probability(state))
        .expect("state present")
}

#[test]
fn every_marginal_sums_to_one() {
    let model = model();
    let marginals = model.marginals().expect("marginals");
    assert_eq!(marginals.len(), 9);
    for dist in marginals.iter() {
        assert!((dist.total() - 1.0).abs() < EPS, "{} sums to {}", dist.variable(), dist.total());
    }

    let evidence = Evidence::new()
        .with(INCOME, "Low")
        .with(DIGITAL_INCLUSION, "High");
    let result = model
        .query(&[INFRASTRUCTURE, ASPIRATION, INTERNET_ACCESS], &evidence)
        .expect("query");
    for dist in result.iter() {
        assert!((dist.total() - 1.0).abs() < EPS);
    }
}

#[test]
fn availability_prior_matches_reference() {
    let model = model();
    let result = model.query(&[AVAILABILITY], &Evidence::new()).expect("query");
    let dist = result.get(AVAILABILITY).expect("availability");
    assert!((dist.probability("Low").expect("low") - 0.69).abs() < EPS);
    assert!((dist.probability("High").expect("high") - 0.31).abs() < EPS);
}

#[test]
fn pinning_all_parents_reproduces_table_rows() {
    let model = model();
    let evidence = Evidence::new()
        .with(AVAILABILITY, "High")
        .with(AFFORDABILITY, "High")
        .with(ASPIRATION, "High");
    assert!((probability(&model, INTERNET_ACCESS, "Yes", &evidence) - 0.7).abs() < EPS);

    let evidence = Evidence::new()
        .with(AVAILABILITY, "Low")
        .with(AFFORDABILITY, "High")
        .with(ASPIRATION, "Low");
    assert!((probability(&model, INTERNET_ACCESS, "Yes", &evidence) - 0.2).abs() < EPS);

    let evidence = Evidence::new()
        .with(INTERNET_ACCESS, "Yes")
        .with(SERVICES, "Weak");
    assert!((probability(&model, DIGITAL_INCLUSION, "High", &evidence) - 0.4).abs() < EPS);

    let evidence = Evidence::new().with(EDUCATION, "High");
    assert!((probability(&model, ASPIRATION, "High", &evidence) - 0.7).abs() < EPS);
}

#[test]
fn repeated_queries_are_identical() {
    let model = model();
    let evidence = Evidence::new().with(SERVICES, "Strong");
    let first = model.query(&[DIGITAL_INCLUSION, INCOME], &evidence).expect("first");
    let second = model.query(&[DIGITAL_INCLUSION, INCOME], &evidence).expect("second");
    assert_eq!(first, second);
}

#[test]
fn infrastructure_raises_internet_access() {
    let model = model();
    let baseline = probability(&model, INTERNET_ACCESS, "Yes", &Evidence::new());
    let built = probability(
        &model,
        INTERNET_ACCESS,
        "Yes",
        &Evidence::new().with(INFRASTRUCTURE, "Present"),
    );
    assert!((baseline - 0.26648).abs() < EPS);
    assert!((built - 0.3684).abs() < EPS);
    assert!(built >= baseline);
}

#[test]
fn standard_scenarios_match_reference_values() {
    let model = model();
    let impacts = model
        .predict_intervention_impact(
            &digital_divide::default_outcome(),
            &digital_divide::standard_scenarios(),
        )
        .expect("impacts");

    let expected = [
        ("baseline", 0.2706032),
        ("infrastructure", 0.305256),
        ("affordability_subsidy", 0.294869),
        ("digital_navigator", 0.406592),
        ("combined", 0.44736),
    ];
    assert_eq!(impacts.len(), expected.len());
    for (impact, (name, value)) in impacts.iter().zip(expected) {
        assert_eq!(impact.scenario, name);
        assert!((0.0..=1.0).contains(&impact.probability));
        assert!(
            (impact.probability - value).abs() < EPS,
            "{name}: {} vs {value}",
            impact.probability
        );
        assert!((impact.distribution.total() - 1.0).abs() < EPS);
    }

    let combined = impacts[4].probability;
    assert!(impacts.iter().all(|impact| combined >= impact.probability));
}

#[test]
fn downstream_and_diagnostic_reasoning() {
    let model = model();
    let evidence = Evidence::new()
        .with(INFRASTRUCTURE, "Absent")
        .with(INCOME, "Low");
    assert!((probability(&model, DIGITAL_INCLUSION, "High", &evidence) - 0.24086).abs() < EPS);

    let evidence = Evidence::new().with(DIGITAL_INCLUSION, "High");
    let upstream = probability(&model, INFRASTRUCTURE, "Present", &evidence);
    assert!((upstream - 0.338417).abs() < EPS, "{upstream}");
    assert!(upstream > 0.3);
}

#[test]
fn invalid_names_are_rejected() {
    let model = model();
    assert!(matches!(
        model.query(&["Bandwidth"], &Evidence::new()),
        Err(ModelError::UnknownVariable { name }) if name == "Bandwidth"
    ));
    assert!(matches!(
        model.query(&[DIGITAL_INCLUSION], &Evidence::new().with("Bandwidth", "High")),
        Err(ModelError::UnknownVariable { .. })
    ));
    assert!(matches!(
        model.query(&[DIGITAL_INCLUSION], &Evidence::new().with(INCOME, "Medium")),
        Err(ModelError::InvalidState { variable, state }) if variable == INCOME && state == "Medium"
    ));
    // States match exactly.
    assert!(matches!(
        model.query(&[DIGITAL_INCLUSION], &Evidence::new().with(INCOME, "high")),
        Err(ModelError::InvalidState { .. })
    ));
    assert!(matches!(
        model.query(&[INCOME], &Evidence::new().with(INCOME, "High")),
        Err(ModelError::ConflictingEvidence { variable }) if variable == INCOME
    ));

    let bad = vec![Scenario::new("bad", Evidence::new().with(SERVICES, "Excellent"))];
    assert!(matches!(
        model.predict_intervention_impact(&digital_divide::default_outcome(), &bad),
        Err(ModelError::InvalidState { .. })
    ));
}

#[test]
fn likelihood_weighting_agrees_with_exact_inference() {
    let model = model();
    let evidence = Evidence::new().with(SERVICES, "Strong");
    let exact = probability(&model, DIGITAL_INCLUSION, "High", &evidence);
    let mut rng = StdRng::seed_from_u64(2024);
    let estimate =
        LikelihoodWeighting::estimate(&model, DIGITAL_INCLUSION, &evidence, 50_000, &mut rng)
            .expect("estimate");
    let sampled = estimate.distribution.probability("High").expect("high");
    assert!((sampled - exact).abs() < 0.02, "sampled {sampled} exact {exact}");

    let evidence = Evidence::new().with(DIGITAL_INCLUSION, "High");
    let exact = probability(&model, INFRASTRUCTURE, "Present", &evidence);
    let estimate =
        LikelihoodWeighting::estimate(&model, INFRASTRUCTURE, &evidence, 50_000, &mut rng)
            .expect("estimate");
    let sampled = estimate.distribution.probability("Present").expect("present");
    assert!((sampled - exact).abs() < 0.02, "sampled {sampled} exact {exact}");
    assert!(estimate.effective_sample_size < 50_000.0);
}

#[test]
fn concurrent_queries_agree_with_sequential() {
    let model = model();
    let scenarios = digital_divide::standard_scenarios();
    let expected: Vec<f64> = scenarios
        .iter()
        .map(|scenario| probability(&model, DIGITAL_INCLUSION, "High", &scenario.evidence))
        .collect();

    let results: Vec<f64> = std::thread::scope(|scope| {
        let handles: Vec<_> = scenarios
            .iter()
            .map(|scenario| {
                let model = &model;
                scope.spawn(move || {
                    probability(model, DIGITAL_INCLUSION, "High", &scenario.evidence)
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("worker panicked"))
            .collect()
    });
    assert_eq!(results, expected);
}

#[test]
fn network_spec_loads_from_yaml() {
    let yaml = r#"
variables:
  - name: Funding
    states: [No, Yes]
  - name: Coverage
    states: [Low, High]
edges:
  - parent: Funding
    child: Coverage
tables:
  - variable: Funding
    rows: [[0.5, 0.5]]
  - variable: Coverage
    parents: [Funding]
    rows:
      - [0.8, 0.2]
      - [0.4, 0.6]
"#;
    let spec: NetworkSpec = serde_yaml::from_str(yaml).expect("yaml parses");
    let model = spec.build().expect("valid network");
    let coverage = probability(&model, "Coverage", "High", &Evidence::new());
    assert!((coverage - 0.4).abs() < EPS);

    let round_trip: NetworkSpec =
        serde_json::from_str(&serde_json::to_string(&digital_divide::network_spec()).expect("json"))
            .expect("parse");
    assert_eq!(round_trip, digital_divide::network_spec());
}
