use criterion::{Criterion, criterion_group, criterion_main};
use rand::SeedableRng;
use rand::rngs::StdRng;

use equity_core::digital_divide::{self, DIGITAL_INCLUSION, INCOME, INFRASTRUCTURE};
use equity_core::{Evidence, LikelihoodWeighting};

fn bench_exact_query(c: &mut Criterion) {
    let model = digital_divide::build().expect("model");
    let evidence = Evidence::new().with(INCOME, "Low");

    c.bench_function("exact_query_digital_inclusion", |b| {
        b.iter(|| model.query(&[DIGITAL_INCLUSION, INFRASTRUCTURE], &evidence));
    });
}

fn bench_scenarios(c: &mut Criterion) {
    let model = digital_divide::build().expect("model");
    let outcome = digital_divide::default_outcome();
    let scenarios = digital_divide::standard_scenarios();

    c.bench_function("predict_intervention_impact_5_scenarios", |b| {
        b.iter(|| model.predict_intervention_impact(&outcome, &scenarios));
    });
}

fn bench_likelihood_weighting(c: &mut Criterion) {
    let model = digital_divide::build().expect("model");
    let evidence = Evidence::new().with(DIGITAL_INCLUSION, "High");

    c.bench_function("likelihood_weighting_10k", |b| {
        b.iter(|| {
            let mut rng = StdRng::seed_from_u64(7);
            LikelihoodWeighting::estimate(&model, INFRASTRUCTURE, &evidence, 10_000, &mut rng)
        });
    });
}

criterion_group!(
    benches,
    bench_exact_query,
    bench_scenarios,
    bench_likelihood_weighting
);
criterion_main!(benches);
