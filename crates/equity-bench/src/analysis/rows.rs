use std::io::Write;

use equity_core::{Distribution, Evidence};
use serde::Serialize;

use super::RunnerError;
use crate::report::{AnalysisSummary, SampledReport};

#[derive(Serialize)]
struct QueryRow<'a> {
    run_id: &'a str,
    kind: &'static str,
    name: &'a str,
    evidence: &'a Evidence,
    variable: &'a str,
    distribution: &'a Distribution,
}

#[derive(Serialize)]
struct ScenarioRow<'a> {
    run_id: &'a str,
    kind: &'static str,
    name: &'a str,
    evidence: &'a Evidence,
    outcome_variable: &'a str,
    outcome_state: &'a str,
    probability: f64,
    lift_vs_baseline: Option<f64>,
    distribution: &'a Distribution,
    sampled: Option<&'a SampledReport>,
}

/// One row per query target, then one per scenario in configured order.
pub(super) fn write_rows<W: Write>(
    writer: &mut W,
    summary: &AnalysisSummary,
) -> Result<usize, RunnerError> {
    let mut rows_written = 0usize;

    for query in &summary.queries {
        for posterior in &query.posteriors {
            let row = QueryRow {
                run_id: &summary.run_id,
                kind: "query",
                name: &query.name,
                evidence: &query.evidence,
                variable: posterior.variable(),
                distribution: posterior,
            };
            serde_json::to_writer(&mut *writer, &row)?;
            writer.write_all(b"\n")?;
            rows_written += 1;
        }
    }

    for scenario in &summary.scenarios {
        let row = ScenarioRow {
            run_id: &summary.run_id,
            kind: "scenario",
            name: &scenario.name,
            evidence: &scenario.evidence,
            outcome_variable: &summary.outcome.variable,
            outcome_state: &summary.outcome.state,
            probability: scenario.probability,
            lift_vs_baseline: scenario.lift,
            distribution: &scenario.distribution,
            sampled: scenario.sampled.as_ref(),
        };
        serde_json::to_writer(&mut *writer, &row)?;
        writer.write_all(b"\n")?;
        rows_written += 1;
    }

    Ok(rows_written)
}
