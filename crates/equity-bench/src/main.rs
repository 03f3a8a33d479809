use std::path::PathBuf;

use clap::Parser;

use equity_bench::analysis::AnalysisRunner;
use equity_bench::config::{AnalysisConfig, QueryConfig, ResolvedOutputs};
use equity_bench::logging::init_logging;
use equity_core::Evidence;

const CLI_QUERY_NAME: &str = "cli_evidence";

/// Batch analysis harness for the digital-equity causal model.
#[derive(Debug, Parser)]
#[command(
    name = "equity-bench",
    author,
    version,
    about = "Deterministic digital-equity inference and intervention reports"
)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "bench/analysis.yaml")]
    config: PathBuf,

    /// Override the run identifier (substitutes {run_id} templates).
    #[arg(long, value_name = "RUN_ID")]
    run_id: Option<String>,

    /// Override the RNG seed for the sampling cross-check.
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,

    /// Override the number of likelihood-weighting samples (0 disables).
    #[arg(long, value_name = "COUNT")]
    samples: Option<usize>,

    /// Observation for an ad-hoc query over the outcome variable; repeatable.
    #[arg(long, value_name = "VAR=STATE", value_parser = parse_observation)]
    evidence: Vec<(String, String)>,

    /// Exit after validating the configuration and building the network.
    #[arg(long)]
    validate_only: bool,
}

fn parse_observation(raw: &str) -> Result<(String, String), String> {
    let (variable, state) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected VAR=STATE, got '{raw}'"))?;
    let (variable, state) = (variable.trim(), state.trim());
    if variable.is_empty() || state.is_empty() {
        return Err(format!("expected VAR=STATE, got '{raw}'"));
    }
    Ok((variable.to_string(), state.to_string()))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = AnalysisConfig::from_path(&cli.config)?;

    if let Some(run_id) = cli.run_id {
        config.run_id = run_id;
    }

    if let Some(seed) = cli.seed {
        config.sampling.seed = Some(seed);
    }

    if let Some(samples) = cli.samples {
        config.sampling.samples = samples;
    }

    if !cli.evidence.is_empty() {
        let evidence: Evidence = cli.evidence.into_iter().collect();
        config.queries.push(QueryConfig {
            name: CLI_QUERY_NAME.to_string(),
            targets: vec![config.interventions.outcome.variable.clone()],
            evidence,
        });
    }

    config.validate()?;

    let outputs: ResolvedOutputs = config.resolved_outputs();
    let run_id = config.run_id.clone();
    let query_count = config.queries.len();
    let scenario_count = config.interventions.scenarios().len();

    println!(
        "Loaded configuration '{run_id}' with {query_count} quer{} and {scenario_count} scenario{} ({} samples)",
        if query_count == 1 { "y" } else { "ies" },
        if scenario_count == 1 { "" } else { "s" },
        config.sampling.samples
    );

    let logging_guard = init_logging(&config.logging, &outputs)?;
    let mut runner = AnalysisRunner::new(config, outputs)?;
    if let Some(guard) = logging_guard {
        runner = runner.with_logging(guard);
    }

    if cli.validate_only {
        println!(
            "Validation-only mode: network with {} variables built, analysis skipped.",
            runner.model().len()
        );
        return Ok(());
    }

    let summary = runner.run()?;
    println!(
        "Analysis complete for '{run_id}': {} queries, {} scenarios → {} rows at {}",
        summary.queries_run,
        summary.scenarios_compared,
        summary.rows_written,
        summary.jsonl_path.display()
    );
    if let Some((name, probability)) = summary.best_intervention.as_ref() {
        println!(
            "Most effective intervention: {name} ({:.1}%)",
            probability * 100.0
        );
    }
    println!("Summary table: {}", summary.summary_path.display());
    if let Some(plot_path) = summary.plot_path.as_ref() {
        println!("Scenario plot: {}", plot_path.display());
    }
    if let Some(telemetry_path) = summary.telemetry_path.as_ref() {
        println!("Telemetry log: {}", telemetry_path.display());
    }
    if let Some(outputs) = summary.telemetry_outputs.as_ref() {
        println!("Telemetry summary (JSON): {}", outputs.json_path.display());
        println!(
            "Telemetry summary (Markdown): {}",
            outputs.markdown_path.display()
        );
        println!(
            "  Queries: {} events, scenarios: {} events",
            outputs.summary.query.count, outputs.summary.intervention.count
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_observations() {
        assert_eq!(
            parse_observation("Income=High"),
            Ok(("Income".to_string(), "High".to_string()))
        );
        assert_eq!(
            parse_observation(" Services = Strong "),
            Ok(("Services".to_string(), "Strong".to_string()))
        );
        assert!(parse_observation("Income").is_err());
        assert!(parse_observation("=High").is_err());
    }

    #[test]
    fn evidence_flag_is_repeatable() {
        let cli = Cli::parse_from([
            "equity-bench",
            "--evidence",
            "Income=Low",
            "--evidence",
            "Infrastructure=Absent",
            "--validate-only",
        ]);
        assert_eq!(cli.evidence.len(), 2);
        assert!(cli.validate_only);
        assert_eq!(cli.config, PathBuf::from("bench/analysis.yaml"));
    }
}
