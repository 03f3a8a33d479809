mod rows;

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use equity_core::{DiscreteCausalModel, LikelihoodWeighting, ModelError, Scenario};
use rand::{RngCore, SeedableRng, rngs::StdRng};
use thiserror::Error;
use tracing::{Level, event};

use crate::config::{AnalysisConfig, ResolvedOutputs};
use crate::logging::{LoggingGuard, telemetry_dir};
use crate::report::{
    AnalysisSummary, QueryReport, ReportError, SampledReport, ScenarioReport,
};
use crate::telemetry::{
    INTERVENTION_TARGET, QUERY_TARGET, TelemetryError, TelemetryOutputs,
    append_highlights_to_markdown, write_summary_outputs,
};

/// Primary entry point for running a configured analysis.
pub struct AnalysisRunner {
    config: AnalysisConfig,
    outputs: ResolvedOutputs,
    model: DiscreteCausalModel,
    logging_enabled: bool,
    logging_guard: Option<LoggingGuard>,
}

/// Summary details returned after a run.
pub struct RunSummary {
    pub queries_run: usize,
    pub scenarios_compared: usize,
    pub rows_written: usize,
    pub best_intervention: Option<(String, f64)>,
    pub jsonl_path: PathBuf,
    pub summary_path: PathBuf,
    pub plot_path: Option<PathBuf>,
    pub telemetry_path: Option<PathBuf>,
    pub telemetry_outputs: Option<TelemetryOutputs>,
}

impl AnalysisRunner {
    /// Build a runner from a validated configuration.
    pub fn new(config: AnalysisConfig, outputs: ResolvedOutputs) -> Result<Self, RunnerError> {
        let model = config.build_model()?;
        Ok(Self {
            logging_enabled: config.logging.enable_structured,
            config,
            outputs,
            model,
            logging_guard: None,
        })
    }

    /// Hands over the log writer so `run` can flush it before summarising telemetry.
    pub fn with_logging(mut self, guard: LoggingGuard) -> Self {
        self.logging_guard = Some(guard);
        self
    }

    pub fn model(&self) -> &DiscreteCausalModel {
        &self.model
    }

    /// Execute queries and scenario comparisons, then write every report.
    pub fn run(&mut self) -> Result<RunSummary, RunnerError> {
        ensure_parent(self.outputs.jsonl.parent())?;
        ensure_parent(self.outputs.summary_md.parent())?;
        if !self.outputs.plots_dir.as_os_str().is_empty() {
            fs::create_dir_all(&self.outputs.plots_dir)?;
        }

        let queries = self.run_queries()?;
        let scenarios = self.run_interventions()?;
        let summary = AnalysisSummary::new(
            self.config.run_id.clone(),
            self.config.interventions.outcome.clone(),
            queries,
            scenarios,
        );

        let mut writer = BufWriter::new(File::create(&self.outputs.jsonl)?);
        let rows_written = rows::write_rows(&mut writer, &summary)?;
        writer.flush()?;

        summary.write_markdown(&self.outputs.summary_md)?;
        let plot_path = match summary.render_plot(&self.outputs.plots_dir) {
            Ok(path) => Some(path),
            Err(err) => {
                eprintln!("WARN: {}", err);
                None
            }
        };

        let guard_path = self.logging_guard.take().map(LoggingGuard::finish);
        let telemetry_dir = telemetry_dir(&self.outputs);
        let telemetry_path = if self.logging_enabled {
            Some(guard_path.unwrap_or_else(|| telemetry_dir.join("telemetry.jsonl")))
        } else {
            None
        };

        let telemetry_outputs = if let Some(path) = telemetry_path.as_ref() {
            write_summary_outputs(path, &telemetry_dir)?
        } else {
            None
        };

        if let Some(outputs) = telemetry_outputs.as_ref() {
            append_highlights_to_markdown(&self.outputs.summary_md, outputs)?;
        }

        Ok(RunSummary {
            queries_run: summary.queries.len(),
            scenarios_compared: summary.scenarios.len(),
            rows_written,
            best_intervention: summary
                .best_intervention()
                .map(|best| (best.name.clone(), best.probability)),
            jsonl_path: self.outputs.jsonl.clone(),
            summary_path: self.outputs.summary_md.clone(),
            plot_path,
            telemetry_path,
            telemetry_outputs,
        })
    }

    fn run_queries(&self) -> Result<Vec<QueryReport>, RunnerError> {
        let mut reports = Vec::with_capacity(self.config.queries.len());
        for query in &self.config.queries {
            let start = Instant::now();
            let result = self
                .model
                .query(query.targets.as_slice(), &query.evidence)?;
            let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

            if self.logging_enabled && tracing::enabled!(Level::INFO) {
                event!(
                    target: QUERY_TARGET,
                    Level::INFO,
                    run_id = %self.config.run_id,
                    query = %query.name,
                    targets = result.len() as u64,
                    evidence = query.evidence.len() as u64,
                    elapsed_ms
                );
            }

            reports.push(QueryReport {
                name: query.name.clone(),
                evidence: result.evidence().clone(),
                posteriors: result.into_distributions(),
            });
        }
        Ok(reports)
    }

    fn run_interventions(&self) -> Result<Vec<ScenarioReport>, RunnerError> {
        let outcome = &self.config.interventions.outcome;
        let scenarios = self.config.interventions.scenarios();
        let sampling = &self.config.sampling;
        let mut rng = StdRng::seed_from_u64(sampling.seed.unwrap_or(0));

        let mut reports = Vec::with_capacity(scenarios.len());
        for scenario in scenarios {
            // Drawn for every scenario so seeds do not shift when sampling is toggled.
            let scenario_seed = rng.next_u64();
            let start = Instant::now();
            let impact = self
                .model
                .predict_intervention_impact(outcome, std::slice::from_ref(&scenario))?
                .into_iter()
                .next()
                .ok_or_else(|| RunnerError::MissingImpact(scenario.name.clone()))?;

            let sampled = if sampling.enabled() {
                Some(self.sample(&scenario, scenario_seed)?)
            } else {
                None
            };
            let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

            if self.logging_enabled && tracing::enabled!(Level::INFO) {
                event!(
                    target: INTERVENTION_TARGET,
                    Level::INFO,
                    run_id = %self.config.run_id,
                    scenario = %scenario.name,
                    probability = impact.probability,
                    effective_sample_size = sampled.as_ref().map(|s| s.effective_sample_size),
                    elapsed_ms
                );
            }

            reports.push(ScenarioReport {
                name: impact.scenario,
                evidence: scenario.evidence,
                probability: impact.probability,
                lift: None,
                distribution: impact.distribution,
                sampled,
            });
        }
        Ok(reports)
    }

    fn sample(&self, scenario: &Scenario, seed: u64) -> Result<SampledReport, RunnerError> {
        let outcome = &self.config.interventions.outcome;
        let mut rng = StdRng::seed_from_u64(seed);
        let estimate = LikelihoodWeighting::estimate(
            &self.model,
            &outcome.variable,
            &scenario.evidence,
            self.config.sampling.samples,
            &mut rng,
        )?;
        Ok(SampledReport::from_estimate(&estimate, &outcome.state))
    }
}

fn ensure_parent(path: Option<&Path>) -> Result<(), RunnerError> {
    if let Some(dir) = path.filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    Ok(())
}

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("model error: {0}")]
    Model(#[from] ModelError),
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
    #[error("failed to serialize log row: {source}")]
    Serialize {
        #[from]
        source: serde_json::Error,
    },
    #[error("scenario '{0}' produced no outcome")]
    MissingImpact(String),
    #[error("report error: {0}")]
    Report(#[from] ReportError),
    #[error("telemetry summarisation failed: {0}")]
    Telemetry(#[from] TelemetryError),
}
