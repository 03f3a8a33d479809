use std::fs;
use std::path::{Path, PathBuf};

use equity_core::{Distribution, Evidence, OutcomeTarget, SampledEstimate};
use plotters::prelude::*;
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, Normal};
use thiserror::Error;

const CONFIDENCE: f64 = 0.95;
const FALLBACK_Z: f64 = 1.96;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to render plot: {0}")]
    Plot(String),
}

/// Posteriors produced by one configured query.
#[derive(Debug, Clone, Serialize)]
pub struct QueryReport {
    pub name: String,
    pub evidence: Evidence,
    pub posteriors: Vec<Distribution>,
}

/// Likelihood-weighting estimate of the outcome state with a normal-approximation interval.
#[derive(Debug, Clone, Serialize)]
pub struct SampledReport {
    pub probability: f64,
    pub ci95: (f64, f64),
    pub samples: usize,
    pub effective_sample_size: f64,
}

impl SampledReport {
    pub fn from_estimate(estimate: &SampledEstimate, state: &str) -> Self {
        let probability = estimate.distribution.probability(state).unwrap_or(0.0);
        Self {
            probability,
            ci95: confidence_interval(probability, estimate.effective_sample_size),
            samples: estimate.samples,
            effective_sample_size: estimate.effective_sample_size,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub name: String,
    pub evidence: Evidence,
    pub probability: f64,
    /// Difference from the baseline scenario's probability.
    pub lift: Option<f64>,
    pub distribution: Distribution,
    pub sampled: Option<SampledReport>,
}

impl ScenarioReport {
    pub fn is_baseline(&self) -> bool {
        self.evidence.is_empty()
    }
}

#[derive(Debug, Serialize)]
pub struct AnalysisSummary {
    pub run_id: String,
    pub outcome: OutcomeTarget,
    pub queries: Vec<QueryReport>,
    /// Scenarios in configured order.
    pub scenarios: Vec<ScenarioReport>,
}

impl AnalysisSummary {
    pub fn new(
        run_id: impl Into<String>,
        outcome: OutcomeTarget,
        queries: Vec<QueryReport>,
        scenarios: Vec<ScenarioReport>,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            outcome,
            queries,
            scenarios,
        }
        .enrich()
    }

    /// Fills in each scenario's lift against the first evidence-free scenario.
    fn enrich(mut self) -> Self {
        let baseline = self.baseline().map(|scenario| scenario.probability);
        for scenario in &mut self.scenarios {
            scenario.lift = baseline.map(|base| scenario.probability - base);
        }
        self
    }

    pub fn baseline(&self) -> Option<&ScenarioReport> {
        self.scenarios.iter().find(|scenario| scenario.is_baseline())
    }

    /// Scenarios by descending outcome probability; ties keep configured order.
    pub fn ranked(&self) -> Vec<&ScenarioReport> {
        let mut ranked: Vec<&ScenarioReport> = self.scenarios.iter().collect();
        ranked.sort_by(|a, b| b.probability.total_cmp(&a.probability));
        ranked
    }

    /// Highest-probability scenario that fixes at least one variable.
    pub fn best_intervention(&self) -> Option<&ScenarioReport> {
        self.ranked()
            .into_iter()
            .find(|scenario| !scenario.is_baseline())
    }

    pub fn write_markdown(&self, path: impl AsRef<Path>) -> Result<(), ReportError> {
        let mut out = String::new();
        out.push_str(&format!("# Digital Equity Analysis: {}\n\n", self.run_id));

        if !self.queries.is_empty() {
            out.push_str("## Queries\n\n");
            out.push_str("| Query | Evidence | Variable | Posterior |\n");
            out.push_str("|-------|----------|----------|-----------|\n");
            for query in &self.queries {
                for posterior in &query.posteriors {
                    out.push_str(&format!(
                        "| {name} | {evidence} | {variable} | {posterior} |\n",
                        name = query.name,
                        evidence = describe_evidence(&query.evidence),
                        variable = posterior.variable(),
                        posterior = describe_distribution(posterior),
                    ));
                }
            }
            out.push('\n');
        }

        out.push_str("## Interventions\n\n");
        out.push_str(&format!(
            "Outcome: P({} = {})\n\n",
            self.outcome.variable, self.outcome.state
        ));
        out.push_str(
            "| Rank | Scenario | Evidence | P(outcome) | Δ vs baseline | Sampled | 95% CI | ESS |\n",
        );
        out.push_str(
            "|------|----------|----------|------------|----------------|---------|--------|-----|\n",
        );
        for (rank, scenario) in self.ranked().into_iter().enumerate() {
            let lift = scenario
                .lift
                .map(|value| format!("{value:+.4}"))
                .unwrap_or_else(|| "n/a".to_string());
            let (sampled, ci, ess) = match scenario.sampled.as_ref() {
                Some(sampled) => (
                    format!("{:.4}", sampled.probability),
                    format!("[{:.4}, {:.4}]", sampled.ci95.0, sampled.ci95.1),
                    format!("{:.0}", sampled.effective_sample_size),
                ),
                None => ("-".to_string(), "-".to_string(), "-".to_string()),
            };
            out.push_str(&format!(
                "| {rank} | {name} | {evidence} | {probability:.4} | {lift} | {sampled} | {ci} | {ess} |\n",
                rank = rank + 1,
                name = scenario.name,
                evidence = describe_evidence(&scenario.evidence),
                probability = scenario.probability,
            ));
        }

        if let Some(best) = self.best_intervention() {
            out.push_str(&format!(
                "\n**Most effective intervention:** {} ({:.1}% probability of {} = {})\n",
                best.name,
                best.probability * 100.0,
                self.outcome.variable,
                self.outcome.state
            ));
        }

        fs::write(path.as_ref(), out).map_err(|e| ReportError::Io {
            context: "writing summary markdown",
            source: e,
        })?;
        Ok(())
    }

    pub fn render_plot(&self, dir: impl AsRef<Path>) -> Result<PathBuf, ReportError> {
        let dir = dir.as_ref();
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir).map_err(|e| ReportError::Io {
                context: "creating plots directory",
                source: e,
            })?;
        }

        let output_path = dir.join("scenario_outcomes.png");
        let caption = format!(
            "P({} = {}) by scenario",
            self.outcome.variable, self.outcome.state
        );
        let bars: Vec<(String, f64, Option<f64>)> = self
            .ranked()
            .into_iter()
            .map(|scenario| (scenario.name.clone(), scenario.probability, scenario.lift))
            .collect();

        let prev_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(|_| {}));

        let plot_attempt = std::panic::catch_unwind(move || {
            let root = BitMapBackend::new(&output_path, (800, 480)).into_drawing_area();
            root.fill(&WHITE)
                .map_err(|e| ReportError::Plot(e.to_string()))?;

            let mut chart = ChartBuilder::on(&root)
                .margin(20)
                .caption(caption, ("sans-serif", 22))
                .set_label_area_size(LabelAreaPosition::Left, 50)
                .set_label_area_size(LabelAreaPosition::Bottom, 60)
                .build_cartesian_2d(0..bars.len(), 0.0f64..1.0f64)
                .map_err(|e| ReportError::Plot(e.to_string()))?;

            chart
                .configure_mesh()
                .disable_mesh()
                .y_desc("Probability")
                .x_desc("Scenario")
                .x_label_formatter(&|idx| {
                    bars.get(*idx)
                        .map(|(name, _, _)| name.clone())
                        .unwrap_or_default()
                })
                .draw()
                .map_err(|e| ReportError::Plot(e.to_string()))?;

            chart
                .draw_series(bars.iter().enumerate().map(|(idx, (_, probability, lift))| {
                    let color = match lift {
                        Some(lift) if *lift > 0.0 => &GREEN,
                        Some(lift) if *lift < 0.0 => &RED,
                        _ => &BLUE,
                    };
                    Rectangle::new([(idx, 0.0), (idx + 1, *probability)], color.filled())
                }))
                .map_err(|e| ReportError::Plot(e.to_string()))?;

            drop(chart);

            root.present()
                .map_err(|e| ReportError::Plot(e.to_string()))?;

            drop(root);

            Ok(output_path)
        });

        std::panic::set_hook(prev_hook);

        match plot_attempt {
            Ok(result) => result,
            Err(_) => Err(ReportError::Plot(
                "plotters panicked while rendering (missing font support?)".into(),
            )),
        }
    }
}

pub fn describe_evidence(evidence: &Evidence) -> String {
    if evidence.is_empty() {
        return "(none)".to_string();
    }
    evidence
        .iter()
        .map(|(variable, state)| format!("{variable}={state}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn describe_distribution(distribution: &Distribution) -> String {
    distribution
        .iter()
        .map(|entry| format!("{} {:.4}", entry.state, entry.probability))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Normal-approximation interval for a weighted proportion, clamped to [0, 1].
fn confidence_interval(probability: f64, effective_sample_size: f64) -> (f64, f64) {
    if effective_sample_size <= 0.0 {
        return (probability, probability);
    }
    let z = Normal::new(0.0, 1.0)
        .map(|normal| normal.inverse_cdf(0.5 + CONFIDENCE / 2.0))
        .unwrap_or(FALLBACK_Z);
    let std_error = (probability * (1.0 - probability) / effective_sample_size).sqrt();
    let margin = z * std_error;
    ((probability - margin).max(0.0), (probability + margin).min(1.0))
}
