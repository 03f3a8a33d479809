use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

pub const QUERY_TARGET: &str = "equity_bench::query";
pub const INTERVENTION_TARGET: &str = "equity_bench::intervention";
const CORE_TARGET_PREFIX: &str = "equity_core";

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse telemetry JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Default, Serialize)]
pub struct TelemetrySummary {
    pub query: QueryTelemetrySummary,
    pub intervention: InterventionTelemetrySummary,
    /// Event counts per `equity_core` module target.
    pub model_events: BTreeMap<String, usize>,
}

#[derive(Debug, Default, Serialize)]
pub struct QueryTelemetrySummary {
    pub count: usize,
    pub avg_elapsed_ms: Option<f64>,
    pub avg_targets: Option<f64>,
}

#[derive(Debug, Default, Serialize)]
pub struct InterventionTelemetrySummary {
    pub count: usize,
    pub avg_elapsed_ms: Option<f64>,
    pub avg_effective_sample_size: Option<f64>,
    pub top_scenario: Option<String>,
    pub top_probability: Option<f64>,
}

#[derive(Debug)]
struct Average {
    sum: f64,
    count: usize,
}

impl Average {
    fn new() -> Self {
        Self { sum: 0.0, count: 0 }
    }

    fn add(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    fn mean(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.sum / self.count as f64)
        }
    }
}

/// Aggregate query/intervention telemetry emitted by the analysis runner.
pub fn summarise_telemetry(path: &Path) -> Result<TelemetrySummary, TelemetryError> {
    if !path.exists() {
        return Ok(TelemetrySummary::default());
    }

    let file = File::open(path).map_err(|source| TelemetryError::Io {
        context: "opening telemetry log",
        source,
    })?;
    let reader = BufReader::new(file);

    let mut summary = TelemetrySummary::default();
    let mut query_elapsed = Average::new();
    let mut query_targets = Average::new();
    let mut intervention_elapsed = Average::new();
    let mut intervention_ess = Average::new();

    for line in reader.lines() {
        let line = line.map_err(|source| TelemetryError::Io {
            context: "reading telemetry line",
            source,
        })?;
        if line.trim().is_empty() {
            continue;
        }

        let payload: Value = serde_json::from_str(&line)?;
        let target = payload
            .get("target")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let fields = payload
            .get("fields")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        match target {
            QUERY_TARGET => {
                summary.query.count += 1;
                if let Some(elapsed) = fields.get("elapsed_ms").and_then(Value::as_f64) {
                    query_elapsed.add(elapsed);
                }
                if let Some(count) = fields.get("targets").and_then(Value::as_u64) {
                    query_targets.add(count as f64);
                }
            }
            INTERVENTION_TARGET => {
                summary.intervention.count += 1;
                if let Some(elapsed) = fields.get("elapsed_ms").and_then(Value::as_f64) {
                    intervention_elapsed.add(elapsed);
                }
                if let Some(ess) = fields
                    .get("effective_sample_size")
                    .and_then(Value::as_f64)
                {
                    intervention_ess.add(ess);
                }

                let scenario = fields
                    .get("scenario")
                    .and_then(Value::as_str)
                    .map(|s| s.trim())
                    .filter(|s| !s.is_empty());
                let probability = fields.get("probability").and_then(Value::as_f64);
                if let (Some(scenario), Some(probability)) = (scenario, probability) {
                    let best = summary.intervention.top_probability.unwrap_or(f64::MIN);
                    if probability > best {
                        summary.intervention.top_scenario = Some(scenario.to_string());
                        summary.intervention.top_probability = Some(probability);
                    }
                }
            }
            other if other.starts_with(CORE_TARGET_PREFIX) => {
                *summary.model_events.entry(other.to_string()).or_insert(0) += 1;
            }
            _ => {}
        }
    }

    summary.query.avg_elapsed_ms = query_elapsed.mean();
    summary.query.avg_targets = query_targets.mean();
    summary.intervention.avg_elapsed_ms = intervention_elapsed.mean();
    summary.intervention.avg_effective_sample_size = intervention_ess.mean();

    Ok(summary)
}

pub fn write_summary_outputs(
    telemetry_path: &Path,
    output_dir: &Path,
) -> Result<Option<TelemetryOutputs>, TelemetryError> {
    if !telemetry_path.exists() {
        return Ok(None);
    }

    let summary = summarise_telemetry(telemetry_path)?;
    let json_path = output_dir.join("telemetry_summary.json");
    let md_path = output_dir.join("telemetry_summary.md");

    std::fs::write(
        &json_path,
        serde_json::to_vec_pretty(&summary).map_err(TelemetryError::from)?,
    )
    .map_err(|source| TelemetryError::Io {
        context: "writing telemetry summary json",
        source,
    })?;

    let markdown = render_markdown(&summary, telemetry_path);
    std::fs::write(&md_path, markdown).map_err(|source| TelemetryError::Io {
        context: "writing telemetry summary markdown",
        source,
    })?;

    Ok(Some(TelemetryOutputs {
        summary,
        json_path,
        markdown_path: md_path,
    }))
}

pub fn append_highlights_to_markdown(
    summary_path: &Path,
    outputs: &TelemetryOutputs,
) -> Result<(), TelemetryError> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(summary_path)
        .map_err(|source| TelemetryError::Io {
            context: "opening summary markdown for telemetry append",
            source,
        })?;

    let mut section = String::new();
    section.push_str("\n## Telemetry Highlights\n");
    let query = &outputs.summary.query;
    section.push_str(&format!("- Query events captured: {}\n", query.count));
    if let Some(value) = query.avg_elapsed_ms {
        section.push_str(&format!("- Avg query time: {:.3} ms\n", value));
    }
    let intervention = &outputs.summary.intervention;
    section.push_str(&format!(
        "- Scenario events captured: {}\n",
        intervention.count
    ));
    if let Some(value) = intervention.avg_elapsed_ms {
        section.push_str(&format!("- Avg scenario time: {:.3} ms\n", value));
    }
    if let Some(value) = intervention.avg_effective_sample_size {
        section.push_str(&format!("- Avg effective sample size: {:.0}\n", value));
    }

    write!(file, "{section}").map_err(|source| TelemetryError::Io {
        context: "writing telemetry highlights",
        source,
    })?;

    Ok(())
}

fn render_markdown(summary: &TelemetrySummary, telemetry_path: &Path) -> String {
    let mut output = String::new();
    output.push_str("# Telemetry Summary\n\n");
    output.push_str(&format!("- Source: `{}`\n", telemetry_path.display()));
    output.push('\n');

    output.push_str("## Queries\n");
    output.push_str(&format!("- Events: {}\n", summary.query.count));
    if let Some(value) = summary.query.avg_elapsed_ms {
        output.push_str(&format!("- Avg elapsed: {:.3} ms\n", value));
    }
    if let Some(value) = summary.query.avg_targets {
        output.push_str(&format!("- Avg targets: {:.2}\n", value));
    }
    output.push('\n');

    output.push_str("## Interventions\n");
    output.push_str(&format!("- Events: {}\n", summary.intervention.count));
    if let Some(value) = summary.intervention.avg_elapsed_ms {
        output.push_str(&format!("- Avg elapsed: {:.3} ms\n", value));
    }
    if let Some(value) = summary.intervention.avg_effective_sample_size {
        output.push_str(&format!("- Avg effective sample size: {:.0}\n", value));
    }
    if let (Some(name), Some(probability)) = (
        summary.intervention.top_scenario.as_ref(),
        summary.intervention.top_probability,
    ) {
        output.push_str(&format!("- Top scenario: {} ({:.4})\n", name, probability));
    }
    output.push('\n');

    output.push_str("## Model Events\n");
    if summary.model_events.is_empty() {
        output.push_str("- <none>\n");
    } else {
        for (target, count) in &summary.model_events {
            output.push_str(&format!("- {}: {}\n", target, count));
        }
    }
    output
}

#[derive(Debug)]
pub struct TelemetryOutputs {
    pub summary: TelemetrySummary,
    pub json_path: PathBuf,
    pub markdown_path: PathBuf,
}
