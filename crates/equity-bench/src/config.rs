use equity_core::digital_divide;
use equity_core::{DiscreteCausalModel, Evidence, ModelError, NetworkSpec, OutcomeTarget, Scenario};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::Level;

const DEFAULT_SAMPLES: usize = 10_000;
const RUN_ID_ALLOWED: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789._-";

/// Root analysis configuration loaded from YAML.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AnalysisConfig {
    pub run_id: String,
    /// Inline network; the digital-divide network when absent.
    #[serde(default)]
    pub network: Option<NetworkSpec>,
    #[serde(default)]
    pub queries: Vec<QueryConfig>,
    #[serde(default)]
    pub interventions: InterventionConfig,
    #[serde(default)]
    pub sampling: SamplingConfig,
    pub outputs: OutputsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AnalysisConfig {
    /// Load configuration from a YAML file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let path_buf = path.to_path_buf();
        let file = File::open(path).map_err(|source| ConfigError::Read {
            source,
            path: path_buf.clone(),
        })?;
        let reader = BufReader::new(file);
        let mut cfg: AnalysisConfig =
            serde_yaml::from_reader(reader).map_err(|source| ConfigError::Parse {
                source,
                path: path_buf.clone(),
            })?;
        cfg.validate().map_err(|source| ConfigError::Invalid {
            path: path_buf,
            source,
        })?;
        Ok(cfg)
    }

    /// Validate the configuration without performing I/O.
    ///
    /// Builds the network so that query targets, evidence and the outcome
    /// can be checked against its variables.
    pub fn validate(&mut self) -> Result<(), ValidationError> {
        validate_run_id(&self.run_id)?;
        self.outputs.validate(&self.run_id)?;
        self.logging.normalize();

        let model = self
            .build_model()
            .map_err(|err| ValidationError::InvalidField {
                field: "network".to_string(),
                message: err.to_string(),
            })?;
        validate_queries(&self.queries, &model)?;
        self.interventions.validate(&model)?;
        Ok(())
    }

    pub fn build_model(&self) -> Result<DiscreteCausalModel, ModelError> {
        match self.network.as_ref() {
            Some(spec) => spec.build(),
            None => digital_divide::build(),
        }
    }

    /// Resolve output templates (e.g., `{run_id}` placeholders) into concrete paths.
    pub fn resolved_outputs(&self) -> ResolvedOutputs {
        ResolvedOutputs {
            jsonl: resolve_template(&self.run_id, &self.outputs.jsonl),
            summary_md: resolve_template(&self.run_id, &self.outputs.summary_md),
            plots_dir: resolve_template(&self.run_id, &self.outputs.plots_dir),
        }
    }
}

/// A named posterior query.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct QueryConfig {
    pub name: String,
    pub targets: Vec<String>,
    #[serde(default)]
    pub evidence: Evidence,
}

/// Intervention comparison block.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct InterventionConfig {
    #[serde(default = "digital_divide::default_outcome")]
    pub outcome: OutcomeTarget,
    /// Replaces the standard scenarios when present.
    #[serde(default)]
    pub scenarios: Option<Vec<Scenario>>,
}

impl Default for InterventionConfig {
    fn default() -> Self {
        Self {
            outcome: digital_divide::default_outcome(),
            scenarios: None,
        }
    }
}

impl InterventionConfig {
    pub fn scenarios(&self) -> Vec<Scenario> {
        self.scenarios
            .clone()
            .unwrap_or_else(digital_divide::standard_scenarios)
    }

    fn validate(&self, model: &DiscreteCausalModel) -> Result<(), ValidationError> {
        let Some(variable) = model.variable(&self.outcome.variable) else {
            return Err(ValidationError::InvalidField {
                field: "interventions.outcome.variable".to_string(),
                message: format!("unknown variable '{}'", self.outcome.variable),
            });
        };
        if variable.state_index(&self.outcome.state).is_none() {
            return Err(ValidationError::InvalidField {
                field: "interventions.outcome.state".to_string(),
                message: format!(
                    "'{}' is not a state of '{}' (expected one of {:?})",
                    self.outcome.state,
                    self.outcome.variable,
                    variable.states()
                ),
            });
        }

        let scenarios = self.scenarios();
        if scenarios.is_empty() {
            return Err(ValidationError::InvalidField {
                field: "interventions.scenarios".to_string(),
                message: "at least one scenario must be specified".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for scenario in &scenarios {
            validate_name("interventions.scenarios.name", &scenario.name)?;
            if !seen.insert(scenario.name.as_str()) {
                return Err(ValidationError::InvalidField {
                    field: "interventions.scenarios".to_string(),
                    message: format!("scenario '{}' defined more than once", scenario.name),
                });
            }
            let field = format!("interventions.scenarios[{}].evidence", scenario.name);
            validate_evidence(&field, &scenario.evidence, model)?;
            if scenario.evidence.contains(&self.outcome.variable) {
                return Err(ValidationError::InvalidField {
                    field,
                    message: format!(
                        "scenario fixes the outcome variable '{}'",
                        self.outcome.variable
                    ),
                });
            }
        }
        Ok(())
    }
}

/// Likelihood-weighting cross-check; `samples: 0` disables it.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SamplingConfig {
    #[serde(default = "default_samples")]
    pub samples: usize,
    pub seed: Option<u64>,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            samples: DEFAULT_SAMPLES,
            seed: None,
        }
    }
}

impl SamplingConfig {
    pub fn enabled(&self) -> bool {
        self.samples > 0
    }
}

fn default_samples() -> usize {
    DEFAULT_SAMPLES
}

/// Output artifact configuration.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct OutputsConfig {
    pub jsonl: String,
    pub summary_md: String,
    pub plots_dir: String,
}

impl OutputsConfig {
    fn validate(&self, run_id: &str) -> Result<(), ValidationError> {
        for (label, value) in [
            ("outputs.jsonl", &self.jsonl),
            ("outputs.summary_md", &self.summary_md),
            ("outputs.plots_dir", &self.plots_dir),
        ] {
            if value.trim().is_empty() {
                return Err(ValidationError::InvalidField {
                    field: label.to_string(),
                    message: "path must not be empty".to_string(),
                });
            }

            let resolved = resolve_template(run_id, value);
            if resolved.components().count() == 0 {
                return Err(ValidationError::InvalidField {
                    field: label.to_string(),
                    message: "resolved path is invalid".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Logging configuration defaults to disabled structured logs.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default)]
    pub enable_structured: bool,
    #[serde(default = "default_tracing_level")]
    pub tracing_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enable_structured: false,
            tracing_level: default_tracing_level(),
        }
    }
}

impl LoggingConfig {
    fn normalize(&mut self) {
        if self.tracing_level.trim().is_empty() {
            self.tracing_level = default_tracing_level();
        }
    }

    pub fn level(&self) -> Option<Level> {
        match self.tracing_level.to_ascii_lowercase().as_str() {
            "trace" => Some(Level::TRACE),
            "debug" => Some(Level::DEBUG),
            "info" => Some(Level::INFO),
            "warn" | "warning" => Some(Level::WARN),
            "error" => Some(Level::ERROR),
            _ => None,
        }
    }
}

fn default_tracing_level() -> String {
    "info".to_string()
}

fn validate_run_id(run_id: &str) -> Result<(), ValidationError> {
    if run_id.trim().is_empty() {
        return Err(ValidationError::InvalidField {
            field: "run_id".to_string(),
            message: "run_id must not be empty".to_string(),
        });
    }

    if !run_id.chars().all(|c| RUN_ID_ALLOWED.contains(c)) {
        return Err(ValidationError::InvalidField {
            field: "run_id".to_string(),
            message: "run_id may only contain alphanumeric characters, '.', '_' or '-'".to_string(),
        });
    }

    Ok(())
}

fn validate_name(field: &str, name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::InvalidField {
            field: field.to_string(),
            message: "name must not be empty".to_string(),
        });
    }
    if !name.chars().all(|c| RUN_ID_ALLOWED.contains(c)) {
        return Err(ValidationError::InvalidField {
            field: format!("{field}[{name}]"),
            message: "name contains invalid characters".to_string(),
        });
    }
    Ok(())
}

fn validate_queries(
    queries: &[QueryConfig],
    model: &DiscreteCausalModel,
) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for query in queries {
        validate_name("queries.name", &query.name)?;
        if !seen.insert(query.name.as_str()) {
            return Err(ValidationError::InvalidField {
                field: "queries".to_string(),
                message: format!("query '{}' defined more than once", query.name),
            });
        }

        if query.targets.is_empty() {
            return Err(ValidationError::InvalidField {
                field: format!("queries[{}].targets", query.name),
                message: "at least one target must be specified".to_string(),
            });
        }
        for target in &query.targets {
            if model.variable(target).is_none() {
                return Err(ValidationError::InvalidField {
                    field: format!("queries[{}].targets", query.name),
                    message: format!("unknown variable '{target}'"),
                });
            }
            if query.evidence.contains(target) {
                return Err(ValidationError::InvalidField {
                    field: format!("queries[{}].targets", query.name),
                    message: format!("'{target}' is both a target and observed"),
                });
            }
        }

        let field = format!("queries[{}].evidence", query.name);
        validate_evidence(&field, &query.evidence, model)?;
    }
    Ok(())
}

fn validate_evidence(
    field: &str,
    evidence: &Evidence,
    model: &DiscreteCausalModel,
) -> Result<(), ValidationError> {
    for (name, state) in evidence.iter() {
        let Some(variable) = model.variable(name) else {
            return Err(ValidationError::InvalidField {
                field: field.to_string(),
                message: format!("unknown variable '{name}'"),
            });
        };
        if variable.state_index(state).is_none() {
            return Err(ValidationError::InvalidField {
                field: field.to_string(),
                message: format!("'{state}' is not a state of '{name}'"),
            });
        }
    }
    Ok(())
}

fn resolve_template(run_id: &str, template: &str) -> PathBuf {
    let replaced = template.replace("{run_id}", run_id);
    PathBuf::from(replaced)
}

/// Fully resolved output paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOutputs {
    pub jsonl: PathBuf,
    pub summary_md: PathBuf,
    pub plots_dir: PathBuf,
}

/// Errors surfaced when loading configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        #[source]
        source: serde_yaml::Error,
        path: PathBuf,
    },
    #[error("invalid configuration in {path:?}: {source}")]
    Invalid {
        path: PathBuf,
        source: ValidationError,
    },
}

impl ConfigError {
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. }
            | ConfigError::Parse { path, .. }
            | ConfigError::Invalid { path, .. } => path.as_path(),
        }
    }
}

/// Validation failures captured with contextual metadata.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field}: {message}")]
    InvalidField { field: String, message: String },
}
