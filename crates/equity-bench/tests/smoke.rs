use std::fs;
use std::path::Path;

use equity_bench::analysis::AnalysisRunner;
use equity_bench::config::AnalysisConfig;
use sha2::{Digest, Sha256};
use tempfile::tempdir;

fn load_config(output_dir: &Path) -> AnalysisConfig {
    let yaml = format!(
        r#"
run_id: "test_smoke"
queries:
  - name: "rural_low_income"
    targets: ["DigitalInclusion"]
    evidence:
      Infrastructure: "Absent"
      Income: "Low"
  - name: "included_households"
    targets: ["Infrastructure"]
    evidence:
      DigitalInclusion: "High"
sampling:
  samples: 4000
  seed: 4242
outputs:
  jsonl: "{jsonl}"
  summary_md: "{summary}"
  plots_dir: "{plots}"
logging:
  enable_structured: false
"#,
        jsonl = output_dir.join("analysis.jsonl").display(),
        summary = output_dir.join("summary.md").display(),
        plots = output_dir.join("plots").display()
    );

    let mut cfg: AnalysisConfig = serde_yaml::from_str(&yaml).expect("valid yaml");
    cfg.validate().expect("config validates");
    cfg
}

fn run_and_hash(output_dir: &Path) -> (String, String) {
    let config = load_config(output_dir);
    let outputs = config.resolved_outputs();
    let mut runner = AnalysisRunner::new(config, outputs).expect("runner created");
    let summary = runner.run().expect("analysis completes");

    assert_eq!(summary.queries_run, 2);
    assert_eq!(summary.scenarios_compared, 5);
    assert_eq!(summary.rows_written, 7);
    assert!(summary.summary_path.exists(), "summary markdown missing");
    // Plot rendering is optional; ensure any failure surfaces explicitly
    if let Some(plot_path) = summary.plot_path {
        assert!(plot_path.exists(), "plot path reported but missing on disk");
    }

    let jsonl = fs::read_to_string(&summary.jsonl_path).expect("jsonl readable");
    let mut hasher = Sha256::new();
    hasher.update(jsonl.as_bytes());
    (hex::encode(hasher.finalize()), jsonl)
}

#[test]
fn analysis_smoke_test_is_byte_for_byte_deterministic() {
    let first_dir = tempdir().expect("temp dir");
    let second_dir = tempdir().expect("temp dir");

    let (first_hash, jsonl) = run_and_hash(first_dir.path());
    let (second_hash, _) = run_and_hash(second_dir.path());
    assert_eq!(first_hash, second_hash, "JSONL output differs between runs");

    let rows: Vec<serde_json::Value> = jsonl
        .lines()
        .map(|line| serde_json::from_str(line).expect("row decodes to JSON"))
        .collect();
    let rural = &rows[0];
    assert_eq!(rural["name"], "rural_low_income");
    let high = rural["distribution"]["states"][1]["probability"]
        .as_f64()
        .expect("probability");
    assert!((high - 0.24086).abs() < 1e-6);

    let diagnostic = rows[1]["distribution"]["states"][1]["probability"]
        .as_f64()
        .expect("probability");
    assert!((diagnostic - 0.338417).abs() < 1e-6);

    let combined = rows
        .iter()
        .find(|row| row["name"] == "combined")
        .expect("combined row");
    assert!((combined["probability"].as_f64().expect("p") - 0.44736).abs() < 1e-6);
    assert!(combined["sampled"]["effective_sample_size"].as_f64().expect("ess") > 0.0);
}

#[test]
fn summary_ranks_scenarios() {
    let dir = tempdir().expect("temp dir");
    run_and_hash(dir.path());
    let summary = fs::read_to_string(dir.path().join("summary.md")).expect("summary");
    assert!(summary.contains("## Interventions"));
    assert!(summary.contains("| 1 | combined |"));
    assert!(summary.contains("**Most effective intervention:** combined"));
    assert!(summary.contains(
        "| rural_low_income | Income=Low, Infrastructure=Absent | DigitalInclusion |"
    ));
}
