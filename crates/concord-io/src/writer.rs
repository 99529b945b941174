//! JSON report writer for training runs, predictions and decisions.

use std::fs;
use std::path::{Path, PathBuf};

use concord_consensus::Decision;
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::IoError;
use crate::domain::RunName;
use crate::report::{PredictionRecord, TrainingSummary};

/// Writes run reports to JSON files.
///
/// Creates the output directory on construction if it does not exist.
/// Output files are named `{run}_training.json`, `{run}_predictions.json`
/// and `{run}_decision.json`.
pub struct ReportWriter {
    output_dir: PathBuf,
    run: RunName,
}

impl ReportWriter {
    /// Create a new writer targeting the given directory and run name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::OutputDirCreate`] if the directory cannot be created.
    #[instrument(skip_all, fields(dir = %output_dir.display(), run = %run))]
    pub fn new(output_dir: &Path, run: RunName) -> Result<Self, IoError> {
        fs::create_dir_all(output_dir).map_err(|e| IoError::OutputDirCreate {
            path: output_dir.to_path_buf(),
            source: e,
        })?;
        debug!("output directory ready");
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            run,
        })
    }

    /// Write a training summary to `{run}_training.json`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Serialize`] or [`IoError::WriteFile`] if the report
    /// cannot be encoded or written.
    #[instrument(skip_all)]
    pub fn write_training(&self, summary: &TrainingSummary) -> Result<PathBuf, IoError> {
        self.write_artifact(
            "training",
            &RunArtifact {
                run: self.run.as_str(),
                body: summary,
            },
        )
    }

    /// Write per-row predictions to `{run}_predictions.json`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Serialize`] or [`IoError::WriteFile`] if the report
    /// cannot be encoded or written.
    #[instrument(skip_all, fields(n_rows = records.len()))]
    pub fn write_predictions(&self, records: &[PredictionRecord]) -> Result<PathBuf, IoError> {
        self.write_artifact(
            "predictions",
            &PredictionsArtifact {
                run: self.run.as_str(),
                n_rows: records.len(),
                predictions: records,
            },
        )
    }

    /// Write a consensus decision to `{run}_decision.json`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Serialize`] or [`IoError::WriteFile`] if the report
    /// cannot be encoded or written.
    #[instrument(skip_all)]
    pub fn write_decision(&self, decision: &Decision) -> Result<PathBuf, IoError> {
        self.write_artifact(
            "decision",
            &RunArtifact {
                run: self.run.as_str(),
                body: decision,
            },
        )
    }

    fn write_artifact<T: Serialize>(&self, kind: &str, artifact: &T) -> Result<PathBuf, IoError> {
        let path = self
            .output_dir
            .join(format!("{}_{kind}.json", self.run.as_str()));
        let json = serde_json::to_string_pretty(artifact).map_err(|e| IoError::Serialize {
            path: path.clone(),
            source: e,
        })?;
        fs::write(&path, json).map_err(|e| IoError::WriteFile {
            path: path.clone(),
            source: e,
        })?;
        info!(path = %path.display(), kind, "report written");
        Ok(path)
    }
}

// --- Shadow structs for JSON serialization ---

#[derive(Serialize)]
struct RunArtifact<'a, T: Serialize> {
    run: &'a str,
    #[serde(flatten)]
    body: &'a T,
}

#[derive(Serialize)]
struct PredictionsArtifact<'a> {
    run: &'a str,
    n_rows: usize,
    predictions: &'a [PredictionRecord],
}

#[cfg(test)]
mod tests {
    use super::*;
    use concord_consensus::{Action, ConsensusConfig, Orchestrator, StaticPredictor};
    use concord_forest::{LabeledSample, OobMode, RandomForestConfig};
    use tempfile::TempDir;

    use crate::domain::ClassSet;

    fn read_json(path: &Path) -> serde_json::Value {
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    fn summary() -> TrainingSummary {
        let samples: Vec<LabeledSample> = (0..30)
            .map(|i| LabeledSample::new(vec![i as f64, (i % 3) as f64], usize::from(i >= 15)))
            .collect();
        let result = RandomForestConfig::new(10)
            .unwrap()
            .with_classes(2, 1)
            .with_oob_mode(OobMode::Enabled)
            .with_feature_names(vec!["rsi".into(), "macd".into()])
            .fit(&samples)
            .unwrap();
        let classes = ClassSet::parse("BUY,SELL").unwrap();
        TrainingSummary::new(&classes, vec![15, 15], &result)
    }

    #[test]
    fn write_training_json_structure() {
        let dir = TempDir::new().unwrap();
        let run = RunName::new("t1".into()).unwrap();
        let writer = ReportWriter::new(dir.path(), run).unwrap();
        let path = writer.write_training(&summary()).unwrap();
        assert_eq!(path, dir.path().join("t1_training.json"));

        let content = read_json(&path);
        assert_eq!(content["run"], "t1");
        assert_eq!(content["classes"], serde_json::json!(["BUY", "SELL"]));
        assert_eq!(content["n_samples"], 30);
        assert_eq!(content["params"]["tree_count"], 10);
        assert_eq!(content["importances"].as_array().unwrap().len(), 2);
        assert!(content["oob"]["accuracy"].is_number());
        assert_eq!(content["oob"]["confusion_matrix"].as_array().unwrap().len(), 2);
        let per_class = content["oob"]["per_class"].as_array().unwrap();
        assert_eq!(per_class.len(), 2);
        assert_eq!(per_class[0]["class"], "BUY");
        assert_eq!(per_class[1]["class"], "SELL");
        for m in per_class {
            assert!((0.0..=1.0).contains(&m["f1"].as_f64().unwrap()));
        }
    }

    #[test]
    fn write_decision_includes_skipped_sources() {
        let dir = TempDir::new().unwrap();
        let run = RunName::new("d1".into()).unwrap();
        let writer = ReportWriter::new(dir.path(), run).unwrap();

        let mut orch = Orchestrator::new(ConsensusConfig::new()).unwrap();
        orch.add_source(Box::new(StaticPredictor::new("a", Action::Buy, 0.8)), 1.0)
            .unwrap();
        orch.add_source(Box::new(StaticPredictor::failed("b", "offline")), 1.0)
            .unwrap();
        let decision = orch.decide(&[], 100.0, Some(2.0)).unwrap();

        let content = read_json(&writer.write_decision(&decision).unwrap());
        assert_eq!(content["run"], "d1");
        assert_eq!(content["result"]["final_action"], "BUY");
        assert_eq!(content["result"]["target"], 105.0);
        assert_eq!(content["skipped"][0]["source"], "b");
    }

    #[test]
    fn creates_nested_output_dir() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("nested").join("deep");
        let run = RunName::new("n".into()).unwrap();
        let writer = ReportWriter::new(&nested, run).unwrap();
        writer.write_predictions(&[]).unwrap();
        let content = read_json(&nested.join("n_predictions.json"));
        assert_eq!(content["n_rows"], 0);
    }
}
