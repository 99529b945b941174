//! End-to-end integration tests: CSV -> train -> predict -> JSON, and
//! JSON inputs -> combine -> decision report.

use std::fs;
use std::path::Path;

use concord_consensus::{Action, ConsensusConfig, Decision, combine};
use concord_forest::{OobMode, RandomForestConfig};
use concord_io::{
    ClassSet, ConsensusInputReader, FeatureReader, IoError, ReportWriter, RunName,
    TrainingReader, TrainingSummary, prediction_records,
};
use tempfile::TempDir;

/// Path to the test fixture directory.
fn fixture_path(name: &str) -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn read_json(path: &Path) -> serde_json::Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn train_predict_round_trip() {
    // 1. Read training CSV
    let classes = ClassSet::parse("BUY,SELL,HOLD").unwrap();
    let set = TrainingReader::new(&fixture_path("regimes_train.csv"), classes)
        .read()
        .expect("fixture should parse");
    assert_eq!(set.samples().len(), 60);
    assert_eq!(set.class_counts(), vec![20, 20, 20]);

    // 2. Train
    let result = RandomForestConfig::new(50)
        .unwrap()
        .with_seed(42)
        .with_oob_mode(OobMode::Enabled)
        .with_feature_names(set.feature_names().to_vec())
        .fit(set.samples())
        .unwrap();
    let summary = TrainingSummary::new(set.classes(), set.class_counts(), &result);

    // 3. Predict rows whose columns must match the training columns
    let table = FeatureReader::new(&fixture_path("regimes_rows.csv"))
        .read_matching(set.feature_names())
        .unwrap();
    let predictions = result.forest().predict_batch(table.rows()).unwrap();
    let records = prediction_records(&table, &predictions, set.classes());
    let classes: Vec<&str> = records.iter().map(|r| r.class.as_str()).collect();
    assert_eq!(classes, vec!["BUY", "SELL", "HOLD"]);

    // 4. Write and read back
    let dir = TempDir::new().unwrap();
    let run = RunName::new("regimes".into()).unwrap();
    let writer = ReportWriter::new(dir.path(), run).unwrap();
    let training = read_json(&writer.write_training(&summary).unwrap());
    assert_eq!(training["run"], "regimes");
    assert_eq!(training["feature_names"][0], "rsi");
    assert!(training["oob"]["accuracy"].as_f64().unwrap() > 0.9);
    let per_class = training["oob"]["per_class"].as_array().unwrap();
    let names: Vec<&str> = per_class
        .iter()
        .map(|m| m["class"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["BUY", "SELL", "HOLD"]);
    assert!(per_class.iter().all(|m| m["support"] == 20));

    let written = read_json(&writer.write_predictions(&records).unwrap());
    assert_eq!(written["n_rows"], 3);
    assert_eq!(written["predictions"][0]["id"], "up");
    assert_eq!(written["predictions"][0]["class"], "BUY");
    assert_eq!(written["predictions"][0]["votes"].as_array().unwrap().len(), 3);
}

#[test]
fn combine_inputs_round_trip() {
    let inputs = ConsensusInputReader::new(&fixture_path("consensus_inputs.json"))
        .read()
        .unwrap();
    let result = combine(&inputs, 100.0, 2.0, &ConsensusConfig::new()).unwrap();
    assert_eq!(result.final_action, Action::Buy);

    let dir = TempDir::new().unwrap();
    let run = RunName::new("combo".into()).unwrap();
    let writer = ReportWriter::new(dir.path(), run).unwrap();
    let decision = Decision {
        result,
        skipped: Vec::new(),
    };
    let content = read_json(&writer.write_decision(&decision).unwrap());

    assert_eq!(content["result"]["final_action"], "BUY");
    let confidence = content["result"]["final_confidence"].as_f64().unwrap();
    assert!((confidence - 0.6).abs() < 1e-12);
    assert!((content["result"]["agreement"].as_f64().unwrap() - 0.5).abs() < 1e-12);
    assert_eq!(content["result"]["breakdown"].as_array().unwrap().len(), 3);
    assert!(content["skipped"].as_array().unwrap().is_empty());
}

#[test]
fn mismatched_inference_columns_rejected() {
    let names = vec!["rsi".to_string(), "macd".to_string()];
    let err = FeatureReader::new(&fixture_path("regimes_rows.csv"))
        .read_matching(&names)
        .unwrap_err();
    assert!(matches!(err, IoError::FeatureMismatch { .. }));
}
