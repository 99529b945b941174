//! Serializable summaries of training runs and predictions.
//!
//! These are printed to stdout by the CLI and written to disk by
//! [`ReportWriter`](crate::ReportWriter).

use concord_forest::{
    ClassMetrics, ForestParams, ForestPrediction, RandomForestResult, RankedFeature,
};
use serde::Serialize;

use crate::domain::{ClassSet, FeatureTable};

/// Out-of-bag figures for a training report.
#[derive(Debug, Clone, Serialize)]
pub struct OobSummary {
    /// OOB accuracy.
    pub accuracy: f64,
    /// Samples that were out of bag for at least one tree.
    pub n_oob_samples: usize,
    /// `confusion_matrix[true][predicted]`.
    pub confusion_matrix: Vec<Vec<usize>>,
    /// Precision, recall and F1 per class, in class-index order.
    pub per_class: Vec<ClassReport>,
}

/// [`ClassMetrics`] labeled with the class name.
#[derive(Debug, Clone, Serialize)]
pub struct ClassReport {
    pub class: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

impl ClassReport {
    fn labeled(metrics: &ClassMetrics, classes: &ClassSet) -> Self {
        Self {
            class: classes
                .name(metrics.class)
                .map_or_else(|| metrics.class.to_string(), str::to_string),
            precision: metrics.precision,
            recall: metrics.recall,
            f1: metrics.f1,
            support: metrics.support,
        }
    }
}

/// What a training run produced.
#[derive(Debug, Clone, Serialize)]
pub struct TrainingSummary {
    /// Class names in index order.
    pub classes: ClassSet,
    /// Samples per class, in class-index order.
    pub class_counts: Vec<usize>,
    /// Number of training samples.
    pub n_samples: usize,
    /// Feature column names.
    pub feature_names: Vec<String>,
    /// Hyperparameters the forest was built with.
    pub params: ForestParams,
    /// Ranked feature importances.
    pub importances: Vec<RankedFeature>,
    /// OOB evaluation, when enabled.
    pub oob: Option<OobSummary>,
}

impl TrainingSummary {
    /// Summarize `result` trained on rows labeled through `classes`.
    #[must_use]
    pub fn new(classes: &ClassSet, class_counts: Vec<usize>, result: &RandomForestResult) -> Self {
        let forest = result.forest();
        Self {
            classes: classes.clone(),
            class_counts,
            n_samples: result.metadata().n_samples,
            feature_names: forest.feature_names().to_vec(),
            params: forest.params(),
            importances: result.importances().to_vec(),
            oob: result.oob_score().map(|oob| OobSummary {
                accuracy: oob.accuracy,
                n_oob_samples: oob.n_oob_samples,
                confusion_matrix: oob.confusion.as_rows().to_vec(),
                per_class: oob
                    .confusion
                    .class_metrics()
                    .iter()
                    .map(|m| ClassReport::labeled(m, classes))
                    .collect(),
            }),
        }
    }
}

/// One row's forest prediction, labeled with class names.
#[derive(Debug, Clone, Serialize)]
pub struct PredictionRecord {
    /// Row id from the inference CSV.
    pub id: String,
    /// Winning class name.
    pub class: String,
    /// Winning vote fraction.
    pub confidence: f64,
    /// `(class name, vote fraction)` for every class, highest first.
    pub votes: Vec<(String, f64)>,
}

/// Pair each row of `table` with its prediction.
///
/// `predictions[i]` must belong to `table.rows()[i]`.
#[must_use]
pub fn prediction_records(
    table: &FeatureTable,
    predictions: &[ForestPrediction],
    classes: &ClassSet,
) -> Vec<PredictionRecord> {
    let name = |c: usize| classes.name(c).map_or_else(|| c.to_string(), str::to_string);
    table
        .ids()
        .iter()
        .zip(predictions)
        .map(|(id, p)| PredictionRecord {
            id: id.to_string(),
            class: name(p.class),
            confidence: p.confidence,
            votes: p
                .top_k(p.vote_share.len())
                .into_iter()
                .map(|(c, share)| (name(c), share))
                .collect(),
        })
        .collect()
}
