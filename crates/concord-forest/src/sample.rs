//! Labeled training samples and dataset validation.

use crate::error::ForestError;

/// A fixed-arity feature vector with its class label.
///
/// `label` is a zero-based index into the configured class set.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LabeledSample {
    /// Feature values, one per column.
    pub features: Vec<f64>,
    /// Zero-based class index.
    pub label: usize,
}

impl LabeledSample {
    /// Create a new sample.
    #[must_use]
    pub fn new(features: Vec<f64>, label: usize) -> Self {
        Self { features, label }
    }

    /// Return the number of feature columns.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.features.len()
    }
}

/// Check that a training set is non-empty, rectangular, finite, and that every
/// label is below `n_classes`.
///
/// Returns the shared feature arity.
pub(crate) fn validate_samples(
    samples: &[LabeledSample],
    n_classes: usize,
) -> Result<usize, ForestError> {
    let first = samples.first().ok_or(ForestError::EmptyDataset)?;
    let n_features = first.n_features();
    if n_features == 0 {
        return Err(ForestError::ZeroFeatures);
    }

    for (sample_index, sample) in samples.iter().enumerate() {
        if sample.n_features() != n_features {
            return Err(ForestError::FeatureCountMismatch {
                expected: n_features,
                got: sample.n_features(),
                sample_index,
            });
        }
        if let Some(feature_index) = sample.features.iter().position(|v| !v.is_finite()) {
            return Err(ForestError::NonFiniteValue {
                sample_index,
                feature_index,
            });
        }
        if sample.label >= n_classes {
            return Err(ForestError::LabelOutOfRange {
                sample_index,
                label: sample.label,
                n_classes,
            });
        }
    }

    Ok(n_features)
}

/// Count samples per class over the given indices.
pub(crate) fn class_counts(
    samples: &[LabeledSample],
    indices: &[usize],
    n_classes: usize,
) -> Vec<usize> {
    let mut counts = vec![0usize; n_classes];
    for &i in indices {
        counts[samples[i].label] += 1;
    }
    counts
}

/// Index of the largest count; the lowest index wins ties.
pub(crate) fn majority_class(counts: &[usize]) -> usize {
    let mut best = 0usize;
    for (class, &count) in counts.iter().enumerate() {
        if count > counts[best] {
            best = class;
        }
    }
    best
}
