//! Out-of-bag confusion matrix with per-class precision and recall.

use crate::error::ForestError;

/// A confusion matrix for multi-class classification.
///
/// `matrix[true_class][predicted_class]` counts the samples of `true_class`
/// that were predicted as `predicted_class`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ConfusionMatrix {
    matrix: Vec<Vec<usize>>,
    n_classes: usize,
}

/// Precision, recall and F1 for one class of a [`ConfusionMatrix`].
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ClassMetrics {
    pub class: usize,
    /// Share of predictions of this class that were right; 0.0 when never predicted.
    pub precision: f64,
    /// Share of this class's samples that were found; 0.0 when the class is absent.
    pub recall: f64,
    /// `2·hits / (predicted + support)`, the harmonic mean of the two above.
    pub f1: f64,
    /// True samples of this class.
    pub support: usize,
}

impl ClassMetrics {
    fn from_counts(class: usize, hits: usize, predicted: usize, support: usize) -> Self {
        Self {
            class,
            precision: fraction(hits, predicted),
            recall: fraction(hits, support),
            f1: fraction(2 * hits, predicted + support),
            support,
        }
    }
}

fn fraction(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

impl ConfusionMatrix {
    /// Build a confusion matrix from paired true and predicted labels.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ForestError::EmptyDataset`] | zero labels provided |
    /// | [`ForestError::LabelOutOfRange`] | a label is `>= n_classes` |
    pub fn from_labels(
        true_labels: &[usize],
        predicted: &[usize],
        n_classes: usize,
    ) -> Result<Self, ForestError> {
        if true_labels.is_empty() {
            return Err(ForestError::EmptyDataset);
        }
        let mut matrix = vec![vec![0usize; n_classes]; n_classes];
        for (sample_index, (&t, &p)) in true_labels.iter().zip(predicted).enumerate() {
            if let Some(label) = [t, p].into_iter().find(|&l| l >= n_classes) {
                return Err(ForestError::LabelOutOfRange {
                    sample_index,
                    label,
                    n_classes,
                });
            }
            matrix[t][p] += 1;
        }
        Ok(Self { matrix, n_classes })
    }

    /// Share of samples on the diagonal.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        let diagonal: usize = (0..self.n_classes).map(|i| self.matrix[i][i]).sum();
        let total: usize = self.matrix.iter().flatten().sum();
        fraction(diagonal, total)
    }

    /// Metrics for every class, in class-index order.
    #[must_use]
    pub fn class_metrics(&self) -> Vec<ClassMetrics> {
        let mut predicted = vec![0usize; self.n_classes];
        for row in &self.matrix {
            for (total, &count) in predicted.iter_mut().zip(row) {
                *total += count;
            }
        }
        self.matrix
            .iter()
            .enumerate()
            .map(|(c, row)| ClassMetrics::from_counts(c, row[c], predicted[c], row.iter().sum()))
            .collect()
    }

    /// Return the underlying matrix rows.
    #[must_use]
    pub fn as_rows(&self) -> &[Vec<usize>] {
        &self.matrix
    }

    /// Return the number of classes.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }
}
