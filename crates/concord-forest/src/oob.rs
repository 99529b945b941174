//! Out-of-bag (OOB) evaluation for Random Forest.

use crate::confusion::ConfusionMatrix;
use crate::error::ForestError;
use crate::node::TreeNode;
use crate::sample::{LabeledSample, majority_class};

/// Out-of-bag evaluation result.
#[derive(Debug, Clone, serde::Serialize)]
pub struct OobScore {
    /// Fraction of OOB-evaluated samples predicted correctly.
    pub accuracy: f64,
    /// Confusion matrix over the OOB-evaluated samples.
    pub confusion: ConfusionMatrix,
    /// Number of samples that were out of bag for at least one tree.
    pub n_oob_samples: usize,
}

/// Score each sample by majority vote over the trees it was out of bag for.
///
/// Samples that were drawn into every bootstrap are skipped.
pub(crate) fn compute_oob(
    trees: &[TreeNode],
    samples: &[LabeledSample],
    n_classes: usize,
    oob_indices_per_tree: &[Vec<usize>],
) -> Result<OobScore, ForestError> {
    let mut votes: Vec<Vec<usize>> = vec![vec![0; n_classes]; samples.len()];
    let mut has_oob = vec![false; samples.len()];

    for (tree, oob_indices) in trees.iter().zip(oob_indices_per_tree) {
        for &i in oob_indices {
            votes[i][tree.vote(&samples[i].features)] += 1;
            has_oob[i] = true;
        }
    }

    let (truth, predicted): (Vec<usize>, Vec<usize>) = samples
        .iter()
        .zip(&votes)
        .zip(&has_oob)
        .filter(|(_, evaluated)| **evaluated)
        .map(|((sample, v), _)| (sample.label, majority_class(v)))
        .unzip();

    if truth.is_empty() {
        return Err(ForestError::OobEvaluationFailed {
            reason: "no sample has any OOB tree".to_string(),
        });
    }

    let confusion = ConfusionMatrix::from_labels(&truth, &predicted, n_classes)?;

    Ok(OobScore {
        accuracy: confusion.accuracy(),
        n_oob_samples: truth.len(),
        confusion,
    })
}
