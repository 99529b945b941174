//! Majority-vote inference for the Random Forest ensemble.

use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::config::ForestParams;
use crate::error::ForestError;
use crate::forest::RandomForest;
use crate::node::TreeNode;
use crate::sample::majority_class;

/// Confidence reported by an untrained forest.
pub const UNTRAINED_CONFIDENCE: f64 = 0.5;

/// Outcome of routing one feature vector through every tree.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ForestPrediction {
    /// Class with the most tree votes (lowest index on ties).
    pub class: usize,
    /// `votes[class] / tree_count`.
    pub confidence: f64,
    /// `votes[c] / tree_count` for every class `c`.
    pub vote_share: Vec<f64>,
}

impl ForestPrediction {
    /// Return the top-k classes sorted by descending vote share.
    #[must_use]
    pub fn top_k(&self, k: usize) -> Vec<(usize, f64)> {
        let mut indexed: Vec<(usize, f64)> =
            self.vote_share.iter().copied().enumerate().collect();
        indexed.sort_by(|a, b| b.1.total_cmp(&a.1));
        indexed.truncate(k);
        indexed
    }
}

impl RandomForest {
    /// Predict by plain majority voting: each tree votes once for the majority
    /// class of the leaf the sample reaches.
    ///
    /// An untrained forest does not fail: it returns the neutral class with
    /// confidence [`UNTRAINED_CONFIDENCE`] for any input. Callers that must
    /// tell the two apart check [`RandomForest::is_trained`].
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::ShapeMismatch`] when a trained forest receives a
    /// sample whose length differs from the training arity.
    pub fn predict(&self, sample: &[f64]) -> Result<ForestPrediction, ForestError> {
        if !self.is_trained() {
            let mut vote_share = vec![0.0; self.n_classes];
            vote_share[self.neutral_class] = UNTRAINED_CONFIDENCE;
            return Ok(ForestPrediction {
                class: self.neutral_class,
                confidence: UNTRAINED_CONFIDENCE,
                vote_share,
            });
        }

        if sample.len() != self.n_features {
            return Err(ForestError::ShapeMismatch {
                expected: self.n_features,
                got: sample.len(),
            });
        }

        let votes = self.tally(sample);
        let class = majority_class(&votes);
        let n = self.trees.len() as f64;

        Ok(ForestPrediction {
            class,
            confidence: votes[class] as f64 / n,
            vote_share: votes.iter().map(|&v| v as f64 / n).collect(),
        })
    }

    /// Raw per-class vote counts for `sample`.
    ///
    /// The caller guarantees `sample` has the training arity.
    pub(crate) fn tally(&self, sample: &[f64]) -> Vec<usize> {
        let mut votes = vec![0usize; self.n_classes];
        for tree in &self.trees {
            votes[tree.vote(sample)] += 1;
        }
        votes
    }

    /// Predict a batch of samples in parallel.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::ShapeMismatch`] if any sample has the wrong arity.
    pub fn predict_batch(
        &self,
        samples: &[Vec<f64>],
    ) -> Result<Vec<ForestPrediction>, ForestError> {
        samples
            .into_par_iter()
            .map(|sample| self.predict(sample))
            .collect()
    }

    /// Borrow the tree roots in training order.
    #[must_use]
    pub fn trees(&self) -> &[TreeNode] {
        &self.trees
    }

    /// Return the hyperparameters the forest was built with.
    #[must_use]
    pub fn params(&self) -> ForestParams {
        self.params
    }

    /// Return the training arity (0 when untrained).
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Return the size of the class set.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Return the class an untrained forest answers with.
    #[must_use]
    pub fn neutral_class(&self) -> usize {
        self.neutral_class
    }

    /// Return the number of trees in the ensemble.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Return the feature names.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }
}
