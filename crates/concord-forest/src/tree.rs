use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, instrument, trace};

use crate::{
    ForestError,
    node::TreeNode,
    sample::{LabeledSample, class_counts, majority_class, validate_samples},
    split::{find_best_split, gini_impurity},
};

/// Configuration for a single Gini decision tree.
///
/// Construct via [`DecisionTreeConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter           | Default               |
/// |---------------------|-----------------------|
/// | `max_depth`         | 15                    |
/// | `min_samples_split` | 5                     |
/// | `max_features`      | `None` (all features) |
/// | `n_classes`         | 3                     |
/// | `seed`              | 42                    |
#[derive(Debug, Clone)]
pub struct DecisionTreeConfig {
    pub(crate) max_depth: usize,
    pub(crate) min_samples_split: usize,
    pub(crate) max_features: Option<usize>,
    pub(crate) n_classes: usize,
    pub(crate) seed: u64,
}

impl DecisionTreeConfig {
    /// Create a new config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_depth: 15,
            min_samples_split: 5,
            max_features: None,
            n_classes: 3,
            seed: 42,
        }
    }

    /// Set the maximum tree depth (root is depth 0).
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the partition size at or below which a node becomes a leaf.
    #[must_use]
    pub fn with_min_samples_split(mut self, min_samples_split: usize) -> Self {
        self.min_samples_split = min_samples_split;
        self
    }

    /// Set the number of features drawn per split. `None` means all features.
    #[must_use]
    pub fn with_max_features(mut self, max_features: Option<usize>) -> Self {
        self.max_features = max_features;
        self
    }

    /// Set the size of the class set.
    #[must_use]
    pub fn with_n_classes(mut self, n_classes: usize) -> Self {
        self.n_classes = n_classes;
        self
    }

    /// Set the feature-subsampling seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    // --- Getters ---

    /// Return the maximum depth.
    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Return the leaf-forcing partition size.
    #[must_use]
    pub fn min_samples_split(&self) -> usize {
        self.min_samples_split
    }

    /// Return the per-split feature draw, if limited.
    #[must_use]
    pub fn max_features(&self) -> Option<usize> {
        self.max_features
    }

    /// Return the size of the class set.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Return the seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Induce a tree on every sample in `samples`.
    ///
    /// # Errors
    ///
    /// | Variant                                  | When                                       |
    /// |------------------------------------------|--------------------------------------------|
    /// | [`ForestError::InvalidMaxDepth`]         | `max_depth` is 0                           |
    /// | [`ForestError::InvalidMinSamplesSplit`]  | `min_samples_split` is 0                   |
    /// | [`ForestError::InvalidClassCount`]       | fewer than 2 classes                       |
    /// | [`ForestError::EmptyDataset`]            | `samples` is empty                         |
    /// | [`ForestError::ZeroFeatures`]            | samples have no feature columns            |
    /// | [`ForestError::FeatureCountMismatch`]    | samples have inconsistent arity            |
    /// | [`ForestError::NonFiniteValue`]          | any value is NaN or infinite               |
    /// | [`ForestError::LabelOutOfRange`]         | a label is `>= n_classes`                  |
    /// | [`ForestError::InvalidMaxFeatures`]      | `max_features` is 0 or exceeds the arity   |
    #[instrument(skip(self, samples), fields(n_samples = samples.len()))]
    pub fn fit(&self, samples: &[LabeledSample]) -> Result<DecisionTree, ForestError> {
        self.validate()?;
        let n_features = validate_samples(samples, self.n_classes)?;

        let max_features = self.max_features.unwrap_or(n_features);
        if max_features == 0 || max_features > n_features {
            return Err(ForestError::InvalidMaxFeatures {
                max_features,
                n_features,
            });
        }

        let indices: Vec<usize> = (0..samples.len()).collect();
        let root = TreeInducer::new(samples, self, max_features, self.seed).build(indices, 0);

        debug!(
            n_nodes = root.n_nodes(),
            depth = root.depth(),
            "decision tree built"
        );

        Ok(DecisionTree {
            root,
            n_features,
            n_classes: self.n_classes,
        })
    }

    pub(crate) fn validate(&self) -> Result<(), ForestError> {
        if self.max_depth == 0 {
            return Err(ForestError::InvalidMaxDepth { max_depth: 0 });
        }
        if self.min_samples_split == 0 {
            return Err(ForestError::InvalidMinSamplesSplit {
                min_samples_split: 0,
            });
        }
        if self.n_classes < 2 {
            return Err(ForestError::InvalidClassCount {
                n_classes: self.n_classes,
            });
        }
        Ok(())
    }
}

impl Default for DecisionTreeConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Recursive Gini tree builder over a validated sample set.
///
/// Partitions are index lists into `samples`; a bootstrap partition may
/// contain the same index several times.
pub(crate) struct TreeInducer<'a> {
    samples: &'a [LabeledSample],
    n_classes: usize,
    max_depth: usize,
    min_samples_split: usize,
    max_features: usize,
    rng: ChaCha8Rng,
}

impl<'a> TreeInducer<'a> {
    pub(crate) fn new(
        samples: &'a [LabeledSample],
        config: &DecisionTreeConfig,
        max_features: usize,
        seed: u64,
    ) -> Self {
        Self {
            samples,
            n_classes: config.n_classes,
            max_depth: config.max_depth,
            min_samples_split: config.min_samples_split,
            max_features,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Build the subtree for `indices` at `depth`.
    pub(crate) fn build(&mut self, indices: Vec<usize>, depth: usize) -> TreeNode {
        debug_assert!(!indices.is_empty(), "tree nodes never receive empty partitions");

        let n_samples = indices.len();
        let counts = class_counts(self.samples, &indices, self.n_classes);
        let pure = counts[majority_class(&counts)] == n_samples;

        if depth >= self.max_depth || n_samples <= self.min_samples_split || pure {
            return TreeNode::Leaf {
                class_counts: counts,
            };
        }

        let Some(split) = find_best_split(
            self.samples,
            &indices,
            self.n_classes,
            self.max_features,
            &mut self.rng,
        ) else {
            trace!(depth, n_samples, "no separating threshold, emitting leaf");
            return TreeNode::Leaf {
                class_counts: counts,
            };
        };

        let n = n_samples as f64;
        let impurity_decrease = n * (gini_impurity(&counts, n_samples) - split.weighted_impurity);

        // Each child consumes its own partition.
        let left = self.build(split.left_indices, depth + 1);
        let right = self.build(split.right_indices, depth + 1);

        TreeNode::Internal {
            feature: split.feature,
            threshold: split.threshold,
            left: Box::new(left),
            right: Box::new(right),
            n_samples,
            impurity_decrease,
        }
    }
}

/// A fitted Gini decision tree.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct DecisionTree {
    pub(crate) root: TreeNode,
    pub(crate) n_features: usize,
    pub(crate) n_classes: usize,
}

impl DecisionTree {
    /// Predict the majority class of the leaf `sample` reaches.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::ShapeMismatch`] when `sample.len() != n_features`.
    pub fn predict(&self, sample: &[f64]) -> Result<usize, ForestError> {
        self.check_shape(sample)?;
        Ok(self.root.vote(sample))
    }

    /// Return the raw class counts of the leaf `sample` reaches.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::ShapeMismatch`] when `sample.len() != n_features`.
    pub fn class_counts(&self, sample: &[f64]) -> Result<&[usize], ForestError> {
        self.check_shape(sample)?;
        Ok(self.root.leaf_counts(sample))
    }

    /// Mean Decrease in Impurity per feature, normalized to sum to 1.0.
    ///
    /// All zeros when the tree is a single leaf.
    #[must_use]
    pub fn feature_importances(&self) -> Vec<f64> {
        let mut totals = vec![0.0f64; self.n_features];
        self.root.accumulate_importance(&mut totals);
        let sum: f64 = totals.iter().sum();
        if sum > 0.0 {
            totals.iter_mut().for_each(|v| *v /= sum);
        }
        totals
    }

    /// Borrow the root node.
    #[must_use]
    pub fn root(&self) -> &TreeNode {
        &self.root
    }

    /// Return the total number of nodes.
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.root.n_nodes()
    }

    /// Return the number of leaves.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.root.n_leaves()
    }

    /// Return the depth; a single-leaf tree has depth 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.root.depth()
    }

    /// Return the training arity.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Return the size of the class set.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    fn check_shape(&self, sample: &[f64]) -> Result<(), ForestError> {
        if sample.len() != self.n_features {
            return Err(ForestError::ShapeMismatch {
                expected: self.n_features,
                got: sample.len(),
            });
        }
        Ok(())
    }
}
