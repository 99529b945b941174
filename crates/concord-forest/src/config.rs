//! Configuration builder for Random Forest training.

use std::time::Duration;

use crate::error::ForestError;
use crate::result::RandomForestResult;
use crate::sample::LabeledSample;

/// Strategy for determining the number of features drawn at each split.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub enum MaxFeatures {
    /// Square root of total features, rounded up.
    Sqrt,
    /// Log base 2 of total features, rounded up, at least 1.
    Log2,
    /// A fraction of total features, rounded up.
    Fraction(f64),
    /// A fixed count.
    Fixed(usize),
    /// All features (no subsampling).
    All,
}

impl MaxFeatures {
    /// Resolve to a concrete count for a dataset with `n_features` columns.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::InvalidMaxFeatures`] when the resolved count is 0
    /// or exceeds `n_features`. Out-of-range values are never clamped.
    pub fn resolve(self, n_features: usize) -> Result<usize, ForestError> {
        let resolved = match self {
            MaxFeatures::Sqrt => (n_features as f64).sqrt().ceil() as usize,
            MaxFeatures::Log2 => (n_features as f64).log2().ceil().max(1.0) as usize,
            MaxFeatures::Fraction(f) if f.is_finite() && f > 0.0 => {
                (n_features as f64 * f).ceil() as usize
            }
            MaxFeatures::Fraction(_) => 0,
            MaxFeatures::Fixed(n) => n,
            MaxFeatures::All => n_features,
        };
        if resolved == 0 || resolved > n_features {
            return Err(ForestError::InvalidMaxFeatures {
                max_features: resolved,
                n_features,
            });
        }
        Ok(resolved)
    }
}

/// Whether to compute out-of-bag evaluation during training.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OobMode {
    /// Compute OOB accuracy and confusion matrix.
    Enabled,
    /// Skip OOB evaluation.
    Disabled,
}

/// Hyperparameters a trained forest was built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct ForestParams {
    /// Number of trees in the ensemble.
    pub tree_count: usize,
    /// Maximum depth of each tree.
    pub max_depth: usize,
    /// Partition size at or below which a node becomes a leaf.
    pub min_samples_split: usize,
    /// Number of features drawn per split (0 for an untrained forest).
    pub max_features: usize,
}

/// Configuration for Random Forest training.
///
/// Construct via [`RandomForestConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter           | Default    |
/// |---------------------|------------|
/// | `max_features`      | `Sqrt`     |
/// | `max_depth`         | 15         |
/// | `min_samples_split` | 5          |
/// | `n_classes`         | 3          |
/// | `neutral_class`     | 2          |
/// | `seed`              | 42         |
/// | `oob_mode`          | `Disabled` |
/// | `time_budget`       | `None`     |
/// | `feature_names`     | `None` (`f0`, `f1`, ...) |
///
/// The class defaults match the `[Buy, Sell, Hold]` layout, where `Hold` is
/// the neutral class an untrained forest answers with.
#[derive(Debug, Clone)]
pub struct RandomForestConfig {
    pub(crate) tree_count: usize,
    pub(crate) max_features: MaxFeatures,
    pub(crate) max_depth: usize,
    pub(crate) min_samples_split: usize,
    pub(crate) n_classes: usize,
    pub(crate) neutral_class: usize,
    pub(crate) seed: u64,
    pub(crate) oob_mode: OobMode,
    pub(crate) time_budget: Option<Duration>,
    pub(crate) feature_names: Option<Vec<String>>,
}

impl RandomForestConfig {
    /// Create a new config with the given number of trees.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::InvalidTreeCount`] if `tree_count` is zero.
    pub fn new(tree_count: usize) -> Result<Self, ForestError> {
        if tree_count == 0 {
            return Err(ForestError::InvalidTreeCount { tree_count });
        }
        Ok(Self {
            tree_count,
            max_features: MaxFeatures::Sqrt,
            max_depth: 15,
            min_samples_split: 5,
            n_classes: 3,
            neutral_class: 2,
            seed: 42,
            oob_mode: OobMode::Disabled,
            time_budget: None,
            feature_names: None,
        })
    }

    // --- Setters ---

    /// Set the max features strategy.
    #[must_use]
    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    /// Set the maximum tree depth.
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

    /// Set the class-set size and the neutral class used by an untrained forest.
    #[must_use]
    pub fn with_classes(mut self, n_classes: usize, neutral_class: usize) -> Self {
        self.n_classes = n_classes;
        self.neutral_class = neutral_class;
        self
    }

    /// Set the master random seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the OOB evaluation mode.
    #[must_use]
    pub fn with_oob_mode(mut self, oob_mode: OobMode) -> Self {
        self.oob_mode = oob_mode;
        self
    }

    /// Abort training once `budget` has elapsed, checked before each tree build.
    #[must_use]
    pub fn with_time_budget(mut self, budget: Duration) -> Self {
        self.time_budget = Some(budget);
        self
    }

    /// Name the feature columns for importance reporting.
    #[must_use]
    pub fn with_feature_names(mut self, names: Vec<String>) -> Self {
        self.feature_names = Some(names);
        self
    }

    // --- Getters ---

    /// Return the number of trees.
    #[must_use]
    pub fn tree_count(&self) -> usize {
        self.tree_count
    }

    /// Return the max features strategy.
    #[must_use]
    pub fn max_features(&self) -> MaxFeatures {
        self.max_features
    }

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

    /// Return the size of the class set.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Return the neutral class.
    #[must_use]
    pub fn neutral_class(&self) -> usize {
        self.neutral_class
    }

    /// Return the master random seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Return the OOB evaluation mode.
    #[must_use]
    pub fn oob_mode(&self) -> OobMode {
        self.oob_mode
    }

    /// Return the training time budget, if any.
    #[must_use]
    pub fn time_budget(&self) -> Option<Duration> {
        self.time_budget
    }

    /// Return the configured feature names, if any.
    #[must_use]
    pub fn feature_names(&self) -> Option<&[String]> {
        self.feature_names.as_deref()
    }

    /// Check every hyperparameter that does not depend on the data.
    pub(crate) fn validate(&self) -> Result<(), ForestError> {
        if self.tree_count == 0 {
            return Err(ForestError::InvalidTreeCount { tree_count: 0 });
        }
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
        if self.neutral_class >= self.n_classes {
            return Err(ForestError::InvalidNeutralClass {
                neutral_class: self.neutral_class,
                n_classes: self.n_classes,
            });
        }
        Ok(())
    }

    /// Train a Random Forest on `samples`.
    ///
    /// # Errors
    ///
    /// | Variant                                   | When                                             |
    /// |-------------------------------------------|--------------------------------------------------|
    /// | [`ForestError::InvalidMaxDepth`]          | `max_depth` is zero                              |
    /// | [`ForestError::InvalidMinSamplesSplit`]   | `min_samples_split` is zero                      |
    /// | [`ForestError::InvalidClassCount`]        | fewer than 2 classes                             |
    /// | [`ForestError::InvalidNeutralClass`]      | neutral class outside the class set              |
    /// | [`ForestError::EmptyDataset`]             | `samples` is empty                               |
    /// | [`ForestError::ZeroFeatures`]             | samples have zero feature columns                |
    /// | [`ForestError::FeatureCountMismatch`]     | samples have inconsistent arity                  |
    /// | [`ForestError::NonFiniteValue`]           | any value is NaN or infinite                     |
    /// | [`ForestError::LabelOutOfRange`]          | a label is `>= n_classes`                        |
    /// | [`ForestError::FeatureNameMismatch`]      | feature names do not match the arity             |
    /// | [`ForestError::InvalidMaxFeatures`]       | resolved max_features outside [1, n_features]    |
    /// | [`ForestError::TrainingBudgetExceeded`]   | the time budget ran out before all trees built   |
    /// | [`ForestError::OobEvaluationFailed`]      | OOB enabled but no sample has any OOB tree       |
    pub fn fit(&self, samples: &[LabeledSample]) -> Result<RandomForestResult, ForestError> {
        crate::forest::train(samples, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_trees_rejected() {
        let err = RandomForestConfig::new(0).unwrap_err();
        assert!(matches!(err, ForestError::InvalidTreeCount { tree_count: 0 }));
    }

    #[test]
    fn defaults() {
        let config = RandomForestConfig::new(100).unwrap();
        assert_eq!(config.tree_count(), 100);
        assert_eq!(config.max_depth(), 15);
        assert_eq!(config.min_samples_split(), 5);
        assert_eq!(config.n_classes(), 3);
        assert_eq!(config.neutral_class(), 2);
        assert_eq!(config.max_features(), MaxFeatures::Sqrt);
        assert_eq!(config.oob_mode(), OobMode::Disabled);
        assert!(config.time_budget().is_none());
        assert!(config.feature_names().is_none());
    }

    #[test]
    fn builder_chain() {
        let config = RandomForestConfig::new(10)
            .unwrap()
            .with_max_features(MaxFeatures::Fixed(2))
            .with_max_depth(4)
            .with_min_samples_split(2)
            .with_classes(2, 0)
            .with_seed(7)
            .with_oob_mode(OobMode::Enabled)
            .with_time_budget(Duration::from_secs(5));
        assert_eq!(config.max_features(), MaxFeatures::Fixed(2));
        assert_eq!(config.max_depth(), 4);
        assert_eq!(config.min_samples_split(), 2);
        assert_eq!((config.n_classes(), config.neutral_class()), (2, 0));
        assert_eq!(config.seed(), 7);
        assert_eq!(config.oob_mode(), OobMode::Enabled);
        assert_eq!(config.time_budget(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn neutral_class_must_be_in_range() {
        let config = RandomForestConfig::new(3).unwrap().with_classes(2, 2);
        assert!(matches!(
            config.validate(),
            Err(ForestError::InvalidNeutralClass { .. })
        ));
    }

    #[test]
    fn resolve_strategies() {
        assert_eq!(MaxFeatures::Sqrt.resolve(10).unwrap(), 4);
        assert_eq!(MaxFeatures::Log2.resolve(10).unwrap(), 4);
        assert_eq!(MaxFeatures::Log2.resolve(1).unwrap(), 1);
        assert_eq!(MaxFeatures::Fraction(0.5).resolve(10).unwrap(), 5);
        assert_eq!(MaxFeatures::Fixed(3).resolve(10).unwrap(), 3);
        assert_eq!(MaxFeatures::All.resolve(10).unwrap(), 10);
    }

    #[test]
    fn resolve_rejects_out_of_range() {
        assert!(matches!(
            MaxFeatures::Fixed(11).resolve(10),
            Err(ForestError::InvalidMaxFeatures {
                max_features: 11,
                n_features: 10
            })
        ));
        assert!(MaxFeatures::Fixed(0).resolve(10).is_err());
        assert!(MaxFeatures::Fraction(1.5).resolve(10).is_err());
        assert!(MaxFeatures::Fraction(-0.5).resolve(10).is_err());
    }
}
