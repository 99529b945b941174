//! Random Forest training with parallel tree construction.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tracing::{debug, info, instrument, warn};

use crate::config::{ForestParams, OobMode, RandomForestConfig};
use crate::error::ForestError;
use crate::importance::aggregate_importances;
use crate::node::TreeNode;
use crate::oob::compute_oob;
use crate::result::{RandomForestResult, TrainingMetadata};
use crate::sample::{LabeledSample, validate_samples};
use crate::tree::{DecisionTreeConfig, TreeInducer};

/// Trees between progress log lines.
const PROGRESS_EVERY: usize = 20;

/// A bagged ensemble of Gini decision trees.
///
/// A forest is either untrained (no trees) or produced once by [`train`] and
/// never mutated afterwards, so `&RandomForest` can be shared across threads
/// for inference without locking.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct RandomForest {
    pub(crate) trees: Vec<TreeNode>,
    pub(crate) params: ForestParams,
    pub(crate) n_features: usize,
    pub(crate) n_classes: usize,
    pub(crate) neutral_class: usize,
    pub(crate) feature_names: Vec<String>,
}

impl RandomForest {
    /// Create an empty forest that answers every prediction with the
    /// configured neutral class at confidence 0.5.
    ///
    /// # Errors
    ///
    /// Returns the same configuration errors as [`RandomForestConfig::fit`]
    /// for hyperparameters that do not depend on training data.
    pub fn untrained(config: &RandomForestConfig) -> Result<Self, ForestError> {
        config.validate()?;
        Ok(Self {
            trees: Vec::new(),
            params: ForestParams {
                tree_count: config.tree_count,
                max_depth: config.max_depth,
                min_samples_split: config.min_samples_split,
                max_features: 0,
            },
            n_features: 0,
            n_classes: config.n_classes,
            neutral_class: config.neutral_class,
            feature_names: Vec::new(),
        })
    }

    /// Return `true` once the forest holds trained trees.
    #[must_use]
    pub fn is_trained(&self) -> bool {
        !self.trees.is_empty()
    }
}

/// Draw `n_samples` indices uniformly with replacement and report which
/// indices were never drawn.
fn bootstrap_sample(n_samples: usize, rng: &mut impl Rng) -> (Vec<usize>, Vec<usize>) {
    let mut in_bag = vec![false; n_samples];
    let mut drawn = Vec::with_capacity(n_samples);
    for _ in 0..n_samples {
        let idx = rng.gen_range(0..n_samples);
        drawn.push(idx);
        in_bag[idx] = true;
    }
    let out_of_bag: Vec<usize> = (0..n_samples).filter(|&i| !in_bag[i]).collect();
    (drawn, out_of_bag)
}

/// Train a Random Forest.
///
/// Per-tree seeds come from a master `ChaCha8Rng` seeded with
/// `config.seed`; each tree then draws its own bootstrap and feature subsets,
/// so trees are independent rayon tasks and the collected forest is identical
/// across runs for a fixed seed.
#[instrument(skip_all, fields(tree_count = config.tree_count, n_samples = samples.len()))]
pub fn train(
    samples: &[LabeledSample],
    config: &RandomForestConfig,
) -> Result<RandomForestResult, ForestError> {
    config.validate()?;
    let n_features = validate_samples(samples, config.n_classes)?;
    let max_features = config.max_features.resolve(n_features)?;

    let feature_names: Vec<String> = match &config.feature_names {
        Some(names) if names.len() != n_features => {
            return Err(ForestError::FeatureNameMismatch {
                expected: n_features,
                got: names.len(),
            });
        }
        Some(names) => names.clone(),
        None => (0..n_features).map(|f| format!("f{f}")).collect(),
    };

    let n_samples = samples.len();
    let n_classes = config.n_classes;

    info!(
        tree_count = config.tree_count,
        n_samples,
        n_features,
        n_classes,
        max_features,
        "training random forest"
    );

    let mut master_rng = ChaCha8Rng::seed_from_u64(config.seed);
    let tree_seeds: Vec<u64> = (0..config.tree_count)
        .map(|_| master_rng.r#gen())
        .collect();

    let tree_config = DecisionTreeConfig::new()
        .with_max_depth(config.max_depth)
        .with_min_samples_split(config.min_samples_split)
        .with_n_classes(n_classes);
    let deadline = config.time_budget.map(|budget| Instant::now() + budget);
    let completed = AtomicUsize::new(0);

    let built: Vec<Option<(TreeNode, Vec<usize>)>> = tree_seeds
        .into_par_iter()
        .map(|seed| {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                return None;
            }
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let (bootstrap, out_of_bag) = bootstrap_sample(n_samples, &mut rng);
            let tree = TreeInducer::new(samples, &tree_config, max_features, rng.r#gen())
                .build(bootstrap, 0);

            let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
            if done % PROGRESS_EVERY == 0 {
                debug!(done, total = config.tree_count, "trees trained");
            }
            Some((tree, out_of_bag))
        })
        .collect();

    let n_built = built.iter().filter(|t| t.is_some()).count();
    if n_built < config.tree_count {
        warn!(
            completed = n_built,
            requested = config.tree_count,
            "training time budget exhausted"
        );
        return Err(ForestError::TrainingBudgetExceeded {
            completed: n_built,
            requested: config.tree_count,
        });
    }

    let (trees, oob_indices_per_tree): (Vec<TreeNode>, Vec<Vec<usize>>) =
        built.into_iter().flatten().unzip();

    let per_tree_importances: Vec<Vec<f64>> = trees
        .iter()
        .map(|tree| {
            let mut totals = vec![0.0f64; n_features];
            tree.accumulate_importance(&mut totals);
            let sum: f64 = totals.iter().sum();
            if sum > 0.0 {
                totals.iter_mut().for_each(|v| *v /= sum);
            }
            totals
        })
        .collect();
    let importances = aggregate_importances(&per_tree_importances, &feature_names);

    let oob_score = if config.oob_mode == OobMode::Enabled {
        Some(compute_oob(&trees, samples, n_classes, &oob_indices_per_tree)?)
    } else {
        None
    };

    let forest = RandomForest {
        trees,
        params: ForestParams {
            tree_count: config.tree_count,
            max_depth: config.max_depth,
            min_samples_split: config.min_samples_split,
            max_features,
        },
        n_features,
        n_classes,
        neutral_class: config.neutral_class,
        feature_names,
    };

    let metadata = TrainingMetadata {
        tree_count: config.tree_count,
        n_features,
        n_classes,
        n_samples,
        max_features_resolved: max_features,
    };

    info!(
        oob_accuracy = oob_score.as_ref().map(|s| s.accuracy),
        "random forest training complete"
    );

    Ok(RandomForestResult::new(forest, importances, oob_score, metadata))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::bootstrap_sample;
    use crate::ForestError;
    use crate::config::{MaxFeatures, OobMode, RandomForestConfig};
    use crate::sample::LabeledSample;

    /// Three well separated classes along feature 0.
    fn make_separable_data() -> Vec<LabeledSample> {
        let mut samples = Vec::new();
        for (class, offset) in [(0usize, 0.0f64), (1, 10.0), (2, 20.0)] {
            for i in 0..20 {
                samples.push(LabeledSample::new(vec![offset + i as f64 * 0.15, 0.5], class));
            }
        }
        samples
    }

    fn accuracy(result: &crate::RandomForestResult, samples: &[LabeledSample]) -> f64 {
        let correct = samples
            .iter()
            .filter(|s| result.forest().predict(&s.features).unwrap().class == s.label)
            .count();
        correct as f64 / samples.len() as f64
    }

    #[test]
    fn bootstrap_has_full_size_and_complementary_oob() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let (drawn, oob) = bootstrap_sample(50, &mut rng);
        assert_eq!(drawn.len(), 50);
        assert!(drawn.iter().all(|&i| i < 50));
        assert!(oob.iter().all(|i| !drawn.contains(i)));
        let mut distinct = drawn.clone();
        distinct.sort_unstable();
        distinct.dedup();
        assert_eq!(distinct.len() + oob.len(), 50);
    }

    #[test]
    fn three_class_separable_accuracy() {
        let samples = make_separable_data();
        let result = RandomForestConfig::new(50)
            .unwrap()
            .with_max_features(MaxFeatures::All)
            .with_min_samples_split(2)
            .fit(&samples)
            .unwrap();
        let acc = accuracy(&result, &samples);
        assert!(acc > 0.95, "accuracy = {acc}");
        assert_eq!(result.forest().n_trees(), 50);
    }

    #[test]
    fn oob_score_computed() {
        let samples = make_separable_data();
        let result = RandomForestConfig::new(50)
            .unwrap()
            .with_oob_mode(OobMode::Enabled)
            .with_max_features(MaxFeatures::All)
            .fit(&samples)
            .unwrap();
        let oob = result.oob_score().expect("OOB should be computed");
        assert!(oob.accuracy > 0.8, "oob accuracy = {}", oob.accuracy);
        assert!(oob.n_oob_samples > 0);
        assert_eq!(oob.confusion.n_classes(), 3);
    }

    #[test]
    fn feature_importances_sum_to_one() {
        let samples = make_separable_data();
        let result = RandomForestConfig::new(20).unwrap().fit(&samples).unwrap();
        let total: f64 = result.importances().iter().map(|f| f.importance).sum();
        assert!((total - 1.0).abs() < 1e-10, "total = {total}");
        assert_eq!(result.importances()[0].name, "f0");
    }

    #[test]
    fn same_seed_builds_identical_forest() {
        let samples = make_separable_data();
        let config = RandomForestConfig::new(10).unwrap().with_seed(99);
        let a = config.fit(&samples).unwrap().into_forest();
        let b = config.fit(&samples).unwrap().into_forest();
        assert_eq!(a.trees(), b.trees());
        assert_eq!(a, b);
    }

    #[test]
    fn different_seeds_build_different_forests() {
        let samples = make_separable_data();
        let fit = |seed| {
            RandomForestConfig::new(10)
                .unwrap()
                .with_seed(seed)
                .fit(&samples)
                .unwrap()
        };
        let (a, b) = (fit(1), fit(2));
        assert_ne!(a.forest().trees(), b.forest().trees());
    }

    #[test]
    fn empty_dataset_error() {
        let err = RandomForestConfig::new(10).unwrap().fit(&[]).unwrap_err();
        assert!(matches!(err, ForestError::EmptyDataset));
    }

    #[test]
    fn max_features_above_arity_is_an_error() {
        let err = RandomForestConfig::new(5)
            .unwrap()
            .with_max_features(MaxFeatures::Fixed(3))
            .fit(&make_separable_data())
            .unwrap_err();
        assert!(matches!(
            err,
            ForestError::InvalidMaxFeatures {
                max_features: 3,
                n_features: 2
            }
        ));
    }

    #[test]
    fn feature_name_count_must_match() {
        let err = RandomForestConfig::new(5)
            .unwrap()
            .with_feature_names(vec!["rsi".to_string()])
            .fit(&make_separable_data())
            .unwrap_err();
        assert!(matches!(
            err,
            ForestError::FeatureNameMismatch {
                expected: 2,
                got: 1
            }
        ));
    }

    #[test]
    fn exhausted_budget_is_an_error() {
        let err = RandomForestConfig::new(8)
            .unwrap()
            .with_time_budget(Duration::ZERO)
            .fit(&make_separable_data())
            .unwrap_err();
        assert!(matches!(
            err,
            ForestError::TrainingBudgetExceeded {
                completed: 0,
                requested: 8
            }
        ));
    }

    #[test]
    fn generous_budget_trains_every_tree() {
        let result = RandomForestConfig::new(8)
            .unwrap()
            .with_time_budget(Duration::from_secs(600))
            .fit(&make_separable_data())
            .unwrap();
        assert_eq!(result.forest().n_trees(), 8);
    }

    #[test]
    fn params_are_recorded() {
        let result = RandomForestConfig::new(4)
            .unwrap()
            .with_max_depth(3)
            .with_min_samples_split(2)
            .with_max_features(MaxFeatures::Fixed(1))
            .fit(&make_separable_data())
            .unwrap();
        let params = result.forest().params();
        assert_eq!(params.tree_count, 4);
        assert_eq!(params.max_depth, 3);
        assert_eq!(params.min_samples_split, 2);
        assert_eq!(params.max_features, 1);
        assert!(result.forest().trees().iter().all(|t| t.depth() <= 3));
    }
}
