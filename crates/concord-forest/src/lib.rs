//! Random Forest classification: induce, bag, vote.
//!
//! Provides a Gini decision-tree inducer with random feature subsampling,
//! a bootstrap-aggregated forest trained in parallel via rayon, plain
//! majority-vote inference, out-of-bag evaluation and feature importance.

mod config;
mod confusion;
mod error;
mod forest;
mod importance;
mod node;
mod oob;
mod predict;
mod result;
mod sample;
mod split;
mod tree;

pub use config::{ForestParams, MaxFeatures, OobMode, RandomForestConfig};
pub use confusion::{ClassMetrics, ConfusionMatrix};
pub use error::ForestError;
pub use forest::{RandomForest, train};
pub use importance::RankedFeature;
pub use node::{FeatureIndex, TreeNode};
pub use oob::OobScore;
pub use predict::{ForestPrediction, UNTRAINED_CONFIDENCE};
pub use result::{RandomForestResult, TrainingMetadata};
pub use sample::LabeledSample;
pub use split::gini_impurity;
pub use tree::{DecisionTree, DecisionTreeConfig};
