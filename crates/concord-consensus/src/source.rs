//! Prediction sources feeding the orchestrator.

use std::sync::Arc;

use concord_forest::RandomForest;

use crate::action::Action;
use crate::error::ConsensusError;

/// A single source's answer for one feature vector.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct SourcePrediction {
    /// Predicted action.
    pub action: Action,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
}

/// Anything that turns a feature vector into an action with a confidence.
///
/// Implementors are queried concurrently and must not rely on call order.
pub trait Predictor: Send + Sync {
    /// Name reported in breakdowns and logs.
    fn name(&self) -> &str;

    /// Predict an action for `features`.
    ///
    /// # Errors
    ///
    /// Implementations return [`ConsensusError::Source`] (or a more specific
    /// variant) when no prediction can be produced.
    fn predict(&self, features: &[f64]) -> Result<SourcePrediction, ConsensusError>;
}

/// Adapts a trained (or untrained) [`RandomForest`] to [`Predictor`].
///
/// Forest class indices map to actions through `class_actions`, which
/// defaults to the `[Buy, Sell, Hold]` prefix matching the forest's class
/// count.
#[derive(Debug, Clone)]
pub struct ForestPredictor {
    name: String,
    forest: Arc<RandomForest>,
    class_actions: Vec<Action>,
}

impl ForestPredictor {
    /// Wrap `forest` under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`ConsensusError::InvalidConfig`] when the forest has more
    /// classes than there are actions.
    pub fn new(name: impl Into<String>, forest: Arc<RandomForest>) -> Result<Self, ConsensusError> {
        let n_classes = forest.n_classes();
        if n_classes > Action::ALL.len() {
            return Err(ConsensusError::InvalidConfig {
                reason: format!(
                    "forest has {n_classes} classes; map them with with_class_actions"
                ),
            });
        }
        Ok(Self {
            name: name.into(),
            forest,
            class_actions: Action::ALL[..n_classes].to_vec(),
        })
    }

    /// Map forest class `i` to `class_actions[i]`.
    ///
    /// # Errors
    ///
    /// Returns [`ConsensusError::InvalidConfig`] when the mapping length
    /// differs from the forest's class count.
    pub fn with_class_actions(
        mut self,
        class_actions: Vec<Action>,
    ) -> Result<Self, ConsensusError> {
        if class_actions.len() != self.forest.n_classes() {
            return Err(ConsensusError::InvalidConfig {
                reason: format!(
                    "{} class actions given for a forest with {} classes",
                    class_actions.len(),
                    self.forest.n_classes()
                ),
            });
        }
        self.class_actions = class_actions;
        Ok(self)
    }

    /// Borrow the wrapped forest.
    #[must_use]
    pub fn forest(&self) -> &RandomForest {
        &self.forest
    }
}

impl Predictor for ForestPredictor {
    fn name(&self) -> &str {
        &self.name
    }

    fn predict(&self, features: &[f64]) -> Result<SourcePrediction, ConsensusError> {
        let prediction = self
            .forest
            .predict(features)
            .map_err(|e| ConsensusError::Source {
                name: self.name.clone(),
                cause: Box::new(e),
            })?;
        let action = self
            .class_actions
            .get(prediction.class)
            .copied()
            .ok_or(ConsensusError::UnknownClass {
                class: prediction.class,
                n_mapped: self.class_actions.len(),
            })?;
        Ok(SourcePrediction {
            action,
            confidence: prediction.confidence,
        })
    }
}

/// A fixed answer from a model evaluated outside this crate, or the failure
/// that model reported.
#[derive(Debug, Clone)]
pub struct StaticPredictor {
    name: String,
    outcome: Result<SourcePrediction, String>,
}

impl StaticPredictor {
    /// A source that always answers `action` with `confidence`.
    pub fn new(name: impl Into<String>, action: Action, confidence: f64) -> Self {
        Self {
            name: name.into(),
            outcome: Ok(SourcePrediction { action, confidence }),
        }
    }

    /// A source whose upstream call failed with `reason`.
    pub fn failed(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            outcome: Err(reason.into()),
        }
    }
}

impl Predictor for StaticPredictor {
    fn name(&self) -> &str {
        &self.name
    }

    fn predict(&self, _features: &[f64]) -> Result<SourcePrediction, ConsensusError> {
        self.outcome.clone().map_err(|reason| ConsensusError::Source {
            name: self.name.clone(),
            cause: reason.into(),
        })
    }
}
