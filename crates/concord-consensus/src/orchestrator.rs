//! Caller-owned orchestrator that polls weighted sources and combines them.

use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use tracing::{info, instrument, warn};

use crate::combine::{ConsensusInput, ConsensusResult, combine};
use crate::config::ConsensusConfig;
use crate::error::ConsensusError;
use crate::source::Predictor;

struct WeightedSource {
    predictor: Box<dyn Predictor>,
    weight: f64,
}

/// A source left out of a decision because it failed to predict.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SkippedSource {
    /// Source name.
    pub source: String,
    /// Rendered failure.
    pub reason: String,
}

/// A consensus result plus the sources that could not take part.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Decision {
    /// The combined result over the sources that answered.
    pub result: ConsensusResult,
    /// Sources that failed, in registration order.
    pub skipped: Vec<SkippedSource>,
}

/// Holds weighted predictors and a consensus configuration.
///
/// The orchestrator carries no per-decision state, so one instance can serve
/// concurrent [`Orchestrator::decide`] calls through a shared reference.
pub struct Orchestrator {
    sources: Vec<WeightedSource>,
    config: ConsensusConfig,
}

impl Orchestrator {
    /// Create an orchestrator with no sources.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`ConsensusConfig::validate`].
    pub fn new(config: ConsensusConfig) -> Result<Self, ConsensusError> {
        config.validate()?;
        Ok(Self {
            sources: Vec::new(),
            config,
        })
    }

    /// Register `predictor` with `weight`.
    ///
    /// # Errors
    ///
    /// Returns [`ConsensusError::InvalidWeight`] for a negative or
    /// non-finite weight.
    pub fn add_source(
        &mut self,
        predictor: Box<dyn Predictor>,
        weight: f64,
    ) -> Result<(), ConsensusError> {
        if !(weight.is_finite() && weight >= 0.0) {
            return Err(ConsensusError::InvalidWeight {
                name: predictor.name().to_string(),
                weight,
            });
        }
        self.sources.push(WeightedSource { predictor, weight });
        Ok(())
    }

    /// Number of registered sources.
    #[must_use]
    pub fn n_sources(&self) -> usize {
        self.sources.len()
    }

    /// Return the consensus configuration.
    #[must_use]
    pub fn config(&self) -> &ConsensusConfig {
        &self.config
    }

    /// Query every source in parallel and combine the answers.
    ///
    /// Failing sources, and sources answering with a confidence outside
    /// `[0, 1]`, are skipped and reported in [`Decision::skipped`].
    /// Without a `volatility`, `price * fallback_volatility_fraction` is used.
    ///
    /// # Errors
    ///
    /// Returns [`ConsensusError::NoInputs`] when no source answered, and the
    /// errors of [`combine`] otherwise.
    #[instrument(skip_all, fields(n_sources = self.sources.len(), price = price))]
    pub fn decide(
        &self,
        features: &[f64],
        price: f64,
        volatility: Option<f64>,
    ) -> Result<Decision, ConsensusError> {
        let answers: Vec<Result<ConsensusInput, SkippedSource>> = self
            .sources
            .par_iter()
            .map(|source| {
                let name = source.predictor.name();
                source
                    .predictor
                    .predict(features)
                    .and_then(|p| {
                        if (0.0..=1.0).contains(&p.confidence) {
                            Ok(ConsensusInput::new(name, p.action, p.confidence, source.weight))
                        } else {
                            Err(ConsensusError::InvalidConfidence {
                                name: name.to_string(),
                                confidence: p.confidence,
                            })
                        }
                    })
                    .map_err(|e| SkippedSource {
                        source: name.to_string(),
                        reason: e.to_string(),
                    })
            })
            .collect();

        let mut inputs = Vec::with_capacity(answers.len());
        let mut skipped = Vec::new();
        for answer in answers {
            match answer {
                Ok(input) => inputs.push(input),
                Err(skip) => {
                    warn!(source = %skip.source, reason = %skip.reason, "skipping failed source");
                    skipped.push(skip);
                }
            }
        }

        let volatility =
            volatility.unwrap_or(price * self.config.fallback_volatility_fraction());
        let result = combine(&inputs, price, volatility, &self.config)?;

        info!(
            action = %result.final_action,
            confidence = result.final_confidence,
            agreement = result.agreement,
            n_answered = inputs.len(),
            n_skipped = skipped.len(),
            "decision made"
        );

        Ok(Decision { result, skipped })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Action;
    use crate::combine::Strength;
    use crate::source::StaticPredictor;

    fn orchestrator(sources: Vec<(StaticPredictor, f64)>) -> Orchestrator {
        let mut orch = Orchestrator::new(ConsensusConfig::new()).unwrap();
        for (predictor, weight) in sources {
            orch.add_source(Box::new(predictor), weight).unwrap();
        }
        orch
    }

    #[test]
    fn combines_static_sources() {
        let orch = orchestrator(vec![
            (StaticPredictor::new("forest", Action::Buy, 0.9), 0.4),
            (StaticPredictor::new("momentum", Action::Buy, 0.8), 0.3),
            (StaticPredictor::new("sentiment", Action::Sell, 0.7), 0.3),
        ]);
        let decision = orch.decide(&[0.0], 100.0, Some(2.0)).unwrap();
        assert!(decision.skipped.is_empty());
        assert_eq!(decision.result.final_action, Action::Buy);
        assert!((decision.result.final_confidence - 0.6).abs() < 1e-12);
        assert!((decision.result.target - 105.0).abs() < 1e-12);
        let names: Vec<&str> = decision
            .result
            .breakdown
            .iter()
            .map(|c| c.source.as_str())
            .collect();
        assert_eq!(names, vec!["forest", "momentum", "sentiment"]);
    }

    #[test]
    fn failed_sources_are_skipped() {
        let orch = orchestrator(vec![
            (StaticPredictor::new("forest", Action::Sell, 0.8), 1.0),
            (StaticPredictor::failed("llm", "rate limited"), 1.0),
        ]);
        let decision = orch.decide(&[], 50.0, Some(1.0)).unwrap();
        assert_eq!(decision.result.final_action, Action::Sell);
        assert_eq!(decision.result.strength, Strength::Strong);
        assert_eq!(decision.result.breakdown.len(), 1);
        assert_eq!(decision.skipped.len(), 1);
        assert_eq!(decision.skipped[0].source, "llm");
        assert!(decision.skipped[0].reason.contains("rate limited"));
    }

    #[test]
    fn out_of_range_confidence_is_skipped() {
        let orch = orchestrator(vec![
            (StaticPredictor::new("good", Action::Buy, 0.8), 1.0),
            (StaticPredictor::new("bad", Action::Sell, 1.7), 1.0),
            (StaticPredictor::new("nan", Action::Sell, f64::NAN), 1.0),
        ]);
        let decision = orch.decide(&[], 100.0, Some(2.0)).unwrap();
        assert_eq!(decision.result.final_action, Action::Buy);
        assert!((decision.result.final_confidence - 0.8).abs() < 1e-12);
        let skipped: Vec<&str> = decision
            .skipped
            .iter()
            .map(|s| s.source.as_str())
            .collect();
        assert_eq!(skipped, vec!["bad", "nan"]);
        assert!(decision.skipped[0].reason.contains("1.7"));
    }

    #[test]
    fn all_sources_failing_is_an_error() {
        let orch = orchestrator(vec![(StaticPredictor::failed("llm", "down"), 1.0)]);
        let err = orch.decide(&[], 50.0, None).unwrap_err();
        assert!(matches!(err, ConsensusError::NoInputs));
    }

    #[test]
    fn falls_back_to_price_fraction_volatility() {
        let orch = orchestrator(vec![(StaticPredictor::new("a", Action::Buy, 1.0), 1.0)]);
        let decision = orch.decide(&[], 100.0, None).unwrap();
        // volatility = 100 * 0.02 = 2
        assert!((decision.result.target - 105.0).abs() < 1e-12);
        assert!((decision.result.stop - 97.0).abs() < 1e-12);
    }

    #[test]
    fn rejects_negative_weight() {
        let mut orch = Orchestrator::new(ConsensusConfig::new()).unwrap();
        let err = orch
            .add_source(Box::new(StaticPredictor::new("a", Action::Buy, 1.0)), -0.5)
            .unwrap_err();
        assert!(matches!(err, ConsensusError::InvalidWeight { .. }));
        assert_eq!(orch.n_sources(), 0);
    }

    #[test]
    fn rejects_invalid_config() {
        let config = ConsensusConfig::new().with_multipliers(1.0, 2.0);
        assert!(Orchestrator::new(config).is_err());
    }
}
