//! Configuration for consensus scoring, risk bands and position sizing.

use crate::error::ConsensusError;

/// Consensus configuration.
///
/// Construct via [`ConsensusConfig::new`], then chain `with_*` methods.
/// Values are checked by [`ConsensusConfig::validate`], which every
/// consumer calls before use.
///
/// # Defaults
///
/// | Parameter                      | Default  |
/// |--------------------------------|----------|
/// | `target_multiplier`            | 2.5      |
/// | `stop_multiplier`              | 1.5      |
/// | `min_consensus`                | 0.6      |
/// | `max_position_fraction`        | 0.1      |
/// | `portfolio_value`              | 10 000.0 |
/// | `fallback_volatility_fraction` | 0.02     |
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ConsensusConfig {
    target_multiplier: f64,
    stop_multiplier: f64,
    min_consensus: f64,
    max_position_fraction: f64,
    portfolio_value: f64,
    fallback_volatility_fraction: f64,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsensusConfig {
    /// Create a config with the documented defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            target_multiplier: 2.5,
            stop_multiplier: 1.5,
            min_consensus: 0.6,
            max_position_fraction: 0.1,
            portfolio_value: 10_000.0,
            fallback_volatility_fraction: 0.02,
        }
    }

    // --- Setters ---

    /// Set the volatility multipliers for the target and stop bands.
    #[must_use]
    pub fn with_multipliers(mut self, target: f64, stop: f64) -> Self {
        self.target_multiplier = target;
        self.stop_multiplier = stop;
        self
    }

    /// Set the agreement at or above which a decision is `Strong`.
    #[must_use]
    pub fn with_min_consensus(mut self, min_consensus: f64) -> Self {
        self.min_consensus = min_consensus;
        self
    }

    /// Set the largest fraction of the portfolio one position may take.
    #[must_use]
    pub fn with_max_position_fraction(mut self, fraction: f64) -> Self {
        self.max_position_fraction = fraction;
        self
    }

    /// Set the portfolio value used for the max-loss estimate.
    #[must_use]
    pub fn with_portfolio_value(mut self, value: f64) -> Self {
        self.portfolio_value = value;
        self
    }

    /// Set the price fraction used as volatility when none is supplied.
    #[must_use]
    pub fn with_fallback_volatility_fraction(mut self, fraction: f64) -> Self {
        self.fallback_volatility_fraction = fraction;
        self
    }

    // --- Getters ---

    /// Return the target multiplier.
    #[must_use]
    pub fn target_multiplier(&self) -> f64 {
        self.target_multiplier
    }

    /// Return the stop multiplier.
    #[must_use]
    pub fn stop_multiplier(&self) -> f64 {
        self.stop_multiplier
    }

    /// Return the strong-consensus threshold.
    #[must_use]
    pub fn min_consensus(&self) -> f64 {
        self.min_consensus
    }

    /// Return the position fraction cap.
    #[must_use]
    pub fn max_position_fraction(&self) -> f64 {
        self.max_position_fraction
    }

    /// Return the portfolio value.
    #[must_use]
    pub fn portfolio_value(&self) -> f64 {
        self.portfolio_value
    }

    /// Return the fallback volatility fraction.
    #[must_use]
    pub fn fallback_volatility_fraction(&self) -> f64 {
        self.fallback_volatility_fraction
    }

    /// Check every value against its valid range.
    ///
    /// # Errors
    ///
    /// | Variant                                  | When                                              |
    /// |------------------------------------------|---------------------------------------------------|
    /// | [`ConsensusError::InvalidMultipliers`]   | a multiplier is not positive, or `stop >= target` |
    /// | [`ConsensusError::InvalidConfig`]        | any other value is non-finite or out of range     |
    pub fn validate(&self) -> Result<(), ConsensusError> {
        let (target, stop) = (self.target_multiplier, self.stop_multiplier);
        if !(target.is_finite() && stop.is_finite() && stop > 0.0 && stop < target) {
            return Err(ConsensusError::InvalidMultipliers { target, stop });
        }
        let unit_ranges = [
            ("min_consensus", self.min_consensus),
            ("max_position_fraction", self.max_position_fraction),
            ("fallback_volatility_fraction", self.fallback_volatility_fraction),
        ];
        for (name, value) in unit_ranges {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConsensusError::InvalidConfig {
                    reason: format!("{name} must be in [0, 1], got {value}"),
                });
            }
        }
        if !(self.portfolio_value.is_finite() && self.portfolio_value >= 0.0) {
            return Err(ConsensusError::InvalidConfig {
                reason: format!(
                    "portfolio_value must be finite and non-negative, got {}",
                    self.portfolio_value
                ),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let config = ConsensusConfig::new();
        assert!(config.validate().is_ok());
        assert_eq!(config.target_multiplier(), 2.5);
        assert_eq!(config.stop_multiplier(), 1.5);
        assert_eq!(config.min_consensus(), 0.6);
    }

    #[test]
    fn stop_must_be_tighter_than_target() {
        for (target, stop) in [(1.5, 1.5), (1.0, 2.0), (2.0, 0.0), (f64::NAN, 1.0)] {
            let err = ConsensusConfig::new()
                .with_multipliers(target, stop)
                .validate()
                .unwrap_err();
            assert!(matches!(err, ConsensusError::InvalidMultipliers { .. }));
        }
    }

    #[test]
    fn fractions_out_of_range_rejected() {
        let err = ConsensusConfig::new()
            .with_min_consensus(1.5)
            .validate()
            .unwrap_err();
        assert!(matches!(
            err,
            ConsensusError::InvalidConfig { reason } if reason.contains("min_consensus")
        ));

        let err = ConsensusConfig::new()
            .with_max_position_fraction(f64::NAN)
            .validate()
            .unwrap_err();
        assert!(matches!(err, ConsensusError::InvalidConfig { .. }));
    }

    #[test]
    fn negative_portfolio_rejected() {
        let err = ConsensusConfig::new()
            .with_portfolio_value(-1.0)
            .validate()
            .unwrap_err();
        assert!(matches!(err, ConsensusError::InvalidConfig { .. }));
    }
}
