//! Target/stop bands and position sizing derived from a volatility scalar.

use crate::action::Action;
use crate::config::ConsensusConfig;

/// Price levels bracketing a decision.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct RiskBands {
    /// Take-profit level.
    pub target: f64,
    /// Stop-loss level.
    pub stop: f64,
}

/// Suggested exposure for a decision.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct PositionSizing {
    /// Fraction of the portfolio to commit, capped at `max_position_fraction`.
    pub position_fraction: f64,
    /// `|target - price| / |stop - price|`; `None` when the stop distance is zero.
    pub risk_reward: Option<f64>,
    /// Portfolio value lost if the stop is hit.
    pub max_loss: f64,
}

/// Place the target and stop around `price`.
///
/// `Buy` targets above and stops below, `Sell` mirrors it, and `Hold` puts
/// both bands at `price`.
#[must_use]
pub fn risk_bands(
    action: Action,
    price: f64,
    volatility: f64,
    config: &ConsensusConfig,
) -> RiskBands {
    let direction = action.direction();
    RiskBands {
        target: price + direction * volatility * config.target_multiplier(),
        stop: price - direction * volatility * config.stop_multiplier(),
    }
}

/// Size a position from the decision confidence and its bands.
///
/// `Hold` takes no exposure.
#[must_use]
pub fn position_sizing(
    action: Action,
    confidence: f64,
    price: f64,
    bands: RiskBands,
    config: &ConsensusConfig,
) -> PositionSizing {
    let cap = config.max_position_fraction();
    let position_fraction = if action == Action::Hold {
        0.0
    } else {
        (confidence * cap).min(cap)
    };

    let stop_distance = (price - bands.stop).abs();
    let risk_reward = (stop_distance > 0.0).then(|| (bands.target - price).abs() / stop_distance);

    PositionSizing {
        position_fraction,
        risk_reward,
        max_loss: config.portfolio_value() * position_fraction * stop_distance / price,
    }
}
