//! Confidence-weighted consensus over per-source predictions.
//!
//! Each input contributes `weight * confidence` to the score of the action it
//! predicts. The highest score wins (ties resolve in `Buy`, `Sell`, `Hold`
//! order), and its score divided by the total weight of all inputs becomes
//! the final confidence. The forest's one-tree-one-vote majority is a
//! separate policy and is not applied here.

use tracing::{debug, instrument};

use crate::action::Action;
use crate::config::ConsensusConfig;
use crate::error::ConsensusError;
use crate::risk::{PositionSizing, RiskBands, position_sizing, risk_bands};

/// One source's vote.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ConsensusInput {
    /// Source name, used in the breakdown and error messages.
    pub source: String,
    /// Predicted action.
    pub action: Action,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
    /// Non-negative source weight.
    pub weight: f64,
}

impl ConsensusInput {
    /// Create an input.
    pub fn new(source: impl Into<String>, action: Action, confidence: f64, weight: f64) -> Self {
        Self {
            source: source.into(),
            action,
            confidence,
            weight,
        }
    }
}

/// Whether sources agreed enough to trust the decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Strength {
    /// Agreement reached `min_consensus`.
    Strong,
    /// Agreement fell short of `min_consensus`.
    Weak,
}

/// Per-action share of the total weighted score.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct VoteShare {
    /// Share for `Buy`.
    pub buy: f64,
    /// Share for `Sell`.
    pub sell: f64,
    /// Share for `Hold`.
    pub hold: f64,
}

impl VoteShare {
    /// Share of `action`.
    #[must_use]
    pub fn get(&self, action: Action) -> f64 {
        match action {
            Action::Buy => self.buy,
            Action::Sell => self.sell,
            Action::Hold => self.hold,
        }
    }
}

/// How one source contributed to the decision.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SourceContribution {
    /// Source name.
    pub source: String,
    /// Action the source predicted.
    pub action: Action,
    /// Reported confidence.
    pub confidence: f64,
    /// Source weight.
    pub weight: f64,
    /// `weight * confidence`.
    pub score: f64,
    /// Whether the source predicted the final action.
    pub agrees: bool,
}

/// Outcome of a consensus round.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ConsensusResult {
    /// Winning action.
    pub final_action: Action,
    /// Winning score over total input weight, in `[0, 1]`.
    pub final_confidence: f64,
    /// `1 - (distinct - 1) / (n - 1)`, or `1.0` for a single input.
    pub agreement: f64,
    /// `Strong` when agreement reached `min_consensus`.
    pub strength: Strength,
    /// Per-action share of the summed scores.
    pub vote_share: VoteShare,
    /// Per-source contributions in input order.
    pub breakdown: Vec<SourceContribution>,
    /// Take-profit level.
    pub target: f64,
    /// Stop-loss level.
    pub stop: f64,
    /// Suggested exposure.
    pub sizing: PositionSizing,
}

/// Agreement among `actions`: `1.0` when unanimous or when there is at most
/// one vote, falling linearly as distinct actions appear.
#[must_use]
pub fn agreement(actions: &[Action]) -> f64 {
    let n = actions.len();
    if n <= 1 {
        return 1.0;
    }
    let distinct = Action::ALL
        .into_iter()
        .filter(|a| actions.contains(a))
        .count();
    (1.0 - (distinct as f64 - 1.0) / (n as f64 - 1.0)).clamp(0.0, 1.0)
}

fn validate_inputs(inputs: &[ConsensusInput]) -> Result<f64, ConsensusError> {
    if inputs.is_empty() {
        return Err(ConsensusError::NoInputs);
    }
    for input in inputs {
        if !(0.0..=1.0).contains(&input.confidence) {
            return Err(ConsensusError::InvalidConfidence {
                name: input.source.clone(),
                confidence: input.confidence,
            });
        }
        if !(input.weight.is_finite() && input.weight >= 0.0) {
            return Err(ConsensusError::InvalidWeight {
                name: input.source.clone(),
                weight: input.weight,
            });
        }
    }
    let total_weight: f64 = inputs.iter().map(|i| i.weight).sum();
    if !total_weight.is_finite() {
        return Err(ConsensusError::NonFiniteTotalWeight {
            total: total_weight,
        });
    }
    if total_weight <= 0.0 {
        return Err(ConsensusError::ZeroTotalWeight);
    }
    Ok(total_weight)
}

/// Combine per-source votes into one decision with risk bands.
///
/// Pure: the same arguments always produce the same result.
///
/// # Errors
///
/// | Variant                                 | When                                        |
/// |-----------------------------------------|---------------------------------------------|
/// | [`ConsensusError::InvalidMultipliers`]  | config multipliers are invalid              |
/// | [`ConsensusError::InvalidConfig`]       | another config value is out of range        |
/// | [`ConsensusError::NoInputs`]            | `inputs` is empty                           |
/// | [`ConsensusError::InvalidConfidence`]   | a confidence is outside `[0, 1]`            |
/// | [`ConsensusError::InvalidWeight`]       | a weight is negative or non-finite          |
/// | [`ConsensusError::ZeroTotalWeight`]     | all weights are zero                        |
/// | [`ConsensusError::NonFiniteTotalWeight`] | the weights overflow when summed |
/// | [`ConsensusError::InvalidPrice`]        | `price` is not finite and positive          |
/// | [`ConsensusError::InvalidVolatility`]   | `volatility` is negative or non-finite      |
#[instrument(skip_all, fields(n_inputs = inputs.len(), price = price, volatility = volatility))]
pub fn combine(
    inputs: &[ConsensusInput],
    price: f64,
    volatility: f64,
    config: &ConsensusConfig,
) -> Result<ConsensusResult, ConsensusError> {
    config.validate()?;
    let total_weight = validate_inputs(inputs)?;
    if !(price.is_finite() && price > 0.0) {
        return Err(ConsensusError::InvalidPrice { price });
    }
    if !(volatility.is_finite() && volatility >= 0.0) {
        return Err(ConsensusError::InvalidVolatility { volatility });
    }

    let mut scores = [0.0f64; 3];
    for input in inputs {
        scores[input.action.index()] += input.weight * input.confidence;
    }

    let mut final_action = Action::Buy;
    for action in Action::ALL {
        if scores[action.index()] > scores[final_action.index()] {
            final_action = action;
        }
    }
    let final_confidence = (scores[final_action.index()] / total_weight).clamp(0.0, 1.0);

    let score_sum: f64 = scores.iter().sum();
    let share = |a: Action| {
        if score_sum > 0.0 {
            scores[a.index()] / score_sum
        } else {
            0.0
        }
    };
    let vote_share = VoteShare {
        buy: share(Action::Buy),
        sell: share(Action::Sell),
        hold: share(Action::Hold),
    };

    let actions: Vec<Action> = inputs.iter().map(|i| i.action).collect();
    let agreement = agreement(&actions);
    let strength = if agreement >= config.min_consensus() {
        Strength::Strong
    } else {
        Strength::Weak
    };

    let breakdown = inputs
        .iter()
        .map(|input| SourceContribution {
            source: input.source.clone(),
            action: input.action,
            confidence: input.confidence,
            weight: input.weight,
            score: input.weight * input.confidence,
            agrees: input.action == final_action,
        })
        .collect();

    let bands = risk_bands(final_action, price, volatility, config);
    let sizing = position_sizing(final_action, final_confidence, price, bands, config);
    let RiskBands { target, stop } = bands;

    debug!(
        %final_action,
        final_confidence,
        agreement,
        ?strength,
        target,
        stop,
        "consensus reached"
    );

    Ok(ConsensusResult {
        final_action,
        final_confidence,
        agreement,
        strength,
        vote_share,
        breakdown,
        target,
        stop,
        sizing,
    })
}
