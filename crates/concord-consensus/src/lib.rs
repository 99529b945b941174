//! Multi-source consensus: confidence-weighted scoring, agreement, and
//! volatility-scaled risk bands.
//!
//! [`combine`] is the pure scoring function. [`Orchestrator`] owns a set of
//! weighted [`Predictor`]s (for example a [`ForestPredictor`]) and runs them
//! in parallel before combining.

mod action;
mod combine;
mod config;
mod error;
mod orchestrator;
mod risk;
mod source;

pub use action::Action;
pub use combine::{
    ConsensusInput, ConsensusResult, SourceContribution, Strength, VoteShare, agreement, combine,
};
pub use config::ConsensusConfig;
pub use error::ConsensusError;
pub use orchestrator::{Decision, Orchestrator, SkippedSource};
pub use risk::{PositionSizing, RiskBands, position_sizing, risk_bands};
pub use source::{ForestPredictor, Predictor, SourcePrediction, StaticPredictor};
