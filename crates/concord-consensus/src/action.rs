//! The trading action class set.

use std::fmt;
use std::str::FromStr;

use crate::error::ConsensusError;

/// A predicted action. Class indices follow the declaration order, so a
/// three-class forest trained on `[Buy, Sell, Hold]` maps directly.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    /// Directional up.
    Buy,
    /// Directional down.
    Sell,
    /// Neutral; no exposure taken.
    Hold,
}

impl Action {
    /// All actions in class-index order, which is also the tie-break order.
    pub const ALL: [Action; 3] = [Action::Buy, Action::Sell, Action::Hold];

    /// Class index of this action.
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Action::Buy => 0,
            Action::Sell => 1,
            Action::Hold => 2,
        }
    }

    /// Action for a class index, if any.
    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Sign of the price move this action bets on: `1.0`, `-1.0` or `0.0`.
    #[must_use]
    pub fn direction(self) -> f64 {
        match self {
            Action::Buy => 1.0,
            Action::Sell => -1.0,
            Action::Hold => 0.0,
        }
    }

    /// Upper-case label used in files and reports.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Buy => "BUY",
            Action::Sell => "SELL",
            Action::Hold => "HOLD",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = ConsensusError;

    /// Parse a label case-insensitively, ignoring surrounding whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let label = s.trim();
        Self::ALL
            .into_iter()
            .find(|a| a.as_str().eq_ignore_ascii_case(label))
            .ok_or_else(|| ConsensusError::UnknownAction {
                label: label.to_string(),
            })
    }
}
